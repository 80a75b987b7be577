// cli.rs — 命令行接口定义模块
// 使用 clap 的 derive 模式定义参数；不带子命令时执行下载

use clap::{Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

/// Get your wallpaper!
///
/// Downloads a random Magic: The Gathering wallpaper from magic.wizards.com,
/// or a whole pack of them with --pack.
#[derive(Parser, Debug)]
#[command(name = "gatherer")]
#[command(version)]
#[command(author)]
#[command(args_conflicts_with_subcommands = true)]
pub struct Cli {
    /// Only get wallpapers whose title contains NAME
    #[arg(short, long, default_value = "", value_name = "NAME")]
    pub name: String,

    /// Only get wallpapers from a specific expansion
    #[arg(short, long, default_value = "")]
    pub expansion: String,

    /// Size of the wallpaper, e.g. 2560x1600 [config: download.size]
    #[arg(short, long, value_name = "WxH")]
    pub size: Option<String>,

    /// Directory to download wallpapers to [config: download.path]
    #[arg(short, long, value_name = "DIR")]
    pub path: Option<PathBuf>,

    /// Listing order: title, ASC or DESC [config: search.filter_by]
    #[arg(short, long, value_name = "FILTER")]
    pub filter_by: Option<String>,

    /// Be verbose
    #[arg(short, long)]
    pub verbose: bool,

    /// Log file to store verbose output. Useful for cron
    #[arg(short, long, value_name = "FILE")]
    pub log_file: Option<PathBuf>,

    /// Set the downloaded wallpaper as desktop picture
    #[arg(short, long, conflicts_with = "pack")]
    pub wallpaper: bool,

    /// Download every matching wallpaper instead of a random one
    #[arg(short = 'P', long)]
    pub pack: bool,

    /// Upper bound on the number of result pages [config: search.upper_bound]
    #[arg(long, value_name = "N", value_parser = clap::value_parser!(u32).range(1..))]
    pub max_pages: Option<u32>,

    /// Request timeout in seconds [config: network.timeout_secs]
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print shell completions (bash, zsh, fish, elvish, powershell)
    ///
    /// Example:
    ///   gatherer completions zsh > ~/.zsh/completions/_gatherer
    Completions {
        shell: Shell,
    },

    /// Inspect or change the config file
    ///
    /// Example:
    ///   gatherer config show
    ///   gatherer config set size 1920x1080
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show the effective settings
    Show,
    /// Print the JSON Schema of the config file
    Schema,
    /// Print the effective config as TOML
    Dump,
    /// Set a value (path, size, filter_by, upper_bound, base_url, timeout, log_file)
    Set {
        key: String,
        value: String,
    },
}
