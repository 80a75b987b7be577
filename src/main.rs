// main.rs — 程序入口
// 负责初始化异步运行时、解析命令行参数、构造日志、分发到下载或配置子命令

mod catalog;
mod cli;
mod config;
mod error;
mod locator;
mod logging;
mod setter;
mod source;
#[cfg(test)]
mod test_support;

// 初始化多语言支持，嵌入 locales 目录下的所有翻译
rust_i18n::i18n!("locales");

use catalog::WallpaperCatalog;
use clap::{CommandFactory, Parser};
use clap_complete::generate;
use cli::{Cli, Commands, ConfigAction};
use config::AppConfig;
use error::GatherError;
use logging::LogOptions;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rust_i18n::t;
use source::FilterBy;
use source::wizards::{ClientOptions, WizardsClient};
use std::process::ExitCode;
use std::time::Duration;
use tracing::instrument::WithSubscriber;
use tracing::{info_span, warn};

/// 所有请求严格顺序执行，单线程运行时就够了
#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    // 自动检测系统语言并设置
    let locale = std::env::var("LANG").unwrap_or_else(|_| "en".to_string());
    if locale.starts_with("zh") {
        rust_i18n::set_locale("zh-CN");
    } else {
        rust_i18n::set_locale("en");
    }

    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", t!("error_prefix", reason => e));
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    // 创建应用配置（读取配置文件与环境变量）
    let mut config = AppConfig::new();

    match &cli.command {
        Some(Commands::Completions { shell }) => {
            generate(*shell, &mut Cli::command(), "gatherer", &mut std::io::stdout());
            return Ok(());
        }
        Some(Commands::Config { action }) => return handle_config(&mut config, action),
        None => {}
    }

    let log_options = LogOptions {
        verbose: cli.verbose || config.verbose,
        log_file: cli.log_file.clone().or_else(|| config.log_file.clone()),
    };
    let dispatch = match logging::build_dispatch(&log_options) {
        Ok(dispatch) => dispatch,
        Err(e) => {
            eprintln!("{}", t!("log_file_fallback", reason => e));
            logging::stderr_dispatch(log_options.verbose)
        }
    };

    // 下载操作与 Ctrl-C 竞争：中断时直接丢弃正在进行的 future
    tokio::select! {
        result = handle_fetch(&cli, &config).with_subscriber(dispatch) => result,
        _ = tokio::signal::ctrl_c() => {
            eprintln!("{}", t!("cancelled"));
            Err(GatherError::Cancelled.into())
        }
    }
}

/// 处理下载：随机一张，或 --pack 整包
async fn handle_fetch(cli: &Cli, config: &AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(reason) = &config.load_error {
        warn!("ignoring unreadable config file: {}", reason);
    }

    // filter_by 必须在发出任何请求之前校验
    let filter_by: FilterBy = cli
        .filter_by
        .as_deref()
        .unwrap_or(&config.filter_by)
        .parse()?;
    let size = cli.size.as_deref().unwrap_or(&config.size);
    let dest_dir = cli.path.clone().unwrap_or_else(|| config.download_dir.clone());
    let upper_bound = cli.max_pages.unwrap_or(config.upper_bound);

    let client = WizardsClient::new(ClientOptions {
        base_url: config.base_url.clone(),
        timeout: Duration::from_secs(cli.timeout.unwrap_or(config.timeout_secs)),
        ..ClientOptions::default()
    })?;

    let span = info_span!("gather", name = %cli.name, expansion = %cli.expansion, %filter_by);
    let catalog = WallpaperCatalog::new(&client, filter_by, span);

    if cli.pack {
        println!("{}", t!("pack_start", base_url => client.base_url()));
        let count = catalog
            .download_pack(&cli.name, &cli.expansion, size, &dest_dir)
            .await?;
        println!(
            "{}",
            t!("pack_done", count => count, path => dest_dir.display())
        );
        return Ok(());
    }

    println!("{}", t!("search_start"));
    let mut rng = StdRng::from_entropy();
    let path = catalog
        .get_random_wallpaper(&cli.name, &cli.expansion, size, &dest_dir, upper_bound, &mut rng)
        .await?;
    println!("{}", t!("download_done", path => path.display()));

    if cli.wallpaper {
        println!("{}", t!("setting_wallpaper"));
        setter::platform_background().set_desktop_background(&path)?;
        println!("{}", t!("set_done"));
    }

    Ok(())
}

/// 处理 config 子命令：查看或修改配置
fn handle_config(
    config: &mut AppConfig,
    action: &ConfigAction,
) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        ConfigAction::Show => {
            println!("{}", t!("config_title"));
            println!("{}", t!("config_path", path => config.config_path.display()));
            println!("{}", t!("config_download_dir", path => config.download_dir.display()));
            println!("{}", t!("config_size", size => config.size));
            println!("{}", t!("config_filter_by", filter => config.filter_by));
            println!("{}", t!("config_upper_bound", bound => config.upper_bound));
            println!("{}", t!("config_base_url", url => config.base_url));
            println!("{}", t!("config_timeout", secs => config.timeout_secs));
            if let Some(reason) = &config.load_error {
                println!("{}", t!("config_load_error", reason => reason));
            }
        }
        ConfigAction::Schema => {
            println!("{}", AppConfig::get_schema());
        }
        ConfigAction::Dump => {
            println!("{}", config.to_toml());
        }
        ConfigAction::Set { key, value } => {
            config.set(key, value)?;
            config.save()?;
            println!("{}", t!("config_updated", key => key, value => value));
        }
    }
    Ok(())
}
