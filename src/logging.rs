// logging.rs — 日志初始化模块
// 根据命令行/配置构造一个 tracing::Dispatch，由 main 挂到顶层 future 上，
// 不安装进程级的全局 subscriber

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::Dispatch;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::writer::BoxMakeWriter;

/// 日志输出选项
#[derive(Debug, Clone, Default)]
pub struct LogOptions {
    /// 输出 debug 级别日志；否则只输出 warning 及以上
    pub verbose: bool,
    /// 写入文件（追加），不指定则写到 stderr
    pub log_file: Option<PathBuf>,
}

impl LogOptions {
    /// RUST_LOG 优先，其次按 verbose 决定级别
    fn filter(&self) -> EnvFilter {
        let default = if self.verbose {
            "warn,gatherer=debug"
        } else {
            "warn"
        };
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default))
    }
}

fn open_log_file(path: &Path) -> io::Result<fs::File> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    fs::OpenOptions::new().create(true).append(true).open(path)
}

/// 构造日志 Dispatch
///
/// 打不开日志文件时返回 Err，由调用方决定是否退回 stderr
pub fn build_dispatch(options: &LogOptions) -> io::Result<Dispatch> {
    let (writer, ansi) = match &options.log_file {
        Some(path) => (BoxMakeWriter::new(Mutex::new(open_log_file(path)?)), false),
        None => (BoxMakeWriter::new(io::stderr), true),
    };

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(options.filter())
        .with_writer(writer)
        .with_ansi(ansi)
        .with_target(true)
        .finish();

    Ok(Dispatch::new(subscriber))
}

/// 只写 stderr 的 Dispatch，日志文件不可用时使用
pub fn stderr_dispatch(verbose: bool) -> Dispatch {
    let options = LogOptions {
        verbose,
        log_file: None,
    };
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(options.filter())
        .with_writer(io::stderr)
        .finish();
    Dispatch::new(subscriber)
}
