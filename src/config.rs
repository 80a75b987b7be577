// config.rs — 配置管理模块
// 遵循 Unix 风格：优先从 $XDG_CONFIG_HOME/gatherer/config.toml（默认 ~/.config/gatherer/config.toml）读取配置
// 优先级：命令行参数 > 环境变量 > 配置文件 > 内置默认值

use crate::source::FilterBy;
use crate::source::wizards::DEFAULT_BASE_URL;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use shellexpand::tilde;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// 覆盖列表接口地址的环境变量
pub const BASE_URL_ENV: &str = "GATHERER_BASE_URL";

/// 展开路径中的 ~ 和 $HOME 等环境变量
fn expand_path(path_str: &str) -> PathBuf {
    PathBuf::from(tilde(path_str).into_owned())
}

/// 映射 config.toml 文件内容的嵌套结构体
#[derive(Debug, Deserialize, Serialize, Default, JsonSchema)]
struct ConfigFile {
    #[serde(default)]
    download: DownloadConfig,
    #[serde(default)]
    search: SearchConfig,
    #[serde(default)]
    network: NetworkConfig,
    #[serde(default)]
    logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Serialize, JsonSchema)]
struct DownloadConfig {
    /// 壁纸保存目录（支持 ~、$HOME 等环境变量，相对路径相对于当前目录）
    #[serde(default = "default_path")]
    path: String,
    /// 目标分辨率
    #[serde(default = "default_size")]
    size: String,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            path: default_path(),
            size: default_size(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, JsonSchema)]
struct SearchConfig {
    /// 列表排序/过滤方式：title、ASC 或 DESC
    #[serde(default = "default_filter_by")]
    filter_by: String,
    /// 二分查找的页数上界
    #[serde(default = "default_upper_bound")]
    upper_bound: u32,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            filter_by: default_filter_by(),
            upper_bound: default_upper_bound(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, JsonSchema)]
struct NetworkConfig {
    /// see-more-wallpaper 接口地址
    #[serde(default = "default_base_url")]
    base_url: String,
    /// 单次请求超时（秒）
    #[serde(default = "default_timeout_secs")]
    timeout_secs: u64,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Default, JsonSchema)]
struct LoggingConfig {
    #[serde(default)]
    verbose: bool,
    /// 日志文件路径，不配置则输出到 stderr
    #[serde(default)]
    log_file: Option<String>,
}

fn default_path() -> String {
    "./".to_string()
}
fn default_size() -> String {
    "2560x1600".to_string()
}
fn default_filter_by() -> String {
    "title".to_string()
}
fn default_upper_bound() -> u32 {
    crate::locator::DEFAULT_UPPER_BOUND
}
fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}
fn default_timeout_secs() -> u64 {
    30
}

/// 应用全局配置项
#[derive(Debug)]
pub struct AppConfig {
    /// 壁纸保存目录
    pub download_dir: PathBuf,
    /// 默认分辨率
    pub size: String,
    /// 列表排序方式，使用前才校验（FilterBy::from_str）
    pub filter_by: String,
    pub upper_bound: u32,
    /// 列表接口地址 (优先级：ENV > TOML)
    pub base_url: String,
    pub timeout_secs: u64,
    pub verbose: bool,
    pub log_file: Option<PathBuf>,
    /// 配置文件所在路径
    pub config_path: PathBuf,
    /// 配置文件存在但无法解析时的错误信息，日志初始化后再输出
    pub load_error: Option<String>,
}

impl AppConfig {
    /// 从默认位置初始化配置
    pub fn new() -> Self {
        let config_dir = env::var_os("XDG_CONFIG_HOME")
            .filter(|v| !v.is_empty())
            .map(PathBuf::from)
            .or_else(|| env::var_os("HOME").map(|home| PathBuf::from(home).join(".config")))
            .unwrap_or_else(|| PathBuf::from("."));

        let mut config = Self::from_file(&config_dir.join("gatherer").join("config.toml"));

        // 环境变量 > 配置文件内容
        if let Ok(url) = env::var(BASE_URL_ENV) {
            if !url.trim().is_empty() {
                config.base_url = url;
            }
        }

        config
    }

    /// 从指定路径读取配置，文件不存在时使用默认值
    pub fn from_file(config_path: &Path) -> Self {
        let (config_file, load_error) = match fs::read_to_string(config_path) {
            Ok(content) => match toml::from_str::<ConfigFile>(&content) {
                Ok(file) => (file, None),
                Err(e) => (
                    ConfigFile::default(),
                    Some(format!("{}: {}", config_path.display(), e)),
                ),
            },
            Err(_) => (ConfigFile::default(), None),
        };

        Self {
            download_dir: expand_path(&config_file.download.path),
            size: config_file.download.size,
            filter_by: config_file.search.filter_by,
            upper_bound: config_file.search.upper_bound,
            base_url: config_file.network.base_url,
            timeout_secs: config_file.network.timeout_secs,
            verbose: config_file.logging.verbose,
            log_file: config_file.logging.log_file.as_deref().map(expand_path),
            config_path: config_path.to_path_buf(),
            load_error,
        }
    }

    fn to_file(&self) -> ConfigFile {
        ConfigFile {
            download: DownloadConfig {
                path: self.download_dir.to_string_lossy().to_string(),
                size: self.size.clone(),
            },
            search: SearchConfig {
                filter_by: self.filter_by.clone(),
                upper_bound: self.upper_bound,
            },
            network: NetworkConfig {
                base_url: self.base_url.clone(),
                timeout_secs: self.timeout_secs,
            },
            logging: LoggingConfig {
                verbose: self.verbose,
                log_file: self
                    .log_file
                    .as_ref()
                    .map(|p| p.to_string_lossy().to_string()),
            },
        }
    }

    /// 将配置保存回文件
    pub fn save(&self) -> std::io::Result<()> {
        if let Some(parent) = self.config_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let toml_str = toml::to_string_pretty(&self.to_file()).map_err(std::io::Error::other)?;
        fs::write(&self.config_path, toml_str)
    }

    /// 修改单个配置项（不保存）
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), String> {
        match key {
            "path" => self.download_dir = expand_path(value),
            "size" => self.size = value.to_string(),
            "filter_by" => {
                value.parse::<FilterBy>().map_err(|e| e.to_string())?;
                self.filter_by = value.to_string();
            }
            "upper_bound" => {
                self.upper_bound = value
                    .parse()
                    .ok()
                    .filter(|n: &u32| *n > 0)
                    .ok_or_else(|| format!("upper_bound must be a positive integer, got `{value}`"))?;
            }
            "base_url" => self.base_url = value.to_string(),
            "timeout" | "timeout_secs" => {
                self.timeout_secs = value
                    .parse()
                    .map_err(|_| format!("timeout must be a number of seconds, got `{value}`"))?;
            }
            "log_file" => {
                self.log_file = (!value.is_empty()).then(|| expand_path(value));
            }
            _ => return Err(format!("unknown config key `{key}`")),
        }
        Ok(())
    }

    /// 获取配置文件的 JSON Schema
    pub fn get_schema() -> String {
        let schema = schemars::schema_for!(ConfigFile);
        serde_json::to_string_pretty(&schema).unwrap_or_default()
    }

    /// 将当前配置转换为 TOML 字符串
    pub fn to_toml(&self) -> String {
        toml::to_string_pretty(&self.to_file())
            .unwrap_or_else(|_| "# Error serializing config".to_string())
    }
}
