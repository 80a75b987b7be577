// error.rs — 统一错误类型
// 核心模块（locator / catalog / source）全部返回 GatherError，
// main 中再转换为 Box<dyn Error> 输出给用户

use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, GatherError>;

/// 所有操作都是快速失败：内部不做任何重试
#[derive(Debug, Error)]
pub enum GatherError {
    /// 不支持的 filter_by 取值，在发出任何请求之前校验
    #[error("invalid filter `{0}`, expected one of: title, ASC, DESC")]
    InvalidFilter(String),

    /// 网络/传输错误或非 2xx 状态码
    #[error("failed to fetch {url}: {reason}")]
    FetchFailed { url: String, reason: String },

    /// 列表片段缺少预期的结构
    #[error("failed to parse listing: {reason}\n{fragment}")]
    ParseFailed { reason: String, fragment: String },

    /// 二分查找在上界内没有找到终止页
    #[error("page search exhausted its bound without a terminal page (low = {low}, high = {high})")]
    SearchExhausted { low: i64, high: i64 },

    #[error("no wallpaper of size {resolution}")]
    NoMatchingResolution { resolution: String },

    #[error("wallpaper \"{name}\" has no downloadable resolutions")]
    NoResolutionsAvailable { name: String },

    /// 资源下载或写盘失败
    #[error("failed to download {url} to {}: {reason}", path.display())]
    DownloadFailed {
        url: String,
        path: PathBuf,
        reason: String,
    },

    /// 设置桌面壁纸失败或当前平台不支持
    #[error("cannot set desktop background: {0}")]
    Platform(String),

    #[error("operation cancelled")]
    Cancelled,
}

impl GatherError {
    pub fn fetch(url: &str, reason: impl ToString) -> Self {
        GatherError::FetchFailed {
            url: url.to_string(),
            reason: reason.to_string(),
        }
    }

    pub fn parse(reason: impl ToString, fragment: impl ToString) -> Self {
        GatherError::ParseFailed {
            reason: reason.to_string(),
            fragment: fragment.to_string(),
        }
    }

    pub fn download(url: &str, path: &std::path::Path, reason: impl ToString) -> Self {
        GatherError::DownloadFailed {
            url: url.to_string(),
            path: path.to_path_buf(),
            reason: reason.to_string(),
        }
    }
}
