// source/mod.rs — 壁纸源抽象接口模块
// 定义列表查询参数、列表响应，以及核心逻辑依赖的 WallpaperSource Trait
pub mod wizards;

use crate::error::{GatherError, Result};
use async_trait::async_trait;
use serde_json::Value;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// 列表接口的排序/过滤方式（对应查询参数 filter_by）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FilterBy {
    #[default]
    Title,
    Asc,
    Desc,
}

impl FilterBy {
    pub fn as_str(&self) -> &'static str {
        match self {
            FilterBy::Title => "title",
            FilterBy::Asc => "ASC",
            FilterBy::Desc => "DESC",
        }
    }
}

impl FromStr for FilterBy {
    type Err = GatherError;

    /// 取值区分大小写，与远端接口保持一致
    fn from_str(s: &str) -> Result<Self> {
        match s {
            "title" => Ok(FilterBy::Title),
            "ASC" => Ok(FilterBy::Asc),
            "DESC" => Ok(FilterBy::Desc),
            other => Err(GatherError::InvalidFilter(other.to_string())),
        }
    }
}

impl fmt::Display for FilterBy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 一次列表请求的全部参数
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingQuery {
    pub filter_by: FilterBy,
    /// 标题子串过滤，空串表示不过滤
    pub title: String,
    /// 系列（expansion）精确过滤，空串表示不过滤
    pub expansion: String,
    pub page: u32,
}

impl ListingQuery {
    /// artist 固定为 "-1"
    pub fn params(&self) -> Vec<(&'static str, String)> {
        vec![
            ("filter_by", self.filter_by.as_str().to_string()),
            ("expansion", self.expansion.clone()),
            ("artist", "-1".to_string()),
            ("title", self.title.clone()),
            ("page", self.page.to_string()),
        ]
    }
}

/// 列表接口解码后的响应
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListingResponse {
    /// data 字段中的 HTML 片段，可能为空
    pub html: String,
    /// displaySeeMore：true 表示后面还有更多页
    pub has_more: bool,
    /// 服务端回显的 page，只在二分查找的终止响应里有意义
    pub page_hint: Option<u32>,
}

impl ListingResponse {
    pub fn has_content(&self) -> bool {
        !self.html.trim().is_empty()
    }
}

/// 解析 displaySeeMore 字段
///
/// 接受 0/1、true/false 以及 "0"/"1"；其余取值一律视为解析失败，
/// 不去猜测翻页方向。
pub fn decode_continuation_flag(value: Option<&Value>) -> Result<bool> {
    match value {
        Some(Value::Bool(b)) => Ok(*b),
        Some(Value::Number(n)) => match n.as_u64() {
            Some(0) => Ok(false),
            Some(1) => Ok(true),
            _ => Err(GatherError::parse("unexpected displaySeeMore value", n)),
        },
        Some(Value::String(s)) => match s.trim() {
            "0" => Ok(false),
            "1" => Ok(true),
            _ => Err(GatherError::parse("unexpected displaySeeMore value", s)),
        },
        Some(other) => Err(GatherError::parse("unexpected displaySeeMore value", other)),
        None => Err(GatherError::parse("response has no displaySeeMore field", "")),
    }
}

/// 壁纸源的抽象 Trait
///
/// 核心逻辑只通过它访问网络：列表请求、仅取元数据的大小探测、以及流式下载。
/// 所有调用都是顺序 await 的，同一时刻最多只有一个请求在途。
#[async_trait]
pub trait WallpaperSource: Send + Sync {
    /// 请求一页列表
    async fn fetch_listing(&self, query: &ListingQuery) -> Result<ListingResponse>;

    /// 只读取资源大小（Content-Length），不下载内容；缺少长度时返回 0
    async fn content_length(&self, url: &str) -> Result<u64>;

    /// 将资源流式写入 dest（已存在则覆盖），返回写入的字节数
    ///
    /// 下载失败时 dest 原有的内容保持不变
    async fn download_to(&self, url: &str, dest: &Path) -> Result<u64>;
}
