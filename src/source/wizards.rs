// wizards.rs — magic.wizards.com 壁纸列表异步客户端模块
// 负责与 see-more-wallpaper 接口交互：请求列表、探测资源大小、下载图片

use super::{ListingQuery, ListingResponse, WallpaperSource, decode_continuation_flag};
use crate::error::{GatherError, Result};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;

pub const DEFAULT_BASE_URL: &str = "https://magic.wizards.com/en/see-more-wallpaper";
/// 下载中临时文件的后缀
pub const PART_SUFFIX: &str = ".part";

/// see-more-wallpaper 接口的 JSON 响应
///
/// displaySeeMore 和 page 的类型在不同时期并不稳定（数字、布尔、字符串都出现过），
/// 所以先按 Value 接收，再统一解码
#[derive(Deserialize, Debug)]
struct SeeMoreResponse {
    #[serde(default)]
    data: Option<String>,
    #[serde(rename = "displaySeeMore")]
    display_see_more: Option<Value>,
    #[serde(default)]
    page: Option<Value>,
}

impl SeeMoreResponse {
    fn into_listing(self) -> Result<ListingResponse> {
        let has_more = decode_continuation_flag(self.display_see_more.as_ref())?;
        let page_hint = self.page.as_ref().and_then(|p| match p {
            Value::Number(n) => n.as_u64().and_then(|n| u32::try_from(n).ok()),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        });

        Ok(ListingResponse {
            html: self.data.unwrap_or_default(),
            has_more,
            page_hint,
        })
    }
}

/// 客户端的网络参数
#[derive(Debug, Clone)]
pub struct ClientOptions {
    pub base_url: String,
    /// 单次请求超时
    pub timeout: Duration,
    pub connect_timeout: Duration,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
        }
    }
}

/// magic.wizards.com 异步客户端
///
/// reqwest::Client 只创建一次，列表请求、HEAD 探测和下载全部复用它的连接池
pub struct WizardsClient {
    client: reqwest::Client,
    base_url: String,
}

impl WizardsClient {
    pub fn new(options: ClientOptions) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(format!("gatherer/{}", env!("CARGO_PKG_VERSION")))
            .timeout(options.timeout)
            .connect_timeout(options.connect_timeout)
            .build()
            .map_err(|e| GatherError::fetch(&options.base_url, e))?;

        Ok(Self {
            client,
            base_url: options.base_url,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn stream_to(&self, url: &str, dest: &Path, part: &Path) -> Result<u64> {
        let mut response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| GatherError::download(url, dest, e))?;

        if !response.status().is_success() {
            return Err(GatherError::download(
                url,
                dest,
                format!("HTTP {}", response.status()),
            ));
        }

        let mut file = File::create(part)
            .await
            .map_err(|e| GatherError::download(url, dest, e))?;

        // 按块写入，不把整张图读进内存
        let mut written = 0u64;
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| GatherError::download(url, dest, e))?
        {
            file.write_all(&chunk)
                .await
                .map_err(|e| GatherError::download(url, dest, e))?;
            written += chunk.len() as u64;
        }

        file.flush()
            .await
            .map_err(|e| GatherError::download(url, dest, e))?;

        Ok(written)
    }
}

#[async_trait]
impl WallpaperSource for WizardsClient {
    async fn fetch_listing(&self, query: &ListingQuery) -> Result<ListingResponse> {
        let response = self
            .client
            .get(&self.base_url)
            .query(&query.params())
            .send()
            .await
            .map_err(|e| GatherError::fetch(&self.base_url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(GatherError::fetch(&self.base_url, format!("HTTP {}", status)));
        }

        // 200 但 body 不是预期的 JSON（比如一张 HTML 错误页）算作载荷格式错误
        let text = response
            .text()
            .await
            .map_err(|e| GatherError::fetch(&self.base_url, e))?;
        let body: SeeMoreResponse = serde_json::from_str(&text)
            .map_err(|e| GatherError::parse(format!("unexpected listing payload: {e}"), &text))?;

        body.into_listing()
    }

    async fn content_length(&self, url: &str) -> Result<u64> {
        let response = self
            .client
            .head(url)
            .send()
            .await
            .map_err(|e| GatherError::fetch(url, e))?;

        if !response.status().is_success() {
            return Err(GatherError::fetch(url, format!("HTTP {}", response.status())));
        }

        // HEAD 响应没有 body，reqwest 的 content_length() 会返回 0，只能直接读 header
        let length = response
            .headers()
            .get(reqwest::header::CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u64>().ok())
            .unwrap_or(0);

        Ok(length)
    }

    /// 先写入 `<dest>.part`，完整收到后再改名覆盖 dest；失败时删掉临时文件，原有文件保持不变
    async fn download_to(&self, url: &str, dest: &Path) -> Result<u64> {
        let part = part_path(dest);

        match self.stream_to(url, dest, &part).await {
            Ok(written) => {
                if let Err(e) = tokio::fs::rename(&part, dest).await {
                    let _ = tokio::fs::remove_file(&part).await;
                    return Err(GatherError::download(url, dest, e));
                }
                Ok(written)
            }
            Err(e) => {
                let _ = tokio::fs::remove_file(&part).await;
                Err(e)
            }
        }
    }
}

/// 下载中的临时文件：在完整文件名后追加 ".part"
pub fn part_path(dest: &Path) -> PathBuf {
    let mut name = dest.as_os_str().to_owned();
    name.push(PART_SUFFIX);
    PathBuf::from(name)
}
