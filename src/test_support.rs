// test_support.rs — 测试辅助
// 一个最小的 HTTP/1.1 服务器（只支持 GET/HEAD，每个连接一个请求）和一个按脚本回放的内存壁纸源

use crate::error::{GatherError, Result};
use crate::source::{ListingQuery, ListingResponse, WallpaperSource};
use async_trait::async_trait;
use std::collections::HashMap;
use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::thread;

#[derive(Debug, Clone)]
pub struct Route {
    path: String,
    status: u16,
    content_type: String,
    body: Vec<u8>,
    /// 声明的 Content-Length，为 None 时就是 body 的长度
    declared_len: Option<usize>,
}

impl Route {
    pub fn ok(path: &str, content_type: &str, body: impl Into<Vec<u8>>) -> Self {
        Self {
            path: path.to_string(),
            status: 200,
            content_type: content_type.to_string(),
            body: body.into(),
            declared_len: None,
        }
    }

    /// 声明 declared_len 字节，但只发送 body 就关闭连接
    pub fn truncated(path: &str, body: impl Into<Vec<u8>>, declared_len: usize) -> Self {
        Self {
            declared_len: Some(declared_len),
            ..Self::ok(path, "image/jpeg", body)
        }
    }

    pub fn status(path: &str, status: u16) -> Self {
        Self {
            path: path.to_string(),
            status,
            content_type: "text/plain".to_string(),
            body: Vec::new(),
            declared_len: None,
        }
    }
}

pub struct TestServer {
    pub base_url: String,
    requests: Arc<Mutex<Vec<String>>>,
}

impl TestServer {
    /// 已收到的请求行，如 `GET /see-more?page=0 HTTP/1.1`
    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}

/// 在后台线程启动服务器，一直运行到进程退出
pub fn serve(routes: Vec<Route>) -> TestServer {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let port = listener.local_addr().unwrap().port();
    let routes = Arc::new(routes);
    let requests = Arc::new(Mutex::new(Vec::new()));
    let seen = Arc::clone(&requests);

    thread::spawn(move || {
        for stream in listener.incoming().flatten() {
            let routes = Arc::clone(&routes);
            let seen = Arc::clone(&seen);
            thread::spawn(move || handle(stream, &routes, &seen));
        }
    });

    TestServer {
        base_url: format!("http://127.0.0.1:{}", port),
        requests,
    }
}

fn handle(mut stream: TcpStream, routes: &[Route], seen: &Mutex<Vec<String>>) {
    let _ = stream.set_read_timeout(Some(std::time::Duration::from_secs(2)));
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    while !buf.windows(4).any(|w| w == b"\r\n\r\n") {
        match stream.read(&mut chunk) {
            Ok(0) | Err(_) => break,
            Ok(n) => buf.extend_from_slice(&chunk[..n]),
        }
    }
    let request = String::from_utf8_lossy(&buf);
    let Some(request_line) = request.lines().next() else {
        return;
    };
    seen.lock().unwrap().push(request_line.to_string());

    let mut parts = request_line.split_whitespace();
    let method = parts.next().unwrap_or("");
    let target = parts.next().unwrap_or("/");
    let path = target.split('?').next().unwrap_or(target);

    let (status, content_type, body, declared_len) = match routes.iter().find(|r| r.path == path) {
        Some(route) => (
            route.status,
            route.content_type.as_str(),
            route.body.as_slice(),
            route.declared_len.unwrap_or(route.body.len()),
        ),
        None => (404, "text/plain", &b""[..], 0),
    };

    let head = format!(
        "HTTP/1.1 {} X\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
        status,
        content_type,
        declared_len
    );
    let _ = stream.write_all(head.as_bytes());
    if !method.eq_ignore_ascii_case("HEAD") {
        let _ = stream.write_all(body);
    }
    let _ = stream.flush();
}

/// 按远端页面的结构生成一个 div.wrap 条目
pub fn entry_html(expansion: &str, name: &str, resolutions: &[(&str, &str)]) -> String {
    let links: String = resolutions
        .iter()
        .map(|(label, url)| format!(r#"<a href="{url}" download="{url}">{label}</a>"#))
        .collect();
    format!(
        r#"<div class="wrap"><h3>{name}</h3><span>({expansion})</span><p class="author">By: Some Author</p><div class="download-links">{links}</div></div>"#
    )
}

/// 按脚本回放的壁纸源
///
/// 超出脚本的页返回空内容、没有后续页；资源从 assets 读取，未知地址报错
#[derive(Default)]
pub struct ScriptedSource {
    pub pages: Vec<ListingResponse>,
    pub assets: HashMap<String, Vec<u8>>,
    pub listing_requests: Mutex<Vec<u32>>,
    pub head_requests: Mutex<Vec<String>>,
    pub downloads: Mutex<Vec<String>>,
    /// 下载这个地址时返回失败
    pub broken_asset: Option<String>,
    /// 请求这一页列表时返回 FetchFailed
    pub failing_page: Option<u32>,
}

impl ScriptedSource {
    /// 第 last 页有内容且没有后续页，之前的页都声明还有后续，之后的页全为空
    pub fn with_last_page(last: u32) -> Self {
        let pages = (0..=last)
            .map(|page| ListingResponse {
                html: entry_html("Kaladesh", &format!("Page {page}"), &[("1920x1080", "u")]),
                has_more: page < last,
                page_hint: Some(last + 1),
            })
            .collect();
        Self {
            pages,
            ..Default::default()
        }
    }

    pub fn probes(&self) -> Vec<u32> {
        self.listing_requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl WallpaperSource for ScriptedSource {
    async fn fetch_listing(&self, query: &ListingQuery) -> Result<ListingResponse> {
        self.listing_requests.lock().unwrap().push(query.page);
        if self.failing_page == Some(query.page) {
            return Err(GatherError::fetch("scripted", "connection reset by peer"));
        }
        Ok(self
            .pages
            .get(query.page as usize)
            .cloned()
            .unwrap_or_default())
    }

    async fn content_length(&self, url: &str) -> Result<u64> {
        self.head_requests.lock().unwrap().push(url.to_string());
        self.assets
            .get(url)
            .map(|body| body.len() as u64)
            .ok_or_else(|| GatherError::fetch(url, "HTTP 404 Not Found"))
    }

    async fn download_to(&self, url: &str, dest: &Path) -> Result<u64> {
        self.downloads.lock().unwrap().push(url.to_string());
        if self.broken_asset.as_deref() == Some(url) {
            return Err(GatherError::download(url, dest, "HTTP 500 Internal Server Error"));
        }
        let body = self
            .assets
            .get(url)
            .ok_or_else(|| GatherError::download(url, dest, "HTTP 404 Not Found"))?;
        std::fs::write(dest, body).map_err(|e| GatherError::download(url, dest, e))?;
        Ok(body.len() as u64)
    }
}

/// 收集 tracing 输出，方便断言记录了哪些事件
#[derive(Clone, Default)]
pub struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

impl CapturedLogs {
    pub fn dispatch(&self) -> tracing::Dispatch {
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_writer(self.clone())
            .with_ansi(false)
            .finish();
        tracing::Dispatch::new(subscriber)
    }

    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl<'a> tracing_subscriber::fmt::MakeWriter<'a> for CapturedLogs {
    type Writer = CapturedLogs;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}
