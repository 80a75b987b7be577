// catalog.rs — 壁纸目录模块
// 负责：解析列表 HTML 片段、挑选壁纸、下载单张壁纸以及整包下载

use crate::error::{GatherError, Result};
use crate::locator::PageLocator;
use crate::source::{FilterBy, ListingQuery, WallpaperSource};
use rand::Rng;
use rand::seq::SliceRandom;
use scraper::{ElementRef, Html, Selector};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{Instrument, Span, debug, info, warn};

// 远端 HTML 结构的全部假设都集中在这里，页面改版时只需调整这些常量
/// 每个壁纸条目的外层容器
pub const ENTRY_SELECTOR: &str = "div.wrap";
/// 标题
pub const TITLE_SELECTOR: &str = "h3";
/// 系列名，形如 "(Kaladesh)"
pub const EXPANSION_SELECTOR: &str = "span";
/// 作者，形如 "By: Some Author"
pub const AUTHOR_SELECTOR: &str = "p.author";
/// 作者前缀 "By:" 的长度
pub const AUTHOR_LABEL_LEN: usize = 3;
/// 分辨率链接：文本是分辨率，download 属性是下载地址
pub const RESOLUTION_LINK_SELECTOR: &str = "a";
pub const DOWNLOAD_ATTR: &str = "download";

/// 文件名的字节上限（常见文件系统的 NAME_MAX）
const NAME_MAX: usize = 255;
const FILE_EXTENSION: &str = ".jpg";

/// 一张壁纸的元数据
///
/// 解析后不再修改；挑选逻辑只读取 resolutions
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WallpaperRecord {
    pub name: String,
    pub expansion: String,
    pub author: String,
    /// 分辨率 -> 下载地址；BTreeMap 让遍历顺序固定
    pub resolutions: BTreeMap<String, String>,
}

impl WallpaperRecord {
    pub fn has_resolution(&self, resolution: &str) -> bool {
        self.resolutions.contains_key(resolution)
    }
}

/// 一页解析后的列表结果
#[derive(Debug, Clone, Default)]
pub struct ListingPage {
    pub records: Vec<WallpaperRecord>,
    pub has_more: bool,
}

fn selector(css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|e| GatherError::parse(format!("bad selector {css}: {e:?}"), ""))
}

fn element_text(element: ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_string()
}

/// 解析整段列表 HTML
///
/// 要么全部条目解析成功，要么整体失败；空片段返回空列表
pub fn parse_listing(html: &str) -> Result<Vec<WallpaperRecord>> {
    if html.trim().is_empty() {
        return Ok(Vec::new());
    }

    let document = Html::parse_fragment(html);
    let entry = selector(ENTRY_SELECTOR)?;

    document
        .select(&entry)
        .map(parse_listing_entry)
        .collect()
}

/// 解析单个 div.wrap 条目
pub fn parse_listing_entry(entry: ElementRef<'_>) -> Result<WallpaperRecord> {
    let missing = |what: &str| GatherError::parse(format!("entry has no {what}"), entry.html());

    let name = entry
        .select(&selector(TITLE_SELECTOR)?)
        .next()
        .map(element_text)
        .ok_or_else(|| missing("title"))?;

    let expansion = entry
        .select(&selector(EXPANSION_SELECTOR)?)
        .next()
        .map(|span| element_text(span).replace(['(', ')'], "").trim().to_string())
        .ok_or_else(|| missing("expansion"))?;

    let author = entry
        .select(&selector(AUTHOR_SELECTOR)?)
        .next()
        .map(|p| {
            element_text(p)
                .chars()
                .skip(AUTHOR_LABEL_LEN)
                .collect::<String>()
                .trim()
                .to_string()
        })
        .ok_or_else(|| missing("author"))?;

    let mut resolutions = BTreeMap::new();
    for link in entry.select(&selector(RESOLUTION_LINK_SELECTOR)?) {
        // 带 class 的链接是分享按钮之类，不是分辨率
        if link.value().attr("class").is_some_and(|c| !c.trim().is_empty()) {
            continue;
        }

        let size = element_text(link);
        let url = link
            .value()
            .attr(DOWNLOAD_ATTR)
            .map(str::trim)
            .filter(|url| !url.is_empty())
            .ok_or_else(|| missing("download attribute on a resolution link"))?;
        if size.is_empty() {
            return Err(missing("resolution label"));
        }

        debug!("Parsing wallpaper: [{}] {} {}", expansion, name, size);
        resolutions.insert(size, url.to_string());
    }

    Ok(WallpaperRecord {
        name,
        expansion,
        author,
        resolutions,
    })
}

/// 在带有目标分辨率的壁纸中等概率随机挑一张
pub fn select_random<'r, R: Rng + ?Sized>(
    records: &'r [WallpaperRecord],
    resolution: &str,
    rng: &mut R,
) -> Result<&'r WallpaperRecord> {
    let eligible: Vec<&WallpaperRecord> = records
        .iter()
        .filter(|r| r.has_resolution(resolution))
        .collect();

    eligible
        .choose(rng)
        .copied()
        .ok_or_else(|| GatherError::NoMatchingResolution {
            resolution: resolution.to_string(),
        })
}

/// 把文件系统不允许的字符替换为 '_'
///
/// 首尾的空格和点会被去掉，结果为空时使用 "wallpaper"
pub fn sanitize_filename(name: &str) -> String {
    const FORBIDDEN: &[char] = &['/', '\\', ':', '*', '?', '"', '<', '>', '|'];

    let replaced: String = name
        .chars()
        .map(|c| {
            if c.is_control() || FORBIDDEN.contains(&c) {
                '_'
            } else {
                c
            }
        })
        .collect();

    let trimmed = replaced.trim_matches(|c: char| c == ' ' || c == '.');
    if trimmed.is_empty() {
        "wallpaper".to_string()
    } else {
        trimmed.to_string()
    }
}

/// 壁纸保存的文件名："[系列] 标题.jpg"
pub fn wallpaper_filename(record: &WallpaperRecord) -> String {
    let stem = sanitize_filename(&format!("[{}] {}", record.expansion, record.name));

    let limit = NAME_MAX - FILE_EXTENSION.len();
    let mut take = stem.len().min(limit);
    while !stem.is_char_boundary(take) {
        take -= 1;
    }

    format!("{}{}", stem[..take].trim_end(), FILE_EXTENSION)
}

/// 壁纸目录：列表请求、挑选与下载
pub struct WallpaperCatalog<'a, S: WallpaperSource + ?Sized> {
    source: &'a S,
    filter_by: FilterBy,
    span: Span,
}

impl<'a, S: WallpaperSource + ?Sized> WallpaperCatalog<'a, S> {
    pub fn new(source: &'a S, filter_by: FilterBy, span: Span) -> Self {
        Self {
            source,
            filter_by,
            span,
        }
    }

    /// 请求并解析一页列表
    pub async fn fetch_page(&self, page: u32, title: &str, expansion: &str) -> Result<ListingPage> {
        let query = ListingQuery {
            filter_by: self.filter_by,
            title: title.to_string(),
            expansion: expansion.to_string(),
            page,
        };

        let response = self
            .source
            .fetch_listing(&query)
            .instrument(self.span.clone())
            .await?;

        let records = parse_listing(&response.html)?;
        self.span.in_scope(|| {
            debug!(page, count = records.len(), has_more = response.has_more, "page merged");
        });

        Ok(ListingPage {
            records,
            has_more: response.has_more,
        })
    }

    /// 逐个探测各分辨率的资源大小，返回最大的那个
    ///
    /// 大小相同时保留先遇到的
    pub async fn select_largest_available(&self, record: &WallpaperRecord) -> Result<String> {
        async {
            let mut best: Option<(&String, u64)> = None;

            for (size, url) in &record.resolutions {
                let length = self.source.content_length(url).await?;
                debug!(size = %size, length, "probed resolution");

                if best.is_none_or(|(_, max)| length > max) {
                    best = Some((size, length));
                }
            }

            best.map(|(size, _)| size.clone())
                .ok_or_else(|| GatherError::NoResolutionsAvailable {
                    name: record.name.clone(),
                })
        }
        .instrument(self.span.clone())
        .await
    }

    /// 下载一张壁纸到 dest_dir，返回保存路径
    ///
    /// 目标分辨率不存在时退回到最大的可用分辨率，并记录一条 warning
    pub async fn download(
        &self,
        record: &WallpaperRecord,
        resolution: &str,
        dest_dir: &Path,
    ) -> Result<PathBuf> {
        let size = if record.has_resolution(resolution) {
            resolution.to_string()
        } else {
            let substitute = self.select_largest_available(record).await?;
            self.span.in_scope(|| {
                warn!(
                    "[{}] {} has no {}, using {} instead",
                    record.expansion, record.name, resolution, substitute
                );
            });
            substitute
        };

        let url = &record.resolutions[&size];
        let path = dest_dir.join(wallpaper_filename(record));

        async {
            tokio::fs::create_dir_all(dest_dir)
                .await
                .map_err(|e| GatherError::download(url, &path, e))?;

            info!("Fetching {} by {} from {}", record.name, record.author, url);
            let written = self.source.download_to(url, &path).await?;
            info!("Saved {} to {} ({} bytes)", record.name, path.display(), written);

            Ok::<_, GatherError>(path)
        }
        .instrument(self.span.clone())
        .await
    }

    /// 整包下载：从第 0 页开始顺序翻页，直到某页声明没有后续页
    ///
    /// 任何一张下载失败都会中止整个操作，不跳过、不重试
    pub async fn download_pack(
        &self,
        title: &str,
        expansion: &str,
        resolution: &str,
        dest_dir: &Path,
    ) -> Result<usize> {
        let mut page = 0u32;
        let mut written = 0usize;

        loop {
            let listing = self.fetch_page(page, title, expansion).await?;

            for record in &listing.records {
                self.download(record, resolution, dest_dir).await?;
                written += 1;
            }

            if !listing.has_more {
                break;
            }
            page += 1;
        }

        self.span.in_scope(|| {
            info!(pages = page + 1, written, "pack download finished");
        });
        Ok(written)
    }

    /// 随机下载一张：先定位最后一页，再随机挑一页、随机挑一张
    pub async fn get_random_wallpaper<R: Rng + ?Sized>(
        &self,
        title: &str,
        expansion: &str,
        resolution: &str,
        dest_dir: &Path,
        upper_bound: u32,
        rng: &mut R,
    ) -> Result<PathBuf> {
        let locator = PageLocator::new(self.source, self.filter_by, self.span.clone());
        let last_page = locator.locate(title, expansion, upper_bound).await?;

        let page = rng.gen_range(0..=last_page);
        self.span.in_scope(|| {
            debug!("Chosen page = {} / {}", page + 1, last_page + 1);
        });

        let listing = self.fetch_page(page, title, expansion).await?;
        let record = select_random(&listing.records, resolution, rng)?;

        self.download(record, resolution, dest_dir).await
    }
}
