// locator.rs — 结果页数定位模块
// 用二分查找确定某个过滤条件下的最后一页，尽量减少请求次数

use crate::error::{GatherError, Result};
use crate::source::{FilterBy, ListingQuery, ListingResponse, WallpaperSource};
use tracing::{Instrument, Span, debug};

/// 默认的页数上界：假定结果不会超过这么多页
pub const DEFAULT_UPPER_BOUND: u32 = 150;

/// 一次探测的三种结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeOutcome {
    /// 有内容且没有后续页：就是要找的最后一页
    Found,
    /// 后面还有页，答案严格在 guess 之上
    Above,
    /// 空页且没有后续页：已经越过末尾
    Below,
}

impl ProbeOutcome {
    pub fn classify(response: &ListingResponse) -> Self {
        if response.has_content() && !response.has_more {
            ProbeOutcome::Found
        } else if response.has_more {
            ProbeOutcome::Above
        } else {
            ProbeOutcome::Below
        }
    }
}

/// 根据探测结果收缩区间 [low, high]
///
/// Below 时 guess 本身已被排除，所以取 guess - 1，保证区间每轮严格缩小。
pub fn narrow(low: i64, high: i64, guess: i64, outcome: ProbeOutcome) -> (i64, i64) {
    match outcome {
        ProbeOutcome::Found => (guess, guess),
        ProbeOutcome::Above => (guess + 1, high),
        ProbeOutcome::Below => (low, guess - 1),
    }
}

/// 页数定位器
///
/// 只读地借用壁纸源；每次 locate 都是一串顺序请求，不重试
pub struct PageLocator<'a, S: WallpaperSource + ?Sized> {
    source: &'a S,
    filter_by: FilterBy,
    span: Span,
}

impl<'a, S: WallpaperSource + ?Sized> PageLocator<'a, S> {
    pub fn new(source: &'a S, filter_by: FilterBy, span: Span) -> Self {
        Self {
            source,
            filter_by,
            span,
        }
    }

    /// 返回最后一个"有内容且没有后续页"的页码（从 0 开始）
    ///
    /// 在 [0, upper_bound] 内找不到这样的页时返回 SearchExhausted，
    /// 不会给出错误的答案
    pub async fn locate(&self, title: &str, expansion: &str, upper_bound: u32) -> Result<u32> {
        async {
            let mut low: i64 = 0;
            let mut high: i64 = i64::from(upper_bound);

            while low <= high {
                let guess = (low + high) / 2;
                debug!(low, high, guess, "bin_search");

                let query = ListingQuery {
                    filter_by: self.filter_by,
                    title: title.to_string(),
                    expansion: expansion.to_string(),
                    page: guess as u32,
                };
                let response = self.source.fetch_listing(&query).await?;

                match ProbeOutcome::classify(&response) {
                    ProbeOutcome::Found => {
                        debug!(page = guess, page_hint = ?response.page_hint, "last page found");
                        return Ok(guess as u32);
                    }
                    outcome => (low, high) = narrow(low, high, guess, outcome),
                }
            }

            Err(GatherError::SearchExhausted { low, high })
        }
        .instrument(self.span.clone())
        .await
    }
}
