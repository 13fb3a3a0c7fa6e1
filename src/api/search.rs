// src/api/search.rs
//! Lazy pagination over `flickr.photos.search` results.

use super::{PhotoStream, SearchPage};
use crate::constants::MAX_RESULTS_PER_QUERY;
use crate::error::{AppError, Result};
use crate::model::PhotoRecord;
use crate::types::Interval;
use futures::stream::{self, StreamExt};
use serde_json::Value;
use std::collections::VecDeque;
use std::future::Future;

struct Pager<F> {
    fetch_page: F,
    interval: Interval,
    buffered: VecDeque<Value>,
    next_page: Option<u64>,
    failed: bool,
}

/// Streams the photos of `interval`, requesting page `n` only once the
/// photos of page `n - 1` have been consumed.
///
/// If the first page reports more than [`MAX_RESULTS_PER_QUERY`] matches the
/// stream yields a single [`AppError::BatchTooLarge`] and ends. Search
/// results that cannot be normalized are skipped.
pub fn photos_in<F, Fut>(interval: Interval, fetch_page: F) -> PhotoStream
where
    F: FnMut(u64) -> Fut + Send + 'static,
    Fut: Future<Output = Result<SearchPage>> + Send + 'static,
{
    let pager = Pager {
        fetch_page,
        interval,
        buffered: VecDeque::new(),
        next_page: Some(1),
        failed: false,
    };

    stream::unfold(pager, |mut pager| async move {
        loop {
            if pager.failed {
                return None;
            }

            if let Some(raw) = pager.buffered.pop_front() {
                match PhotoRecord::from_search_result(&raw) {
                    Ok(photo) => return Some((Ok(photo), pager)),
                    Err(e) => {
                        log::warn!("Skipping search result in {}: {}", pager.interval, e);
                        continue;
                    }
                }
            }

            let page = pager.next_page?;
            let result = match (pager.fetch_page)(page).await {
                Ok(result) => result,
                Err(e) => {
                    pager.failed = true;
                    return Some((Err(e), pager));
                }
            };

            if page == 1 && result.total > MAX_RESULTS_PER_QUERY {
                pager.failed = true;
                let overflow = AppError::BatchTooLarge {
                    interval: pager.interval,
                    total: result.total,
                };
                return Some((Err(overflow), pager));
            }

            log::debug!(
                "{}: page {}/{} ({} photos)",
                pager.interval,
                page,
                result.pages,
                result.photo.len()
            );
            pager.next_page = (page < result.pages && !result.photo.is_empty()).then_some(page + 1);
            pager.buffered.extend(result.photo);
        }
    })
    .boxed()
}
