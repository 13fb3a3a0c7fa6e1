// tests/common/mod.rs
//! In-process stand-ins for flickr, shared by the integration tests.

#![allow(dead_code)]

use chrono::{DateTime, TimeZone, Utc};
use flickr_history::{
    AppError, Downloader, Interval, Nsid, PhotoId, PhotoRecord, PhotoStream, ProfileDetails,
    UserRecord,
};
use futures::stream::{self, StreamExt};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

pub fn at(h: u32, m: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2020, 5, 1, h, m, 0).unwrap()
}

pub fn span(from: (u32, u32), to: (u32, u32)) -> Interval {
    Interval::new(at(from.0, from.1), at(to.0, to.1)).unwrap()
}

pub fn owner(n: i64) -> UserRecord {
    UserRecord {
        name: Some(format!("photographer {}", n)),
        ..UserRecord::new(Nsid::from_parts(n, 1))
    }
}

pub fn photo(id: i64, posted: DateTime<Utc>, owner_id: i64) -> PhotoRecord {
    PhotoRecord {
        title: Some(format!("photo {}", id)),
        date_posted: Some(posted),
        tags: vec!["geotagged".to_string()],
        owner: Some(owner(owner_id)),
        ..PhotoRecord::new(PhotoId::new(id))
    }
}

/// A flickr with a fixed set of photos and profiles.
///
/// Searches with more than `max_results` matches overflow, like the real
/// API does beyond 4000 results.
pub struct FakeFlickr {
    photos: Vec<PhotoRecord>,
    profiles: HashMap<Nsid, UserRecord>,
    max_results: usize,
    poison: Option<DateTime<Utc>>,
    delay: Option<Duration>,
    fetches: AtomicUsize,
}

impl FakeFlickr {
    pub fn new(photos: Vec<PhotoRecord>) -> Self {
        Self {
            photos,
            profiles: HashMap::new(),
            max_results: usize::MAX,
            poison: None,
            delay: None,
            fetches: AtomicUsize::new(0),
        }
    }

    pub fn with_max_results(mut self, max_results: usize) -> Self {
        self.max_results = max_results;
        self
    }

    /// Every search covering `at` fails with a non-recoverable error.
    pub fn with_poison(mut self, at: DateTime<Utc>) -> Self {
        self.poison = Some(at);
        self
    }

    /// Each photo takes `delay` to arrive.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn with_profile(mut self, nsid: Nsid, first_name: &str) -> Self {
        let user = UserRecord {
            details: Some(ProfileDetails {
                first_name: first_name.to_string(),
                ..ProfileDetails::default()
            }),
            ..UserRecord::new(nsid)
        };
        self.profiles.insert(nsid, user);
        self
    }

    pub fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    pub fn photos_within(&self, interval: &Interval) -> Vec<PhotoRecord> {
        self.photos
            .iter()
            .filter(|p| {
                p.date_posted
                    .is_some_and(|t| interval.start() <= t && t < interval.end())
            })
            .cloned()
            .collect()
    }
}

#[async_trait::async_trait]
impl Downloader for FakeFlickr {
    fn fetch(&self, interval: Interval) -> PhotoStream {
        self.fetches.fetch_add(1, Ordering::SeqCst);

        if let Some(poison) = self.poison {
            if interval.start() <= poison && poison < interval.end() {
                return stream::iter(vec![Err(AppError::MalformedResponse(
                    "poisoned time span".to_string(),
                ))])
                .boxed();
            }
        }

        let matching = self.photos_within(&interval);
        if matching.len() > self.max_results {
            return stream::iter(vec![Err(AppError::BatchTooLarge {
                interval,
                total: matching.len() as u64,
            })])
            .boxed();
        }

        let delay = self.delay;
        stream::iter(matching)
            .then(move |photo| async move {
                if let Some(delay) = delay {
                    tokio::time::sleep(delay).await;
                }
                Ok(photo)
            })
            .boxed()
    }

    async fn fetch_detail(&self, nsid: &Nsid) -> Result<UserRecord, AppError> {
        self.profiles
            .get(nsid)
            .cloned()
            .ok_or_else(|| AppError::NotFound(nsid.to_string()))
    }
}
