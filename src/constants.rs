// src/constants.rs
//! Domain constants that define the operational boundaries of the harvester.
//!
//! Reading these constants should tell you how the system operates: how the
//! flickr API pages its results, how much a key may be used, and how often
//! the background loops wake up.

use std::time::Duration;

// ---------------------------------------------------------------------------
// flickr API boundaries
// ---------------------------------------------------------------------------

/// How many photos `flickr.photos.search` returns per page of results.
///
/// 500 is the API maximum.
pub const FLICKR_SEARCH_PAGE_SIZE: u32 = 500;

/// The most results flickr will serve for a single search query.
///
/// Beyond this, further pages silently repeat earlier results, so any time
/// span with more matches has to be split.
pub const MAX_RESULTS_PER_QUERY: u64 = 4_000;

/// Requests each API key may issue per hour under flickr's terms of use.
pub const DEFAULT_REQUESTS_PER_HOUR: u32 = 3_600;

/// The window over which per-key quotas are counted.
pub const KEY_QUOTA_WINDOW: Duration = Duration::from_secs(60 * 60);

/// Extras requested with every search so that a single call yields complete photo records.
pub const SEARCH_EXTRAS: &str =
    "description,date_upload,date_taken,geo,owner_name,license,tags,server";

// ---------------------------------------------------------------------------
// Harvest boundaries
// ---------------------------------------------------------------------------

/// Offset in seconds of the "beginning of time" anchor from the unix epoch.
///
/// flickr matches upload dates fuzzily: photos with missing or garbled upload
/// dates alias to timestamps at, or a timezone offset away from, epoch 0.
/// Starting one day after the epoch keeps those out of the first gap.
pub const EPOCH_ANCHOR_OFFSET_SECS: i64 = 24 * 60 * 60;

/// How long the profile enricher idles after a pass that found nothing to do.
pub const ENRICHER_IDLE: Duration = Duration::from_secs(10 * 60);

/// How often the progress line is refreshed.
pub const PROGRESS_TICK: Duration = Duration::from_millis(100);

/// Upper bound for the number of concurrent harvest workers.
pub const MAX_WORKERS: usize = 256;

// ---------------------------------------------------------------------------
// Retry policy of the HTTP client
// ---------------------------------------------------------------------------

/// Attempts per API request before a transient failure is surfaced.
pub const REQUEST_MAX_ATTEMPTS: u32 = 3;

pub const REQUEST_INITIAL_BACKOFF: Duration = Duration::from_millis(500);

pub const REQUEST_MAX_BACKOFF: Duration = Duration::from_secs(30);

/// Maximum characters shown when previewing error response bodies.
pub const ERROR_BODY_PREVIEW_LENGTH: usize = 200;
