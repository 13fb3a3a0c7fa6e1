// src/api/mod.rs
//! flickr API interaction: the ability to download photos and user profiles.
//!
//! Harvest logic depends on the [`Downloader`] and [`CredentialPool`] traits,
//! never on HTTP details.

mod client;
mod key_pool;
mod responses;
mod search;

pub use client::FlickrClient;
pub use key_pool::ApiKeyPool;
pub use responses::SearchPage;
pub use search::photos_in;

use crate::error::AppError;
use crate::model::{PhotoRecord, UserRecord};
use crate::types::{ApiKey, Interval, Nsid};
use futures::stream::BoxStream;

/// A lazy sequence of photos; an [`AppError::BatchTooLarge`] item means the
/// interval holds more results than one query can return.
pub type PhotoStream = BoxStream<'static, Result<PhotoRecord, AppError>>;

/// The ability to download records from flickr.
#[async_trait::async_trait]
pub trait Downloader: Send + Sync {
    /// All georeferenced photos uploaded within `interval`.
    ///
    /// Nothing is requested until the stream is polled.
    fn fetch(&self, interval: Interval) -> PhotoStream;

    /// The full profile of one user; [`AppError::NotFound`] if flickr does not know them.
    async fn fetch_detail(&self, nsid: &Nsid) -> Result<UserRecord, AppError>;
}

/// Hands out API keys without ever exceeding a key's quota.
#[async_trait::async_trait]
pub trait CredentialPool: Send + Sync {
    /// Waits until some key has quota left, then spends one request of it.
    async fn acquire(&self) -> Result<ApiKey, AppError>;
}
