// src/api/client.rs
//! HTTP client for the flickr REST API.
//!
//! Handles keys, query encoding, response envelopes and transient-failure
//! retries. Parsing records is left to [`crate::model`].

use super::responses::{self, SearchPage};
use super::search;
use super::{CredentialPool, Downloader, PhotoStream};
use crate::constants::{
    FLICKR_SEARCH_PAGE_SIZE, REQUEST_INITIAL_BACKOFF, REQUEST_MAX_ATTEMPTS, REQUEST_MAX_BACKOFF,
    SEARCH_EXTRAS,
};
use crate::error::{AppError, FlickrErrorCode, Result};
use crate::error_recovery::retry_with_backoff;
use crate::model::UserRecord;
use crate::types::{Interval, Nsid};
use reqwest::Client;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

const API_ENDPOINT: &str = "https://www.flickr.com/services/rest/";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// A [`Downloader`] backed by the flickr REST API.
#[derive(Clone)]
pub struct FlickrClient {
    http: Client,
    keys: Arc<dyn CredentialPool>,
    endpoint: Url,
}

impl FlickrClient {
    pub fn new(keys: Arc<dyn CredentialPool>) -> Result<Self> {
        let endpoint = Url::parse(API_ENDPOINT).map_err(|e| AppError::InternalError {
            message: format!("Invalid API endpoint {}", API_ENDPOINT),
            source: Some(Box::new(e)),
        })?;
        Self::with_endpoint(keys, endpoint)
    }

    /// Talks to `endpoint` instead of flickr, e.g. a local mirror.
    pub fn with_endpoint(keys: Arc<dyn CredentialPool>, endpoint: Url) -> Result<Self> {
        let http = Client::builder()
            .user_agent(concat!("flickr-history/", env!("CARGO_PKG_VERSION")))
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            http,
            keys,
            endpoint,
        })
    }

    /// Builds the request URL for `method` with the given key.
    fn method_url(&self, method: &str, api_key: &str, params: &[(&str, String)]) -> Url {
        let mut url = self.endpoint.clone();
        url.query_pairs_mut()
            .append_pair("method", method)
            .append_pair("api_key", api_key)
            .append_pair("format", "json")
            .append_pair("nojsoncallback", "1")
            .extend_pairs(params.iter().map(|(k, v)| (*k, v.as_str())));
        url
    }

    /// Calls an API method, retrying transient failures.
    async fn call(&self, method: &str, params: &[(&str, String)]) -> Result<Value> {
        retry_with_backoff(
            || self.call_once(method, params),
            REQUEST_MAX_ATTEMPTS,
            REQUEST_INITIAL_BACKOFF,
            REQUEST_MAX_BACKOFF,
        )
        .await
    }

    async fn call_once(&self, method: &str, params: &[(&str, String)]) -> Result<Value> {
        let key = self.keys.acquire().await?;
        log::debug!("GET {} with key {}", method, key);

        let response = self
            .http
            .get(self.method_url(method, key.as_str(), params))
            .send()
            .await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(AppError::FlickrService {
                code: FlickrErrorCode::from_http_status(status.as_u16()),
                message: responses::preview(&body),
            });
        }
        responses::parse_envelope(&body)
    }

    /// Fetches one page of georeferenced photos uploaded within `interval`.
    pub async fn search_page(&self, interval: Interval, page: u64) -> Result<SearchPage> {
        let params = [
            ("has_geo", "1".to_string()),
            ("min_upload_date", interval.start().timestamp().to_string()),
            ("max_upload_date", interval.end().timestamp().to_string()),
            ("sort", "date-posted-asc".to_string()),
            ("extras", SEARCH_EXTRAS.to_string()),
            ("per_page", FLICKR_SEARCH_PAGE_SIZE.to_string()),
            ("page", page.to_string()),
        ];
        let envelope = self.call("flickr.photos.search", &params).await?;
        responses::parse_search_page(envelope)
    }
}

#[async_trait::async_trait]
impl Downloader for FlickrClient {
    fn fetch(&self, interval: Interval) -> PhotoStream {
        let client = self.clone();
        search::photos_in(interval, move |page| {
            let client = client.clone();
            async move { client.search_page(interval, page).await }
        })
    }

    async fn fetch_detail(&self, nsid: &Nsid) -> Result<UserRecord> {
        let params = [("user_id", nsid.to_string())];
        let envelope = match self.call("flickr.profile.getProfile", &params).await {
            Err(e) if e.is_not_found() => return Err(AppError::NotFound(nsid.to_string())),
            other => other?,
        };
        UserRecord::from_profile(&responses::parse_profile(envelope)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ApiKey;

    struct OneKey;

    #[async_trait::async_trait]
    impl CredentialPool for OneKey {
        async fn acquire(&self) -> Result<ApiKey> {
            Ok(ApiKey::new("0123456789abcdef0123456789abcdef")?)
        }
    }

    #[test]
    fn test_method_url_encodes_parameters() {
        let client = FlickrClient::new(Arc::new(OneKey)).unwrap();
        let url = client.method_url(
            "flickr.photos.search",
            "0123456789abcdef0123456789abcdef",
            &[("extras", "date_upload,geo".to_string())],
        );

        let pairs: Vec<(String, String)> = url
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        assert_eq!(url.host_str(), Some("www.flickr.com"));
        assert!(pairs.contains(&("method".to_string(), "flickr.photos.search".to_string())));
        assert!(pairs.contains(&("nojsoncallback".to_string(), "1".to_string())));
        assert!(pairs.contains(&("extras".to_string(), "date_upload,geo".to_string())));
    }
}
