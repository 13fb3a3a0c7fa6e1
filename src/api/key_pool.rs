// src/api/key_pool.rs
use super::CredentialPool;
use crate::constants::KEY_QUOTA_WINDOW;
use crate::error::{AppError, Result};
use crate::types::ApiKey;
use parking_lot::Mutex;
use rand::Rng;
use std::collections::VecDeque;
use std::time::Duration;
use tokio::time::Instant;

struct KeyUsage {
    key: ApiKey,
    /// When each request inside the current window was issued, oldest first
    issued: VecDeque<Instant>,
}

impl KeyUsage {
    fn forget_before(&mut self, cutoff: Instant) {
        while self.issued.front().is_some_and(|t| *t <= cutoff) {
            self.issued.pop_front();
        }
    }
}

/// Spreads requests over several API keys, each limited to
/// `requests_per_window` requests per sliding window.
pub struct ApiKeyPool {
    keys: Mutex<Vec<KeyUsage>>,
    requests_per_window: usize,
    window: Duration,
}

impl ApiKeyPool {
    pub fn new(keys: Vec<ApiKey>, requests_per_hour: u32) -> Result<Self> {
        Self::with_window(keys, requests_per_hour, KEY_QUOTA_WINDOW)
    }

    pub fn with_window(keys: Vec<ApiKey>, requests_per_window: u32, window: Duration) -> Result<Self> {
        if keys.is_empty() {
            return Err(AppError::MissingConfiguration(
                "at least one flickr API key is required".to_string(),
            ));
        }
        if requests_per_window == 0 {
            return Err(AppError::MissingConfiguration(
                "requests per hour must be positive".to_string(),
            ));
        }
        Ok(Self {
            keys: Mutex::new(
                keys.into_iter()
                    .map(|key| KeyUsage {
                        key,
                        issued: VecDeque::new(),
                    })
                    .collect(),
            ),
            requests_per_window: requests_per_window as usize,
            window,
        })
    }

    /// Spends one request of a random key with quota left, or returns how
    /// long until the earliest key frees up.
    fn try_acquire(&self) -> std::result::Result<ApiKey, Duration> {
        let now = Instant::now();
        let mut keys = self.keys.lock();

        let cutoff = now.checked_sub(self.window);
        if let Some(cutoff) = cutoff {
            keys.iter_mut().for_each(|usage| usage.forget_before(cutoff));
        }

        let available: Vec<usize> = keys
            .iter()
            .enumerate()
            .filter(|(_, usage)| usage.issued.len() < self.requests_per_window)
            .map(|(i, _)| i)
            .collect();

        if !available.is_empty() {
            let pick = available[rand::rng().random_range(0..available.len())];
            let usage = &mut keys[pick];
            usage.issued.push_back(now);
            return Ok(usage.key.clone());
        }

        let wait = keys
            .iter()
            .filter_map(|usage| usage.issued.front())
            .map(|oldest| (*oldest + self.window).saturating_duration_since(now))
            .min()
            .unwrap_or(self.window);
        Err(wait)
    }
}

#[async_trait::async_trait]
impl CredentialPool for ApiKeyPool {
    async fn acquire(&self) -> Result<ApiKey> {
        loop {
            match self.try_acquire() {
                Ok(key) => return Ok(key),
                Err(wait) => {
                    log::debug!("All API keys exhausted, waiting {:?}", wait);
                    // Wake just after the oldest request leaves the window
                    tokio::time::sleep(wait + Duration::from_millis(1)).await;
                }
            }
        }
    }
}
