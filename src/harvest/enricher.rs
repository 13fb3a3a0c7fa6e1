// src/harvest/enricher.rs
use crate::api::Downloader;
use crate::error::Result;
use crate::model::{Record, UserRecord};
use crate::store::RecordStore;
use crate::types::Nsid;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Backfills profile details of users that were only seen as photo owners.
///
/// Runs until shutdown: each pass fetches the profile of every user that has
/// never been enriched; after a pass that found nobody it idles.
pub struct ProfileEnricher {
    downloader: Arc<dyn Downloader>,
    store: Arc<dyn RecordStore>,
    shutdown: CancellationToken,
    idle: Duration,
    count: Arc<AtomicU64>,
}

impl ProfileEnricher {
    pub fn new(
        downloader: Arc<dyn Downloader>,
        store: Arc<dyn RecordStore>,
        shutdown: CancellationToken,
        idle: Duration,
    ) -> Self {
        Self {
            downloader,
            store,
            shutdown,
            idle,
            count: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Profiles updated so far.
    pub fn counter(&self) -> Arc<AtomicU64> {
        Arc::clone(&self.count)
    }

    pub async fn run(self) -> Result<()> {
        while !self.shutdown.is_cancelled() {
            let pending = self.store.find_incomplete_profiles().await?;
            log::debug!("{} profile(s) to enrich", pending.len());

            for nsid in &pending {
                if self.shutdown.is_cancelled() {
                    break;
                }
                self.enrich(nsid).await?;
            }

            if pending.is_empty() {
                tokio::select! {
                    _ = self.shutdown.cancelled() => break,
                    _ = tokio::time::sleep(self.idle) => {}
                }
            }
        }
        log::debug!("Profile enricher stopped");
        Ok(())
    }

    async fn enrich(&self, nsid: &Nsid) -> Result<()> {
        let user = tokio::select! {
            biased;
            _ = self.shutdown.cancelled() => return Ok(()),
            user = self.downloader.fetch_detail(nsid) => user,
        };
        let user = match user {
            Ok(user) => user,
            Err(e) if e.is_not_found() => {
                log::debug!("No profile for {}, marking as attempted", nsid);
                UserRecord::enrichment_attempted(*nsid)
            }
            Err(e) => return Err(e),
        };

        self.store.upsert(&Record::User(user)).await?;
        self.count.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}
