// src/harvest/worker.rs
//! One harvest worker: drains the todo queue until it is empty or shutdown is requested.

use super::queue::TodoQueue;
use crate::api::Downloader;
use crate::error::{AppError, Result};
use crate::model::Record;
use crate::store::RecordStore;
use crate::types::Interval;
use chrono::{DateTime, Utc};
use futures::StreamExt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedSender;
use tokio_util::sync::CancellationToken;

/// What became of one interval.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IntervalOutcome {
    /// Every record in the interval is stored
    Completed,
    /// Too many results; the interval was bisected and both halves requeued
    Bisected(Interval, Interval),
    /// Shutdown was requested; records up to the end of the given interval are stored
    Truncated(Interval),
}

/// Why a worker stopped without error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerExit {
    QueueEmpty,
    ShutdownRequested,
}

pub struct HarvestWorker {
    name: String,
    todo: Arc<TodoQueue>,
    done: UnboundedSender<Interval>,
    downloader: Arc<dyn Downloader>,
    store: Arc<dyn RecordStore>,
    shutdown: CancellationToken,
    count: Arc<AtomicU64>,
}

impl HarvestWorker {
    pub fn new(
        name: impl Into<String>,
        todo: Arc<TodoQueue>,
        done: UnboundedSender<Interval>,
        downloader: Arc<dyn Downloader>,
        store: Arc<dyn RecordStore>,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            name: name.into(),
            todo,
            done,
            downloader,
            store,
            shutdown,
            count: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Photos stored so far; approximate while the worker runs.
    pub fn counter(&self) -> Arc<AtomicU64> {
        Arc::clone(&self.count)
    }

    /// Works until the queue is observed empty or shutdown is requested.
    ///
    /// Any error other than an overflow ends the worker; the interval it was
    /// working on is not reported done and will be retried on the next run.
    pub async fn run(self) -> Result<WorkerExit> {
        log::debug!("{} started", self.name);
        while !self.shutdown.is_cancelled() {
            let Some(interval) = self.todo.pop() else {
                log::debug!("{} found no more work", self.name);
                return Ok(WorkerExit::QueueEmpty);
            };

            match self.harvest(interval).await? {
                IntervalOutcome::Completed => self.report(interval)?,
                IntervalOutcome::Bisected(left, right) => {
                    log::debug!("{}: {} too large, split in halves", self.name, interval);
                    self.todo.push(left);
                    self.todo.push(right);
                }
                IntervalOutcome::Truncated(partial) => {
                    if !partial.is_empty() {
                        self.report(partial)?;
                    }
                    break;
                }
            }
        }
        log::debug!("{} stopped for shutdown", self.name);
        Ok(WorkerExit::ShutdownRequested)
    }

    /// Downloads and stores every photo in `interval`.
    pub async fn harvest(&self, interval: Interval) -> Result<IntervalOutcome> {
        let mut photos = self.downloader.fetch(interval);
        let mut last_posted: Option<DateTime<Utc>> = None;

        loop {
            let next = tokio::select! {
                biased;
                _ = self.shutdown.cancelled() => {
                    return Ok(IntervalOutcome::Truncated(truncate(interval, last_posted)));
                }
                next = photos.next() => next,
            };

            let photo = match next {
                None => return Ok(IntervalOutcome::Completed),
                Some(Err(e)) if e.is_batch_too_large() => {
                    let (left, right) = interval.bisect()?;
                    return Ok(IntervalOutcome::Bisected(left, right));
                }
                Some(result) => result?,
            };

            if let Some(posted) = photo.date_posted {
                last_posted = Some(posted);
            }
            self.store.upsert(&Record::Photo(photo)).await?;
            self.count.fetch_add(1, Ordering::Relaxed);

            if self.shutdown.is_cancelled() {
                return Ok(IntervalOutcome::Truncated(truncate(interval, last_posted)));
            }
        }
    }

    fn report(&self, interval: Interval) -> Result<()> {
        self.done.send(interval).map_err(|_| AppError::WorkerFailed {
            worker: self.name.clone(),
            message: format!("coverage reconciler is gone, {} not recorded", interval),
        })
    }
}

/// The part of `interval` known to be stored: up to the last stored upload time.
fn truncate(interval: Interval, last_posted: Option<DateTime<Utc>>) -> Interval {
    interval.truncated_at(last_posted.unwrap_or(interval.start()))
}
