// src/harvest/orchestrator.rs
//! Runs a harvest: schedules work, starts the loops and shuts them down cleanly.

use super::enricher::ProfileEnricher;
use super::progress::{HarvestCounters, HarvestSummary, ProgressSnapshot};
use super::queue::TodoQueue;
use super::scheduler::{harvest_anchors, GapScheduler};
use super::worker::{HarvestWorker, WorkerExit};
use crate::api::Downloader;
use crate::config::HarvestConfig;
use crate::constants::PROGRESS_TICK;
use crate::coverage::{CoveragePersistence, CoverageReconciler};
use crate::error::{AppError, Result};
use crate::store::RecordStore;
use crate::types::Coverage;
use chrono::Utc;
use std::fmt;
use std::future::Future;
use std::io::Write;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, watch};
use tokio::task::{JoinHandle, JoinSet};
use tokio_util::sync::CancellationToken;

/// Lifecycle of a [`Harvester`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HarvestState {
    Idle,
    Running,
    ShuttingDown,
    Stopped,
}

impl fmt::Display for HarvestState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            HarvestState::Idle => "idle",
            HarvestState::Running => "running",
            HarvestState::ShuttingDown => "shutting down",
            HarvestState::Stopped => "stopped",
        };
        write!(f, "{}", name)
    }
}

/// Owns the queues and every loop of one harvest run.
pub struct Harvester {
    downloader: Arc<dyn Downloader>,
    store: Arc<dyn RecordStore>,
    coverage: Arc<dyn CoveragePersistence>,
    harvest_workers: usize,
    enricher_idle: Duration,
    show_progress: bool,
    shutdown: CancellationToken,
    state: watch::Sender<HarvestState>,
}

impl Harvester {
    pub fn new(
        config: &HarvestConfig,
        downloader: Arc<dyn Downloader>,
        store: Arc<dyn RecordStore>,
        coverage: Arc<dyn CoveragePersistence>,
    ) -> Self {
        let (state, _) = watch::channel(HarvestState::Idle);
        Self {
            downloader,
            store,
            coverage,
            harvest_workers: config.harvest_workers(),
            enricher_idle: config.enricher_idle,
            show_progress: config.show_progress,
            shutdown: CancellationToken::new(),
            state,
        }
    }

    /// Follows the lifecycle of this harvester.
    pub fn subscribe(&self) -> watch::Receiver<HarvestState> {
        self.state.subscribe()
    }

    /// Cancelling the token has the same effect as the termination signal.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Harvests until `termination` resolves (or the shutdown token is cancelled).
    ///
    /// Harvest workers exit on their own once the todo queue is empty; the
    /// profile enricher keeps going until termination. Every exit is
    /// cooperative: completions reach the reconciler before it saves for
    /// the last time, so persisted coverage matches what was stored.
    pub async fn run(self, termination: impl Future<Output = ()>) -> Result<HarvestSummary> {
        let started = Instant::now();

        let persisted = self.coverage.load().await?.unwrap_or_default();
        let scheduler = GapScheduler::new(harvest_anchors(Utc::now())?);
        let work = scheduler.compute_initial_work(&persisted, self.harvest_workers)?;
        log::info!(
            "{} time slot(s) to download between {} and {}",
            work.len(),
            scheduler.anchors().start(),
            scheduler.anchors().end()
        );

        let todo: Arc<TodoQueue> = Arc::new(work.into_iter().collect());
        let (done_tx, done_rx) = mpsc::unbounded_channel();
        let mut counters = HarvestCounters::default();

        let reconciler = tokio::spawn(
            CoverageReconciler::new(persisted, Arc::clone(&self.coverage), done_rx).run(),
        );

        let mut workers = JoinSet::new();
        for n in 0..self.harvest_workers {
            let worker = HarvestWorker::new(
                format!("worker-{}", n),
                Arc::clone(&todo),
                done_tx.clone(),
                Arc::clone(&self.downloader),
                Arc::clone(&self.store),
                self.shutdown.clone(),
            );
            counters.track_photos(worker.counter());
            workers.spawn(async move {
                let name = worker.name().to_string();
                (name, worker.run().await)
            });
        }
        // The reconciler finishes once the last worker drops its sender
        drop(done_tx);

        let enricher = ProfileEnricher::new(
            Arc::clone(&self.downloader),
            Arc::clone(&self.store),
            self.shutdown.clone(),
            self.enricher_idle,
        );
        counters.track_profiles(enricher.counter());
        let mut enricher: JoinHandle<Result<()>> = tokio::spawn(enricher.run());
        let mut enricher_running = true;

        self.state.send_replace(HarvestState::Running);
        log::info!("Harvest running with {} worker(s)", self.harvest_workers);

        let mut failed_workers = 0;
        let mut ticker = tokio::time::interval(PROGRESS_TICK);
        tokio::pin!(termination);

        loop {
            if workers.is_empty() && !enricher_running {
                log::info!("All workers have stopped");
                break;
            }

            tokio::select! {
                _ = &mut termination => {
                    log::info!("Termination requested");
                    break;
                }
                _ = self.shutdown.cancelled() => break,
                Some(joined) = workers.join_next(), if !workers.is_empty() => {
                    if !worker_succeeded(joined) {
                        failed_workers += 1;
                    }
                    if workers.is_empty() {
                        log::info!("All time slots done");
                    }
                }
                joined = &mut enricher, if enricher_running => {
                    enricher_running = false;
                    if !enricher_succeeded(joined) {
                        failed_workers += 1;
                    }
                }
                _ = ticker.tick(), if self.show_progress => {
                    let active = workers.len() + usize::from(enricher_running);
                    self.print_progress(&counters, &todo, active, started);
                }
            }
        }

        self.state.send_replace(HarvestState::ShuttingDown);
        if self.show_progress {
            eprintln!("\nCleaning up.");
        }
        self.shutdown.cancel();

        while let Some(joined) = workers.join_next().await {
            if !worker_succeeded(joined) {
                failed_workers += 1;
            }
        }
        if enricher_running && !enricher_succeeded(enricher.await) {
            failed_workers += 1;
        }

        let coverage: Coverage = reconciler.await.map_err(|e| AppError::InternalError {
            message: "coverage reconciler panicked".to_string(),
            source: Some(Box::new(e)),
        })??;
        log::info!("Coverage now spans {} interval(s)", coverage.len());

        self.state.send_replace(HarvestState::Stopped);
        Ok(HarvestSummary {
            photos: counters.photos(),
            profiles: counters.profiles(),
            elapsed: started.elapsed(),
            failed_workers,
        })
    }

    fn print_progress(
        &self,
        counters: &HarvestCounters,
        todo: &TodoQueue,
        active_workers: usize,
        started: Instant,
    ) {
        let snapshot = ProgressSnapshot {
            photos: counters.photos(),
            profiles: counters.profiles(),
            active_workers,
            todo: todo.len(),
            elapsed: started.elapsed(),
        };
        let mut stderr = std::io::stderr().lock();
        let _ = write!(stderr, "\r{}", snapshot);
        let _ = stderr.flush();
    }
}

type WorkerJoin = std::result::Result<(String, Result<WorkerExit>), tokio::task::JoinError>;

fn worker_succeeded(joined: WorkerJoin) -> bool {
    match joined {
        Ok((name, Ok(exit))) => {
            log::debug!("{} exited: {:?}", name, exit);
            true
        }
        Ok((name, Err(e))) => {
            log::error!("{} failed: {}", name, e);
            false
        }
        Err(e) => {
            log::error!("Worker task panicked: {}", e);
            false
        }
    }
}

fn enricher_succeeded(joined: std::result::Result<Result<()>, tokio::task::JoinError>) -> bool {
    match joined {
        Ok(Ok(())) => true,
        Ok(Err(e)) => {
            log::error!("Profile enricher failed: {}", e);
            false
        }
        Err(e) => {
            log::error!("Profile enricher panicked: {}", e);
            false
        }
    }
}
