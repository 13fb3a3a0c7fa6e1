// src/harvest/mod.rs
//! The harvest core: gap scheduling, the worker pool with bisection on
//! overflow, the profile enricher and the orchestrator that shuts them
//! down cooperatively.
//!
//! Data flows through two queues. The [`TodoQueue`] holds intervals still to
//! be downloaded; workers pop from it without blocking and exit once it is
//! empty. Completed (or truncated) intervals go through an mpsc channel to
//! the [`crate::coverage::CoverageReconciler`], the only writer of persisted
//! coverage.

mod enricher;
mod orchestrator;
mod progress;
mod queue;
mod scheduler;
mod worker;

pub use enricher::ProfileEnricher;
pub use orchestrator::{HarvestState, Harvester};
pub use progress::{HarvestCounters, HarvestSummary, ProgressSnapshot};
pub use queue::TodoQueue;
pub use scheduler::{harvest_anchors, GapScheduler};
pub use worker::{HarvestWorker, IntervalOutcome, WorkerExit};
