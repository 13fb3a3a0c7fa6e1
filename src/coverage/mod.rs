// src/coverage/mod.rs
//! Persisted coverage: which upload-time ranges are fully harvested.

mod file;
mod reconciler;

pub use file::JsonCoverageFile;
pub use reconciler::CoverageReconciler;

use crate::error::AppError;
use crate::types::Coverage;

/// Loads and saves the "already downloaded" coverage.
///
/// Only the [`CoverageReconciler`] ever calls `save`.
#[async_trait::async_trait]
pub trait CoveragePersistence: Send + Sync {
    /// `None` if nothing has been persisted yet.
    async fn load(&self) -> Result<Option<Coverage>, AppError>;

    async fn save(&self, coverage: &Coverage) -> Result<(), AppError>;
}
