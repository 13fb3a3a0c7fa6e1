// src/store/mod.rs
//! Persistence of harvested records.

mod schema;
mod sqlite;

pub use sqlite::SqliteStore;

use crate::error::AppError;
use crate::model::Record;
use crate::types::Nsid;

/// The ability to persist normalized records.
///
/// Laws every implementation must satisfy:
/// - `upsert` is idempotent and keyed by the entity's stable id
/// - fields that are `None` in the record never overwrite stored values
/// - concurrent upserts of the same entity converge to the same row
#[async_trait::async_trait]
pub trait RecordStore: Send + Sync {
    async fn upsert(&self, record: &Record) -> Result<(), AppError>;

    /// Users whose profile details have never been fetched.
    async fn find_incomplete_profiles(&self) -> Result<Vec<Nsid>, AppError>;
}
