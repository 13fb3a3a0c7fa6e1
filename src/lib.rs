// src/lib.rs
//! flickr-history library: incrementally downloads all georeferenced flickr
//! posts and resumes where it left off.
//!
//! # Public API
//!
//! The library exposes types organized by concern:
//! - **Error handling**: `AppError`, `FlickrErrorCode`, `ValidationError`
//! - **Configuration**: `CommandLineInput`, `HarvestConfig`
//! - **Domain model**: `PhotoRecord`, `UserRecord`, `Record`
//! - **Domain types**: `Interval`, `Coverage`, `Nsid`, `PhotoId`, `ApiKey`
//! - **Collaborators**: `Downloader`, `CredentialPool`, `RecordStore`, `CoveragePersistence`
//! - **Harvest**: `Harvester`, `GapScheduler`, `HarvestWorker`, `ProfileEnricher`

pub mod api;
pub mod config;
pub mod constants;
pub mod coverage;
mod error;
mod error_recovery;
pub mod harvest;
pub mod model;
pub mod store;
mod types;

// --- Error Handling ---
pub use crate::error::{AppError, FlickrErrorCode, Result};
pub use crate::error_recovery::retry_with_backoff;
pub use crate::types::ValidationError;

// --- Configuration ---
pub use crate::config::{CommandLineInput, HarvestConfig};

// --- Domain Model ---
pub use crate::model::{EntityKind, GeoPoint, PhotoRecord, ProfileDetails, Record, UserRecord};

// --- Domain Types ---
pub use crate::types::{ApiKey, Coverage, Interval, Nsid, PhotoId};

// --- Collaborators ---
pub use crate::api::{ApiKeyPool, CredentialPool, Downloader, FlickrClient, PhotoStream};
pub use crate::coverage::{CoveragePersistence, CoverageReconciler, JsonCoverageFile};
pub use crate::store::{RecordStore, SqliteStore};

// --- Harvest ---
pub use crate::harvest::{
    GapScheduler, HarvestState, HarvestSummary, HarvestWorker, Harvester, ProfileEnricher,
    TodoQueue,
};
