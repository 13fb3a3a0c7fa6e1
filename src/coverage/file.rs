// src/coverage/file.rs
use super::CoveragePersistence;
use crate::error::{AppError, Result};
use crate::types::{Coverage, Interval};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// On-disk shape of the coverage file.
#[derive(Debug, Default, Serialize, Deserialize)]
struct CoverageDocument {
    #[serde(default)]
    already_downloaded: Vec<Interval>,
}

/// Coverage stored as a small JSON document.
///
/// Writes go to a sibling temp file which is then renamed over the target,
/// so a crash mid-write leaves the previous coverage intact.
pub struct JsonCoverageFile {
    path: PathBuf,
}

impl JsonCoverageFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `coverage.json` under the platform cache directory, if there is one.
    pub fn default_path() -> Option<PathBuf> {
        dirs::cache_dir().map(|p| p.join("flickr-history").join("coverage.json"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|name| name.to_os_string())
            .unwrap_or_else(|| "coverage.json".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

#[async_trait::async_trait]
impl CoveragePersistence for JsonCoverageFile {
    async fn load(&self) -> Result<Option<Coverage>> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                log::info!("No coverage at {}, starting from scratch", self.path.display());
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };

        let document: CoverageDocument =
            serde_json::from_str(&content).map_err(|source| AppError::CoverageFile {
                path: self.path.clone(),
                source,
            })?;

        // Zero-length spans are sentinels from earlier runs, not coverage
        let coverage = Coverage::union(document.already_downloaded).without_markers();
        log::debug!(
            "Loaded {} covered span(s) from {}",
            coverage.len(),
            self.path.display()
        );
        Ok(Some(coverage))
    }

    async fn save(&self, coverage: &Coverage) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        let document = CoverageDocument {
            already_downloaded: coverage.intervals().to_vec(),
        };
        let json = serde_json::to_string_pretty(&document)?;

        let temp_path = self.temp_path();
        tokio::fs::write(&temp_path, json).await?;
        tokio::fs::rename(&temp_path, &self.path).await?;
        Ok(())
    }
}
