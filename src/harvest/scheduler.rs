// src/harvest/scheduler.rs
//! Turns persisted coverage into the initial set of work items.

use crate::constants::EPOCH_ANCHOR_OFFSET_SECS;
use crate::error::Result;
use crate::types::{Coverage, Interval, ValidationError};
use chrono::{DateTime, TimeDelta, Utc};

/// The range a complete harvest covers: one day after the unix epoch until `now`.
///
/// Upload dates flickr could not record alias to values around epoch 0, so
/// the range starts a little later.
pub fn harvest_anchors(now: DateTime<Utc>) -> Result<Interval> {
    let zero = DateTime::<Utc>::UNIX_EPOCH + TimeDelta::seconds(EPOCH_ANCHOR_OFFSET_SECS);
    Ok(Interval::new(zero, now)?)
}

/// Computes the gaps in coverage that still need harvesting.
#[derive(Debug, Clone, Copy)]
pub struct GapScheduler {
    anchors: Interval,
}

impl GapScheduler {
    pub fn new(anchors: Interval) -> Self {
        Self { anchors }
    }

    pub fn anchors(&self) -> Interval {
        self.anchors
    }

    /// Uncovered intervals within the anchors, in temporal order.
    pub fn gaps(&self, coverage: &Coverage) -> Vec<Interval> {
        coverage.gaps_within(&self.anchors)
    }

    /// The initial work items for `worker_count` workers.
    ///
    /// If there are fewer gaps than workers every gap is split into
    /// `worker_count` equal pieces, so no worker starts idle. An empty result
    /// means the harvest is caught up.
    pub fn compute_initial_work(
        &self,
        coverage: &Coverage,
        worker_count: usize,
    ) -> Result<Vec<Interval>> {
        if worker_count == 0 {
            return Err(ValidationError::ZeroPartitions.into());
        }

        let gaps = self.gaps(coverage);
        if gaps.len() >= worker_count {
            return Ok(gaps);
        }

        let mut work = Vec::with_capacity(gaps.len() * worker_count);
        for gap in gaps {
            work.extend(
                gap.partition(worker_count)?
                    .into_iter()
                    .filter(|piece| !piece.is_empty()),
            );
        }
        Ok(work)
    }
}
