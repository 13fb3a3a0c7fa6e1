// src/harvest/progress.rs
//! Throughput counters for the progress line and the final summary.
//!
//! Counters are read without synchronization beyond relaxed atomics; the
//! numbers are for display and never drive decisions.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Handles on every worker's counter.
#[derive(Debug, Clone, Default)]
pub struct HarvestCounters {
    photos: Vec<Arc<AtomicU64>>,
    profiles: Vec<Arc<AtomicU64>>,
}

impl HarvestCounters {
    pub fn track_photos(&mut self, counter: Arc<AtomicU64>) {
        self.photos.push(counter);
    }

    pub fn track_profiles(&mut self, counter: Arc<AtomicU64>) {
        self.profiles.push(counter);
    }

    pub fn photos(&self) -> u64 {
        sum(&self.photos)
    }

    pub fn profiles(&self) -> u64 {
        sum(&self.profiles)
    }
}

fn sum(counters: &[Arc<AtomicU64>]) -> u64 {
    counters.iter().map(|c| c.load(Ordering::Relaxed)).sum()
}

fn rate(count: u64, elapsed: Duration) -> f64 {
    let secs = elapsed.as_secs_f64();
    if secs > 0.0 {
        count as f64 / secs
    } else {
        0.0
    }
}

/// One refresh of the progress line.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressSnapshot {
    pub photos: u64,
    pub profiles: u64,
    pub active_workers: usize,
    pub todo: usize,
    pub elapsed: Duration,
}

impl fmt::Display for ProgressSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} photos ({:.1}/s), {} profiles ({:.1}/s), {} workers, {} time slots to do",
            self.photos,
            rate(self.photos, self.elapsed),
            self.profiles,
            rate(self.profiles, self.elapsed),
            self.active_workers,
            self.todo
        )
    }
}

/// Totals of a finished run.
#[derive(Debug, Clone, PartialEq)]
pub struct HarvestSummary {
    pub photos: u64,
    pub profiles: u64,
    pub elapsed: Duration,
    /// Workers (including the enricher) that stopped on an error
    pub failed_workers: usize,
}

impl HarvestSummary {
    pub fn photo_rate(&self) -> f64 {
        rate(self.photos, self.elapsed)
    }

    pub fn profile_rate(&self) -> f64 {
        rate(self.profiles, self.elapsed)
    }
}

impl fmt::Display for HarvestSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Downloaded {} photos ({:.1}/s) and updated {} user profiles ({:.1}/s)",
            self.photos,
            self.photo_rate(),
            self.profiles,
            self.profile_rate()
        )?;
        if self.failed_workers > 0 {
            write!(f, "; {} worker(s) stopped on errors, see log", self.failed_workers)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_are_summed() {
        let mut counters = HarvestCounters::default();
        let a = Arc::new(AtomicU64::new(3));
        let b = Arc::new(AtomicU64::new(4));
        counters.track_photos(a.clone());
        counters.track_photos(b);
        counters.track_profiles(Arc::new(AtomicU64::new(1)));

        a.fetch_add(10, Ordering::Relaxed);
        assert_eq!(counters.photos(), 17);
        assert_eq!(counters.profiles(), 1);
    }

    #[test]
    fn test_summary_wording() {
        let summary = HarvestSummary {
            photos: 100,
            profiles: 5,
            elapsed: Duration::from_secs(10),
            failed_workers: 0,
        };
        assert_eq!(
            summary.to_string(),
            "Downloaded 100 photos (10.0/s) and updated 5 user profiles (0.5/s)"
        );

        let failed = HarvestSummary {
            failed_workers: 2,
            elapsed: Duration::ZERO,
            ..summary
        };
        assert!(failed.to_string().contains("(0.0/s)"));
        assert!(failed.to_string().ends_with("2 worker(s) stopped on errors, see log"));
    }
}
