// src/coverage/reconciler.rs
use super::CoveragePersistence;
use crate::error::Result;
use crate::types::{Coverage, Interval};
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedReceiver;

/// The single writer of persisted coverage.
///
/// Drains completed intervals from the done queue, folds them into the
/// coverage and saves after every batch. It stops once every sender of the
/// done queue is gone and the queue is empty, so no completion reported by a
/// worker is ever lost.
pub struct CoverageReconciler {
    coverage: Coverage,
    persistence: Arc<dyn CoveragePersistence>,
    done: UnboundedReceiver<Interval>,
}

impl CoverageReconciler {
    pub fn new(
        coverage: Coverage,
        persistence: Arc<dyn CoveragePersistence>,
        done: UnboundedReceiver<Interval>,
    ) -> Self {
        Self {
            coverage,
            persistence,
            done,
        }
    }

    /// Runs until the done queue is closed and drained; returns the final coverage.
    pub async fn run(mut self) -> Result<Coverage> {
        let mut batch = Vec::new();
        while let Some(first) = self.done.recv().await {
            batch.push(first);
            while let Ok(next) = self.done.try_recv() {
                batch.push(next);
            }

            for interval in batch.drain(..) {
                self.fold(interval);
            }
            // A failed intermediate save is repaired by the next one
            if let Err(e) = self.persistence.save(&self.coverage).await {
                log::warn!("Could not save coverage: {}", e);
            }
        }

        self.persistence.save(&self.coverage).await?;
        log::info!(
            "Coverage reconciled: {} covered span(s)",
            self.coverage.len()
        );
        Ok(self.coverage)
    }

    fn fold(&mut self, interval: Interval) {
        if interval.is_empty() {
            log::debug!("Ignoring empty completion {}", interval);
            return;
        }
        log::debug!("Completed {}", interval);
        self.coverage.insert(interval);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use chrono::{DateTime, TimeZone, Utc};
    use parking_lot::Mutex;
    use pretty_assertions::assert_eq;
    use tokio::sync::mpsc;

    #[derive(Default)]
    struct RecordingPersistence {
        saved: Mutex<Vec<Coverage>>,
    }

    #[async_trait::async_trait]
    impl CoveragePersistence for RecordingPersistence {
        async fn load(&self) -> Result<Option<Coverage>, AppError> {
            Ok(self.saved.lock().last().cloned())
        }

        async fn save(&self, coverage: &Coverage) -> Result<(), AppError> {
            self.saved.lock().push(coverage.clone());
            Ok(())
        }
    }

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2020, 5, 1, h, m, 0).unwrap()
    }

    fn span(from: (u32, u32), to: (u32, u32)) -> Interval {
        Interval::new(at(from.0, from.1), at(to.0, to.1)).unwrap()
    }

    async fn reconcile(completions: Vec<Interval>) -> (Coverage, Arc<RecordingPersistence>) {
        let persistence = Arc::new(RecordingPersistence::default());
        let (tx, rx) = mpsc::unbounded_channel();
        for interval in completions {
            tx.send(interval).unwrap();
        }
        drop(tx);

        let coverage = CoverageReconciler::new(Coverage::new(), persistence.clone(), rx)
            .run()
            .await
            .unwrap();
        (coverage, persistence)
    }

    #[tokio::test]
    async fn test_adjacent_halves_merge_in_either_order() {
        let expected = vec![span((10, 0), (11, 0))];

        let (coverage, _) = reconcile(vec![span((10, 0), (10, 30)), span((10, 30), (11, 0))]).await;
        assert_eq!(coverage.intervals(), expected.as_slice());

        let (coverage, _) = reconcile(vec![span((10, 30), (11, 0)), span((10, 0), (10, 30))]).await;
        assert_eq!(coverage.intervals(), expected.as_slice());
    }

    #[tokio::test]
    async fn test_final_coverage_is_persisted() {
        let (coverage, persistence) =
            reconcile(vec![span((8, 0), (9, 0)), span((12, 0), (13, 0))]).await;
        assert_eq!(persistence.load().await.unwrap(), Some(coverage));
    }

    #[tokio::test]
    async fn test_empty_completions_are_ignored() {
        let (coverage, _) = reconcile(vec![span((10, 7), (10, 7))]).await;
        assert!(coverage.is_empty());
    }

    #[tokio::test]
    async fn test_drains_completions_sent_before_close() {
        let persistence = Arc::new(RecordingPersistence::default());
        let (tx, rx) = mpsc::unbounded_channel();
        let reconciler = tokio::spawn(
            CoverageReconciler::new(Coverage::new(), persistence.clone(), rx).run(),
        );

        let worker = tokio::spawn(async move {
            for h in 0..5 {
                tx.send(span((h, 0), (h + 1, 0))).unwrap();
                tokio::task::yield_now().await;
            }
        });
        worker.await.unwrap();

        let coverage = reconciler.await.unwrap().unwrap();
        assert_eq!(coverage.intervals(), &[span((0, 0), (5, 0))]);
    }
}
