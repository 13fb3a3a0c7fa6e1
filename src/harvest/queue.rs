// src/harvest/queue.rs
//! The shared todo queue of intervals still to be harvested.

use crate::types::Interval;
use crossbeam::deque::{Injector, Steal};
use std::sync::atomic::{AtomicUsize, Ordering};

/// Lock-free FIFO of work items.
///
/// Popping never blocks: an empty queue means "no more work" and the caller
/// is expected to exit rather than wait.
#[derive(Default)]
pub struct TodoQueue {
    injector: Injector<Interval>,
    /// Approximate length, for progress display only
    queued: AtomicUsize,
}

impl TodoQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, interval: Interval) {
        self.queued.fetch_add(1, Ordering::Relaxed);
        self.injector.push(interval);
    }

    pub fn push_all(&self, intervals: impl IntoIterator<Item = Interval>) {
        for interval in intervals {
            self.push(interval);
        }
    }

    /// Takes the next interval, or `None` if the queue was observed empty.
    pub fn pop(&self) -> Option<Interval> {
        loop {
            match self.injector.steal() {
                Steal::Success(interval) => {
                    self.queued.fetch_sub(1, Ordering::Relaxed);
                    return Some(interval);
                }
                Steal::Empty => return None,
                Steal::Retry => std::hint::spin_loop(),
            }
        }
    }

    pub fn len(&self) -> usize {
        self.queued.load(Ordering::Relaxed)
    }

    pub fn is_empty(&self) -> bool {
        self.injector.is_empty()
    }
}

impl FromIterator<Interval> for TodoQueue {
    fn from_iter<I: IntoIterator<Item = Interval>>(iter: I) -> Self {
        let queue = Self::new();
        queue.push_all(iter);
        queue
    }
}
