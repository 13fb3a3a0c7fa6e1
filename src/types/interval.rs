// src/types/interval.rs
//! Half-open time ranges and the canonical set of ranges already harvested.
//!
//! An [`Interval`] is immutable; every operation produces new values so that
//! intervals can cross queue and task boundaries freely. A [`Coverage`] is
//! always kept canonical: sorted by start, pairwise disjoint and never
//! adjacent. Folding any list of intervals through [`Coverage::union`]
//! yields that canonical form regardless of input order.

use super::ValidationError;
use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

const NANOS_PER_SECOND: i128 = 1_000_000_000;

/// A time range `[start, end)` with `start <= end`.
///
/// Equal endpoints denote a zero-length marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawInterval", into = "RawInterval")]
pub struct Interval {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

#[derive(Serialize, Deserialize)]
struct RawInterval {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl TryFrom<RawInterval> for Interval {
    type Error = ValidationError;

    fn try_from(raw: RawInterval) -> Result<Self, Self::Error> {
        Interval::new(raw.start, raw.end)
    }
}

impl From<Interval> for RawInterval {
    fn from(interval: Interval) -> Self {
        RawInterval {
            start: interval.start,
            end: interval.end,
        }
    }
}

impl Interval {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self, ValidationError> {
        if start > end {
            return Err(ValidationError::InvertedInterval {
                start: start.to_rfc3339(),
                end: end.to_rfc3339(),
            });
        }
        Ok(Self { start, end })
    }

    /// A zero-length marker at `at`.
    pub fn instant(at: DateTime<Utc>) -> Self {
        Self { start: at, end: at }
    }

    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    pub fn end(&self) -> DateTime<Utc> {
        self.end
    }

    pub fn duration(&self) -> TimeDelta {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// True when the two intervals overlap or share an endpoint.
    pub fn touches(&self, other: &Interval) -> bool {
        self.start <= other.end && other.start <= self.end
    }

    /// Splits at the midpoint into `(start, mid)` and `(mid, end)`.
    ///
    /// Both halves must be non-empty, otherwise repeated bisection could
    /// never make progress.
    pub fn bisect(&self) -> Result<(Interval, Interval), ValidationError> {
        let mid = self.offset_by_fraction(1, 2);
        if mid <= self.start || mid >= self.end {
            return Err(ValidationError::IntervalTooShort(self.to_string()));
        }
        Ok((
            Interval {
                start: self.start,
                end: mid,
            },
            Interval {
                start: mid,
                end: self.end,
            },
        ))
    }

    /// Splits into `parts` consecutive sub-intervals of equal width.
    ///
    /// The first sub-interval starts at `start`, the last ends exactly at
    /// `end`, and each boundary is shared by its neighbours.
    pub fn partition(&self, parts: usize) -> Result<Vec<Interval>, ValidationError> {
        if parts == 0 {
            return Err(ValidationError::ZeroPartitions);
        }
        let parts = parts as i128;
        let boundaries: Vec<DateTime<Utc>> = (0..=parts)
            .map(|i| self.offset_by_fraction(i, parts))
            .collect();
        Ok(boundaries
            .windows(2)
            .map(|pair| Interval {
                start: pair[0],
                end: pair[1],
            })
            .collect())
    }

    /// The smallest interval spanning both, if they overlap or touch.
    pub fn merge(&self, other: &Interval) -> Result<Interval, ValidationError> {
        if !self.touches(other) {
            return Err(ValidationError::DisjointIntervals {
                left: self.to_string(),
                right: other.to_string(),
            });
        }
        Ok(Interval {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        })
    }

    /// The prefix of this interval ending at `at`, clamped to the interval.
    pub fn truncated_at(&self, at: DateTime<Utc>) -> Interval {
        Interval {
            start: self.start,
            end: at.clamp(self.start, self.end),
        }
    }

    /// The part of this interval inside `bounds`, if any.
    pub fn clipped_to(&self, bounds: &Interval) -> Option<Interval> {
        let start = self.start.max(bounds.start);
        let end = self.end.min(bounds.end);
        (start <= end).then_some(Interval { start, end })
    }

    /// `start + duration * numerator / denominator`, exact to the nanosecond.
    fn offset_by_fraction(&self, numerator: i128, denominator: i128) -> DateTime<Utc> {
        let duration = self.duration();
        let total = duration.num_seconds() as i128 * NANOS_PER_SECOND
            + duration.subsec_nanos() as i128;
        let offset = total * numerator / denominator;
        let seconds = (offset / NANOS_PER_SECOND) as i64;
        let nanos = (offset % NANOS_PER_SECOND) as i64;
        self.start + TimeDelta::seconds(seconds) + TimeDelta::nanoseconds(nanos)
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}, {})",
            self.start.format("%Y-%m-%d %H:%M:%S%.f"),
            self.end.format("%Y-%m-%d %H:%M:%S%.f")
        )
    }
}

/// Canonical set of harvested intervals: sorted, disjoint, non-adjacent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<Interval>", into = "Vec<Interval>")]
pub struct Coverage {
    spans: Vec<Interval>,
}

impl Coverage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Folds any intervals (unordered, overlapping, adjacent) into canonical form.
    pub fn union(intervals: impl IntoIterator<Item = Interval>) -> Self {
        let mut sorted: Vec<Interval> = intervals.into_iter().collect();
        sorted.sort_by_key(|interval| (interval.start, interval.end));

        let mut spans: Vec<Interval> = Vec::with_capacity(sorted.len());
        for interval in sorted {
            match spans.last_mut() {
                Some(last) if last.touches(&interval) => {
                    last.end = last.end.max(interval.end);
                }
                _ => spans.push(interval),
            }
        }
        Self { spans }
    }

    /// Folds one more interval into the coverage.
    pub fn insert(&mut self, interval: Interval) {
        let spans = std::mem::take(&mut self.spans);
        *self = Self::union(spans.into_iter().chain(std::iter::once(interval)));
    }

    /// Drops zero-length markers.
    pub fn without_markers(self) -> Self {
        Self {
            spans: self.spans.into_iter().filter(|s| !s.is_empty()).collect(),
        }
    }

    pub fn intervals(&self) -> &[Interval] {
        &self.spans
    }

    pub fn len(&self) -> usize {
        self.spans.len()
    }

    pub fn is_empty(&self) -> bool {
        self.spans.is_empty()
    }

    pub fn contains(&self, interval: &Interval) -> bool {
        self.spans
            .iter()
            .any(|span| span.start <= interval.start && interval.end <= span.end)
    }

    /// Uncovered, non-empty intervals inside `bounds`, in temporal order.
    ///
    /// Covered spans are clipped to `bounds` and zero-length markers are
    /// added at both ends before taking the space between consecutive spans.
    pub fn gaps_within(&self, bounds: &Interval) -> Vec<Interval> {
        let anchored = Self::union(
            self.spans
                .iter()
                .filter_map(|span| span.clipped_to(bounds))
                .chain([Interval::instant(bounds.start), Interval::instant(bounds.end)]),
        );
        anchored
            .spans
            .windows(2)
            .map(|pair| Interval {
                start: pair[0].end,
                end: pair[1].start,
            })
            .filter(|gap| !gap.is_empty())
            .collect()
    }
}

impl From<Vec<Interval>> for Coverage {
    fn from(intervals: Vec<Interval>) -> Self {
        Self::union(intervals)
    }
}

impl From<Coverage> for Vec<Interval> {
    fn from(coverage: Coverage) -> Self {
        coverage.spans
    }
}

impl FromIterator<Interval> for Coverage {
    fn from_iter<I: IntoIterator<Item = Interval>>(iter: I) -> Self {
        Self::union(iter)
    }
}
