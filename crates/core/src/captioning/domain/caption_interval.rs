use std::ops::Deref;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::caption_error::CaptionError;

/// A time range, in seconds, during which `text` is shown.
///
/// `start` is inclusive and `end` is exclusive.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CaptionInterval {
    pub start: f64,
    pub end: f64,
    pub text: String,
}

impl CaptionInterval {
    pub fn new(start: f64, end: f64, text: impl Into<String>) -> Self {
        Self {
            start,
            end,
            text: text.into(),
        }
    }

    pub fn duration(&self) -> f64 {
        self.end - self.start
    }

    pub fn contains(&self, t: f64) -> bool {
        self.start <= t && t < self.end
    }
}

/// Read-only, start-ordered sequence of non-overlapping captions.
///
/// Cloning is cheap: clones share the same backing slice, so several
/// cursors can walk one timeline independently.
#[derive(Clone, Debug, PartialEq, Default)]
pub struct CaptionTimeline {
    intervals: Arc<[CaptionInterval]>,
}

impl CaptionTimeline {
    /// Builds a timeline, rejecting intervals that are empty, unordered or
    /// overlapping.
    pub fn new(intervals: Vec<CaptionInterval>) -> Result<Self, CaptionError> {
        for (i, interval) in intervals.iter().enumerate() {
            if !(interval.start < interval.end) {
                return Err(CaptionError::InvalidInput(format!(
                    "caption {i} has non-positive duration ({}..{})",
                    interval.start, interval.end
                )));
            }
            if interval.text.trim().is_empty() {
                return Err(CaptionError::InvalidInput(format!(
                    "caption {i} has empty text"
                )));
            }
        }
        for (i, pair) in intervals.windows(2).enumerate() {
            if pair[0].end > pair[1].start {
                return Err(CaptionError::InvalidInput(format!(
                    "caption {i} ends at {} after caption {} starts at {}",
                    pair[0].end,
                    i + 1,
                    pair[1].start
                )));
            }
        }
        Ok(Self::from_ordered(intervals))
    }

    /// Wraps intervals already known to satisfy the timeline invariants.
    pub(crate) fn from_ordered(intervals: Vec<CaptionInterval>) -> Self {
        debug_assert!(intervals
            .windows(2)
            .all(|pair| pair[0].end <= pair[1].start));
        Self {
            intervals: intervals.into(),
        }
    }

    pub fn intervals(&self) -> &[CaptionInterval] {
        &self.intervals
    }

    /// Index of the first interval whose end lies after `t`.
    pub fn first_unfinished(&self, t: f64) -> usize {
        self.intervals.partition_point(|interval| interval.end <= t)
    }
}

impl Deref for CaptionTimeline {
    type Target = [CaptionInterval];

    fn deref(&self) -> &Self::Target {
        &self.intervals
    }
}
