use super::caption_error::CaptionError;
use super::caption_interval::{CaptionInterval, CaptionTimeline};

/// Extends caption end times by a hold duration without colliding with the
/// next caption.
pub struct IntervalAdjuster;

impl IntervalAdjuster {
    /// Returns a timeline where every caption but the last ends at
    /// `min(end + hold, next.start)` and the last ends at `end + hold`.
    /// `next` is the next caption that is kept, so a dropped caption never
    /// cuts short the one before it.
    ///
    /// Starts are never moved. Blank captions and captions left with
    /// `end <= start` are dropped.
    /// Input starts must be non-decreasing; an input end that runs past the
    /// next start is clamped the same way a hold would be.
    pub fn extend_holds(
        intervals: &[CaptionInterval],
        hold: f64,
    ) -> Result<CaptionTimeline, CaptionError> {
        if !(hold >= 0.0) || !hold.is_finite() {
            return Err(CaptionError::InvalidInput(format!(
                "hold duration must be a non-negative number of seconds, got {hold}"
            )));
        }
        if let Some(i) = intervals
            .iter()
            .position(|c| !c.start.is_finite() || !c.end.is_finite())
        {
            return Err(CaptionError::InvalidInput(format!(
                "caption {i} has a non-finite time"
            )));
        }
        if let Some(i) = intervals
            .windows(2)
            .position(|pair| pair[1].start < pair[0].start)
        {
            return Err(CaptionError::InvalidInput(format!(
                "captions must be ordered by start time (caption {} starts before caption {i})",
                i + 1
            )));
        }

        // Walk backwards so each caption knows the start of the next kept one.
        let mut adjusted = Vec::with_capacity(intervals.len());
        let mut next_start: Option<f64> = None;
        for (i, interval) in intervals.iter().enumerate().rev() {
            let extended = interval.end + hold;
            let end = match next_start {
                Some(start) => extended.min(start),
                None => extended,
            };
            if end <= interval.start || interval.text.trim().is_empty() {
                log::debug!(
                    "Dropping caption {i} ({:?}): nothing visible after adjustment",
                    interval.text
                );
                continue;
            }
            next_start = Some(interval.start);
            adjusted.push(CaptionInterval {
                end,
                ..interval.clone()
            });
        }
        adjusted.reverse();

        Ok(CaptionTimeline::from_ordered(adjusted))
    }
}
