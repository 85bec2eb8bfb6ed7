use super::caption_error::CaptionError;
use super::caption_interval::{CaptionInterval, CaptionTimeline};

/// Where a cursor stands relative to the timeline after its last query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorState {
    /// No query yet, or the query time precedes the first caption.
    BeforeFirst,
    /// The caption at this index is on screen.
    Active(usize),
    /// Between two captions.
    Gap,
    /// Every caption has ended.
    Done,
}

/// Walks a caption timeline with non-decreasing query times.
///
/// The index only moves forward, so a full pass over `n` frames and `m`
/// captions costs `O(n + m)`. Each render pass owns its own cursor; the
/// timeline itself is shared read-only.
#[derive(Debug, Clone)]
pub struct CaptionCursor {
    timeline: CaptionTimeline,
    index: usize,
    last_query: Option<f64>,
    state: CursorState,
}

impl CaptionCursor {
    pub fn new(timeline: CaptionTimeline) -> Self {
        Self {
            timeline,
            index: 0,
            last_query: None,
            state: CursorState::BeforeFirst,
        }
    }

    /// Creates a cursor positioned for a pass that begins at `t`, skipping
    /// every caption that has already ended by binary search. Later queries
    /// must not go below `t`.
    pub fn starting_at(timeline: CaptionTimeline, t: f64) -> Self {
        let index = timeline.first_unfinished(t);
        let mut cursor = Self {
            timeline,
            index,
            last_query: Some(t),
            state: CursorState::BeforeFirst,
        };
        cursor.state = cursor.classify(t);
        cursor
    }

    /// Moves the cursor to time `t` and returns the caption on screen, if any.
    pub fn advance(&mut self, t: f64) -> Result<Option<&CaptionInterval>, CaptionError> {
        if t.is_nan() {
            return Err(CaptionError::InvalidInput(
                "caption query time is NaN".to_string(),
            ));
        }
        if let Some(previous) = self.last_query {
            if t < previous {
                return Err(CaptionError::NonMonotonicQuery {
                    previous,
                    requested: t,
                });
            }
        }
        self.last_query = Some(t);

        while self.index < self.timeline.len() && t >= self.timeline[self.index].end {
            self.index += 1;
        }
        self.state = self.classify(t);

        Ok(self.active())
    }

    fn classify(&self, t: f64) -> CursorState {
        match self.timeline.get(self.index) {
            None => CursorState::Done,
            Some(interval) if interval.contains(t) => CursorState::Active(self.index),
            Some(_) if self.index == 0 => CursorState::BeforeFirst,
            Some(_) => CursorState::Gap,
        }
    }

    /// The caption on screen as of the last query.
    pub fn active(&self) -> Option<&CaptionInterval> {
        match self.state {
            CursorState::Active(i) => self.timeline.get(i),
            _ => None,
        }
    }

    pub fn active_text(&self) -> Option<&str> {
        self.active().map(|c| c.text.as_str())
    }

    pub fn state(&self) -> CursorState {
        self.state
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn last_query(&self) -> Option<f64> {
        self.last_query
    }

    pub fn timeline(&self) -> &CaptionTimeline {
        &self.timeline
    }
}
