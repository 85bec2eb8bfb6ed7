use super::caption_error::CaptionError;

pub const DEFAULT_WORD_LIMIT: usize = 2;
pub const DEFAULT_HOLD_SECONDS: f64 = 0.0;

/// Scheduling knobs for one render pass: how many words share a caption and
/// how long a caption lingers past its last word.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CaptionSettings {
    pub word_limit: usize,
    pub hold: f64,
}

impl CaptionSettings {
    pub fn new(word_limit: usize, hold: f64) -> Result<Self, CaptionError> {
        let settings = Self { word_limit, hold };
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), CaptionError> {
        if self.word_limit == 0 {
            return Err(CaptionError::InvalidInput(
                "word_limit must be a positive integer".to_string(),
            ));
        }
        if !self.hold.is_finite() || self.hold < 0.0 {
            return Err(CaptionError::InvalidInput(format!(
                "hold_duration must be a non-negative number of seconds, got {}",
                self.hold
            )));
        }
        Ok(())
    }
}

impl Default for CaptionSettings {
    fn default() -> Self {
        Self {
            word_limit: DEFAULT_WORD_LIMIT,
            hold: DEFAULT_HOLD_SECONDS,
        }
    }
}
