/// A single recognized word with its position in the source audio, in seconds.
#[derive(Clone, Debug, PartialEq)]
pub struct WordTimestamp {
    pub text: String,
    pub start: f64,
    pub end: f64,
}

impl WordTimestamp {
    pub fn new(text: impl Into<String>, start: f64, end: f64) -> Self {
        debug_assert!(start <= end, "word start must not exceed its end");
        Self {
            text: text.into(),
            start,
            end,
        }
    }

    pub fn duration(&self) -> f64 {
        self.end - self.start
    }
}
