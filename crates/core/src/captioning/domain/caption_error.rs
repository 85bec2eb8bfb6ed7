use thiserror::Error;

/// Errors raised while building or querying a caption timeline.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CaptionError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("non-monotonic caption query: {requested}s requested after {previous}s")]
    NonMonotonicQuery { previous: f64, requested: f64 },
}
