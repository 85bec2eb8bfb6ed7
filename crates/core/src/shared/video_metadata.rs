use std::path::PathBuf;

/// Frame rate assumed when a container does not report one.
pub const FALLBACK_FPS: f64 = 30.0;

#[derive(Clone, Debug, PartialEq)]
pub struct VideoMetadata {
    pub width: u32,
    pub height: u32,
    pub fps: f64,
    pub total_frames: usize,
    pub codec: String,
    pub source_path: Option<PathBuf>,
}

impl VideoMetadata {
    /// Frame rate to encode at: the reported rate, or [`FALLBACK_FPS`].
    pub fn effective_fps(&self) -> f64 {
        if self.fps.is_finite() && self.fps > 0.0 {
            self.fps
        } else {
            FALLBACK_FPS
        }
    }

    /// Nominal presentation time of frame `index`, for streams without
    /// usable timestamps.
    pub fn frame_time(&self, index: usize) -> f64 {
        index as f64 / self.effective_fps()
    }

    pub fn canvas(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}
