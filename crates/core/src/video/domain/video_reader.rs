use std::path::Path;

use crate::shared::frame::Frame;
use crate::shared::video_metadata::VideoMetadata;

/// Reads frames from a video source.
///
/// Implementations handle codec and container details while the pipeline
/// works with the abstract `Frame` and `VideoMetadata` types. Every frame
/// carries a presentation time in seconds, and successive timestamps from
/// one pass never decrease.
pub trait VideoReader: Send {
    /// Opens a video file and returns its metadata.
    fn open(&mut self, path: &Path) -> Result<VideoMetadata, Box<dyn std::error::Error>>;

    /// Returns an iterator over frames in presentation order.
    fn frames(
        &mut self,
    ) -> Box<dyn Iterator<Item = Result<Frame, Box<dyn std::error::Error>>> + '_>;

    /// Releases any resources held by the reader.
    fn close(&mut self);
}
