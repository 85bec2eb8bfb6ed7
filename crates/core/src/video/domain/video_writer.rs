use std::path::Path;

use crate::shared::frame::Frame;
use crate::shared::video_metadata::VideoMetadata;

/// Abstracts video encoding so the pipeline can write output without
/// depending on a specific codec library.
pub trait VideoWriter: Send {
    /// Prepares an output at the canvas size and frame rate in `metadata`.
    fn open(
        &mut self,
        path: &Path,
        metadata: &VideoMetadata,
    ) -> Result<(), Box<dyn std::error::Error>>;

    fn write(&mut self, frame: &Frame) -> Result<(), Box<dyn std::error::Error>>;

    /// Finalizes the file. The source's audio track is remuxed here,
    /// untouched.
    fn close(&mut self) -> Result<(), Box<dyn std::error::Error>>;

    /// Drops a pass that did not finish. Nothing is finalized and the
    /// partial output is removed. Safe to call more than once.
    fn abort(&mut self);
}
