use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use crate::shared::video_metadata::VideoMetadata;
use crate::video::domain::video_reader::VideoReader;
use crate::video::domain::video_writer::VideoWriter;

use super::frame_captioner::FrameCaptioner;
use super::pipeline_logger::{NullPipelineLogger, PipelineLogger};

/// Progress callback: `(frames_done, total_frames)`. Returning `false`
/// cancels the pass.
pub type ProgressFn = Box<dyn Fn(usize, usize) -> bool + Send>;

/// Configuration for a pipeline execution run.
pub struct PipelineConfig {
    pub on_progress: Option<ProgressFn>,
    pub cancelled: Arc<AtomicBool>,
    pub logger: Box<dyn PipelineLogger>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            on_progress: None,
            cancelled: Arc::new(AtomicBool::new(false)),
            logger: Box::new(NullPipelineLogger),
        }
    }
}

/// Abstracts how the read → caption → write pass is executed.
///
/// This is a port (application-layer interface). Infrastructure provides
/// concrete implementations. A pass that is cancelled or fails midway
/// returns an error; whatever the writer produced is incomplete.
pub trait PipelineExecutor: Send {
    /// Runs the pass and returns the number of frames written.
    fn execute(
        &self,
        reader: Box<dyn VideoReader>,
        writer: Box<dyn VideoWriter>,
        captioner: FrameCaptioner,
        metadata: &VideoMetadata,
        output_path: &Path,
        config: PipelineConfig,
    ) -> Result<usize, Box<dyn std::error::Error>>;
}
