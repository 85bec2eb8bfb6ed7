use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use crate::shared::video_metadata::VideoMetadata;
use crate::video::domain::video_reader::VideoReader;
use crate::video::domain::video_writer::VideoWriter;

use super::frame_captioner::FrameCaptioner;
use super::pipeline_executor::{PipelineConfig, PipelineExecutor, ProgressFn};
use super::pipeline_logger::{NullPipelineLogger, PipelineLogger};

/// Orchestrates burning a caption timeline into a video.
///
/// Wires the reader, writer and per-frame captioner together and delegates
/// execution to a `PipelineExecutor`. Single-use: `execute` consumes the
/// owned components, so calling it twice fails.
pub struct BurnCaptionsUseCase {
    reader: Option<Box<dyn VideoReader>>,
    writer: Option<Box<dyn VideoWriter>>,
    captioner: Option<FrameCaptioner>,
    executor: Box<dyn PipelineExecutor>,
    on_progress: Option<ProgressFn>,
    cancelled: Arc<AtomicBool>,
    logger: Option<Box<dyn PipelineLogger>>,
}

impl BurnCaptionsUseCase {
    pub fn new(
        reader: Box<dyn VideoReader>,
        writer: Box<dyn VideoWriter>,
        captioner: FrameCaptioner,
        executor: Box<dyn PipelineExecutor>,
    ) -> Self {
        Self {
            reader: Some(reader),
            writer: Some(writer),
            captioner: Some(captioner),
            executor,
            on_progress: None,
            cancelled: Arc::new(AtomicBool::new(false)),
            logger: None,
        }
    }

    pub fn with_progress(mut self, on_progress: ProgressFn) -> Self {
        self.on_progress = Some(on_progress);
        self
    }

    /// Shares a flag that stops the pass between frames when set.
    pub fn with_cancel_flag(mut self, cancelled: Arc<AtomicBool>) -> Self {
        self.cancelled = cancelled;
        self
    }

    pub fn with_logger(mut self, logger: Box<dyn PipelineLogger>) -> Self {
        self.logger = Some(logger);
        self
    }

    /// Runs the pass and returns the number of frames written.
    pub fn execute(
        &mut self,
        metadata: &VideoMetadata,
        output_path: &Path,
    ) -> Result<usize, Box<dyn std::error::Error>> {
        let config = PipelineConfig {
            on_progress: self.on_progress.take(),
            cancelled: self.cancelled.clone(),
            logger: self
                .logger
                .take()
                .unwrap_or_else(|| Box::new(NullPipelineLogger)),
        };

        self.executor.execute(
            self.reader.take().ok_or("Pipeline already executed")?,
            self.writer.take().ok_or("Pipeline already executed")?,
            self.captioner.take().ok_or("Pipeline already executed")?,
            metadata,
            output_path,
            config,
        )
    }
}
