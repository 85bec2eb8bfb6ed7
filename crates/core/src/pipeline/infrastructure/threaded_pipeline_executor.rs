use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use crate::pipeline::frame_captioner::FrameCaptioner;
use crate::pipeline::pipeline_executor::{PipelineConfig, PipelineExecutor};
use crate::rendering::domain::frame_compositor::FrameCompositor;
use crate::shared::frame::Frame;
use crate::shared::video_metadata::VideoMetadata;
use crate::video::domain::video_reader::VideoReader;
use crate::video::domain::video_writer::VideoWriter;

const DEFAULT_CHANNEL_CAPACITY: usize = 8;

type SendError = Box<dyn std::error::Error + Send + Sync>;

/// Executes the captioning pass with dedicated threads for decode and encode.
///
/// Layout: `reader → main [cursor/rasterize/composite] → writer`
///
/// Captioning stays on the calling thread, so frames reach the cursor in
/// decode order and its time queries never go backwards. Bounded channels
/// keep at most a few frames in flight.
pub struct ThreadedPipelineExecutor {
    channel_capacity: usize,
}

impl ThreadedPipelineExecutor {
    pub fn new() -> Self {
        Self {
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
        }
    }

    pub fn with_capacity(channel_capacity: usize) -> Self {
        Self {
            channel_capacity: channel_capacity.max(1),
        }
    }
}

impl Default for ThreadedPipelineExecutor {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineExecutor for ThreadedPipelineExecutor {
    fn execute(
        &self,
        reader: Box<dyn VideoReader>,
        mut writer: Box<dyn VideoWriter>,
        mut captioner: FrameCaptioner,
        metadata: &VideoMetadata,
        output_path: &Path,
        mut config: PipelineConfig,
    ) -> Result<usize, Box<dyn std::error::Error>> {
        let cap = self.channel_capacity;

        if let Err(e) = writer.open(output_path, metadata) {
            writer.abort();
            return Err(e);
        }
        config.logger.info(&format!(
            "Burning captions into {} ({}x{} @ {:.3} fps)",
            output_path.display(),
            metadata.width,
            metadata.height,
            metadata.effective_fps()
        ));

        let (frame_tx, frame_rx) = crossbeam_channel::bounded::<Result<Frame, SendError>>(cap);
        let (write_tx, write_rx) = crossbeam_channel::bounded::<Frame>(cap);

        let reader_handle = spawn_reader(reader, frame_tx, config.cancelled.clone());
        let writer_handle = spawn_writer(writer, write_rx);

        let outcome = run_main_loop(
            frame_rx,
            &write_tx,
            &mut captioner,
            metadata.total_frames,
            &mut config,
        );

        drop(write_tx);

        let frames = join_threads(reader_handle, writer_handle, outcome)?;
        config.logger.summary();
        Ok(frames)
    }
}

fn spawn_reader(
    mut reader: Box<dyn VideoReader>,
    frame_tx: crossbeam_channel::Sender<Result<Frame, SendError>>,
    cancelled: Arc<AtomicBool>,
) -> std::thread::JoinHandle<Box<dyn VideoReader>> {
    std::thread::spawn(move || {
        for frame_result in reader.frames() {
            if cancelled.load(Ordering::Relaxed) {
                break;
            }
            let mapped = frame_result.map_err(|e| -> SendError { e.to_string().into() });
            if frame_tx.send(mapped).is_err() {
                break;
            }
        }
        reader.close();
        reader
    })
}

type WriterOutcome = (Box<dyn VideoWriter>, Result<(), SendError>);

/// Hands the writer back even on failure so the caller decides between
/// closing and aborting it.
fn spawn_writer(
    mut writer: Box<dyn VideoWriter>,
    write_rx: crossbeam_channel::Receiver<Frame>,
) -> std::thread::JoinHandle<WriterOutcome> {
    std::thread::spawn(move || {
        for frame in write_rx {
            if let Err(e) = writer.write(&frame) {
                return (writer, Err(e.to_string().into()));
            }
        }
        (writer, Ok(()))
    })
}

/// Receives decoded frames, burns captions in and forwards them to the
/// writer. Returns the number of frames forwarded.
fn run_main_loop(
    frame_rx: crossbeam_channel::Receiver<Result<Frame, SendError>>,
    write_tx: &crossbeam_channel::Sender<Frame>,
    captioner: &mut FrameCaptioner,
    total_frames: usize,
    config: &mut PipelineConfig,
) -> Result<usize, Box<dyn std::error::Error>> {
    let mut frames_processed: usize = 0;

    for frame_result in frame_rx {
        if config.cancelled.load(Ordering::Relaxed) {
            break;
        }
        let mut frame = frame_result.map_err(|e| -> Box<dyn std::error::Error> {
            e.to_string().into()
        })?;

        caption_one(captioner, &mut frame, config)?;

        write_tx
            .send(frame)
            .map_err(|_| "Writer channel closed unexpectedly")?;
        frames_processed += 1;

        config.logger.progress(frames_processed, total_frames);
        if let Some(ref callback) = config.on_progress {
            if !callback(frames_processed, total_frames) {
                config.cancelled.store(true, Ordering::Relaxed);
            }
        }
    }

    if config.cancelled.load(Ordering::Relaxed) {
        return Err(format!("Cancelled after {frames_processed} frames").into());
    }
    Ok(frames_processed)
}

/// One frame through the caption and composite stages, timing each.
fn caption_one(
    captioner: &mut FrameCaptioner,
    frame: &mut Frame,
    config: &mut PipelineConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    let started = Instant::now();
    let overlay = captioner.overlay_at(frame.timestamp(), frame.canvas())?;
    config
        .logger
        .timing("caption", started.elapsed().as_secs_f64() * 1000.0);

    let Some(overlay) = overlay else {
        config.logger.metric("caption_active", 0.0);
        return Ok(());
    };

    let started = Instant::now();
    FrameCompositor::composite_into(frame, overlay)?;
    config
        .logger
        .timing("composite", started.elapsed().as_secs_f64() * 1000.0);
    config.logger.metric("caption_active", 1.0);
    Ok(())
}

/// Joins the I/O threads and coalesces the first error encountered.
/// The writer is finalized only when every stage succeeded; otherwise its
/// partial output is discarded.
fn join_threads(
    reader_handle: std::thread::JoinHandle<Box<dyn VideoReader>>,
    writer_handle: std::thread::JoinHandle<WriterOutcome>,
    outcome: Result<usize, Box<dyn std::error::Error>>,
) -> Result<usize, Box<dyn std::error::Error>> {
    let (frames, mut first_error) = match outcome {
        Ok(n) => (n, None),
        Err(e) => (0, Some(e)),
    };
    fn set_if_none(slot: &mut Option<Box<dyn std::error::Error>>, err: Box<dyn std::error::Error>) {
        if slot.is_none() {
            *slot = Some(err);
        }
    }

    if reader_handle.join().is_err() {
        set_if_none(&mut first_error, "Reader thread panicked".into());
    }

    match writer_handle.join() {
        Ok((mut w, written)) => {
            if let Err(e) = written {
                set_if_none(&mut first_error, e.to_string().into());
            }
            if first_error.is_some() {
                w.abort();
            } else if let Err(e) = w.close() {
                w.abort();
                first_error = Some(e);
            }
        }
        Err(_) => set_if_none(&mut first_error, "Writer thread panicked".into()),
    }

    match first_error {
        Some(e) => Err(e),
        None => Ok(frames),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::captioning::domain::caption_interval::{CaptionInterval, CaptionTimeline};
    use crate::pipeline::pipeline_logger::StdoutPipelineLogger;
    use crate::rendering::domain::caption_painter::CaptionPainter;
    use crate::rendering::domain::glyph_buffer::{CoverageMask, GlyphBuffer};
    use crate::rendering::domain::render_error::RenderError;
    use crate::rendering::domain::style::{Anchor, OutlineStyle, Rgb, StyleConfig};
    use crate::rendering::domain::text_rasterizer::TextRasterizer;
    use std::sync::Mutex;

    struct StubReader {
        frames: Vec<Result<Frame, String>>,
        closed: Arc<Mutex<bool>>,
    }

    impl VideoReader for StubReader {
        fn open(&mut self, _path: &Path) -> Result<VideoMetadata, Box<dyn std::error::Error>> {
            Ok(metadata(0))
        }

        fn frames(
            &mut self,
        ) -> Box<dyn Iterator<Item = Result<Frame, Box<dyn std::error::Error>>> + '_> {
            Box::new(self.frames.drain(..).map(|r| r.map_err(Into::into)))
        }

        fn close(&mut self) {
            *self.closed.lock().unwrap() = true;
        }
    }

    #[derive(Default)]
    struct StubWriter {
        written: Arc<Mutex<Vec<Frame>>>,
        closed: Arc<Mutex<bool>>,
        aborted: Arc<Mutex<bool>>,
        fail_at: Option<usize>,
        fail_close: bool,
    }

    impl VideoWriter for StubWriter {
        fn open(
            &mut self,
            _path: &Path,
            _metadata: &VideoMetadata,
        ) -> Result<(), Box<dyn std::error::Error>> {
            Ok(())
        }

        fn write(&mut self, frame: &Frame) -> Result<(), Box<dyn std::error::Error>> {
            if self.fail_at == Some(frame.index()) {
                return Err("disk full".into());
            }
            self.written.lock().unwrap().push(frame.clone());
            Ok(())
        }

        fn close(&mut self) -> Result<(), Box<dyn std::error::Error>> {
            if self.fail_close {
                return Err("audio mux failed".into());
            }
            *self.closed.lock().unwrap() = true;
            Ok(())
        }

        fn abort(&mut self) {
            *self.aborted.lock().unwrap() = true;
        }
    }

    struct BlockRasterizer;

    impl TextRasterizer for BlockRasterizer {
        fn render(
            &self,
            _text: &str,
            style: &StyleConfig,
            canvas: (u32, u32),
        ) -> Result<GlyphBuffer, RenderError> {
            let mask = CoverageMask::new(vec![255; 4], 2, 2);
            Ok(CaptionPainter::paint(&mask, style, canvas))
        }
    }

    const FPS: f64 = 10.0;

    fn metadata(total: usize) -> VideoMetadata {
        VideoMetadata {
            width: 8,
            height: 8,
            fps: FPS,
            total_frames: total,
            codec: String::new(),
            source_path: None,
        }
    }

    fn frames(count: usize) -> Vec<Result<Frame, String>> {
        (0..count)
            .map(|i| Ok(Frame::new(vec![0; 8 * 8 * 3], 8, 8, 3, i).with_timestamp(i as f64 / FPS)))
            .collect()
    }

    fn reader(frames: Vec<Result<Frame, String>>) -> (StubReader, Arc<Mutex<bool>>) {
        let closed = Arc::new(Mutex::new(false));
        (
            StubReader {
                frames,
                closed: closed.clone(),
            },
            closed,
        )
    }

    /// Caption on screen from 0.2s to 0.5s.
    fn captioner() -> FrameCaptioner {
        let timeline =
            CaptionTimeline::new(vec![CaptionInterval::new(0.2, 0.5, "hello there")]).unwrap();
        let style = StyleConfig {
            color: Rgb(255, 0, 0),
            font_size: 8,
            anchor: Anchor::new(4, 4),
            outline: OutlineStyle::disabled(),
        };
        FrameCaptioner::new(timeline, Box::new(BlockRasterizer), style).unwrap()
    }

    fn is_captioned(frame: &Frame) -> bool {
        frame.as_ndarray()[[4, 4, 0]] == 255
    }

    fn run(
        reader: StubReader,
        writer: StubWriter,
        total: usize,
        config: PipelineConfig,
    ) -> Result<usize, Box<dyn std::error::Error>> {
        ThreadedPipelineExecutor::with_capacity(2).execute(
            Box::new(reader),
            Box::new(writer),
            captioner(),
            &metadata(total),
            Path::new("/tmp/out.mp4"),
            config,
        )
    }

    #[test]
    fn test_captions_only_frames_inside_interval() {
        let (reader, _) = reader(frames(8));
        let writer = StubWriter::default();
        let written = writer.written.clone();

        let count = run(reader, writer, 8, PipelineConfig::default()).unwrap();
        assert_eq!(count, 8);

        let written = written.lock().unwrap();
        let flags: Vec<bool> = written.iter().map(is_captioned).collect();
        assert_eq!(
            flags,
            vec![false, false, true, true, true, false, false, false]
        );
        for (i, frame) in written.iter().enumerate() {
            assert_eq!(frame.index(), i);
        }
    }

    #[test]
    fn test_closes_reader_and_writer() {
        let (reader, reader_closed) = reader(frames(3));
        let writer = StubWriter::default();
        let writer_closed = writer.closed.clone();
        let writer_aborted = writer.aborted.clone();

        run(reader, writer, 3, PipelineConfig::default()).unwrap();
        assert!(*reader_closed.lock().unwrap());
        assert!(*writer_closed.lock().unwrap());
        assert!(!*writer_aborted.lock().unwrap());
    }

    #[test]
    fn test_empty_video_writes_nothing() {
        let (reader, _) = reader(Vec::new());
        let writer = StubWriter::default();
        let written = writer.written.clone();

        assert_eq!(run(reader, writer, 0, PipelineConfig::default()).unwrap(), 0);
        assert!(written.lock().unwrap().is_empty());
    }

    #[test]
    fn test_progress_reports_every_frame() {
        let (reader, _) = reader(frames(4));
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let config = PipelineConfig {
            on_progress: Some(Box::new(move |done, total| {
                sink.lock().unwrap().push((done, total));
                true
            })),
            ..PipelineConfig::default()
        };

        run(reader, StubWriter::default(), 4, config).unwrap();
        assert_eq!(*seen.lock().unwrap(), vec![(1, 4), (2, 4), (3, 4), (4, 4)]);
    }

    #[test]
    fn test_progress_callback_can_cancel() {
        let (reader, _) = reader(frames(20));
        let writer = StubWriter::default();
        let written = writer.written.clone();
        let cancelled = Arc::new(AtomicBool::new(false));
        let config = PipelineConfig {
            on_progress: Some(Box::new(|done, _| done < 3)),
            cancelled: cancelled.clone(),
            ..PipelineConfig::default()
        };

        let closed = writer.closed.clone();
        let aborted = writer.aborted.clone();

        let err = run(reader, writer, 20, config).unwrap_err();
        assert!(err.to_string().contains("Cancelled"));
        assert!(cancelled.load(Ordering::Relaxed));
        assert_eq!(written.lock().unwrap().len(), 3);
        assert!(*aborted.lock().unwrap());
        assert!(!*closed.lock().unwrap());
    }

    #[test]
    fn test_pre_cancelled_pass_is_an_error() {
        let (reader, _) = reader(frames(5));
        let config = PipelineConfig {
            cancelled: Arc::new(AtomicBool::new(true)),
            ..PipelineConfig::default()
        };
        assert!(run(reader, StubWriter::default(), 5, config).is_err());
    }

    #[test]
    fn test_reader_error_aborts_pass() {
        let mut input = frames(2);
        input.push(Err("corrupt packet".to_string()));
        input.extend(frames(2));
        let (reader, _) = reader(input);
        let writer = StubWriter::default();
        let (closed, aborted) = (writer.closed.clone(), writer.aborted.clone());

        let err = run(reader, writer, 5, PipelineConfig::default()).unwrap_err();
        assert!(err.to_string().contains("corrupt packet"));
        assert!(*aborted.lock().unwrap());
        assert!(!*closed.lock().unwrap());
    }

    #[test]
    fn test_writer_error_is_reported() {
        let (reader, _) = reader(frames(6));
        let writer = StubWriter {
            fail_at: Some(1),
            ..StubWriter::default()
        };
        let aborted = writer.aborted.clone();
        let err = run(reader, writer, 6, PipelineConfig::default()).unwrap_err();
        assert!(
            err.to_string().contains("disk full") || err.to_string().contains("Writer channel"),
            "unexpected error: {err}"
        );
        assert!(*aborted.lock().unwrap());
    }

    #[test]
    fn test_failed_finalize_discards_output() {
        let (reader, _) = reader(frames(3));
        let writer = StubWriter {
            fail_close: true,
            ..StubWriter::default()
        };
        let aborted = writer.aborted.clone();
        let err = run(reader, writer, 3, PipelineConfig::default()).unwrap_err();
        assert!(err.to_string().contains("audio mux failed"));
        assert!(*aborted.lock().unwrap());
    }

    #[test]
    fn test_backwards_timestamp_aborts_pass() {
        let input = vec![
            Ok(Frame::new(vec![0; 192], 8, 8, 3, 0).with_timestamp(0.3)),
            Ok(Frame::new(vec![0; 192], 8, 8, 3, 1).with_timestamp(0.1)),
        ];
        let (reader, _) = reader(input);
        let writer = StubWriter::default();
        let (closed, aborted) = (writer.closed.clone(), writer.aborted.clone());
        let err = run(reader, writer, 2, PipelineConfig::default()).unwrap_err();
        assert!(err.to_string().contains("0.1"), "unexpected error: {err}");
        assert!(*aborted.lock().unwrap());
        assert!(!*closed.lock().unwrap());
    }

    #[test]
    fn test_logger_receives_stage_timings() {
        struct Shared(Arc<Mutex<StdoutPipelineLogger>>);
        impl crate::pipeline::pipeline_logger::PipelineLogger for Shared {
            fn progress(&mut self, current: usize, total: usize) {
                self.0.lock().unwrap().progress(current, total);
            }
            fn timing(&mut self, stage: &str, duration_ms: f64) {
                self.0.lock().unwrap().timing(stage, duration_ms);
            }
            fn metric(&mut self, name: &str, value: f64) {
                self.0.lock().unwrap().metric(name, value);
            }
            fn info(&mut self, message: &str) {
                self.0.lock().unwrap().info(message);
            }
        }

        let inner = Arc::new(Mutex::new(StdoutPipelineLogger::new(100)));
        let config = PipelineConfig {
            logger: Box::new(Shared(inner.clone())),
            ..PipelineConfig::default()
        };
        let (reader, _) = reader(frames(8));
        run(reader, StubWriter::default(), 8, config).unwrap();

        let logger = inner.lock().unwrap();
        assert_eq!(logger.timings_for("caption").unwrap().count(), 8);
        assert_eq!(logger.timings_for("composite").unwrap().count(), 3);
        let active = logger.metrics_for("caption_active").unwrap();
        assert_eq!(active.total(), 3.0);
    }
}
