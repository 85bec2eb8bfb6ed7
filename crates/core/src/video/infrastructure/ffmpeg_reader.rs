use std::path::Path;

use crate::shared::frame::Frame;
use crate::shared::video_metadata::VideoMetadata;
use crate::video::domain::frame_clock::FrameClock;
use crate::video::domain::video_reader::VideoReader;

/// Decodes video frames via ffmpeg-next (libavformat + libavcodec).
///
/// Converts each decoded frame to RGB24, stamps it with its presentation
/// time and wraps it in a [`Frame`].
pub struct FfmpegReader {
    input_ctx: Option<ffmpeg_next::format::context::Input>,
    video_stream_index: usize,
    metadata: Option<VideoMetadata>,
}

// Safety: FfmpegReader is only used from a single thread at a time.
// The raw pointers inside ffmpeg types are not shared across threads.
unsafe impl Send for FfmpegReader {}

impl FfmpegReader {
    pub fn new() -> Self {
        Self {
            input_ctx: None,
            video_stream_index: 0,
            metadata: None,
        }
    }

    fn decode(&mut self) -> Result<FfmpegFrameIter<'_>, Box<dyn std::error::Error>> {
        let fps = self
            .metadata
            .as_ref()
            .ok_or("FfmpegReader: not opened")?
            .effective_fps();
        let ictx = self.input_ctx.as_mut().ok_or("FfmpegReader: not opened")?;

        let stream = ictx
            .stream(self.video_stream_index)
            .ok_or("Video stream disappeared")?;
        let time_base = rational_to_f64(stream.time_base());
        let codec_ctx = ffmpeg_next::codec::context::Context::from_parameters(stream.parameters())?;
        let decoder = codec_ctx.decoder().video()?;

        let width = decoder.width();
        let height = decoder.height();
        let scaler = ffmpeg_next::software::scaling::Context::get(
            decoder.format(),
            width,
            height,
            ffmpeg_next::format::Pixel::RGB24,
            width,
            height,
            ffmpeg_next::software::scaling::Flags::BILINEAR,
        )?;

        Ok(FfmpegFrameIter {
            ictx,
            decoder,
            scaler,
            width,
            height,
            video_stream_index: self.video_stream_index,
            time_base,
            clock: FrameClock::new(fps),
            frame_index: 0,
            flushing: false,
            done: false,
        })
    }
}

impl Default for FfmpegReader {
    fn default() -> Self {
        Self::new()
    }
}

impl VideoReader for FfmpegReader {
    fn open(&mut self, path: &Path) -> Result<VideoMetadata, Box<dyn std::error::Error>> {
        ffmpeg_next::init()?;

        let ictx = ffmpeg_next::format::input(path)?;

        let stream = ictx
            .streams()
            .best(ffmpeg_next::media::Type::Video)
            .ok_or("No video stream found")?;

        let video_stream_index = stream.index();
        let codec_ctx = ffmpeg_next::codec::context::Context::from_parameters(stream.parameters())?;
        let decoder = codec_ctx.decoder().video()?;

        // Prefer the average rate; `rate()` is the container's guess and is
        // often a timebase multiple for variable-rate files.
        let fps = match rational_to_f64(stream.avg_frame_rate()) {
            f if f > 0.0 => f,
            _ => rational_to_f64(stream.rate()),
        };

        let metadata = VideoMetadata {
            width: decoder.width(),
            height: decoder.height(),
            fps,
            total_frames: stream.frames().max(0) as usize,
            codec: decoder
                .codec()
                .map(|c| c.name().to_string())
                .unwrap_or_default(),
            source_path: Some(path.to_path_buf()),
        };
        log::info!(
            "Opened {}: {}x{} @ {:.3} fps, {} frames ({})",
            path.display(),
            metadata.width,
            metadata.height,
            metadata.fps,
            metadata.total_frames,
            metadata.codec
        );

        self.video_stream_index = video_stream_index;
        self.metadata = Some(metadata.clone());
        self.input_ctx = Some(ictx);

        Ok(metadata)
    }

    fn frames(
        &mut self,
    ) -> Box<dyn Iterator<Item = Result<Frame, Box<dyn std::error::Error>>> + '_> {
        match self.decode() {
            Ok(iter) => Box::new(iter),
            Err(e) => Box::new(std::iter::once(Err(e))),
        }
    }

    fn close(&mut self) {
        self.input_ctx = None;
        self.metadata = None;
    }
}

/// Lazy iterator that decodes video frames one at a time, avoiding the need
/// to buffer the entire video in memory.
struct FfmpegFrameIter<'a> {
    ictx: &'a mut ffmpeg_next::format::context::Input,
    decoder: ffmpeg_next::decoder::Video,
    scaler: ffmpeg_next::software::scaling::Context,
    width: u32,
    height: u32,
    video_stream_index: usize,
    time_base: f64,
    clock: FrameClock,
    frame_index: usize,
    flushing: bool,
    done: bool,
}

impl FfmpegFrameIter<'_> {
    fn try_receive(&mut self) -> Option<Result<Frame, Box<dyn std::error::Error>>> {
        let mut decoded = ffmpeg_next::util::frame::video::Video::empty();
        self.decoder.receive_frame(&mut decoded).ok()?;

        let mut rgb_frame = ffmpeg_next::util::frame::video::Video::empty();
        if let Err(e) = self.scaler.run(&decoded, &mut rgb_frame) {
            return Some(Err(Box::new(e)));
        }

        let pts = decoded
            .timestamp()
            .or_else(|| decoded.pts())
            .map(|ticks| ticks as f64 * self.time_base);
        let timestamp = self.clock.stamp(self.frame_index, pts);

        let pixels = extract_rgb_pixels(&rgb_frame, self.width, self.height);
        let frame = Frame::new(pixels, self.width, self.height, 3, self.frame_index)
            .with_timestamp(timestamp);
        self.frame_index += 1;
        Some(Ok(frame))
    }
}

impl Iterator for FfmpegFrameIter<'_> {
    type Item = Result<Frame, Box<dyn std::error::Error>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        if let Some(result) = self.try_receive() {
            return Some(result);
        }

        if self.flushing {
            self.done = true;
            return None;
        }

        loop {
            let Some((stream, packet)) = self.ictx.packets().next() else {
                let _ = self.decoder.send_eof();
                self.flushing = true;
                if let Some(result) = self.try_receive() {
                    return Some(result);
                }
                self.done = true;
                return None;
            };

            if stream.index() != self.video_stream_index {
                continue;
            }

            if let Err(e) = self.decoder.send_packet(&packet) {
                log::debug!("Skipping undecodable packet: {e}");
                continue;
            }

            if let Some(result) = self.try_receive() {
                return Some(result);
            }
        }
    }
}

fn rational_to_f64(r: ffmpeg_next::Rational) -> f64 {
    if r.denominator() == 0 {
        0.0
    } else {
        r.numerator() as f64 / r.denominator() as f64
    }
}

/// Copies pixel data from an ffmpeg frame into a contiguous RGB buffer,
/// dropping the per-row padding (stride > width * 3).
fn extract_rgb_pixels(
    rgb_frame: &ffmpeg_next::util::frame::video::Video,
    width: u32,
    height: u32,
) -> Vec<u8> {
    let stride = rgb_frame.stride(0);
    let data = rgb_frame.data(0);
    let row_len = width as usize * 3;

    let mut pixels = Vec::with_capacity(row_len * height as usize);
    for row in 0..height as usize {
        let row_start = row * stride;
        pixels.extend_from_slice(&data[row_start..row_start + row_len]);
    }
    pixels
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::video::domain::video_writer::VideoWriter;
    use crate::video::infrastructure::ffmpeg_writer::FfmpegWriter;
    use approx::assert_relative_eq;
    use rstest::rstest;
    use std::path::PathBuf;

    /// Encodes `count` flat grey frames whose brightness steps per frame.
    fn write_clip(dir: &Path, count: usize, fps: f64) -> PathBuf {
        let path = dir.join("clip.mp4");
        let meta = VideoMetadata {
            width: 160,
            height: 120,
            fps,
            total_frames: count,
            codec: String::new(),
            source_path: None,
        };
        let mut writer = FfmpegWriter::new();
        writer.open(&path, &meta).unwrap();
        for i in 0..count {
            let value = ((i * 40) % 256) as u8;
            writer
                .write(
                    &Frame::new(vec![value; 160 * 120 * 3], 160, 120, 3, i)
                        .with_timestamp(i as f64 / fps),
                )
                .unwrap();
        }
        writer.close().unwrap();
        path
    }

    #[test]
    fn test_open_returns_metadata() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_clip(dir.path(), 5, 30.0);

        let mut reader = FfmpegReader::new();
        let meta = reader.open(&path).unwrap();
        assert_eq!(meta.canvas(), (160, 120));
        assert_relative_eq!(meta.fps, 30.0, epsilon = 0.01);
        assert_eq!(meta.source_path, Some(path));
    }

    #[test]
    fn test_open_nonexistent_raises() {
        let mut reader = FfmpegReader::new();
        assert!(reader.open(Path::new("/nonexistent/test.mp4")).is_err());
    }

    #[test]
    fn test_frames_yield_every_frame_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_clip(dir.path(), 5, 30.0);

        let mut reader = FfmpegReader::new();
        reader.open(&path).unwrap();

        let frames: Vec<Frame> = reader.frames().map(|f| f.unwrap()).collect();
        assert_eq!(frames.len(), 5);
        for (i, frame) in frames.iter().enumerate() {
            assert_eq!(frame.index(), i);
            assert_eq!(frame.channels(), 3);
            assert_eq!(frame.data().len(), 160 * 120 * 3);
        }
    }

    #[rstest]
    #[case::integer_rate(25.0)]
    #[case::ntsc_rate(30000.0 / 1001.0)]
    fn test_frame_timestamps_follow_frame_rate(#[case] fps: f64) {
        let dir = tempfile::tempdir().unwrap();
        let path = write_clip(dir.path(), 6, fps);

        let mut reader = FfmpegReader::new();
        reader.open(&path).unwrap();

        let stamps: Vec<f64> = reader.frames().map(|f| f.unwrap().timestamp()).collect();
        assert_relative_eq!(stamps[0], 0.0);
        for (i, t) in stamps.iter().enumerate() {
            assert_relative_eq!(*t, i as f64 / fps, epsilon = 1e-3);
        }
    }

    #[test]
    fn test_frames_without_open_returns_error() {
        let mut reader = FfmpegReader::new();
        let result = reader.frames().next().unwrap();
        assert!(result.is_err());
    }

    #[test]
    fn test_close_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_clip(dir.path(), 1, 30.0);

        let mut reader = FfmpegReader::new();
        reader.open(&path).unwrap();
        reader.close();
        reader.close();
        assert!(reader.frames().next().unwrap().is_err());
    }
}
