use std::path::{Path, PathBuf};

use ffmpeg_next::Rational;

use crate::shared::frame::Frame;
use crate::shared::video_metadata::VideoMetadata;
use crate::video::domain::video_writer::VideoWriter;

/// Largest time base denominator the MPEG-4 part 2 encoder accepts.
const MPEG4_MAX_TIMEBASE_DEN: i32 = 65535;

/// Encodes video frames via ffmpeg-next with built-in audio muxing.
///
/// Each written frame is presented at its own timestamp, so variable
/// frame rate sources keep their timing. When the source has an audio
/// stream it is copied into the output packet-for-packet on close; a
/// failed copy fails the close.
pub struct FfmpegWriter {
    output_path: Option<PathBuf>,
    source_path: Option<PathBuf>,
    octx: Option<ffmpeg_next::format::context::Output>,
    encoder: Option<ffmpeg_next::codec::encoder::video::Encoder>,
    scaler: Option<ffmpeg_next::software::scaling::Context>,
    width: u32,
    height: u32,
    time_base: Rational,
    frame_count: usize,
    last_pts: Option<i64>,
    video_stream_index: usize,
}

// Safety: FfmpegWriter is only used from a single thread at a time.
// The raw pointers inside ffmpeg types are not shared across threads.
unsafe impl Send for FfmpegWriter {}

impl FfmpegWriter {
    pub fn new() -> Self {
        Self {
            output_path: None,
            source_path: None,
            octx: None,
            encoder: None,
            scaler: None,
            width: 0,
            height: 0,
            time_base: Rational(1, 30),
            frame_count: 0,
            last_pts: None,
            video_stream_index: 0,
        }
    }

    pub fn frames_written(&self) -> usize {
        self.frame_count
    }

    /// Drains every packet the encoder has ready into the container.
    fn drain_packets(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        let encoder = self.encoder.as_mut().ok_or("FfmpegWriter: not opened")?;
        let octx = self.octx.as_mut().ok_or("FfmpegWriter: not opened")?;
        let ost_time_base = octx
            .stream(self.video_stream_index)
            .ok_or("FfmpegWriter: output stream missing")?
            .time_base();

        let mut encoded = ffmpeg_next::Packet::empty();
        while encoder.receive_packet(&mut encoded).is_ok() {
            encoded.set_stream(self.video_stream_index);
            encoded.rescale_ts(self.time_base, ost_time_base);
            encoded.write_interleaved(octx)?;
        }
        Ok(())
    }

    /// Presentation time of `frame` in encoder ticks. Ticks never repeat or
    /// go backwards; a frame that would collide moves one tick later.
    fn pts_for(&mut self, frame: &Frame) -> i64 {
        let ticks = frame.timestamp() * self.time_base.denominator() as f64
            / self.time_base.numerator() as f64;
        let mut pts = ticks.round() as i64;
        if let Some(last) = self.last_pts {
            pts = pts.max(last + 1);
        }
        self.last_pts = Some(pts);
        pts
    }
}

impl Default for FfmpegWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl VideoWriter for FfmpegWriter {
    fn open(
        &mut self,
        path: &Path,
        metadata: &VideoMetadata,
    ) -> Result<(), Box<dyn std::error::Error>> {
        ffmpeg_next::init()?;

        let frame_rate = encoder_frame_rate(metadata.effective_fps());
        self.time_base = frame_rate.invert();
        self.width = metadata.width;
        self.height = metadata.height;
        self.output_path = Some(path.to_path_buf());
        self.source_path = metadata.source_path.clone();

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let mut octx = ffmpeg_next::format::output(path)?;

        let global_header = octx
            .format()
            .flags()
            .contains(ffmpeg_next::format::Flags::GLOBAL_HEADER);

        // MPEG-4 part 2 ships with every ffmpeg build.
        let codec = ffmpeg_next::encoder::find(ffmpeg_next::codec::Id::MPEG4)
            .ok_or("MPEG4 encoder not found")?;

        let mut ost = octx.add_stream(Some(codec))?;
        self.video_stream_index = ost.index();

        let mut encoder_ctx = ffmpeg_next::codec::context::Context::new_with_codec(codec)
            .encoder()
            .video()?;

        encoder_ctx.set_width(metadata.width);
        encoder_ctx.set_height(metadata.height);
        encoder_ctx.set_format(ffmpeg_next::format::Pixel::YUV420P);
        encoder_ctx.set_time_base(self.time_base);
        encoder_ctx.set_frame_rate(Some(frame_rate));

        if global_header {
            encoder_ctx.set_flags(ffmpeg_next::codec::Flags::GLOBAL_HEADER);
        }

        let encoder = encoder_ctx.open_with(ffmpeg_next::Dictionary::new())?;
        ost.set_parameters(&encoder);
        ost.set_time_base(self.time_base);
        ost.set_avg_frame_rate(frame_rate);

        octx.write_header()?;

        let scaler = ffmpeg_next::software::scaling::Context::get(
            ffmpeg_next::format::Pixel::RGB24,
            metadata.width,
            metadata.height,
            ffmpeg_next::format::Pixel::YUV420P,
            metadata.width,
            metadata.height,
            ffmpeg_next::software::scaling::Flags::BILINEAR,
        )?;

        log::debug!(
            "Encoding {}x{} at {}/{} fps to {}",
            metadata.width,
            metadata.height,
            frame_rate.numerator(),
            frame_rate.denominator(),
            path.display()
        );

        self.octx = Some(octx);
        self.encoder = Some(encoder);
        self.scaler = Some(scaler);
        self.frame_count = 0;
        self.last_pts = None;

        Ok(())
    }

    fn write(&mut self, frame: &Frame) -> Result<(), Box<dyn std::error::Error>> {
        let encoder = self.encoder.as_mut().ok_or("FfmpegWriter: not opened")?;
        let scaler = self.scaler.as_mut().ok_or("FfmpegWriter: not opened")?;

        if frame.channels() != 3 || frame.width() != self.width || frame.height() != self.height {
            return Err(format!(
                "Frame {} is {}x{}x{}, writer expects {}x{}x3",
                frame.index(),
                frame.width(),
                frame.height(),
                frame.channels(),
                self.width,
                self.height
            )
            .into());
        }

        let mut rgb_frame = ffmpeg_next::util::frame::video::Video::new(
            ffmpeg_next::format::Pixel::RGB24,
            self.width,
            self.height,
        );

        let stride = rgb_frame.stride(0);
        let row_len = self.width as usize * 3;
        let data = rgb_frame.data_mut(0);
        for (row, src) in frame.data().chunks_exact(row_len).enumerate() {
            let dst_start = row * stride;
            data[dst_start..dst_start + row_len].copy_from_slice(src);
        }

        let mut yuv_frame = ffmpeg_next::util::frame::video::Video::empty();
        scaler.run(&rgb_frame, &mut yuv_frame)?;
        let pts = self.pts_for(frame);
        yuv_frame.set_pts(Some(pts));

        encoder.send_frame(&yuv_frame)?;
        self.drain_packets()?;

        self.frame_count += 1;
        Ok(())
    }

    fn close(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        if let Some(encoder) = self.encoder.as_mut() {
            encoder.send_eof()?;
            self.drain_packets()?;
            if let Some(octx) = self.octx.as_mut() {
                octx.write_trailer()?;
            }
            log::debug!("Encoded {} frames", self.frame_count);
        }

        self.octx = None;
        self.encoder = None;
        self.scaler = None;

        if let (Some(source_path), Some(output_path)) =
            (self.source_path.take(), self.output_path.as_deref())
        {
            mux_audio(&source_path, output_path)
                .map_err(|e| format!("Copying audio from {} failed: {e}", source_path.display()))?;
        }
        self.output_path = None;

        Ok(())
    }

    fn abort(&mut self) {
        self.octx = None;
        self.encoder = None;
        self.scaler = None;
        self.source_path = None;

        let Some(output_path) = self.output_path.take() else {
            return;
        };
        for path in [output_path.clone(), mux_temp_path(&output_path)] {
            match std::fs::remove_file(&path) {
                Ok(()) => log::info!("Removed partial output {}", path.display()),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => log::warn!("Could not remove {}: {e}", path.display()),
            }
        }
    }
}

/// Frame rate as an exact rational the encoder accepts. Whole, NTSC
/// (x/1001) and centi-frame rates are kept exactly; anything else is
/// rounded to whole frames.
fn encoder_frame_rate(fps: f64) -> Rational {
    for den in [1, 1001, 100] {
        let num = (fps * den as f64).round();
        if num >= 1.0
            && num <= MPEG4_MAX_TIMEBASE_DEN as f64
            && (num / den as f64 - fps).abs() < 1e-6
        {
            return Rational(num as i32, den);
        }
    }
    Rational(fps.round().max(1.0) as i32, 1)
}

/// Copies the audio streams of `source` into `video_output` by remuxing.
///
/// Writes a sibling temp file with both video and audio, then replaces the
/// original output. Does nothing if the source has no audio stream.
fn mux_audio(source: &Path, video_output: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let mut ictx_source = ffmpeg_next::format::input(source)?;
    if ictx_source
        .streams()
        .best(ffmpeg_next::media::Type::Audio)
        .is_none()
    {
        log::debug!("{} has no audio stream", source.display());
        return Ok(());
    }
    let mut ictx_video = ffmpeg_next::format::input(video_output)?;

    let temp_path = mux_temp_path(video_output);

    let mut octx = ffmpeg_next::format::output(&temp_path)?;

    let video_map = map_streams(&ictx_video, &mut octx, ffmpeg_next::media::Type::Video, 0)?;
    let next_index = video_map.iter().flatten().count();
    let audio_map = map_streams(
        &ictx_source,
        &mut octx,
        ffmpeg_next::media::Type::Audio,
        next_index,
    )?;

    octx.write_header()?;
    copy_packets(&mut ictx_video, &mut octx, &video_map)?;
    copy_packets(&mut ictx_source, &mut octx, &audio_map)?;
    octx.write_trailer()?;
    drop(octx);

    std::fs::rename(&temp_path, video_output)?;
    log::info!("Copied audio from {}", source.display());
    Ok(())
}

/// Sibling file the remux is written to before replacing the output.
fn mux_temp_path(video_output: &Path) -> PathBuf {
    let ext = video_output
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("mp4");
    video_output.with_extension(format!("mux.{ext}"))
}

/// Adds a stream-copy output for every input stream of `medium`, returning
/// the input→output index map.
fn map_streams(
    ictx: &ffmpeg_next::format::context::Input,
    octx: &mut ffmpeg_next::format::context::Output,
    medium: ffmpeg_next::media::Type,
    first_index: usize,
) -> Result<Vec<Option<usize>>, Box<dyn std::error::Error>> {
    let mut map = vec![None; ictx.nb_streams() as usize];
    let mut next = first_index;
    for (idx, stream) in ictx.streams().enumerate() {
        if stream.parameters().medium() != medium {
            continue;
        }
        let mut ost = octx.add_stream(ffmpeg_next::encoder::find(ffmpeg_next::codec::Id::None))?;
        ost.set_parameters(stream.parameters());
        // Let the muxer pick a tag valid for the output container.
        unsafe {
            (*ost.parameters().as_mut_ptr()).codec_tag = 0;
        }
        map[idx] = Some(next);
        next += 1;
    }
    Ok(map)
}

fn copy_packets(
    ictx: &mut ffmpeg_next::format::context::Input,
    octx: &mut ffmpeg_next::format::context::Output,
    map: &[Option<usize>],
) -> Result<(), Box<dyn std::error::Error>> {
    let time_bases: Vec<Rational> = ictx.streams().map(|s| s.time_base()).collect();
    for (stream, mut packet) in ictx.packets() {
        let ist_idx = stream.index();
        let Some(ost_idx) = map.get(ist_idx).copied().flatten() else {
            continue;
        };
        let ost_time_base = octx
            .stream(ost_idx)
            .ok_or("Remux output stream missing")?
            .time_base();
        packet.rescale_ts(time_bases[ist_idx], ost_time_base);
        packet.set_position(-1);
        packet.set_stream(ost_idx);
        packet.write_interleaved(octx)?;
    }
    Ok(())
}
