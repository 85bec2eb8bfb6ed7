use std::path::Path;

use ffmpeg_next::software::resampling;
use ffmpeg_next::util::frame::audio::Audio;

use crate::audio::domain::audio_segment::AudioSegment;
use crate::video::domain::audio_reader::AudioReader;

/// Decodes and resamples the audio track of a video file using ffmpeg-next.
///
/// Output is mono f32 at the requested rate, the shape speech recognizers
/// expect.
pub struct FfmpegAudioReader;

impl AudioReader for FfmpegAudioReader {
    fn read_audio(
        &self,
        path: &Path,
        target_sample_rate: u32,
    ) -> Result<Option<AudioSegment>, Box<dyn std::error::Error>> {
        ffmpeg_next::init()?;

        let mut ictx = ffmpeg_next::format::input(path)?;

        let Some(audio_stream) = ictx.streams().best(ffmpeg_next::media::Type::Audio) else {
            log::info!("{} has no audio track", path.display());
            return Ok(None);
        };
        let audio_stream_index = audio_stream.index();

        let codec_ctx =
            ffmpeg_next::codec::context::Context::from_parameters(audio_stream.parameters())?;
        let mut decoder = codec_ctx.decoder().audio()?;

        let mut resampler = resampling::Context::get(
            decoder.format(),
            decoder.channel_layout(),
            decoder.rate(),
            ffmpeg_next::format::Sample::F32(ffmpeg_next::format::sample::Type::Planar),
            ffmpeg_next::ChannelLayout::MONO,
            target_sample_rate,
        )?;
        log::debug!(
            "Resampling audio from {} Hz x{} to {target_sample_rate} Hz mono",
            decoder.rate(),
            decoder.channels()
        );

        let mut samples: Vec<f32> = Vec::new();
        let mut decoded = Audio::empty();
        let mut resampled = Audio::empty();

        for (stream, packet) in ictx.packets() {
            if stream.index() != audio_stream_index {
                continue;
            }
            decoder.send_packet(&packet)?;
            while decoder.receive_frame(&mut decoded).is_ok() {
                resampler.run(&decoded, &mut resampled)?;
                extract_f32_samples(&resampled, &mut samples);
            }
        }

        decoder.send_eof()?;
        while decoder.receive_frame(&mut decoded).is_ok() {
            resampler.run(&decoded, &mut resampled)?;
            extract_f32_samples(&resampled, &mut samples);
        }

        // The resampler keeps a tail of buffered samples until flushed.
        while let Ok(Some(delay)) = resampler.flush(&mut resampled) {
            if delay.output == 0 {
                break;
            }
            extract_f32_samples(&resampled, &mut samples);
        }

        let segment = AudioSegment::new(samples, target_sample_rate, 1);
        log::info!("Decoded {:.1}s of audio", segment.duration());
        Ok(Some(segment))
    }
}

/// Appends the samples of a planar mono f32 frame to `out`.
fn extract_f32_samples(frame: &Audio, out: &mut Vec<f32>) {
    let count = frame.samples();
    if count == 0 {
        return;
    }
    out.extend_from_slice(&frame.plane::<f32>(0)[..count]);
}
