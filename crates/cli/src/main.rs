use std::path::{Path, PathBuf};
use std::process;

use clap::Parser;

use captionburn_core::audio::infrastructure::whisper_recognizer::WhisperRecognizer;
use captionburn_core::captioning::domain::caption_interval::CaptionTimeline;
use captionburn_core::captioning::domain::caption_settings::{
    CaptionSettings, DEFAULT_HOLD_SECONDS, DEFAULT_WORD_LIMIT,
};
use captionburn_core::captioning::infrastructure::jsonl_caption_store::JsonlCaptionStore;
use captionburn_core::pipeline::build_timeline_use_case::{load_timeline, BuildTimelineUseCase};
use captionburn_core::pipeline::burn_captions_use_case::BurnCaptionsUseCase;
use captionburn_core::pipeline::frame_captioner::FrameCaptioner;
use captionburn_core::pipeline::infrastructure::threaded_pipeline_executor::ThreadedPipelineExecutor;
use captionburn_core::pipeline::pipeline_logger::StdoutPipelineLogger;
use captionburn_core::rendering::domain::style::{
    Anchor, OutlineStyle, Rgb, StyleConfig, DEFAULT_FONT_SIZE,
};
use captionburn_core::rendering::infrastructure::fontdue_rasterizer::FontdueRasterizer;
use captionburn_core::shared::constants::{WHISPER_MODEL_NAME, WHISPER_MODEL_URL};
use captionburn_core::shared::model_resolver;
use captionburn_core::shared::video_metadata::VideoMetadata;
use captionburn_core::video::domain::video_reader::VideoReader;
use captionburn_core::video::infrastructure::ffmpeg_audio_reader::FfmpegAudioReader;
use captionburn_core::video::infrastructure::ffmpeg_reader::FfmpegReader;
use captionburn_core::video::infrastructure::ffmpeg_writer::FfmpegWriter;

/// Burn word-timed captions into a video.
#[derive(Parser)]
#[command(name = "captionburn")]
struct Cli {
    /// Input video file.
    input: PathBuf,

    /// Output video file (omit to only export captions).
    output: Option<PathBuf>,

    /// Maximum words shown together in one caption.
    #[arg(long, default_value_t = DEFAULT_WORD_LIMIT)]
    word_limit: usize,

    /// TrueType/OpenType font file (required when rendering).
    #[arg(long)]
    font: Option<PathBuf>,

    /// Font size in pixels.
    #[arg(long, default_value_t = DEFAULT_FONT_SIZE)]
    font_size: u32,

    /// Caption fill colour as RRGGBB.
    #[arg(long, default_value = "ffff00")]
    text_color: Rgb,

    /// Horizontal caption centre in pixels (default: frame centre).
    #[arg(long, allow_negative_numbers = true)]
    anchor_x: Option<i32>,

    /// Vertical caption centre in pixels (default: frame centre).
    #[arg(long, allow_negative_numbers = true)]
    anchor_y: Option<i32>,

    /// Outline colour as RRGGBB.
    #[arg(long, default_value = "000000")]
    outline_color: Rgb,

    /// Outline thickness in pixels (0 = no outline).
    #[arg(long, default_value = "0")]
    outline_radius: u32,

    /// Seconds a caption lingers after its last word.
    #[arg(long, default_value_t = DEFAULT_HOLD_SECONDS)]
    hold: f64,

    /// Write the caption timeline to this JSON-lines file.
    #[arg(long)]
    captions_out: Option<PathBuf>,

    /// Read captions from this JSON-lines file instead of transcribing.
    #[arg(long, conflicts_with_all = ["whisper_model", "language"])]
    captions_in: Option<PathBuf>,

    /// Whisper ggml model file (downloaded to the cache dir if omitted).
    #[arg(long)]
    whisper_model: Option<PathBuf>,

    /// Spoken language code, e.g. "en" (auto-detected if omitted).
    #[arg(long)]
    language: Option<String>,
}

fn main() {
    env_logger::init();

    if let Err(e) = run() {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    validate(&cli)?;
    let settings = CaptionSettings::new(cli.word_limit, cli.hold)?;

    let mut reader: Box<dyn VideoReader> = Box::new(FfmpegReader::new());
    let metadata = reader.open(&cli.input)?;

    // Style errors surface before the slow transcription step.
    let style = render_style(&cli, &metadata)?;

    let timeline = build_timeline(&cli, settings)?;

    let (Some(output), Some(font), Some(style)) = (&cli.output, &cli.font, style) else {
        log::info!("No output requested; captions built only");
        return Ok(());
    };

    let rasterizer = FontdueRasterizer::from_file(font)?;
    let captioner = FrameCaptioner::new(timeline, Box::new(rasterizer), style)?;
    run_burn(reader, captioner, &metadata, output)
}

fn build_timeline(
    cli: &Cli,
    settings: CaptionSettings,
) -> Result<CaptionTimeline, Box<dyn std::error::Error>> {
    if let Some(captions_in) = &cli.captions_in {
        let timeline = load_timeline(captions_in, &settings)?;
        if let Some(captions_out) = &cli.captions_out {
            JsonlCaptionStore::save(captions_out, timeline.intervals())?;
        }
        return Ok(timeline);
    }

    let model_path = resolve_whisper_model(cli)?;
    let recognizer = WhisperRecognizer::new(&model_path, cli.language.clone())?;
    let use_case = BuildTimelineUseCase::new(
        Box::new(FfmpegAudioReader),
        Box::new(recognizer),
        settings,
    );
    use_case.run(&cli.input, cli.captions_out.as_deref())
}

fn resolve_whisper_model(cli: &Cli) -> Result<PathBuf, Box<dyn std::error::Error>> {
    if let Some(path) = &cli.whisper_model {
        return Ok(path.clone());
    }
    log::info!("Resolving model: {WHISPER_MODEL_NAME}");
    let path = model_resolver::resolve(
        WHISPER_MODEL_NAME,
        WHISPER_MODEL_URL,
        Some(Box::new(download_progress)),
    )?;
    eprintln!();
    Ok(path)
}

/// The validated caption style, or `None` when no video is rendered.
fn render_style(cli: &Cli, metadata: &VideoMetadata) -> Result<Option<StyleConfig>, String> {
    if cli.output.is_none() {
        return Ok(None);
    }
    let style = build_style(cli, metadata);
    style
        .validate()
        .map_err(|e| format!("Invalid caption style: {e}"))?;
    Ok(Some(style))
}

fn build_style(cli: &Cli, metadata: &VideoMetadata) -> StyleConfig {
    let centre = Anchor::frame_center(metadata.width, metadata.height);
    StyleConfig {
        color: cli.text_color,
        font_size: cli.font_size,
        anchor: Anchor::new(
            cli.anchor_x.unwrap_or(centre.x),
            cli.anchor_y.unwrap_or(centre.y),
        ),
        outline: OutlineStyle::new(cli.outline_color, cli.outline_radius),
    }
}

fn run_burn(
    reader: Box<dyn VideoReader>,
    captioner: FrameCaptioner,
    metadata: &VideoMetadata,
    output: &Path,
) -> Result<(), Box<dyn std::error::Error>> {
    let total = metadata.total_frames;
    let progress: Box<dyn Fn(usize, usize) -> bool + Send> = Box::new(move |current, _| {
        eprint!("\rCaptioning frame {current}/{total}");
        true
    });

    let mut use_case = BurnCaptionsUseCase::new(
        reader,
        Box::new(FfmpegWriter::new()),
        captioner,
        Box::new(ThreadedPipelineExecutor::new()),
    )
    .with_progress(progress)
    .with_logger(Box::new(StdoutPipelineLogger::default()));
    use_case.execute(metadata, output)?;
    eprintln!();
    log::info!("Output written to {}", output.display());
    Ok(())
}

fn validate(cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    if !cli.input.exists() {
        return Err(format!("Input file not found: {}", cli.input.display()).into());
    }
    if cli.output.is_some() && cli.font.is_none() {
        return Err("--font is required when writing an output video".into());
    }
    if cli.output.is_none() && cli.captions_out.is_none() {
        return Err("Nothing to do: give an output video or --captions-out".into());
    }
    if let Some(font) = &cli.font {
        if !font.exists() {
            return Err(format!("Font file not found: {}", font.display()).into());
        }
    }
    if let Some(captions_in) = &cli.captions_in {
        if !captions_in.exists() {
            return Err(format!("Captions file not found: {}", captions_in.display()).into());
        }
    }
    if let Some(model) = &cli.whisper_model {
        if !model.exists() {
            return Err(format!("Whisper model not found: {}", model.display()).into());
        }
    }
    Ok(())
}

fn download_progress(downloaded: u64, total: u64) {
    if total > 0 {
        let pct = (downloaded as f64 / total as f64 * 100.0) as u32;
        eprint!("\rDownloading speech model... {pct}%");
    } else {
        eprint!("\rDownloading speech model... {downloaded} bytes");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metadata() -> VideoMetadata {
        VideoMetadata {
            width: 640,
            height: 360,
            fps: 25.0,
            total_frames: 0,
            codec: String::new(),
            source_path: None,
        }
    }

    fn parse(extra: &[&str]) -> Cli {
        let mut args = vec!["captionburn", "in.mp4"];
        args.extend_from_slice(extra);
        Cli::try_parse_from(args).unwrap()
    }

    #[test]
    fn test_default_style_is_centred() {
        let style = render_style(&parse(&["out.mp4"]), &metadata())
            .unwrap()
            .unwrap();
        assert_eq!(style.anchor, Anchor::new(320, 180));
        assert_eq!(style.font_size, DEFAULT_FONT_SIZE);
        assert!(!style.outline.enabled);
    }

    #[test]
    fn test_oversized_outline_is_rejected() {
        let cli = parse(&["out.mp4", "--outline-radius", "4000000000"]);
        let err = render_style(&cli, &metadata()).unwrap_err();
        assert!(err.contains("outline radius"), "unexpected error: {err}");
    }

    #[test]
    fn test_oversized_font_is_rejected() {
        let cli = parse(&["out.mp4", "--font-size", "100000"]);
        assert!(render_style(&cli, &metadata()).is_err());
    }

    #[test]
    fn test_zero_font_is_rejected() {
        let cli = parse(&["out.mp4", "--font-size", "0"]);
        assert!(render_style(&cli, &metadata()).is_err());
    }

    #[test]
    fn test_caption_export_skips_style() {
        let cli = parse(&["--captions-out", "c.jsonl", "--font-size", "0"]);
        assert_eq!(render_style(&cli, &metadata()), Ok(None));
    }
}
