use std::path::Path;

use crate::audio::domain::speech_recognizer::SpeechRecognizer;
use crate::captioning::domain::caption_interval::CaptionTimeline;
use crate::captioning::domain::caption_settings::CaptionSettings;
use crate::captioning::domain::interval_adjuster::IntervalAdjuster;
use crate::captioning::domain::segmenter::Segmenter;
use crate::captioning::infrastructure::jsonl_caption_store::JsonlCaptionStore;
use crate::shared::constants::WHISPER_SAMPLE_RATE;
use crate::video::domain::audio_reader::AudioReader;

/// Turns a video's speech into an ordered caption timeline:
/// decode audio → transcribe → segment → extend holds.
///
/// The adjusted timeline can be exported to the JSON-lines interchange
/// file so later renders can skip transcription.
pub struct BuildTimelineUseCase {
    reader: Box<dyn AudioReader>,
    recognizer: Box<dyn SpeechRecognizer>,
    settings: CaptionSettings,
}

impl BuildTimelineUseCase {
    pub fn new(
        reader: Box<dyn AudioReader>,
        recognizer: Box<dyn SpeechRecognizer>,
        settings: CaptionSettings,
    ) -> Self {
        Self {
            reader,
            recognizer,
            settings,
        }
    }

    pub fn run(
        &self,
        source_path: &Path,
        export_path: Option<&Path>,
    ) -> Result<CaptionTimeline, Box<dyn std::error::Error>> {
        // Bad settings fail before any decoding starts.
        self.settings.validate()?;

        let timeline = match self.reader.read_audio(source_path, WHISPER_SAMPLE_RATE)? {
            Some(audio) => {
                let groups = self.recognizer.transcribe(&audio)?;
                let intervals = Segmenter::segment_groups(&groups, self.settings.word_limit)?;
                IntervalAdjuster::extend_holds(&intervals, self.settings.hold)?
            }
            None => {
                log::warn!(
                    "{} has no audio track; output will have no captions",
                    source_path.display()
                );
                CaptionTimeline::default()
            }
        };
        log::info!("Built {} captions", timeline.len());

        if let Some(path) = export_path {
            JsonlCaptionStore::save(path, timeline.intervals())?;
            log::info!("Wrote captions to {}", path.display());
        }

        Ok(timeline)
    }
}

/// Loads a previously exported timeline and applies `settings.hold` on top.
///
/// A hold of zero reproduces the file exactly.
pub fn load_timeline(
    path: &Path,
    settings: &CaptionSettings,
) -> Result<CaptionTimeline, Box<dyn std::error::Error>> {
    settings.validate()?;
    let intervals = JsonlCaptionStore::load(path)?;
    let timeline = CaptionTimeline::new(intervals)?;
    let timeline = if settings.hold > 0.0 {
        IntervalAdjuster::extend_holds(timeline.intervals(), settings.hold)?
    } else {
        timeline
    };
    log::info!("Loaded {} captions from {}", timeline.len(), path.display());
    Ok(timeline)
}
