use crate::captioning::domain::word_timestamp::WordTimestamp;

use super::audio_segment::AudioSegment;

/// Domain interface for speech-to-text transcription.
///
/// Returns word-level timestamps grouped the way the engine segmented the
/// speech. Groups are in chronological order and may be empty.
pub trait SpeechRecognizer: Send {
    fn transcribe(
        &self,
        audio: &AudioSegment,
    ) -> Result<Vec<Vec<WordTimestamp>>, Box<dyn std::error::Error>>;
}
