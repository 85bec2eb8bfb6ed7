use std::path::{Path, PathBuf};

use whisper_rs::{FullParams, SamplingStrategy, WhisperContext, WhisperContextParameters};

use crate::audio::domain::audio_segment::AudioSegment;
use crate::audio::domain::speech_recognizer::SpeechRecognizer;
use crate::captioning::domain::word_timestamp::WordTimestamp;
use crate::shared::constants::WHISPER_SAMPLE_RATE;

/// Speech recognizer using whisper.cpp via whisper-rs.
///
/// Produces one word group per whisper segment. Sub-word tokens are merged
/// into whole words before they leave the adapter.
#[derive(Debug)]
pub struct WhisperRecognizer {
    model_path: PathBuf,
    language: Option<String>,
}

impl WhisperRecognizer {
    /// `language` is an ISO code such as `"en"`; `None` auto-detects.
    pub fn new(
        model_path: &Path,
        language: Option<String>,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        if !model_path.exists() {
            return Err(format!("Whisper model not found at: {}", model_path.display()).into());
        }
        Ok(Self {
            model_path: model_path.to_path_buf(),
            language,
        })
    }

    pub fn model_path(&self) -> &Path {
        &self.model_path
    }

    pub fn language(&self) -> Option<&str> {
        self.language.as_deref()
    }
}

impl SpeechRecognizer for WhisperRecognizer {
    fn transcribe(
        &self,
        audio: &AudioSegment,
    ) -> Result<Vec<Vec<WordTimestamp>>, Box<dyn std::error::Error>> {
        if !audio.is_mono_at(WHISPER_SAMPLE_RATE) {
            return Err(format!(
                "Whisper expects {WHISPER_SAMPLE_RATE} Hz mono audio, got {} Hz x{}",
                audio.sample_rate(),
                audio.channels()
            )
            .into());
        }
        if audio.is_empty() {
            log::info!("No audio samples to transcribe");
            return Ok(Vec::new());
        }

        let ctx = WhisperContext::new_with_params(
            self.model_path.to_str().ok_or("Invalid model path")?,
            WhisperContextParameters::default(),
        )
        .map_err(|e| format!("Failed to load Whisper model: {e}"))?;

        let mut state = ctx
            .create_state()
            .map_err(|e| format!("Failed to create Whisper state: {e}"))?;

        let mut params = FullParams::new(SamplingStrategy::Greedy { best_of: 1 });
        params.set_language(Some(self.language.as_deref().unwrap_or("auto")));
        params.set_translate(false);
        params.set_token_timestamps(true);
        params.set_print_special(false);
        params.set_print_progress(false);
        params.set_print_realtime(false);
        params.set_print_timestamps(false);
        params.set_n_threads(num_cpus().min(4) as i32);

        log::info!(
            "Transcribing {:.1}s of audio with {}",
            audio.duration(),
            self.model_path.display()
        );
        state
            .full(params, audio.samples())
            .map_err(|e| format!("Whisper inference failed: {e}"))?;

        let mut groups = Vec::new();
        for seg_idx in 0..state.full_n_segments() {
            let Some(segment) = state.get_segment(seg_idx) else {
                continue;
            };

            let mut tokens = Vec::new();
            for tok_idx in 0..segment.n_tokens() {
                let Some(token) = segment.get_token(tok_idx) else {
                    continue;
                };
                // A multi-byte character can be split across tokens, so
                // text stays raw until a whole word has been collected.
                let bytes = match token.to_bytes() {
                    Ok(bytes) => bytes,
                    Err(e) => {
                        log::debug!("Skipping token {tok_idx} of segment {seg_idx}: {e}");
                        continue;
                    }
                };
                let data = token.token_data();
                // Token timestamps are in centiseconds.
                tokens.push(RawToken {
                    bytes: bytes.to_vec(),
                    start: data.t0 as f64 / 100.0,
                    end: data.t1 as f64 / 100.0,
                });
            }
            groups.push(merge_tokens(&tokens));
        }

        log::info!(
            "Transcribed {} words in {} segments",
            groups.iter().map(Vec::len).sum::<usize>(),
            groups.len()
        );
        Ok(groups)
    }
}

/// One whisper token with its timing in seconds. `bytes` may hold only
/// part of a UTF-8 character.
#[derive(Debug, Clone, PartialEq)]
struct RawToken {
    bytes: Vec<u8>,
    start: f64,
    end: f64,
}

/// Bracketed control tokens such as `[_BEG_]` or `<|endoftext|>`.
fn is_special(text: &str) -> bool {
    let trimmed = text.trim();
    trimmed.starts_with("[_") || trimmed.starts_with("<|")
}

/// Joins sub-word tokens into words. A token that begins with whitespace
/// starts a new word; any other token continues the current one. Bytes are
/// decoded once per word.
fn merge_tokens(tokens: &[RawToken]) -> Vec<WordTimestamp> {
    let mut words = Vec::new();
    let mut current: Option<(Vec<u8>, f64, f64)> = None;

    for token in tokens {
        if token.bytes.is_empty() || is_special(&String::from_utf8_lossy(&token.bytes)) {
            continue;
        }
        let starts_word = token.bytes[0].is_ascii_whitespace();
        match current.as_mut() {
            Some((bytes, _, end)) if !starts_word => {
                bytes.extend_from_slice(&token.bytes);
                *end = end.max(token.end);
            }
            _ => {
                if let Some(done) = current.take() {
                    push_word(&mut words, done);
                }
                current = Some((token.bytes.clone(), token.start, token.end));
            }
        }
    }
    if let Some(done) = current {
        push_word(&mut words, done);
    }
    words
}

fn push_word(words: &mut Vec<WordTimestamp>, (bytes, start, end): (Vec<u8>, f64, f64)) {
    let text = String::from_utf8_lossy(&bytes);
    let text = text.trim();
    if text.is_empty() {
        return;
    }
    words.push(WordTimestamp::new(text, start, end.max(start)));
}

fn num_cpus() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rstest::rstest;

    fn tok(text: &str, start: f64, end: f64) -> RawToken {
        raw(text.as_bytes(), start, end)
    }

    fn raw(bytes: &[u8], start: f64, end: f64) -> RawToken {
        RawToken {
            bytes: bytes.to_vec(),
            start,
            end,
        }
    }

    fn texts(words: &[WordTimestamp]) -> Vec<&str> {
        words.iter().map(|w| w.text.as_str()).collect()
    }

    #[test]
    fn test_new_nonexistent_path_returns_error() {
        let result = WhisperRecognizer::new(Path::new("/nonexistent/model.bin"), None);
        let err = result.unwrap_err().to_string();
        assert!(err.contains("not found"), "unexpected error: {err}");
    }

    #[test]
    fn test_rejects_audio_at_wrong_rate() {
        let dir = tempfile::tempdir().unwrap();
        let model = dir.path().join("model.bin");
        std::fs::write(&model, b"not a model").unwrap();
        let recognizer = WhisperRecognizer::new(&model, Some("en".into())).unwrap();
        assert_eq!(recognizer.language(), Some("en"));

        let audio = AudioSegment::new(vec![0.0; 100], 44100, 2);
        let err = recognizer.transcribe(&audio).unwrap_err().to_string();
        assert!(err.contains("16000"), "unexpected error: {err}");
    }

    #[test]
    fn test_empty_audio_gives_no_groups_without_loading_model() {
        let dir = tempfile::tempdir().unwrap();
        let model = dir.path().join("model.bin");
        std::fs::write(&model, b"not a model").unwrap();
        let recognizer = WhisperRecognizer::new(&model, None).unwrap();

        let groups = recognizer
            .transcribe(&AudioSegment::silent(WHISPER_SAMPLE_RATE))
            .unwrap();
        assert!(groups.is_empty());
    }

    #[rstest]
    #[case::begin("[_BEG_]", true)]
    #[case::timestamp("[_TT_150]", true)]
    #[case::end_of_text("<|endoftext|>", true)]
    #[case::word(" hello", false)]
    #[case::bracketed_speech(" [music]", false)]
    fn test_is_special(#[case] text: &str, #[case] expected: bool) {
        assert_eq!(is_special(text), expected);
    }

    #[test]
    fn test_merge_joins_subword_tokens() {
        let words = merge_tokens(&[
            tok(" Cap", 0.0, 0.2),
            tok("tion", 0.2, 0.4),
            tok("ing", 0.4, 0.5),
            tok(" works", 0.6, 1.0),
            tok(".", 1.0, 1.05),
        ]);
        assert_eq!(texts(&words), vec!["Captioning", "works."]);
        assert_relative_eq!(words[0].start, 0.0);
        assert_relative_eq!(words[0].end, 0.5);
        assert_relative_eq!(words[1].start, 0.6);
        assert_relative_eq!(words[1].end, 1.05);
    }

    #[test]
    fn test_merge_skips_special_tokens() {
        let words = merge_tokens(&[
            tok("[_BEG_]", 0.0, 0.0),
            tok(" Hi", 0.1, 0.3),
            tok("[_TT_30]", 0.3, 0.3),
            tok(" there", 0.4, 0.7),
            tok("<|endoftext|>", 0.7, 0.7),
        ]);
        assert_eq!(texts(&words), vec!["Hi", "there"]);
    }

    #[test]
    fn test_first_token_without_space_starts_word() {
        let words = merge_tokens(&[tok("Hello", 0.0, 0.4), tok(" world", 0.5, 0.9)]);
        assert_eq!(texts(&words), vec!["Hello", "world"]);
    }

    #[test]
    fn test_whitespace_only_tokens_are_dropped() {
        let words = merge_tokens(&[tok(" ", 0.0, 0.1), tok(" ok", 0.2, 0.4)]);
        assert_eq!(texts(&words), vec!["ok"]);
    }

    #[test]
    fn test_backwards_token_time_is_clamped() {
        let words = merge_tokens(&[tok(" odd", 1.0, 0.8)]);
        assert_relative_eq!(words[0].start, 1.0);
        assert_relative_eq!(words[0].end, 1.0);
    }

    #[test]
    fn test_character_split_across_tokens_is_reassembled() {
        // "é" is 0xC3 0xA9; whisper may emit each byte as its own token.
        let words = merge_tokens(&[
            tok(" caf", 0.0, 0.3),
            raw(&[0xC3], 0.3, 0.35),
            raw(&[0xA9], 0.35, 0.4),
            tok(" ol", 0.5, 0.7),
            raw("é".as_bytes(), 0.7, 0.9),
        ]);
        assert_eq!(texts(&words), vec!["café", "olé"]);
        assert_relative_eq!(words[0].end, 0.4);
    }

    #[test]
    fn test_no_tokens_gives_no_words() {
        assert!(merge_tokens(&[]).is_empty());
    }

    #[test]
    #[ignore] // Requires whisper model file
    fn test_transcribe_does_not_crash_on_sine_wave() {
        let model_path = crate::shared::model_resolver::resolve(
            crate::shared::constants::WHISPER_MODEL_NAME,
            crate::shared::constants::WHISPER_MODEL_URL,
            None,
        )
        .expect("Failed to resolve whisper model");
        let recognizer = WhisperRecognizer::new(&model_path, None).unwrap();

        let len = 3 * WHISPER_SAMPLE_RATE as usize;
        let samples: Vec<f32> = (0..len)
            .map(|i| {
                let t = i as f64 / WHISPER_SAMPLE_RATE as f64;
                (2.0 * std::f64::consts::PI * 440.0 * t).sin() as f32
            })
            .collect();
        let audio = AudioSegment::new(samples, WHISPER_SAMPLE_RATE, 1);

        let result = recognizer.transcribe(&audio);
        assert!(result.is_ok(), "Transcription should not error: {result:?}");
    }
}
