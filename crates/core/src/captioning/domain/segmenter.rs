use super::caption_error::CaptionError;
use super::caption_interval::CaptionInterval;
use super::word_timestamp::WordTimestamp;

/// Groups recognized words into fixed-size captions.
pub struct Segmenter;

impl Segmenter {
    /// Chunks `words` into captions of `limit` words each (the last chunk may
    /// be shorter). Order is preserved; the input is not sorted.
    pub fn segment(
        words: &[WordTimestamp],
        limit: usize,
    ) -> Result<Vec<CaptionInterval>, CaptionError> {
        Self::segment_groups(std::slice::from_ref(&words), limit)
    }

    /// Chunks each transcription group separately, so a caption never spans
    /// two groups. Empty groups contribute nothing.
    pub fn segment_groups<G>(groups: &[G], limit: usize) -> Result<Vec<CaptionInterval>, CaptionError>
    where
        G: AsRef<[WordTimestamp]>,
    {
        if limit == 0 {
            return Err(CaptionError::InvalidInput(
                "word limit must be a positive integer".to_string(),
            ));
        }

        let mut captions = Vec::new();
        for group in groups {
            let words = group.as_ref();
            if words.is_empty() {
                continue;
            }
            for chunk in words.chunks(limit) {
                if let Some(caption) = Self::caption_for(chunk) {
                    captions.push(caption);
                }
            }
        }
        Ok(captions)
    }

    fn caption_for(chunk: &[WordTimestamp]) -> Option<CaptionInterval> {
        let (first, last) = (chunk.first()?, chunk.last()?);
        let text = chunk
            .iter()
            .map(|w| w.text.trim())
            .collect::<Vec<_>>()
            .join(" ");
        let text = text.trim();
        if text.is_empty() {
            return None;
        }
        Some(CaptionInterval::new(first.start, last.end, text))
    }
}
