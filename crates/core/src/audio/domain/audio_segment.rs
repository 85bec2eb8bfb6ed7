/// A segment of decoded audio: interleaved PCM samples normalized to [-1.0, 1.0].
#[derive(Clone, Debug)]
pub struct AudioSegment {
    samples: Vec<f32>,
    sample_rate: u32,
    channels: u16,
}

impl AudioSegment {
    pub fn new(samples: Vec<f32>, sample_rate: u32, channels: u16) -> Self {
        Self {
            samples,
            sample_rate,
            channels,
        }
    }

    /// A segment with no samples, used when the source has no audio stream.
    pub fn silent(sample_rate: u32) -> Self {
        Self::new(Vec::new(), sample_rate, 1)
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn is_mono_at(&self, sample_rate: u32) -> bool {
        self.channels == 1 && self.sample_rate == sample_rate
    }

    /// Length in seconds.
    pub fn duration(&self) -> f64 {
        if self.sample_rate == 0 || self.channels == 0 {
            return 0.0;
        }
        self.samples.len() as f64 / (self.sample_rate as f64 * self.channels as f64)
    }
}
