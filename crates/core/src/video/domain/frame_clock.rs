/// Assigns presentation times to decoded frames.
///
/// Container timestamps are used when present. Missing ones fall back to
/// `index / fps`. The result is clamped so it never goes backwards, which
/// is what a caption cursor needs from its frame source.
#[derive(Debug, Clone)]
pub struct FrameClock {
    fps: f64,
    origin: Option<f64>,
    last: Option<f64>,
}

impl FrameClock {
    /// `fps` must be positive and finite.
    pub fn new(fps: f64) -> Self {
        debug_assert!(fps.is_finite() && fps > 0.0, "fps must be positive");
        Self {
            fps,
            origin: None,
            last: None,
        }
    }

    /// Time in seconds for frame `index`, given its container timestamp.
    ///
    /// Container times are shifted so the first one reads as zero; streams
    /// often start at a non-zero pts.
    pub fn stamp(&mut self, index: usize, pts_seconds: Option<f64>) -> f64 {
        let nominal = index as f64 / self.fps;
        let raw = match pts_seconds.filter(|t| t.is_finite()) {
            Some(t) => {
                let origin = *self.origin.get_or_insert(t);
                t - origin
            }
            None => nominal,
        };

        let t = match self.last {
            Some(previous) if raw < previous => {
                log::debug!("Frame {index}: timestamp {raw:.4}s behind {previous:.4}s, clamping");
                previous
            }
            _ => raw.max(0.0),
        };
        self.last = Some(t);
        t
    }

    pub fn last(&self) -> Option<f64> {
        self.last
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_missing_pts_uses_frame_index() {
        let mut clock = FrameClock::new(25.0);
        assert_relative_eq!(clock.stamp(0, None), 0.0);
        assert_relative_eq!(clock.stamp(1, None), 0.04);
        assert_relative_eq!(clock.stamp(50, None), 2.0);
    }

    #[test]
    fn test_pts_shifted_to_zero_origin() {
        let mut clock = FrameClock::new(30.0);
        assert_relative_eq!(clock.stamp(0, Some(1.5)), 0.0);
        assert_relative_eq!(clock.stamp(1, Some(1.6)), 0.1, epsilon = 1e-9);
    }

    #[test]
    fn test_backwards_pts_is_clamped() {
        let mut clock = FrameClock::new(30.0);
        clock.stamp(0, Some(0.0));
        assert_relative_eq!(clock.stamp(1, Some(0.5)), 0.5);
        assert_relative_eq!(clock.stamp(2, Some(0.3)), 0.5);
        assert_relative_eq!(clock.stamp(3, Some(0.6)), 0.6);
    }

    #[test]
    fn test_timestamps_never_decrease() {
        let mut clock = FrameClock::new(10.0);
        let pts = [Some(0.0), Some(0.2), None, Some(0.1), Some(f64::NAN), Some(0.9)];
        let stamps: Vec<f64> = pts
            .iter()
            .enumerate()
            .map(|(i, p)| clock.stamp(i, *p))
            .collect();
        assert!(stamps.windows(2).all(|w| w[0] <= w[1]), "{stamps:?}");
        assert_eq!(clock.last(), stamps.last().copied());
    }
}
