use std::collections::BTreeMap;
use std::time::Instant;

use crate::shared::constants::PROGRESS_LOG_INTERVAL;

/// Observer for a captioning pass.
///
/// The executor reports progress, per-frame stage timings and per-frame
/// metrics here, so callers can surface them however they like.
pub trait PipelineLogger: Send {
    fn progress(&mut self, current: usize, total: usize);

    /// Milliseconds one frame spent in `stage` (`caption`, `composite`).
    fn timing(&mut self, stage: &str, duration_ms: f64);

    /// One sample of a per-frame quantity, e.g. `caption_active` as 0 or 1.
    fn metric(&mut self, name: &str, value: f64);

    fn info(&mut self, message: &str);

    /// Called once after the pass finishes.
    fn summary(&self) {}
}

/// Discards everything.
pub struct NullPipelineLogger;

impl PipelineLogger for NullPipelineLogger {
    fn progress(&mut self, _current: usize, _total: usize) {}
    fn timing(&mut self, _stage: &str, _duration_ms: f64) {}
    fn metric(&mut self, _name: &str, _value: f64) {}
    fn info(&mut self, _message: &str) {}
}

/// Running count, sum and maximum of one stream of samples.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SampleStats {
    count: usize,
    total: f64,
    max: f64,
}

impl SampleStats {
    pub fn record(&mut self, value: f64) {
        self.max = if self.count == 0 {
            value
        } else {
            self.max.max(value)
        };
        self.count += 1;
        self.total += value;
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn total(&self) -> f64 {
        self.total
    }

    pub fn max(&self) -> f64 {
        self.max
    }

    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.total / self.count as f64
        }
    }
}

/// Sends progress through the `log` facade, at most once every
/// `every` frames, and aggregates samples for an end-of-pass report.
/// Memory stays flat however long the video is.
pub struct StdoutPipelineLogger {
    every: usize,
    timings: BTreeMap<String, SampleStats>,
    metrics: BTreeMap<String, SampleStats>,
    started: Instant,
    frames_total: usize,
    messages: Vec<String>,
}

impl StdoutPipelineLogger {
    pub fn new(every: usize) -> Self {
        Self {
            every: every.max(1),
            timings: BTreeMap::new(),
            metrics: BTreeMap::new(),
            started: Instant::now(),
            frames_total: 0,
            messages: Vec::new(),
        }
    }

    /// The end-of-pass report, or `None` before any sample arrives.
    pub fn summary_string(&self) -> Option<String> {
        if self.timings.is_empty() && self.metrics.is_empty() {
            return None;
        }

        let wall_ms = self.started.elapsed().as_secs_f64() * 1000.0;
        let mut report = vec![format!(
            "Captioned {} frames in {:.1}s",
            self.frames_total,
            wall_ms / 1000.0
        )];

        for (stage, stats) in &self.timings {
            let share = if wall_ms > 0.0 {
                stats.total() / wall_ms * 100.0
            } else {
                0.0
            };
            report.push(format!(
                "  {stage:<10} {:>5} frames  mean {:6.2}ms  max {:6.2}ms  ({share:4.1}% of wall)",
                stats.count(),
                stats.mean(),
                stats.max(),
            ));
        }

        for (name, stats) in &self.metrics {
            report.push(format!("  {name}: mean {:.2}", stats.mean()));
        }

        if self.frames_total > 0 && wall_ms > 0.0 {
            let fps = self.frames_total as f64 * 1000.0 / wall_ms;
            report.push(format!("  throughput {fps:.1} fps"));
        }

        Some(report.join("\n"))
    }

    pub fn timings_for(&self, stage: &str) -> Option<&SampleStats> {
        self.timings.get(stage)
    }

    pub fn metrics_for(&self, name: &str) -> Option<&SampleStats> {
        self.metrics.get(name)
    }
}

fn record(map: &mut BTreeMap<String, SampleStats>, key: &str, value: f64) {
    // Keys repeat every frame; only the first sample allocates.
    if let Some(stats) = map.get_mut(key) {
        stats.record(value);
    } else {
        let mut stats = SampleStats::default();
        stats.record(value);
        map.insert(key.to_owned(), stats);
    }
}

impl Default for StdoutPipelineLogger {
    fn default() -> Self {
        Self::new(PROGRESS_LOG_INTERVAL)
    }
}

impl PipelineLogger for StdoutPipelineLogger {
    fn progress(&mut self, current: usize, total: usize) {
        self.frames_total = total.max(current);
        if current % self.every == 0 || current == total {
            match total {
                0 => log::info!("Captioned {current} frames"),
                _ => log::info!(
                    "Captioned {current}/{total} frames ({:.1}%)",
                    current as f64 / total as f64 * 100.0
                ),
            }
        }
    }

    fn timing(&mut self, stage: &str, duration_ms: f64) {
        record(&mut self.timings, stage, duration_ms);
    }

    fn metric(&mut self, name: &str, value: f64) {
        record(&mut self.metrics, name, value);
    }

    fn info(&mut self, message: &str) {
        log::info!("{message}");
        self.messages.push(message.to_owned());
    }

    fn summary(&self) {
        if let Some(report) = self.summary_string() {
            log::info!("\n{report}");
        }
    }
}
