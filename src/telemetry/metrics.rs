//! Decode timing and counters
//!
//! Rolling statistics over the time spent in each playback tick, plus
//! totals for decoded frames, skipped packets, and seeks.

use std::collections::VecDeque;
use std::time::Duration;

/// Decode timing statistics
#[derive(Debug, Clone, Default)]
pub struct DecodeStats {
    /// Average decode time in milliseconds
    pub avg_ms: f64,
    /// Minimum decode time in milliseconds
    pub min_ms: f64,
    /// Maximum decode time in milliseconds
    pub max_ms: f64,
    /// 50th percentile (median) decode time
    pub p50_ms: f64,
    /// 95th percentile decode time
    pub p95_ms: f64,
    /// 99th percentile decode time
    pub p99_ms: f64,
    /// Number of samples in the statistics
    pub sample_count: usize,
}

/// Collects per-frame decode durations and pipeline counters
#[derive(Debug, Clone)]
pub struct DecodeProfiler {
    decode_times: VecDeque<Duration>,
    /// Maximum samples to keep (10 seconds at 30fps)
    max_samples: usize,
    frames_decoded: u64,
    packets_skipped: u64,
    seeks: u64,
}

impl Default for DecodeProfiler {
    fn default() -> Self {
        Self::new()
    }
}

impl DecodeProfiler {
    pub fn new() -> Self {
        Self::with_capacity(300)
    }

    pub fn with_capacity(max_samples: usize) -> Self {
        Self {
            decode_times: VecDeque::with_capacity(max_samples),
            max_samples: max_samples.max(1),
            frames_decoded: 0,
            packets_skipped: 0,
            seeks: 0,
        }
    }

    /// Record one decoded and converted frame
    pub fn record_frame(&mut self, elapsed: Duration) {
        self.frames_decoded += 1;
        self.decode_times.push_back(elapsed);
        if self.decode_times.len() > self.max_samples {
            self.decode_times.pop_front();
        }
    }

    /// Record a packet the decoder rejected
    pub fn record_skipped_packet(&mut self) {
        self.packets_skipped += 1;
    }

    pub fn record_seek(&mut self) {
        self.seeks += 1;
    }

    /// Drop all samples and counters (new clip loaded)
    pub fn reset(&mut self) {
        *self = Self::with_capacity(self.max_samples);
    }

    /// Get decode timing statistics
    pub fn stats(&self) -> DecodeStats {
        if self.decode_times.is_empty() {
            return DecodeStats::default();
        }

        let mut times: Vec<f64> = self
            .decode_times
            .iter()
            .map(|d| d.as_secs_f64() * 1000.0)
            .collect();
        times.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

        let sum: f64 = times.iter().sum();

        DecodeStats {
            avg_ms: sum / times.len() as f64,
            min_ms: times.first().copied().unwrap_or(0.0),
            max_ms: times.last().copied().unwrap_or(0.0),
            p50_ms: percentile(&times, 0.50),
            p95_ms: percentile(&times, 0.95),
            p99_ms: percentile(&times, 0.99),
            sample_count: times.len(),
        }
    }

    /// The most recent decode time in milliseconds
    pub fn last_decode_time_ms(&self) -> f64 {
        self.decode_times
            .back()
            .map(|d| d.as_secs_f64() * 1000.0)
            .unwrap_or(0.0)
    }

    pub fn frames_decoded(&self) -> u64 {
        self.frames_decoded
    }

    pub fn packets_skipped(&self) -> u64 {
        self.packets_skipped
    }

    pub fn seeks(&self) -> u64 {
        self.seeks
    }
}

/// Calculate percentile from sorted array
fn percentile(sorted: &[f64], p: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    let idx = ((sorted.len() - 1) as f64 * p) as usize;
    sorted[idx]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_profiler() {
        let mut profiler = DecodeProfiler::new();
        for ms in [4, 8, 6, 2] {
            profiler.record_frame(Duration::from_millis(ms));
        }

        let stats = profiler.stats();
        assert_eq!(stats.sample_count, 4);
        assert!((stats.avg_ms - 5.0).abs() < 1e-9);
        assert!((stats.min_ms - 2.0).abs() < 1e-9);
        assert!((stats.max_ms - 8.0).abs() < 1e-9);
        assert!((profiler.last_decode_time_ms() - 2.0).abs() < 1e-9);
        assert_eq!(profiler.frames_decoded(), 4);
    }

    #[test]
    fn test_window_is_bounded() {
        let mut profiler = DecodeProfiler::with_capacity(3);
        for ms in 1..=5 {
            profiler.record_frame(Duration::from_millis(ms));
        }
        assert_eq!(profiler.stats().sample_count, 3);
        assert!((profiler.stats().min_ms - 3.0).abs() < 1e-9);
        // Counters are totals, not windowed
        assert_eq!(profiler.frames_decoded(), 5);
    }

    #[test]
    fn test_counters_and_reset() {
        let mut profiler = DecodeProfiler::new();
        profiler.record_skipped_packet();
        profiler.record_seek();
        profiler.record_seek();
        assert_eq!(profiler.packets_skipped(), 1);
        assert_eq!(profiler.seeks(), 2);

        profiler.reset();
        assert_eq!(profiler.seeks(), 0);
        assert_eq!(profiler.stats().sample_count, 0);
    }

    #[test]
    fn test_percentile() {
        let values = vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0, 10.0];
        assert_eq!(percentile(&values, 0.5), 5.0); // Median
        assert_eq!(percentile(&values, 0.0), 1.0); // Min
        assert_eq!(percentile(&values, 1.0), 10.0); // Max
    }
}
