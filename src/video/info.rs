//! Stream timing metadata
//!
//! Time-base arithmetic and the per-clip metadata the playback engine
//! reports to the host.

/// Fraction of a tick treated as float noise when converting seconds
const TICK_EPSILON: f64 = 1e-6;

/// Rational duration of one timestamp tick in a stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeBase {
    pub numerator: i32,
    pub denominator: i32,
}

impl TimeBase {
    pub fn new(numerator: i32, denominator: i32) -> Self {
        Self {
            numerator,
            denominator,
        }
    }

    /// Seconds per tick, or 0.0 for a degenerate time base
    pub fn as_f64(&self) -> f64 {
        if self.denominator == 0 {
            0.0
        } else {
            self.numerator as f64 / self.denominator as f64
        }
    }

    /// Convert a timestamp in ticks to seconds
    pub fn to_seconds(&self, ticks: i64) -> f64 {
        ticks as f64 * self.as_f64()
    }

    /// Convert seconds to the last tick at or before them
    ///
    /// Float error below a millionth of a tick is absorbed, so an exactly
    /// representable time maps to its own tick.
    pub fn to_ticks(&self, seconds: f64) -> i64 {
        let tick = self.as_f64();
        if tick <= 0.0 {
            return 0;
        }
        (seconds / tick + TICK_EPSILON).floor() as i64
    }
}

impl From<ffmpeg_next::Rational> for TimeBase {
    fn from(r: ffmpeg_next::Rational) -> Self {
        Self::new(r.numerator(), r.denominator())
    }
}

/// Metadata for the selected video stream
#[derive(Debug, Clone, PartialEq)]
pub struct StreamInfo {
    pub width: u32,
    pub height: u32,
    /// Average frame rate, or the configured fallback when the stream has none
    pub frame_rate: f64,
    /// Duration in seconds (0.0 when the container does not report one)
    pub duration: f64,
    pub time_base: TimeBase,
    pub codec_name: String,
}

impl StreamInfo {
    /// Nominal display time of one frame in seconds
    pub fn frame_interval(&self) -> f64 {
        if self.frame_rate > 0.0 {
            1.0 / self.frame_rate
        } else {
            0.0
        }
    }

    /// Estimated total frame count
    pub fn estimated_frame_count(&self) -> u64 {
        (self.duration * self.frame_rate) as u64
    }
}
