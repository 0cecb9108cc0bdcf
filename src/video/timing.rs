//! Playback state machine and clock
//!
//! Tracks transport state (idle, ready, playing, seeking, ended) and the
//! presentation position derived from the last decoded frame. Holds no
//! decoder state; `VideoEngine` drives it.

use serde::{Deserialize, Serialize};

/// Transport state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlaybackState {
    /// No media loaded
    #[default]
    Idle,
    /// Media loaded, paused
    Ready,
    /// Advancing one frame per tick
    Playing,
    /// Repositioning; only observable from inside a seek
    Seeking,
    /// End of stream reached; resumes like `Ready` at the final position
    Ended,
}

impl std::fmt::Display for PlaybackState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlaybackState::Idle => write!(f, "idle"),
            PlaybackState::Ready => write!(f, "ready"),
            PlaybackState::Playing => write!(f, "playing"),
            PlaybackState::Seeking => write!(f, "seeking"),
            PlaybackState::Ended => write!(f, "ended"),
        }
    }
}

/// How precisely a seek lands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SeekMode {
    /// Show the keyframe at or before the target (one decode)
    #[default]
    Keyframe,
    /// Decode forward from the keyframe to the frame covering the target
    Exact,
}

/// The engine's externally visible clock
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PlaybackPosition {
    /// Presentation time of the displayed frame in seconds
    pub current_time: f64,
    /// Total duration in seconds (0.0 if unknown)
    pub duration: f64,
}

impl PlaybackPosition {
    /// Progress through the clip (0.0 to 1.0)
    pub fn progress(&self) -> f64 {
        if self.duration <= 0.0 {
            0.0
        } else {
            (self.current_time / self.duration).clamp(0.0, 1.0)
        }
    }

    pub fn remaining(&self) -> f64 {
        (self.duration - self.current_time).max(0.0)
    }
}

/// Transport state machine for one loaded clip
#[derive(Debug, Clone, Default)]
pub struct PlaybackClock {
    state: PlaybackState,
    position: PlaybackPosition,
    /// State to restore if a seek fails
    resume_state: Option<PlaybackState>,
}

impl PlaybackClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Idle -> Ready with the clock at zero
    pub fn load(&mut self, duration: f64) {
        self.state = PlaybackState::Ready;
        self.position = PlaybackPosition {
            current_time: 0.0,
            duration: duration.max(0.0),
        };
        self.resume_state = None;
    }

    /// Back to Idle
    pub fn unload(&mut self) {
        *self = Self::default();
    }

    /// Ready/Ended -> Playing. Returns whether the state changed.
    pub fn play(&mut self) -> bool {
        match self.state {
            PlaybackState::Ready | PlaybackState::Ended => {
                self.state = PlaybackState::Playing;
                true
            }
            _ => false,
        }
    }

    /// Playing -> Ready. Returns whether the state changed.
    pub fn pause(&mut self) -> bool {
        if self.state == PlaybackState::Playing {
            self.state = PlaybackState::Ready;
            true
        } else {
            false
        }
    }

    /// Toggle between play and pause
    pub fn toggle(&mut self) -> bool {
        match self.state {
            PlaybackState::Playing => self.pause(),
            _ => self.play(),
        }
    }

    /// Clamp a requested seek time to the clip, or `None` if no seek is possible
    ///
    /// Non-finite requests are rejected. When the duration is unknown only
    /// the lower bound applies.
    pub fn clamp_seek_target(&self, seconds: f64) -> Option<f64> {
        if self.state == PlaybackState::Idle || seconds.is_nan() {
            return None;
        }
        let upper = if self.position.duration > 0.0 {
            self.position.duration
        } else if seconds.is_infinite() {
            return None;
        } else {
            f64::MAX
        };
        Some(seconds.clamp(0.0, upper))
    }

    /// {Ready, Playing, Ended} -> Seeking
    pub fn begin_seek(&mut self) {
        if self.state != PlaybackState::Seeking {
            self.resume_state = Some(self.state);
        }
        self.state = PlaybackState::Seeking;
    }

    /// Seeking -> Ready, moving the clock to the landed frame if there was one
    pub fn finish_seek(&mut self, landed: Option<f64>) {
        if let Some(seconds) = landed {
            self.position.current_time = seconds;
        }
        self.resume_state = None;
        self.state = PlaybackState::Ready;
    }

    /// Seeking -> previous state, clock untouched
    pub fn abort_seek(&mut self) {
        self.state = self.resume_state.take().unwrap_or(PlaybackState::Ready);
    }

    /// A frame was decoded and converted
    pub fn frame_presented(&mut self, seconds: f64) {
        self.position.current_time = seconds;
    }

    /// Playing -> Ended
    pub fn end_of_stream(&mut self) {
        if self.state == PlaybackState::Playing {
            self.state = PlaybackState::Ended;
        }
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn position(&self) -> PlaybackPosition {
        self.position
    }

    pub fn is_playing(&self) -> bool {
        self.state == PlaybackState::Playing
    }
}
