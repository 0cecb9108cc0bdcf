//! Immersive Playback Library
//!
//! Video decode and playback timing engine: opens a media file, decodes its
//! video stream to display-ready RGB frames, and keeps an accurate clock
//! through linear playback and random-access seeks.

pub mod settings;
pub mod telemetry;
pub mod video;

pub use settings::{EngineSettings, SettingsError};
pub use video::{
    DisplayFrame, LoadError, MediaSession, OutputFormat, PlaybackPosition, PlaybackSource, PlaybackState,
    SeekMode, StreamInfo, VideoEngine,
};
