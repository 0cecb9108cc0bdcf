//! Video decoding and playback timing
//!
//! Opens a container with FFmpeg via the `ffmpeg-next` crate, decodes the
//! selected video stream frame by frame, converts frames to a packed RGB
//! buffer, and tracks presentation time across playback and seeks.
//!
//! Pipeline, leaves first: [`MediaSource`] (demux) -> [`DecodeSession`]
//! (decode) -> [`FrameConverter`] (color convert) -> [`VideoEngine`]
//! (timing and transport).

mod converter;
mod decoder;
mod frame;
mod info;
mod player;
mod session;
mod source;
mod timing;

pub use converter::{FrameConverter, ScalingQuality};
pub use decoder::{CodecError, DecodeOutcome, DecodeSession, RawFrame};
pub use frame::{DisplayFrame, OutputFormat};
pub use info::{StreamInfo, TimeBase};
pub use player::VideoEngine;
pub use session::{LoadError, MediaSession, PlaybackSource};
pub use source::{MediaSource, OpenError, SeekError, StreamDescriptor};
pub use timing::{PlaybackClock, PlaybackPosition, PlaybackState, SeekMode};
