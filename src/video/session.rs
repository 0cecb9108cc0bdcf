//! Media session
//!
//! Bundles the container, decoder, and converter for one opened file and
//! exposes them to the engine through [`PlaybackSource`].

use std::path::Path;

use crate::settings::EngineSettings;

use super::{
    CodecError, DecodeOutcome, DecodeSession, DisplayFrame, FrameConverter, MediaSource, OpenError,
    SeekError, StreamInfo,
};

/// Errors that can occur while loading a video
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LoadError {
    #[error(transparent)]
    Open(#[from] OpenError),
    #[error(transparent)]
    Codec(#[from] CodecError),
    /// No conversion path from the decoder's pixel format
    #[error("Failed to create frame converter: {0}")]
    ConverterInitFailed(String),
}

/// A decodable, seekable stream of display frames
///
/// `VideoEngine` drives this contract; [`MediaSession`] implements it over
/// FFmpeg.
pub trait PlaybackSource {
    fn info(&self) -> &StreamInfo;

    /// Decode the next video frame and return its presentation time in seconds
    ///
    /// Each `DecodeFailed` should move past some input, but callers bound
    /// their retries regardless.
    fn advance(&mut self) -> Result<f64, DecodeOutcome>;

    /// Convert the most recently decoded frame into the display buffer
    ///
    /// The frame stays convertible after later `advance()` calls that fail
    /// or hit the end of the stream, until the next seek.
    fn convert(&mut self);

    /// Reposition to the keyframe at or before `seconds` and flush the decoder
    ///
    /// On error, decoder state and the display buffer are left untouched.
    fn seek(&mut self, seconds: f64) -> Result<(), SeekError>;

    /// The last converted frame, valid until the next `convert()`
    fn display_frame(&self) -> Option<DisplayFrame<'_>>;
}

/// Owns every native handle for one opened file
///
/// Fields drop in declaration order, which is the reverse of acquisition:
/// converter, then codec context, then container.
pub struct MediaSession {
    converter: FrameConverter,
    decoder: DecodeSession,
    source: MediaSource,
    info: StreamInfo,
}

impl MediaSession {
    /// Open container, decoder, and converter in order
    ///
    /// A failure at any step drops whatever was already acquired.
    pub fn open<P: AsRef<Path>>(path: P, settings: &EngineSettings) -> Result<Self, LoadError> {
        let source = MediaSource::open(path)?;
        let frame_rate = source.frame_rate().unwrap_or(settings.fallback_frame_rate);

        let decoder = DecodeSession::open(&source, frame_rate)?;

        let converter = FrameConverter::new(
            decoder.format(),
            decoder.width(),
            decoder.height(),
            settings.output_format,
            settings.scaling,
        )
        .map_err(|e| LoadError::ConverterInitFailed(e.to_string()))?;

        let info = StreamInfo {
            width: decoder.width(),
            height: decoder.height(),
            frame_rate,
            duration: source.duration(),
            time_base: source.time_base(),
            codec_name: decoder.codec_name().to_string(),
        };

        tracing::info!(
            "Opened video: {}x{} @ {:.2}fps, duration: {:.2}s, codec: {}, output: {}",
            info.width,
            info.height,
            info.frame_rate,
            info.duration,
            info.codec_name,
            converter.output_format()
        );

        Ok(Self {
            converter,
            decoder,
            source,
            info,
        })
    }

    pub fn source(&self) -> &MediaSource {
        &self.source
    }
}

impl PlaybackSource for MediaSession {
    fn info(&self) -> &StreamInfo {
        &self.info
    }

    fn advance(&mut self) -> Result<f64, DecodeOutcome> {
        let start = self.source.start_time();
        let raw = self.decoder.advance(&mut self.source)?;
        Ok((self.info.time_base.to_seconds(raw.pts()) - start).max(0.0))
    }

    fn convert(&mut self) {
        if let Some(raw) = self.decoder.current_frame() {
            self.converter.convert(raw);
        }
    }

    fn seek(&mut self, seconds: f64) -> Result<(), SeekError> {
        self.source.seek(seconds)?;
        self.decoder.flush();
        Ok(())
    }

    fn display_frame(&self) -> Option<DisplayFrame<'_>> {
        self.converter.display_frame()
    }
}

impl Drop for MediaSession {
    fn drop(&mut self) {
        tracing::debug!(path = %self.source.path().display(), "Closing media session");
    }
}
