//! Playback engine
//!
//! Single-threaded player driven by the host's loop: every `update()` while
//! playing decodes and converts exactly one frame, and `seek_to()` resyncs
//! the decoder and shows the frame at (or just before) the target. There is
//! no read-ahead; a slow decode stalls the caller for its duration.

use std::path::Path;
use std::time::Instant;

use crate::settings::EngineSettings;
use crate::telemetry::DecodeProfiler;

use super::{
    DecodeOutcome, DisplayFrame, LoadError, MediaSession, PlaybackClock, PlaybackPosition,
    PlaybackSource, PlaybackState, SeekMode, StreamInfo,
};

/// Slack when comparing a frame's time against a seek target
const SEEK_TOLERANCE: f64 = 1e-6;

/// Consecutive decode failures tolerated in one `update()` or `seek_to()`
/// before the stream is treated as finished
const MAX_DECODE_FAILURES: u32 = 64;

/// Video playback engine owned by the host loop
///
/// Generic over the frame source so the timing logic runs against FFmpeg
/// ([`MediaSession`], the default) or any other [`PlaybackSource`].
pub struct VideoEngine<S = MediaSession> {
    session: Option<S>,
    clock: PlaybackClock,
    settings: EngineSettings,
    profiler: DecodeProfiler,
}

impl VideoEngine<MediaSession> {
    /// Open a video file, replacing whatever was loaded
    ///
    /// On failure the engine is left `Idle`.
    pub fn open<P: AsRef<Path>>(&mut self, path: P) -> Result<(), LoadError> {
        self.close();
        let session = MediaSession::open(path, &self.settings)?;
        self.attach(session);
        Ok(())
    }

    /// Open a video file, reporting only success or failure
    pub fn load_video<P: AsRef<Path>>(&mut self, path: P) -> bool {
        let path = path.as_ref();
        match self.open(path) {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(path = %path.display(), "Failed to load video: {}", e);
                false
            }
        }
    }
}

impl<S: PlaybackSource> VideoEngine<S> {
    /// Create an idle engine
    pub fn new(settings: EngineSettings) -> Self {
        Self {
            session: None,
            clock: PlaybackClock::new(),
            settings,
            profiler: DecodeProfiler::new(),
        }
    }

    /// Take ownership of an already opened source: Idle -> Ready
    pub fn attach(&mut self, source: S) {
        self.close();
        self.clock.load(source.info().duration);
        self.profiler.reset();
        self.session = Some(source);
    }

    /// Release the loaded media and return to `Idle`
    pub fn close(&mut self) {
        if self.session.take().is_some() {
            tracing::info!("Video closed");
        }
        self.clock.unload();
    }

    /// Advance one frame if playing
    ///
    /// Undecodable packets are skipped silently (logged). End of stream, or a
    /// decoder that keeps failing, moves the engine to `Ended`, after which
    /// this is a no-op.
    pub fn update(&mut self) -> PlaybackPosition {
        if !self.clock.is_playing() {
            return self.clock.position();
        }
        let Some(session) = self.session.as_mut() else {
            return self.clock.position();
        };

        let started = Instant::now();
        let mut failures = 0;
        loop {
            match session.advance() {
                Ok(seconds) => {
                    session.convert();
                    self.clock.frame_presented(seconds);
                    self.profiler.record_frame(started.elapsed());
                    break;
                }
                Err(DecodeOutcome::DecodeFailed(reason)) => {
                    tracing::warn!("Skipping undecodable packet: {}", reason);
                    self.profiler.record_skipped_packet();
                    failures += 1;
                    if failures >= MAX_DECODE_FAILURES {
                        tracing::error!(failures, "Decoder keeps failing; stopping playback");
                        self.clock.end_of_stream();
                        break;
                    }
                }
                Err(DecodeOutcome::EndOfStream) => {
                    tracing::info!(
                        position = self.clock.position().current_time,
                        "Reached end of stream"
                    );
                    self.clock.end_of_stream();
                    break;
                }
            }
        }

        self.clock.position()
    }

    /// Seek to `seconds`, clamped to the clip, and show the landed frame
    ///
    /// With [`SeekMode::Keyframe`] the result is the keyframe at or before
    /// the target. With [`SeekMode::Exact`] decoding continues to the frame
    /// covering the target. A target at the very end decodes to the last
    /// frame in either mode. If the container refuses the seek or nothing
    /// decodes after it, the current position is kept. The engine is `Ready`
    /// afterwards unless the seek was refused.
    pub fn seek_to(&mut self, seconds: f64) -> PlaybackPosition {
        let Some(session) = self.session.as_mut() else {
            tracing::debug!("Seek ignored: no video loaded");
            return self.clock.position();
        };
        let Some(target) = self.clock.clamp_seek_target(seconds) else {
            tracing::warn!(requested = seconds, "Seek rejected: target out of range");
            return self.clock.position();
        };

        let previous = self.clock.position().current_time;
        self.clock.begin_seek();

        if let Err(e) = session.seek(target) {
            tracing::warn!(requested = seconds, "Seek failed: {}", e);
            self.clock.abort_seek();
            return self.clock.position();
        }
        self.profiler.record_seek();

        let duration = session.info().duration;
        let interval = session.info().frame_interval();
        let to_end = duration > 0.0 && target >= duration;
        let exact = self.settings.seek_mode == SeekMode::Exact;

        let started = Instant::now();
        let mut landed = None;
        let mut failures = 0;
        loop {
            match session.advance() {
                Ok(pts) => {
                    landed = Some(pts);
                    failures = 0;
                    let next_still_before_target = pts + interval <= target + SEEK_TOLERANCE;
                    if !(to_end || (exact && next_still_before_target)) {
                        break;
                    }
                }
                Err(DecodeOutcome::DecodeFailed(reason)) => {
                    tracing::warn!("Skipping undecodable packet after seek: {}", reason);
                    self.profiler.record_skipped_packet();
                    failures += 1;
                    if failures >= MAX_DECODE_FAILURES {
                        tracing::error!(failures, "Decoder keeps failing after seek");
                        break;
                    }
                }
                Err(DecodeOutcome::EndOfStream) => break,
            }
        }
        match landed {
            Some(pts) => {
                session.convert();
                self.profiler.record_frame(started.elapsed());
                tracing::debug!(requested = seconds, target, landed = pts, "Seek complete");
            }
            None => tracing::warn!(
                requested = seconds,
                kept = previous,
                "No frame decoded after seek; keeping previous position"
            ),
        }
        self.clock.finish_seek(landed);
        self.clock.position()
    }

    /// Seek to the start, keeping the play state
    pub fn restart(&mut self) -> PlaybackPosition {
        let was_playing = self.clock.is_playing();
        self.seek_to(0.0);
        if was_playing {
            self.clock.play();
        }
        self.clock.position()
    }

    /// Start or resume playback (from `Ready` or `Ended`)
    pub fn play(&mut self) {
        if self.clock.play() {
            tracing::info!("Playback started");
        }
    }

    /// Pause playback
    pub fn pause(&mut self) {
        if self.clock.pause() {
            tracing::info!("Playback paused");
        }
    }

    /// Toggle pause state
    pub fn toggle_pause(&mut self) {
        if self.clock.toggle() {
            tracing::info!("Playback {}", if self.clock.is_playing() { "resumed" } else { "paused" });
        }
    }

    /// The last converted frame
    ///
    /// Borrows the engine, so the frame cannot outlive the next `update()`
    /// or `seek_to()`, which overwrite the same buffer.
    pub fn display_frame(&self) -> Option<DisplayFrame<'_>> {
        self.session.as_ref().and_then(|s| s.display_frame())
    }

    pub fn position(&self) -> PlaybackPosition {
        self.clock.position()
    }

    /// Duration in seconds (0.0 when idle or unknown)
    pub fn duration(&self) -> f64 {
        self.clock.position().duration
    }

    /// Presentation time of the displayed frame in seconds
    pub fn current_time(&self) -> f64 {
        self.clock.position().current_time
    }

    pub fn is_playing(&self) -> bool {
        self.clock.is_playing()
    }

    pub fn state(&self) -> PlaybackState {
        self.clock.state()
    }

    /// The loaded frame source
    pub fn source(&self) -> Option<&S> {
        self.session.as_ref()
    }

    /// Metadata of the loaded stream
    pub fn info(&self) -> Option<&StreamInfo> {
        self.session.as_ref().map(|s| s.info())
    }

    /// Nominal frame interval in seconds, for host pacing
    pub fn frame_interval(&self) -> f64 {
        self.info()
            .map(|info| info.frame_interval())
            .unwrap_or(1.0 / self.settings.fallback_frame_rate)
    }

    pub fn stats(&self) -> &DecodeProfiler {
        &self.profiler
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }
}

impl Default for VideoEngine<MediaSession> {
    fn default() -> Self {
        Self::new(EngineSettings::default())
    }
}
