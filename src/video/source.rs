//! Container reader
//!
//! Opens a media file with FFmpeg's demuxer, selects the video stream and
//! hands out compressed packets one at a time. Seeks are keyframe-aligned
//! and always land at or before the requested time; callers decode forward
//! from there. Times are relative to the stream's start time, so the first
//! frame sits at 0.0 even in containers with a timestamp offset.

use std::path::{Path, PathBuf};

use ffmpeg_next::{format, media, Packet};

use super::TimeBase;

/// Errors that can occur while opening a container
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum OpenError {
    /// The path could not be opened or probed as a known container
    #[error("Failed to open video file {path}: {reason}")]
    FileUnreadable { path: String, reason: String },
    /// The container has no stream of video type
    #[error("No video stream found in {0}")]
    NoVideoStream(String),
}

/// Errors that can occur while repositioning a container
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SeekError {
    /// The container or stream rejected random access
    #[error("Seek to {target:.3}s not supported: {reason}")]
    SeekUnsupported { target: f64, reason: String },
    /// The target is not a finite time inside the clip
    #[error("Seek target {target}s outside of 0..={duration:.3}s")]
    SeekOutOfRange { target: f64, duration: f64 },
}

/// One stream found while probing the container
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StreamDescriptor {
    pub index: usize,
    pub medium: media::Type,
    pub time_base: TimeBase,
}

/// An opened container with a selected video stream
pub struct MediaSource {
    path: PathBuf,
    input: format::context::Input,
    streams: Vec<StreamDescriptor>,
    video_stream_index: usize,
    time_base: TimeBase,
    /// Presentation time of the first frame, subtracted from every timestamp
    start_time: f64,
    duration: f64,
    frame_rate: Option<f64>,
}

impl MediaSource {
    /// Open a container and select its best video stream
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, OpenError> {
        let path = path.as_ref();
        let unreadable = |reason: String| OpenError::FileUnreadable {
            path: path.display().to_string(),
            reason,
        };

        // Safe to call multiple times
        ffmpeg_next::init().map_err(|e| unreadable(format!("FFmpeg initialization failed: {}", e)))?;

        let input = format::input(&path).map_err(|e| unreadable(e.to_string()))?;

        let streams: Vec<StreamDescriptor> = input
            .streams()
            .map(|stream| StreamDescriptor {
                index: stream.index(),
                medium: stream.parameters().medium(),
                time_base: stream.time_base().into(),
            })
            .collect();

        let (video_stream_index, time_base, stream_start, stream_duration, avg_frame_rate) = {
            let video = input
                .streams()
                .best(media::Type::Video)
                .ok_or_else(|| OpenError::NoVideoStream(path.display().to_string()))?;
            (
                video.index(),
                TimeBase::from(video.time_base()),
                video.start_time(),
                video.duration(),
                video.avg_frame_rate(),
            )
        };

        let frame_rate = if avg_frame_rate.numerator() > 0 && avg_frame_rate.denominator() > 0 {
            Some(avg_frame_rate.numerator() as f64 / avg_frame_rate.denominator() as f64)
        } else {
            None
        };

        let start_time = if stream_start != ffmpeg_next::ffi::AV_NOPTS_VALUE {
            time_base.to_seconds(stream_start)
        } else {
            0.0
        };

        let duration = if stream_duration > 0 {
            time_base.to_seconds(stream_duration)
        } else if input.duration() > 0 {
            input.duration() as f64 / ffmpeg_next::ffi::AV_TIME_BASE as f64
        } else {
            0.0
        };

        tracing::debug!(
            path = %path.display(),
            streams = streams.len(),
            video_stream = video_stream_index,
            time_base = ?time_base,
            start_time,
            duration,
            "Opened container"
        );

        Ok(Self {
            path: path.to_path_buf(),
            input,
            streams,
            video_stream_index,
            time_base,
            start_time,
            duration,
            frame_rate,
        })
    }

    /// Read the next packet of any stream, or `None` at end of input
    ///
    /// Read errors other than a retryable `EAGAIN` end the input; a damaged
    /// tail is treated like a short file.
    pub fn read_packet(&mut self) -> Option<Packet> {
        let mut packet = Packet::empty();
        loop {
            match packet.read(&mut self.input) {
                Ok(()) => return Some(packet),
                Err(ffmpeg_next::Error::Eof) => return None,
                Err(ffmpeg_next::Error::Other {
                    errno: ffmpeg_next::error::EAGAIN,
                }) => continue,
                Err(e) => {
                    tracing::warn!(path = %self.path.display(), "Stopping demux on read error: {}", e);
                    return None;
                }
            }
        }
    }

    /// Reposition to the keyframe at or before `seconds`
    ///
    /// The decoder must be flushed before decoding resumes.
    pub fn seek(&mut self, seconds: f64) -> Result<(), SeekError> {
        let out_of_range = !seconds.is_finite()
            || seconds < 0.0
            || (self.duration > 0.0 && seconds > self.duration);
        if out_of_range {
            return Err(SeekError::SeekOutOfRange {
                target: seconds,
                duration: self.duration,
            });
        }

        // Container-level seeks take AV_TIME_BASE units on the absolute
        // timeline; the range end is the latest acceptable keyframe
        let target = TimeBase::new(1, ffmpeg_next::ffi::AV_TIME_BASE as i32).to_ticks(self.start_time + seconds);
        self.input
            .seek(target, ..target)
            .map_err(|e| SeekError::SeekUnsupported {
                target: seconds,
                reason: e.to_string(),
            })?;

        tracing::trace!(seconds, target, "Container repositioned");
        Ok(())
    }

    /// Codec parameters of the selected video stream
    pub fn video_parameters(&self) -> Option<ffmpeg_next::codec::Parameters> {
        self.input
            .stream(self.video_stream_index)
            .map(|stream| stream.parameters())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn streams(&self) -> &[StreamDescriptor] {
        &self.streams
    }

    pub fn video_stream_index(&self) -> usize {
        self.video_stream_index
    }

    pub fn time_base(&self) -> TimeBase {
        self.time_base
    }

    /// Stream start time in seconds; timestamps are reported relative to it
    pub fn start_time(&self) -> f64 {
        self.start_time
    }

    /// Duration in seconds, 0.0 if unknown
    pub fn duration(&self) -> f64 {
        self.duration
    }

    /// Average frame rate reported by the stream, if any
    pub fn frame_rate(&self) -> Option<f64> {
        self.frame_rate
    }
}
