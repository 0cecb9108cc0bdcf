//! Decode session
//!
//! Owns the FFmpeg codec context bound to the selected video stream and turns
//! compressed packets into raw frames, one frame per `advance()` call. The
//! last decoded picture stays in a single buffer until the next one arrives;
//! nothing is queued.

use ffmpeg_next::{codec, format, frame};

use super::MediaSource;

/// Errors that can occur while opening the decoder
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CodecError {
    /// No decoder implementation matches the stream's codec id
    #[error("No decoder available for codec {0}")]
    UnsupportedCodec(String),
    /// The decoder exists but rejected the stream's parameters
    #[error("Failed to open {codec} decoder: {reason}")]
    CodecInitFailed { codec: String, reason: String },
}

/// Reasons `advance()` did not produce a frame
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DecodeOutcome {
    /// The decoder rejected a packet or failed to produce a picture; the
    /// input has moved on by at least one packet
    #[error("Decoding failed: {0}")]
    DecodeFailed(String),
    /// Input is exhausted and the decoder has nothing left to drain
    #[error("Reached end of stream")]
    EndOfStream,
}

/// One decoded picture in its native pixel layout
pub struct RawFrame {
    frame: frame::Video,
    pts: i64,
}

impl RawFrame {
    fn empty() -> Self {
        Self {
            frame: frame::Video::empty(),
            pts: 0,
        }
    }

    #[cfg(test)]
    pub(crate) fn from_video(frame: frame::Video, pts: i64) -> Self {
        Self { frame, pts }
    }

    /// Presentation timestamp in stream time-base ticks
    pub fn pts(&self) -> i64 {
        self.pts
    }

    pub fn width(&self) -> u32 {
        self.frame.width()
    }

    pub fn height(&self) -> u32 {
        self.frame.height()
    }

    pub fn format(&self) -> format::Pixel {
        self.frame.format()
    }

    pub fn video(&self) -> &frame::Video {
        &self.frame
    }
}

/// Best-effort timestamp, then the frame's own PTS, then one frame after the
/// previous picture (0 for the first)
fn synthesize_timestamp(
    best_effort: Option<i64>,
    pts: Option<i64>,
    last_pts: Option<i64>,
    frame_duration_ticks: i64,
) -> i64 {
    best_effort
        .or(pts)
        .unwrap_or_else(|| last_pts.map_or(0, |last| last + frame_duration_ticks))
}

/// Stateful decoder for the selected video stream
pub struct DecodeSession {
    decoder: ffmpeg_next::decoder::Video,
    raw: RawFrame,
    /// Receive target; FFmpeg clears it on every failed receive, so a good
    /// picture is swapped into `raw` only on success
    incoming: frame::Video,
    /// Whether `raw` holds a picture decoded since the last flush
    has_frame: bool,
    video_stream_index: usize,
    width: u32,
    height: u32,
    codec_name: String,
    /// Used to synthesize a timestamp when a frame carries none
    frame_duration_ticks: i64,
    last_pts: Option<i64>,
    /// End of input has been signalled to the decoder
    draining: bool,
}

impl DecodeSession {
    /// Find and open a decoder for the source's video stream
    pub fn open(source: &MediaSource, frame_rate: f64) -> Result<Self, CodecError> {
        let parameters = source
            .video_parameters()
            .ok_or_else(|| CodecError::UnsupportedCodec("<missing stream>".to_string()))?;

        let codec_id = parameters.id();
        let codec = ffmpeg_next::decoder::find(codec_id)
            .ok_or_else(|| CodecError::UnsupportedCodec(format!("{:?}", codec_id)))?;
        let codec_name = codec.name().to_string();

        let init_failed = |reason: String| CodecError::CodecInitFailed {
            codec: codec_name.clone(),
            reason,
        };

        let context = codec::context::Context::from_parameters(parameters)
            .map_err(|e| init_failed(e.to_string()))?;
        let decoder = context
            .decoder()
            .open_as(codec)
            .and_then(|opened| opened.video())
            .map_err(|e| init_failed(e.to_string()))?;

        let width = decoder.width();
        let height = decoder.height();
        if width == 0 || height == 0 {
            return Err(init_failed(format!("stream reports {}x{} frames", width, height)));
        }

        let tick = source.time_base().as_f64();
        let frame_duration_ticks = if frame_rate > 0.0 && tick > 0.0 {
            ((1.0 / frame_rate) / tick).round().max(1.0) as i64
        } else {
            1
        };

        Ok(Self {
            decoder,
            raw: RawFrame::empty(),
            incoming: frame::Video::empty(),
            has_frame: false,
            video_stream_index: source.video_stream_index(),
            width,
            height,
            codec_name,
            frame_duration_ticks,
            last_pts: None,
            draining: false,
        })
    }

    /// Decode the next video frame
    ///
    /// Pulls packets from `source` until the decoder yields a picture.
    /// Packets of other streams are dropped. Once the source runs dry the
    /// decoder is drained of any reordered frames before `EndOfStream`.
    /// Every `DecodeFailed` consumes input, so repeated calls always reach
    /// the end of the stream.
    pub fn advance(&mut self, source: &mut MediaSource) -> Result<&RawFrame, DecodeOutcome> {
        loop {
            // First, try to receive any pending frames from the decoder
            let mut failure = None;
            match self.decoder.receive_frame(&mut self.incoming) {
                Ok(()) => {
                    std::mem::swap(&mut self.raw.frame, &mut self.incoming);
                    let pts = self.frame_timestamp();
                    self.raw.pts = pts;
                    self.last_pts = Some(pts);
                    self.has_frame = true;
                    tracing::trace!(pts, "Decoded frame");
                    return Ok(&self.raw);
                }
                Err(ffmpeg_next::Error::Other {
                    errno: ffmpeg_next::error::EAGAIN,
                }) => {
                    // Need more input
                }
                Err(ffmpeg_next::Error::Eof) => return Err(DecodeOutcome::EndOfStream),
                Err(e) => failure = Some(format!("frame retrieval rejected: {}", e)),
            }

            if self.draining {
                return Err(DecodeOutcome::EndOfStream);
            }

            match source.read_packet() {
                Some(packet) if packet.stream() == self.video_stream_index => {
                    if let Err(e) = self.decoder.send_packet(&packet) {
                        return Err(DecodeOutcome::DecodeFailed(format!(
                            "packet at pts {:?} rejected: {}",
                            packet.pts(),
                            e
                        )));
                    }
                }
                // Audio, subtitles, data: not ours
                Some(_) => {}
                None => {
                    self.draining = true;
                    if let Err(e) = self.decoder.send_eof() {
                        tracing::debug!("Decoder refused end-of-stream signal: {}", e);
                        return Err(DecodeOutcome::EndOfStream);
                    }
                }
            }

            if let Some(reason) = failure {
                return Err(DecodeOutcome::DecodeFailed(reason));
            }
        }
    }

    /// Discard all buffered decoder state (required after every seek)
    pub fn flush(&mut self) {
        self.decoder.flush();
        self.draining = false;
        self.has_frame = false;
        self.last_pts = None;
    }

    fn frame_timestamp(&self) -> i64 {
        synthesize_timestamp(
            self.raw.frame.timestamp(),
            self.raw.frame.pts(),
            self.last_pts,
            self.frame_duration_ticks,
        )
    }

    /// The most recently decoded picture, `None` after a flush until the
    /// next successful `advance()`
    pub fn current_frame(&self) -> Option<&RawFrame> {
        self.has_frame.then_some(&self.raw)
    }

    /// Native pixel format reported by the codec context
    pub fn format(&self) -> format::Pixel {
        self.decoder.format()
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn codec_name(&self) -> &str {
        &self.codec_name
    }

    pub fn is_draining(&self) -> bool {
        self.draining
    }
}
