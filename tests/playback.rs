//! Playback timing tests against a scripted frame source
//!
//! The scripted source behaves like a demuxer + decoder pair: frames come out
//! in presentation order, seeks land on the keyframe at or before the target,
//! and individual packets can be marked corrupt.

use immersive_playback::video::{DecodeOutcome, SeekError, TimeBase};
use immersive_playback::{
    DisplayFrame, EngineSettings, OutputFormat, PlaybackPosition, PlaybackSource, PlaybackState,
    SeekMode, StreamInfo, VideoEngine,
};

const WIDTH: u32 = 4;
const HEIGHT: u32 = 2;
/// RGB24 rows padded to 16 bytes
const STRIDE: usize = 16;

#[derive(Debug, Clone, Copy)]
struct ScriptedFrame {
    pts: f64,
    keyframe: bool,
    corrupt: bool,
}

struct ScriptedSource {
    info: StreamInfo,
    frames: Vec<ScriptedFrame>,
    cursor: usize,
    decoded: Option<usize>,
    buffer: Vec<u8>,
    converted: bool,
    seekable: bool,
    /// From this frame on the decoder fails without consuming input
    stuck_at: Option<usize>,
    advance_calls: usize,
    conversions: usize,
}

impl ScriptedSource {
    /// `seconds` long at `fps`, keyframe every `gop` frames
    fn clip(seconds: f64, fps: f64, gop: usize) -> Self {
        let count = (seconds * fps).round() as usize;
        let frames = (0..count)
            .map(|i| ScriptedFrame {
                pts: i as f64 / fps,
                keyframe: i % gop == 0,
                corrupt: false,
            })
            .collect();
        Self {
            info: StreamInfo {
                width: WIDTH,
                height: HEIGHT,
                frame_rate: fps,
                duration: seconds,
                time_base: TimeBase::new(1, 90_000),
                codec_name: "scripted".to_string(),
            },
            frames,
            cursor: 0,
            decoded: None,
            buffer: vec![0; STRIDE * HEIGHT as usize],
            converted: false,
            seekable: true,
            stuck_at: None,
            advance_calls: 0,
            conversions: 0,
        }
    }

    fn corrupt(mut self, indices: impl IntoIterator<Item = usize>) -> Self {
        for i in indices {
            self.frames[i].corrupt = true;
        }
        self
    }

    fn stuck_at(mut self, index: usize) -> Self {
        self.stuck_at = Some(index);
        self
    }

    fn unseekable(mut self) -> Self {
        self.seekable = false;
        self
    }

    fn last_pts(&self) -> f64 {
        self.frames.last().map(|f| f.pts).unwrap_or(0.0)
    }
}

impl PlaybackSource for ScriptedSource {
    fn info(&self) -> &StreamInfo {
        &self.info
    }

    fn advance(&mut self) -> Result<f64, DecodeOutcome> {
        self.advance_calls += 1;
        if self.stuck_at.is_some_and(|index| self.cursor >= index) {
            return Err(DecodeOutcome::DecodeFailed("decoder wedged".to_string()));
        }
        let Some(frame) = self.frames.get(self.cursor).copied() else {
            return Err(DecodeOutcome::EndOfStream);
        };
        let index = self.cursor;
        self.cursor += 1;
        if frame.corrupt {
            return Err(DecodeOutcome::DecodeFailed(format!("corrupt packet {}", index)));
        }
        self.decoded = Some(index);
        Ok(frame.pts)
    }

    fn convert(&mut self) {
        if let Some(index) = self.decoded {
            let value = (index % 251) as u8;
            for y in 0..HEIGHT as usize {
                let row = &mut self.buffer[y * STRIDE..y * STRIDE + WIDTH as usize * 3];
                row.fill(value);
            }
            self.converted = true;
            self.conversions += 1;
        }
    }

    fn seek(&mut self, seconds: f64) -> Result<(), SeekError> {
        if !self.seekable {
            return Err(SeekError::SeekUnsupported {
                target: seconds,
                reason: "stream is not seekable".to_string(),
            });
        }
        let keyframe = self
            .frames
            .iter()
            .enumerate()
            .filter(|(_, f)| f.keyframe && f.pts <= seconds + 1e-9)
            .map(|(i, _)| i)
            .last()
            .unwrap_or(0);
        self.cursor = keyframe;
        self.decoded = None;
        Ok(())
    }

    fn display_frame(&self) -> Option<DisplayFrame<'_>> {
        self.converted
            .then(|| DisplayFrame::new(&self.buffer, WIDTH, HEIGHT, STRIDE, OutputFormat::Rgb24))
    }
}

fn engine_with(source: ScriptedSource, seek_mode: SeekMode) -> VideoEngine<ScriptedSource> {
    let settings = EngineSettings {
        seek_mode,
        ..Default::default()
    };
    let mut engine = VideoEngine::<ScriptedSource>::new(settings);
    engine.attach(source);
    engine
}

/// 30 second clip at 30fps, keyframes every 2 seconds
fn thirty_second_clip() -> ScriptedSource {
    ScriptedSource::clip(30.0, 30.0, 60)
}

#[test]
fn test_load_reports_duration_and_ready() {
    let engine = engine_with(thirty_second_clip(), SeekMode::Keyframe);
    assert_eq!(engine.state(), PlaybackState::Ready);
    assert!((engine.duration() - 30.0).abs() <= 1.0 / 30.0);
    assert_eq!(engine.current_time(), 0.0);
    assert!(engine.display_frame().is_none());
    assert!((engine.frame_interval() - 1.0 / 30.0).abs() < 1e-12);
}

#[test]
fn test_reference_scenario() {
    let mut engine = engine_with(thirty_second_clip(), SeekMode::Keyframe);
    let last_frame_time = 899.0 / 30.0;
    engine.play();

    let mut previous = -1.0;
    for _ in 0..10 {
        let position = engine.update();
        assert!(position.current_time > previous);
        assert!(position.current_time < engine.duration());
        previous = position.current_time;
    }
    assert!((engine.current_time() - 9.0 / 30.0).abs() < 1e-9);

    let first = engine.seek_to(15.0);
    assert!((13.0..=15.0).contains(&first.current_time));
    assert_eq!(first.current_time, 14.0);

    let second = engine.seek_to(15.0);
    assert_eq!(second.current_time, first.current_time);

    let end = engine.seek_to(1000.0);
    assert!((end.current_time - last_frame_time).abs() < 1e-9);
}

#[test]
fn test_playback_is_monotonic_until_end() {
    let mut engine = engine_with(ScriptedSource::clip(2.0, 30.0, 15), SeekMode::Keyframe);
    engine.play();

    let mut previous = engine.current_time();
    while engine.is_playing() {
        let position = engine.update();
        assert!(position.current_time >= previous);
        previous = position.current_time;
    }
    assert_eq!(engine.state(), PlaybackState::Ended);
    assert!((engine.current_time() - 59.0 / 30.0).abs() < 1e-9);
    assert_eq!(engine.stats().frames_decoded(), 60);
}

#[test]
fn test_seek_lands_on_preceding_keyframe() {
    let mut engine = engine_with(thirty_second_clip(), SeekMode::Keyframe);
    for target in [0.5, 2.0, 3.99, 7.3, 15.0, 21.01, 29.5] {
        let position = engine.seek_to(target);
        assert!(position.current_time <= target + 1e-9, "landed after {}", target);
        assert!(target - position.current_time < 2.0 + 1e-9, "more than one GOP before {}", target);
    }
}

#[test]
fn test_seek_is_idempotent() {
    let mut engine = engine_with(thirty_second_clip(), SeekMode::Keyframe);
    engine.play();
    engine.update();
    let a = engine.seek_to(7.7);
    engine.play();
    for _ in 0..5 {
        engine.update();
    }
    let b = engine.seek_to(7.7);
    assert_eq!(a, b);
}

#[test]
fn test_seek_clamps_to_clip() {
    let mut engine = engine_with(thirty_second_clip(), SeekMode::Keyframe);
    assert_eq!(engine.seek_to(-5.0).current_time, 0.0);

    let end = engine.seek_to(engine.duration() + 5.0);
    assert!(end.current_time <= engine.duration());
}

#[test]
fn test_non_finite_seek_keeps_position() {
    let mut engine = engine_with(thirty_second_clip(), SeekMode::Keyframe);
    engine.seek_to(6.0);
    engine.play();

    let position = engine.seek_to(f64::NAN);
    assert_eq!(position.current_time, 6.0);
    assert!(engine.is_playing());
}

#[test]
fn test_update_after_end_is_inert() {
    let mut engine = engine_with(ScriptedSource::clip(1.0, 10.0, 5), SeekMode::Keyframe);
    engine.play();
    while engine.is_playing() {
        engine.update();
    }
    let ended_at = engine.position();
    let calls = engine.stats().frames_decoded();

    for _ in 0..20 {
        assert_eq!(engine.update(), ended_at);
        assert_eq!(engine.state(), PlaybackState::Ended);
    }
    assert_eq!(engine.stats().frames_decoded(), calls);
}

#[test]
fn test_play_after_end_stays_at_end() {
    let mut engine = engine_with(ScriptedSource::clip(1.0, 10.0, 5), SeekMode::Keyframe);
    engine.play();
    while engine.is_playing() {
        engine.update();
    }
    let ended_at = engine.current_time();

    engine.play();
    assert!(engine.is_playing());
    engine.update();
    assert_eq!(engine.state(), PlaybackState::Ended);
    assert_eq!(engine.current_time(), ended_at);
}

#[test]
fn test_display_frame_is_stable_between_updates() {
    let mut engine = engine_with(thirty_second_clip(), SeekMode::Keyframe);
    engine.play();
    engine.update();
    engine.update();

    let snapshot = engine.display_frame().expect("frame after update").to_packed();
    // Queries do not touch the buffer
    let _ = engine.current_time();
    let _ = engine.duration();
    let _ = engine.is_playing();
    assert_eq!(engine.display_frame().unwrap().to_packed(), snapshot);

    engine.update();
    assert_ne!(engine.display_frame().unwrap().to_packed(), snapshot);
}

#[test]
fn test_display_frame_geometry() {
    let mut engine = engine_with(thirty_second_clip(), SeekMode::Keyframe);
    engine.seek_to(4.0);

    let frame = engine.display_frame().expect("seek materializes a frame");
    assert_eq!((frame.width(), frame.height(), frame.stride()), (WIDTH, HEIGHT, STRIDE));
    assert_eq!(frame.to_packed().len(), DisplayFrame::expected_size(WIDTH, HEIGHT, OutputFormat::Rgb24));
    // Frame 120 sits at 4.0s
    assert_eq!(frame.pixel(0, 0), &[120, 120, 120]);
}

#[test]
fn test_corrupt_packets_are_skipped() {
    let source = thirty_second_clip().corrupt([2, 3]);
    let mut engine = engine_with(source, SeekMode::Keyframe);
    engine.play();

    engine.update(); // frame 0
    engine.update(); // frame 1
    let position = engine.update(); // frames 2 and 3 skipped

    assert!((position.current_time - 4.0 / 30.0).abs() < 1e-9);
    assert!(engine.is_playing());
    assert_eq!(engine.stats().packets_skipped(), 2);
}

#[test]
fn test_corrupt_keyframe_after_seek() {
    let source = thirty_second_clip().corrupt([420]);
    let mut engine = engine_with(source, SeekMode::Keyframe);

    let position = engine.seek_to(15.0);
    assert!((position.current_time - 421.0 / 30.0).abs() < 1e-9);
    assert_eq!(engine.stats().packets_skipped(), 1);
}

#[test]
fn test_seek_with_nothing_decodable_keeps_position() {
    // Everything from the last keyframe (28s) on is corrupt
    let source = thirty_second_clip().corrupt(840..900);
    let mut engine = engine_with(source, SeekMode::Keyframe);
    engine.seek_to(5.0);

    let position = engine.seek_to(29.0);
    assert_eq!(position.current_time, 4.0);
    assert_eq!(engine.state(), PlaybackState::Ready);
}

#[test]
fn test_wedged_decoder_stops_playback() {
    let mut engine = engine_with(thirty_second_clip().stuck_at(3), SeekMode::Keyframe);
    engine.play();
    for _ in 0..3 {
        engine.update();
    }

    let position = engine.update();
    assert_eq!(engine.state(), PlaybackState::Ended);
    assert!((position.current_time - 2.0 / 30.0).abs() < 1e-9);
    assert!(engine.stats().packets_skipped() > 0);

    let skipped = engine.stats().packets_skipped();
    engine.update();
    assert_eq!(engine.stats().packets_skipped(), skipped);
}

#[test]
fn test_wedged_decoder_after_seek_keeps_position() {
    let mut engine = engine_with(thirty_second_clip().stuck_at(500), SeekMode::Keyframe);
    engine.seek_to(6.0);

    let position = engine.seek_to(20.0);
    assert_eq!(position.current_time, 6.0);
    assert_eq!(engine.state(), PlaybackState::Ready);
}

#[test]
fn test_seek_to_end_converts_only_the_landed_frame() {
    let mut engine = engine_with(thirty_second_clip(), SeekMode::Keyframe);
    engine.seek_to(1000.0);

    let source = engine.source().unwrap();
    assert_eq!(source.conversions, 1);
    assert!(source.advance_calls > 1);
    // 899 % 251
    assert_eq!(engine.display_frame().unwrap().pixel(0, 0), &[146; 3]);
}

#[test]
fn test_exact_seek_converts_only_the_landed_frame() {
    let mut engine = engine_with(thirty_second_clip(), SeekMode::Exact);
    engine.seek_to(15.0);
    assert_eq!(engine.source().unwrap().conversions, 1);
    // 450 % 251
    assert_eq!(engine.display_frame().unwrap().pixel(0, 0), &[199; 3]);
}

#[test]
fn test_unsupported_seek_keeps_state_and_position() {
    let mut engine = engine_with(thirty_second_clip().unseekable(), SeekMode::Keyframe);
    engine.play();
    engine.update();
    engine.update();
    let before = engine.position();
    let frame_before = engine.display_frame().unwrap().to_packed();

    assert_eq!(engine.seek_to(12.0), before);
    assert!(engine.is_playing());
    assert_eq!(engine.display_frame().unwrap().to_packed(), frame_before);
    assert_eq!(engine.stats().seeks(), 0);
}

#[test]
fn test_seek_pauses_playback() {
    let mut engine = engine_with(thirty_second_clip(), SeekMode::Keyframe);
    engine.play();
    engine.seek_to(10.0);
    assert_eq!(engine.state(), PlaybackState::Ready);

    // Paused: ticks do nothing
    let position = engine.update();
    assert_eq!(position.current_time, 10.0);
}

#[test]
fn test_seek_from_ended() {
    let mut engine = engine_with(ScriptedSource::clip(4.0, 10.0, 10), SeekMode::Keyframe);
    engine.play();
    while engine.is_playing() {
        engine.update();
    }

    let position = engine.seek_to(1.5);
    assert_eq!(position.current_time, 1.0);
    assert_eq!(engine.state(), PlaybackState::Ready);

    engine.play();
    assert!((engine.update().current_time - 1.1).abs() < 1e-9);
}

#[test]
fn test_keyframe_seek_decodes_once() {
    let mut engine = engine_with(thirty_second_clip(), SeekMode::Keyframe);
    engine.seek_to(15.0);
    assert_eq!(engine.stats().frames_decoded(), 1);
    assert_eq!(engine.stats().seeks(), 1);
}

#[test]
fn test_exact_seek_reaches_target_frame() {
    let mut engine = engine_with(thirty_second_clip(), SeekMode::Exact);

    let position = engine.seek_to(15.0);
    assert!((position.current_time - 15.0).abs() < 1e-9);

    // Between frames: the frame covering the target, never after it
    let position = engine.seek_to(15.05);
    assert!(position.current_time <= 15.05);
    assert!((position.current_time - 451.0 / 30.0).abs() < 1e-9);

    let frame = engine.display_frame().unwrap();
    // 451 % 251
    assert_eq!(frame.pixel(WIDTH - 1, HEIGHT - 1), &[200; 3]);
}

#[test]
fn test_exact_seek_is_idempotent() {
    let mut engine = engine_with(thirty_second_clip(), SeekMode::Exact);
    let a = engine.seek_to(22.22);
    let b = engine.seek_to(22.22);
    assert_eq!(a, b);
    assert!(a.current_time <= 22.22);
    assert!(22.22 - a.current_time < 1.0 / 30.0);
}

#[test]
fn test_restart_keeps_play_state() {
    let mut engine = engine_with(thirty_second_clip(), SeekMode::Keyframe);
    engine.play();
    for _ in 0..30 {
        engine.update();
    }

    let position = engine.restart();
    assert_eq!(position.current_time, 0.0);
    assert!(engine.is_playing());
    assert!((engine.update().current_time - 1.0 / 30.0).abs() < 1e-9);
}

#[test]
fn test_toggle_pause() {
    let mut engine = engine_with(thirty_second_clip(), SeekMode::Keyframe);
    engine.toggle_pause();
    assert!(engine.is_playing());
    engine.update();
    engine.toggle_pause();
    assert!(!engine.is_playing());

    let paused_at = engine.current_time();
    engine.update();
    assert_eq!(engine.current_time(), paused_at);
}

#[test]
fn test_close_returns_to_idle() {
    let mut engine = engine_with(thirty_second_clip(), SeekMode::Keyframe);
    engine.play();
    engine.update();

    engine.close();
    assert_eq!(engine.state(), PlaybackState::Idle);
    assert_eq!(engine.position(), PlaybackPosition::default());
    assert!(engine.display_frame().is_none());
    assert!(engine.info().is_none());
}

#[test]
fn test_attach_replaces_previous_clip() {
    let mut engine = engine_with(thirty_second_clip(), SeekMode::Keyframe);
    engine.play();
    engine.update();

    engine.attach(ScriptedSource::clip(5.0, 25.0, 25));
    assert_eq!(engine.state(), PlaybackState::Ready);
    assert_eq!(engine.duration(), 5.0);
    assert_eq!(engine.current_time(), 0.0);
    assert_eq!(engine.stats().frames_decoded(), 0);
}

#[test]
fn test_scripted_clip_shape() {
    let source = thirty_second_clip();
    assert_eq!(source.frames.len(), 900);
    assert!((source.last_pts() - 899.0 / 30.0).abs() < 1e-9);
    assert_eq!(source.advance_calls, 0);
}
