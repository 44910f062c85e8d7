//! Playback state machine tests with a scripted synthesizer and a fake
//! output engine, so no network or sound card is needed.

use sathi_voice::codec::{self, PcmFormat};
use sathi_voice::error::PlaybackError;
use sathi_voice::notification::{Notifier, PLAYBACK_ALERT};
use sathi_voice::playback::{
    ContextState, EndedCallback, OutputBackend, OutputContext, PlaybackBuffer, PlaybackSource,
    TtsPlayer,
};
use sathi_voice::state::{PlaybackState, StateReporter};
use sathi_voice::synth::SpeechSynthesizer;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Everything the fake engine and notifier observed
#[derive(Default)]
struct EngineLog {
    opens: usize,
    resumes: usize,
    closes: usize,
    stops: usize,
    buffers: Vec<PlaybackBuffer>,
    pending_end: Vec<EndedCallback>,
    alerts: Vec<String>,
    transitions: Vec<PlaybackState>,
}

impl EngineLog {
    fn engine_calls(&self) -> usize {
        self.opens + self.resumes + self.closes + self.stops + self.buffers.len()
    }
}

type Log = Arc<Mutex<EngineLog>>;

struct ScriptedSynth(Result<String, String>);

impl SpeechSynthesizer for ScriptedSynth {
    fn synthesize(&self, _text: &str) -> Result<String, PlaybackError> {
        self.0.clone().map_err(PlaybackError::SynthesisFailed)
    }
}

struct FakeBackend {
    log: Log,
    initial: ContextState,
}

impl OutputBackend for FakeBackend {
    fn open(&self, sample_rate: u32) -> Result<Box<dyn OutputContext>, PlaybackError> {
        assert_eq!(sample_rate, 24000);
        self.log.lock().unwrap().opens += 1;
        Ok(Box::new(FakeContext {
            log: self.log.clone(),
            state: self.initial,
        }))
    }
}

struct FakeContext {
    log: Log,
    state: ContextState,
}

impl OutputContext for FakeContext {
    fn state(&self) -> ContextState {
        self.state
    }

    fn resume(&mut self) -> Result<(), PlaybackError> {
        self.log.lock().unwrap().resumes += 1;
        self.state = ContextState::Running;
        Ok(())
    }

    fn start(
        &mut self,
        buffer: PlaybackBuffer,
        on_ended: EndedCallback,
    ) -> Result<Box<dyn PlaybackSource>, PlaybackError> {
        let mut log = self.log.lock().unwrap();
        log.buffers.push(buffer);
        log.pending_end.push(on_ended);
        Ok(Box::new(FakeSource {
            log: self.log.clone(),
        }))
    }

    fn close(&mut self) {
        self.log.lock().unwrap().closes += 1;
        self.state = ContextState::Closed;
    }
}

struct FakeSource {
    log: Log,
}

impl PlaybackSource for FakeSource {
    fn stop(&mut self) {
        self.log.lock().unwrap().stops += 1;
    }
}

struct LogNotifier(Log);

impl Notifier for LogNotifier {
    fn alert(&self, _title: &str, body: &str) {
        self.0.lock().unwrap().alerts.push(body.to_string());
    }
}

fn player_with(synth: Result<String, String>, initial: ContextState) -> (TtsPlayer, Log) {
    let log: Log = Arc::new(Mutex::new(EngineLog::default()));
    let transitions = log.clone();
    let reporter = StateReporter::new(None).with_listener(Arc::new(move |s: PlaybackState| {
        transitions.lock().unwrap().transitions.push(s)
    }));

    let player = TtsPlayer::new(
        Arc::new(ScriptedSynth(synth)),
        Box::new(FakeBackend {
            log: log.clone(),
            initial,
        }),
        Arc::new(LogNotifier(log.clone())),
    )
    .with_reporter(reporter);

    (player, log)
}

/// 48,000 bytes of 0x00,0x40: 24,000 samples of int16 16384
fn half_scale_payload() -> String {
    let bytes: Vec<u8> = std::iter::repeat([0x00u8, 0x40]).take(24_000).flatten().collect();
    assert_eq!(bytes.len(), 48_000);
    codec::encode_base64(&bytes)
}

/// Fire the oldest pending natural-end handler
fn finish_playback(log: &Log) {
    let callback = log.lock().unwrap().pending_end.remove(0);
    callback();
}

#[tokio::test]
async fn plays_decoded_half_scale_buffer() {
    let (mut player, log) = player_with(Ok(half_scale_payload()), ContextState::Running);

    player.play("Take this tablet twice daily").await.unwrap();
    assert_eq!(player.state(), PlaybackState::Playing);
    assert!(player.has_active_source());

    let log = log.lock().unwrap();
    assert_eq!(log.opens, 1);
    assert_eq!(log.buffers.len(), 1);
    let buffer = &log.buffers[0];
    assert_eq!(buffer.sample_rate, 24000);
    assert_eq!(buffer.len(), 24_000);
    assert!(buffer.samples.iter().all(|&s| s == 0.5));
    assert_eq!(
        log.transitions,
        vec![PlaybackState::Loading, PlaybackState::Playing]
    );
}

#[tokio::test]
async fn synthesis_failure_alerts_once_without_touching_engine() {
    let (mut player, log) = player_with(Err("quota exceeded".into()), ContextState::Running);

    let err = player.play("Take this tablet twice daily").await.unwrap_err();
    assert!(matches!(err, PlaybackError::SynthesisFailed(_)));
    assert_eq!(player.state(), PlaybackState::Idle);
    assert!(!player.has_context());

    let log = log.lock().unwrap();
    assert_eq!(
        log.transitions,
        vec![PlaybackState::Loading, PlaybackState::Idle]
    );
    assert_eq!(log.alerts, vec![PLAYBACK_ALERT.to_string()]);
    assert_eq!(log.engine_calls(), 0);
}

#[tokio::test]
async fn odd_length_payload_is_a_decode_failure() {
    let payload = codec::encode_base64(&[0x00, 0x40, 0x00]);
    let (mut player, log) = player_with(Ok(payload), ContextState::Running);

    let err = player.play("hello").await.unwrap_err();
    assert!(matches!(err, PlaybackError::DecodeFailed(_)));
    assert!(err.is_synthesis_failure());
    assert_eq!(player.state(), PlaybackState::Idle);

    let log = log.lock().unwrap();
    assert_eq!(log.alerts.len(), 1);
    assert_eq!(log.engine_calls(), 0);
}

#[tokio::test]
async fn toggle_twice_plays_then_stops() {
    let (mut player, log) = player_with(Ok(half_scale_payload()), ContextState::Running);

    player.toggle("hello").await.unwrap();
    player.toggle("hello").await.unwrap();

    assert_eq!(player.state(), PlaybackState::Idle);
    assert!(!player.has_active_source());

    let log = log.lock().unwrap();
    assert_eq!(
        log.transitions,
        vec![
            PlaybackState::Loading,
            PlaybackState::Playing,
            PlaybackState::Idle
        ]
    );
    assert_eq!(log.buffers.len(), 1);
    assert_eq!(log.stops, 1);
}

#[tokio::test]
async fn play_while_playing_is_rejected() {
    let (mut player, log) = player_with(Ok(half_scale_payload()), ContextState::Running);
    player.play("first").await.unwrap();

    let err = player.play("second").await.unwrap_err();
    assert!(matches!(err, PlaybackError::InvalidState { .. }));
    assert_eq!(player.state(), PlaybackState::Playing);
    assert_eq!(log.lock().unwrap().buffers.len(), 1);
}

#[tokio::test]
async fn natural_end_returns_to_idle_and_reuses_context() {
    let (mut player, log) = player_with(Ok(half_scale_payload()), ContextState::Running);

    player.play("first").await.unwrap();
    finish_playback(&log);
    assert_eq!(player.state(), PlaybackState::Idle);
    assert!(!player.has_active_source());

    player.play("second").await.unwrap();
    assert_eq!(player.state(), PlaybackState::Playing);

    let log = log.lock().unwrap();
    assert_eq!(log.opens, 1);
    assert_eq!(log.buffers.len(), 2);
}

#[tokio::test]
async fn stale_end_event_does_not_stop_newer_playback() {
    let (mut player, log) = player_with(Ok(half_scale_payload()), ContextState::Running);

    player.play("first").await.unwrap();
    assert!(player.stop());
    player.play("second").await.unwrap();

    // End event from the first, already stopped, source
    finish_playback(&log);
    assert_eq!(player.state(), PlaybackState::Playing);
    assert!(player.has_active_source());

    finish_playback(&log);
    assert_eq!(player.state(), PlaybackState::Idle);
}

#[tokio::test]
async fn wait_until_idle_wakes_on_natural_end() {
    let (mut player, log) = player_with(Ok(half_scale_payload()), ContextState::Running);
    player.play("hello").await.unwrap();
    let mut states = player.subscribe();
    assert_eq!(*states.borrow_and_update(), PlaybackState::Playing);

    // The engine reports the end from its own thread
    let callback = log.lock().unwrap().pending_end.remove(0);
    let engine = std::thread::spawn(move || {
        std::thread::sleep(Duration::from_millis(20));
        callback();
    });

    tokio::time::timeout(Duration::from_secs(5), player.wait_until_idle())
        .await
        .expect("player never returned to idle");
    engine.join().unwrap();

    assert!(states.has_changed().unwrap());
    assert_eq!(*states.borrow(), PlaybackState::Idle);
}

#[tokio::test]
async fn wait_until_idle_returns_at_once_when_idle() {
    let (player, _log) = player_with(Ok(half_scale_payload()), ContextState::Running);
    tokio::time::timeout(Duration::from_millis(100), player.wait_until_idle())
        .await
        .unwrap();
}

#[tokio::test]
async fn suspended_context_is_resumed_before_playing() {
    let (mut player, log) = player_with(Ok(half_scale_payload()), ContextState::Suspended);

    player.play("hello").await.unwrap();
    assert_eq!(log.lock().unwrap().resumes, 1);
}

#[tokio::test]
async fn stop_when_idle_is_noop() {
    let (mut player, log) = player_with(Ok(half_scale_payload()), ContextState::Running);
    assert!(!player.stop());
    assert!(log.lock().unwrap().transitions.is_empty());
}

#[tokio::test]
async fn drop_stops_source_and_closes_context() {
    let (mut player, log) = player_with(Ok(half_scale_payload()), ContextState::Running);
    player.play("hello").await.unwrap();
    drop(player);

    let log = log.lock().unwrap();
    assert_eq!(log.stops, 1);
    assert_eq!(log.closes, 1);
}

#[test]
fn playback_buffer_matches_payload_layout() {
    let ints: Vec<i16> = vec![i16::MIN, -12345, 0, 1, 12345, i16::MAX];
    let payload = codec::encode_base64(&codec::i16_to_le_bytes(&ints));

    let buffer = PlaybackBuffer::from_base64(&payload, &PcmFormat::TTS_V1).unwrap();
    assert_eq!(buffer.len(), ints.len());
    for (sample, int) in buffer.samples.iter().zip(&ints) {
        assert_eq!(*sample, *int as f32 / 32768.0);
        assert!((-1.0..1.0).contains(sample));
    }
}
