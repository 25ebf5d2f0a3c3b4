//! Session orchestrator and lifecycle state machine
//!
//! One owning struct holds every piece of mutable session state and every
//! timer; callbacks (frames, channel events, ticks) are methods taking
//! `&mut self`, so they interleave in time but never observe each other
//! mid-mutation. Each callback re-reads the live connection state rather
//! than a cached value: state can change between frames (mid-utterance
//! Connected -> Sleep is legal) and stale-state processing is a
//! correctness bug.
//!
//! Lifecycle: Disconnected -> Connecting -> Connected; 60s of inactivity
//! drops Connected to Sleep with the mic and VAD kept warm; a voice onset
//! wakes through Reconnecting without re-requesting mic permission. Manual
//! stop is the only transition that releases every resource.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use tokio::sync::mpsc;
use tokio::time::{Duration, Instant};

use crate::arbiter::{MutexState, SourceArbiter};
use crate::capture::{shape_frame, CaptureGate, FrameContext, GateDecision};
use crate::channel::{ChannelManager, ProviderConnector};
use crate::config::{EngineTuning, SessionConfig};
use crate::dispatch::{FlushOutcome, UtteranceDispatcher};
use crate::error::{Error, Result};
use crate::events::{
    ChannelEvent, DashboardSnapshot, FrameInput, OutboundAudio, OutputCommand, TaggedEvent,
    TrafficLight,
};
use crate::metrics::{LagTrend, MetricsEstimator};
use crate::playback::PlaybackScheduler;
use crate::transcript::{TranscriptItem, TranscriptLog, TranscriptRole};

/// Connection state of the session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    /// Provider released, mic and VAD warm, auto-wake armed
    Sleep,
    Reconnecting,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ConnectionState::Disconnected => "DISCONNECTED",
            ConnectionState::Connecting => "CONNECTING",
            ConnectionState::Connected => "CONNECTED",
            ConnectionState::Sleep => "SLEEP",
            ConnectionState::Reconnecting => "RECONNECTING",
        };
        f.write_str(s)
    }
}

/// Host audio resources: microphone stream, analyser, output contexts.
/// Acquisition failure is fatal to a start attempt; release happens only
/// on manual stop, never on sleep.
#[async_trait]
pub trait AudioBackend: Send {
    async fn acquire(&mut self, config: &SessionConfig) -> Result<()>;
    fn release(&mut self);
}

/// Backend for embedders that drive frames in from elsewhere
pub struct NullAudioBackend;

#[async_trait]
impl AudioBackend for NullAudioBackend {
    async fn acquire(&mut self, _config: &SessionConfig) -> Result<()> {
        Ok(())
    }
    fn release(&mut self) {}
}

/// The session engine: owns capture, dispatch, channel, playback,
/// arbitration and telemetry for one live interpretation session
pub struct SessionEngine {
    tuning: EngineTuning,
    state: ConnectionState,
    config: Option<SessionConfig>,

    backend: Box<dyn AudioBackend>,
    channel: ChannelManager,
    events_rx: Option<mpsc::UnboundedReceiver<TaggedEvent>>,

    gate: CaptureGate,
    dispatcher: UtteranceDispatcher,
    playback: PlaybackScheduler,
    arbiter: SourceArbiter,
    metrics: MetricsEstimator,
    transcript: TranscriptLog,

    paused: bool,
    muted: bool,

    /// Deferred hot swap target; admission is suspended while set
    pending_language: Option<String>,

    /// Inbound audio ignored until a swap completes
    ignore_audio: bool,

    /// Auto-standby deadline; re-armed on any admitted frame, flush or
    /// playback start
    standby_due: Option<Instant>,

    manually_stopped: bool,
    status: String,

    /// Playback commands awaiting the host audio layer
    outbox: Vec<OutputCommand>,
}

impl SessionEngine {
    pub fn new(
        connector: Arc<dyn ProviderConnector>,
        backend: Box<dyn AudioBackend>,
        tuning: EngineTuning,
    ) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        Self {
            channel: ChannelManager::new(connector, events_tx, tuning.clone()),
            events_rx: Some(events_rx),
            gate: CaptureGate::new(tuning.clone()),
            dispatcher: UtteranceDispatcher::new(tuning.clone()),
            playback: PlaybackScheduler::new(tuning.clone()),
            arbiter: SourceArbiter::new(),
            metrics: MetricsEstimator::new(tuning.clone()),
            transcript: TranscriptLog::new(),
            tuning,
            state: ConnectionState::Disconnected,
            config: None,
            backend,
            paused: false,
            muted: false,
            pending_language: None,
            ignore_audio: false,
            standby_due: None,
            manually_stopped: false,
            status: "system ready".to_string(),
            outbox: Vec::new(),
        }
    }

    /// Take the inbound channel-event receiver; the driver loop owns it
    pub fn take_events(&mut self) -> Option<mpsc::UnboundedReceiver<TaggedEvent>> {
        self.events_rx.take()
    }

    // ------------------------------------------------------------------
    // Lifecycle operations
    // ------------------------------------------------------------------

    /// Start a session with the given config snapshot
    pub async fn start(&mut self, config: SessionConfig) -> Result<()> {
        let now = Instant::now();
        if matches!(
            self.state,
            ConnectionState::Connecting | ConnectionState::Reconnecting
        ) {
            return Err(Error::InvalidState {
                op: "start",
                state: self.state.to_string(),
            });
        }
        if config.language.trim().is_empty() {
            return Err(Error::Config("target language must not be empty".to_string()));
        }

        self.manually_stopped = false;

        if let Err(e) = self.backend.acquire(&config).await {
            self.state = ConnectionState::Disconnected;
            self.status = "audio setup failed".to_string();
            tracing::error!(error = %e, "audio resource acquisition failed");
            return Err(Error::AudioResource(e.to_string()));
        }

        self.state = ConnectionState::Connecting;
        self.status = "connecting".to_string();

        match self.channel.open(&config, now).await {
            Ok(()) => {
                self.config = Some(config);
                self.state = ConnectionState::Connected;
                self.reset_standby(now);
                self.status = "listening".to_string();
                Ok(())
            }
            Err(e) => {
                self.backend.release();
                self.state = ConnectionState::Disconnected;
                self.status = "connect failed".to_string();
                Err(e)
            }
        }
    }

    /// Stop the session. `hard` releases every resource and is
    /// irreversible without a full restart; soft stop is the standby path
    /// (mic warm, auto-wake armed). Output silences immediately either way.
    pub async fn stop(&mut self, hard: bool) {
        if !hard && self.state == ConnectionState::Disconnected {
            return;
        }

        self.dispatcher.clear();
        self.outbox.extend(self.playback.hard_stop());
        self.standby_due = None;
        self.gate.reset();
        self.pending_language = None;
        self.ignore_audio = false;
        self.metrics.reset();
        self.channel.close().await;

        if hard {
            self.manually_stopped = true;
            self.backend.release();
            self.transcript.clear();
            self.paused = false;
            self.muted = false;
            self.state = ConnectionState::Disconnected;
            self.status = "disconnected".to_string();
            tracing::info!("session stopped");
        } else {
            self.state = ConnectionState::Sleep;
            self.status = "standby (listening)".to_string();
            tracing::info!("entering standby, mic stays warm");
        }
    }

    /// Hot language swap. Deferred while reply audio is playing so a
    /// sentence is never cut mid-word; otherwise swaps immediately.
    pub async fn set_language(&mut self, language: impl Into<String>) {
        let language = language.into();
        if self.state == ConnectionState::Disconnected {
            return;
        }
        if self.playback.ai_speaking() {
            tracing::info!(language = %language, "swap deferred until playback empties");
            self.pending_language = Some(language);
            return;
        }
        self.execute_swap(language, Instant::now()).await;
    }

    async fn execute_swap(&mut self, language: String, now: Instant) {
        let mut config = match self.config.clone() {
            Some(c) => c,
            None => return,
        };
        config.language = language.clone();
        self.pending_language = None;

        // Queued unplayed audio is in the old language; drop it
        let commands = self.playback.interrupt(now);
        self.outbox.extend(commands);
        self.ignore_audio = true;
        self.state = ConnectionState::Reconnecting;
        self.status = format!("switching to {language}");

        match self.channel.replace(&config, now).await {
            Ok(()) => {
                self.config = Some(config);
                self.state = ConnectionState::Connected;
                self.ignore_audio = false;
                self.reset_standby(now);
                self.status = format!("swapped: {language}");
            }
            Err(e) => {
                // Fail open: whatever was running before the attempt keeps
                // running; a swap from standby falls back to standby so
                // voice wake still works
                tracing::warn!(error = %e, "language swap failed, keeping session");
                self.state = if self.channel.is_open() {
                    ConnectionState::Connected
                } else {
                    ConnectionState::Sleep
                };
                self.ignore_audio = false;
                self.status = "swap failed".to_string();
            }
        }
    }

    // ------------------------------------------------------------------
    // Per-frame and per-event callbacks
    // ------------------------------------------------------------------

    /// One capture frame from the host audio layer
    pub async fn on_frame(&mut self, frame: FrameInput) {
        let now = Instant::now();

        // Re-read the live state; it may have changed since the last frame
        if self.state != ConnectionState::Connected {
            return;
        }
        let mode = match self.config.as_ref() {
            Some(c) => c.mode,
            None => return,
        };
        let suppressed = self.muted || self.arbiter.is_locked();

        if mode.is_simultaneous() {
            let ctx = FrameContext {
                suppressed,
                paused: self.paused,
                swap_pending: self.pending_language.is_some(),
                now,
            };
            match self.gate.ingest(&frame, &ctx) {
                GateDecision::Admitted => self.reset_standby(now),
                GateDecision::FlushBurst | GateDecision::FlushEndpoint => {
                    self.reset_standby(now);
                    self.try_flush(now).await;
                }
                GateDecision::Discarded => {
                    if self.paused {
                        self.dispatcher.release_lock();
                    }
                }
                GateDecision::Idle => {}
            }
        } else {
            // Conversational modes stream frames straight through; the
            // provider does its own endpointing
            if self.paused {
                self.dispatcher.release_lock();
                return;
            }
            let (shaped, rms) = shape_frame(&frame.samples, suppressed);
            if !suppressed {
                if let Err(e) = self.channel.send(OutboundAudio::Pcm(shaped)).await {
                    tracing::debug!(error = %e, "frame send failed");
                }
                if rms > self.tuning.conversational_activity_rms {
                    self.reset_standby(now);
                }
            }
        }
    }

    /// Alternate capture source: 48kHz frame pushed by the gateway
    pub async fn on_gateway_frame(&mut self, samples: &[f32], voice_probability: f32) {
        let decimated = SourceArbiter::decimate_gateway_frame(samples);
        self.on_frame(FrameInput::new(decimated, voice_probability))
            .await;
    }

    /// Voice-activity onset from the external VAD; wakes a sleeping session
    pub async fn on_voice_onset(&mut self) {
        if self.manually_stopped || self.state != ConnectionState::Sleep {
            return;
        }
        let config = match self.config.clone() {
            Some(c) => c,
            None => return,
        };
        let now = Instant::now();
        self.state = ConnectionState::Reconnecting;
        self.status = "auto-waking".to_string();
        match self.channel.open(&config, now).await {
            Ok(()) => {
                self.state = ConnectionState::Connected;
                self.reset_standby(now);
                self.status = "listening".to_string();
            }
            Err(e) => {
                tracing::warn!(error = %e, "auto-wake failed, staying in standby");
                self.state = ConnectionState::Sleep;
                self.status = "wake failed".to_string();
            }
        }
    }

    /// Explicit external flush: seals the current buffer immediately,
    /// bypassing the endpoint silence window. Hosts that want pure
    /// energy-based endpointing should not wire their VAD end-signal
    /// here; the gate's own silence timer covers that path.
    pub async fn on_voice_offset(&mut self) {
        if self.state == ConnectionState::Connected
            && self.config.as_ref().is_some_and(|c| c.mode.is_simultaneous())
        {
            self.try_flush(Instant::now()).await;
        }
    }

    /// Inbound event from the provider channel
    pub async fn on_channel_event(&mut self, ev: TaggedEvent) {
        let now = Instant::now();

        if !self.channel.accepts(&ev) {
            tracing::debug!(
                generation = ev.generation,
                live = self.channel.generation(),
                "dropping stale channel event"
            );
            return;
        }

        match ev.event {
            ChannelEvent::Opened => {
                // connect() resolves on open; nothing further to do
            }
            ChannelEvent::Audio(pcm) => {
                if self.ignore_audio {
                    return;
                }
                // The genuine reply wins the lock and cancels both timers
                self.dispatcher.on_reply_audio();
                self.playback.enqueue(pcm);
                let input_secs = self.gate.buffered_secs();
                let commands = self.playback.pump(now, input_secs);
                self.outbox.extend(commands);
                // Playback start re-arms the inactivity window
                self.reset_standby(now);
                self.status = "translating".to_string();
            }
            ChannelEvent::InputTranscript { text, is_final } => {
                self.transcript.append(TranscriptRole::User, &text);
                if is_final {
                    self.transcript.finalize_turn();
                }
                // User speech observed remotely counts as activity
                self.reset_standby(now);
            }
            ChannelEvent::OutputTranscript { text, is_final } => {
                self.transcript.append(TranscriptRole::Model, &text);
                if is_final {
                    self.transcript.finalize_turn();
                }
            }
            ChannelEvent::Interrupted => {
                let commands = self.playback.interrupt(now);
                self.outbox.extend(commands);
                self.transcript.finalize_turn();
                self.status = "interrupted".to_string();
            }
            ChannelEvent::TurnComplete => {
                self.dispatcher.on_turn_complete();
                self.transcript.finalize_turn();
                if !self.playback.ai_speaking() {
                    self.status = "ready".to_string();
                }
            }
            ChannelEvent::Error(msg) => {
                // Transient: the session stays up and the in-flight send is
                // not retried
                if msg.contains("429") || msg.to_ascii_lowercase().contains("rate") {
                    self.status = "rate limited".to_string();
                } else {
                    self.status = "provider error".to_string();
                }
                tracing::warn!(error = %msg, "provider error, session preserved");
            }
            ChannelEvent::Closed => {
                if self.state == ConnectionState::Reconnecting || self.manually_stopped {
                    return;
                }
                // Mic stays warm so a voice onset wakes us back up
                tracing::warn!("channel closed unexpectedly, entering standby");
                self.stop(false).await;
            }
        }
    }

    /// Timer tick: dispatcher timers, playback retirement, auto-standby,
    /// rotation and telemetry. Called on a ~100ms cadence by the driver.
    pub async fn on_tick(&mut self) {
        let now = Instant::now();

        let dispatch = self.dispatcher.tick(now, self.playback.ai_speaking());
        if dispatch.send_keepalive && self.channel.is_open() {
            let samples = self.dispatcher.keepalive_samples();
            if let Err(e) = self.channel.send(OutboundAudio::Silence(samples)).await {
                tracing::debug!(error = %e, "keep-alive send failed");
            }
        }
        if dispatch.watchdog_fired {
            self.status = "watchdog reset".to_string();
        }
        if dispatch.quick_release_fired {
            self.status = "quick release".to_string();
        }

        let playback = self.playback.tick(now);
        if playback.speech_ended {
            self.dispatcher.release_lock();
            self.reset_standby(now);
            self.status = "reply finished".to_string();
            if let Some(language) = self.pending_language.take() {
                self.execute_swap(language, now).await;
            }
        }

        if self.state == ConnectionState::Connected {
            if let Some(due) = self.standby_due {
                if now >= due && !self.playback.ai_speaking() {
                    tracing::info!("auto-standby after inactivity");
                    self.stop(false).await;
                }
            }
        }

        if self.state == ConnectionState::Connected && self.channel.rotation_due(now) {
            self.rotate(now).await;
        }

        let lag = self.total_lag_at(now);
        self.metrics.record(now, lag);
    }

    /// Mutex ownership change pushed by the gateway
    pub fn on_mutex_change(&mut self, state: MutexState) {
        self.arbiter.on_mutex_change(state);
        self.status = self.arbiter.status().to_string();
    }

    /// Explicit flush request (mode switch, pause transition)
    pub async fn flush_now(&mut self) {
        self.try_flush(Instant::now()).await;
    }

    pub fn toggle_pause(&mut self) {
        self.paused = !self.paused;
    }

    pub fn toggle_mute(&mut self) {
        self.muted = !self.muted;
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    async fn try_flush(&mut self, now: Instant) {
        if self.gate.is_empty() {
            return;
        }
        let mode = match self.config.as_ref() {
            Some(c) => c.mode,
            None => return,
        };
        let swap_pending = self.pending_language.is_some();
        // The buffer survives a suppressed flush attempt
        if swap_pending || (!mode.is_simultaneous() && self.dispatcher.is_awaiting_reply()) {
            return;
        }

        let chunks = self.gate.len();
        let combined = self.gate.take_buffer();
        match self.dispatcher.flush(combined, chunks, mode, swap_pending, now) {
            FlushOutcome::Sent { payload, chunks } => {
                for part in payload {
                    if let Err(e) = self.channel.send(part).await {
                        // Transient: surfaced as status, never auto-retried
                        tracing::warn!(error = %e, "utterance send failed");
                        self.status = "send failed".to_string();
                        return;
                    }
                }
                self.status = format!("sent {chunks} chunks");
                self.reset_standby(now);
            }
            FlushOutcome::SuppressedByLock | FlushOutcome::SwapPending | FlushOutcome::Empty => {}
        }
    }

    async fn rotate(&mut self, now: Instant) {
        let config = match self.config.clone() {
            Some(c) => c,
            None => return,
        };
        self.status = "rotating session".to_string();
        match self.channel.replace(&config, now).await {
            Ok(()) => {
                self.status = "session extended".to_string();
            }
            Err(e) => {
                tracing::warn!(error = %e, "rotation failed, keeping existing session");
                self.status = "rotation failed".to_string();
            }
        }
    }

    fn reset_standby(&mut self, now: Instant) {
        if self.state == ConnectionState::Connected {
            self.standby_due =
                Some(now + Duration::from_millis(self.tuning.standby_timeout_ms));
        }
    }

    fn total_lag_at(&self, now: Instant) -> f32 {
        self.playback.output_queue_secs(now) + self.gate.buffered_secs()
    }

    // ------------------------------------------------------------------
    // Exposed state for the UI layer
    // ------------------------------------------------------------------

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn ai_speaking(&self) -> bool {
        self.playback.ai_speaking()
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn is_muted(&self) -> bool {
        self.muted
    }

    pub fn status(&self) -> &str {
        &self.status
    }

    pub fn mutex_state(&self) -> &MutexState {
        self.arbiter.state()
    }

    /// Total lag in seconds: queued output plus unflushed input
    pub fn total_lag(&self) -> f32 {
        self.total_lag_at(Instant::now())
    }

    pub fn lag_trend(&self) -> LagTrend {
        self.metrics.trend()
    }

    pub fn efficiency(&self) -> f32 {
        self.metrics.efficiency()
    }

    pub fn transcript(&self) -> &[TranscriptItem] {
        self.transcript.items()
    }

    pub fn last_burst_chunks(&self) -> usize {
        self.dispatcher.last_burst_chunks()
    }

    /// Current channel generation (stale-event fencing)
    pub fn generation(&self) -> u64 {
        self.channel.generation()
    }

    /// Instantaneous dashboard snapshot
    pub fn dashboard(&self) -> DashboardSnapshot {
        let now = Instant::now();
        let traffic_light = if self.state == ConnectionState::Sleep {
            TrafficLight::Sleep
        } else if self.paused {
            TrafficLight::Pause
        } else if self.playback.ai_speaking() || self.dispatcher.is_awaiting_reply() {
            TrafficLight::Talk
        } else {
            TrafficLight::Open
        };

        DashboardSnapshot {
            rms: self.gate.last_rms(),
            voice_probability: self.gate.last_voice_probability(),
            gated: self.gate.is_gated(),
            traffic_light,
            buffer_size: self.gate.len(),
            output_queue_secs: self.playback.output_queue_secs(now),
            uploading: self.dispatcher.is_uploading(now),
        }
    }

    /// Drain pending playback commands for the host audio layer
    pub fn drain_output(&mut self) -> Vec<OutputCommand> {
        std::mem::take(&mut self.outbox)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};

    struct TestConnector {
        fail_next: AtomicBool,
    }

    struct TestSession;

    #[async_trait]
    impl crate::channel::ProviderSession for TestSession {
        async fn send_audio(&mut self, _audio: OutboundAudio) -> Result<()> {
            Ok(())
        }
        async fn close(&mut self) -> Result<()> {
            Ok(())
        }
    }

    #[async_trait]
    impl ProviderConnector for TestConnector {
        async fn connect(
            &self,
            _config: &SessionConfig,
            _generation: u64,
            _events: mpsc::UnboundedSender<TaggedEvent>,
        ) -> Result<Box<dyn crate::channel::ProviderSession>> {
            if self.fail_next.swap(false, Ordering::SeqCst) {
                return Err(Error::ChannelConnect("scripted".to_string()));
            }
            Ok(Box::new(TestSession))
        }
    }

    struct FailingBackend;

    #[async_trait]
    impl AudioBackend for FailingBackend {
        async fn acquire(&mut self, _config: &SessionConfig) -> Result<()> {
            Err(Error::AudioResource("permission denied".to_string()))
        }
        fn release(&mut self) {}
    }

    fn engine() -> SessionEngine {
        SessionEngine::new(
            Arc::new(TestConnector {
                fail_next: AtomicBool::new(false),
            }),
            Box::new(NullAudioBackend),
            EngineTuning::default(),
        )
    }

    fn config() -> SessionConfig {
        SessionConfig::new("german", crate::config::TranslationMode::Simultaneous)
    }

    #[tokio::test]
    async fn test_start_reaches_connected() {
        let mut e = engine();
        e.start(config()).await.unwrap();
        assert_eq!(e.state(), ConnectionState::Connected);
        assert_eq!(e.generation(), 1);
    }

    #[tokio::test]
    async fn test_mic_failure_is_fatal_to_start() {
        let mut e = SessionEngine::new(
            Arc::new(TestConnector {
                fail_next: AtomicBool::new(false),
            }),
            Box::new(FailingBackend),
            EngineTuning::default(),
        );
        let err = e.start(config()).await;
        assert!(matches!(err, Err(Error::AudioResource(_))));
        assert_eq!(e.state(), ConnectionState::Disconnected);
    }

    #[tokio::test]
    async fn test_connect_failure_falls_back_to_disconnected() {
        let mut e = SessionEngine::new(
            Arc::new(TestConnector {
                fail_next: AtomicBool::new(true),
            }),
            Box::new(NullAudioBackend),
            EngineTuning::default(),
        );
        assert!(e.start(config()).await.is_err());
        assert_eq!(e.state(), ConnectionState::Disconnected);
    }

    #[tokio::test]
    async fn test_mutex_locked_admits_nothing() {
        let mut e = engine();
        e.start(config()).await.unwrap();
        e.on_mutex_change(MutexState::Locked {
            owner: "pulpit".to_string(),
        });

        for _ in 0..20 {
            e.on_frame(FrameInput::new(vec![0.5; 320], 0.99)).await;
        }
        assert_eq!(e.dashboard().buffer_size, 0);
    }

    #[tokio::test]
    async fn test_stop_soft_enters_sleep_and_hard_disconnects() {
        let mut e = engine();
        e.start(config()).await.unwrap();

        e.stop(false).await;
        assert_eq!(e.state(), ConnectionState::Sleep);

        e.stop(true).await;
        assert_eq!(e.state(), ConnectionState::Disconnected);
    }

    #[tokio::test]
    async fn test_voice_onset_wakes_from_sleep() {
        let mut e = engine();
        e.start(config()).await.unwrap();
        e.stop(false).await;
        assert_eq!(e.state(), ConnectionState::Sleep);

        e.on_voice_onset().await;
        assert_eq!(e.state(), ConnectionState::Connected);
        // Fresh connection, fresh generation
        assert_eq!(e.generation(), 2);
    }

    #[tokio::test]
    async fn test_voice_onset_ignored_after_manual_stop() {
        let mut e = engine();
        e.start(config()).await.unwrap();
        e.stop(true).await;

        e.on_voice_onset().await;
        assert_eq!(e.state(), ConnectionState::Disconnected);
    }

    #[tokio::test]
    async fn test_empty_language_rejected() {
        let mut e = engine();
        let err = e
            .start(SessionConfig::new(
                "  ",
                crate::config::TranslationMode::Simultaneous,
            ))
            .await;
        assert!(matches!(err, Err(Error::Config(_))));
        assert_eq!(e.state(), ConnectionState::Disconnected);
    }

    #[tokio::test]
    async fn test_set_language_ignored_while_disconnected() {
        let mut e = engine();
        e.set_language("french").await;
        assert_eq!(e.state(), ConnectionState::Disconnected);
    }
}
