//! Session configuration and engine tuning parameters
//!
//! `SessionConfig` is the immutable per-session snapshot supplied by the
//! caller on `start`; changing it means tear-down + reconnect (the hot
//! language swap path rebuilds the snapshot internally). `EngineTuning`
//! holds the timing and threshold constants the pipeline runs on.

use serde::{Deserialize, Serialize};

/// Turn-taking mode for the interpretation session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TranslationMode {
    /// Semi-duplex streaming: short bursts sent as soon as the gate seals
    /// them, sends never suppressed by the reply lock
    Simultaneous,
    /// Wait for the speaker to finish, then translate the whole turn
    Sequential,
    /// Conversational with fast tempo forced
    Fluid,
    /// Shadowing a speech or sermon; tone preservation over latency
    Presentation,
}

impl TranslationMode {
    /// Whether this mode streams discrete gated utterances (as opposed to
    /// a continuous frame stream with remote endpointing)
    pub fn is_simultaneous(&self) -> bool {
        matches!(self, TranslationMode::Simultaneous)
    }
}

/// Speaking tempo requested from the provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TranslationTempo {
    Standard,
    Fast,
    Presentation,
}

/// Immutable per-session configuration snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Target language (the other side of the bridge)
    pub language: String,

    /// Turn-taking mode
    pub mode: TranslationMode,

    /// Speaking tempo
    pub tempo: TranslationTempo,

    /// Input device id (`None` = default device)
    #[serde(default)]
    pub mic_device: Option<String>,

    /// Secondary trigger-mic device id
    #[serde(default)]
    pub trigger_device: Option<String>,

    /// Output device id
    #[serde(default)]
    pub speaker_device: Option<String>,

    /// Request input/output transcription events from the provider
    #[serde(default)]
    pub enable_transcription: bool,
}

impl SessionConfig {
    /// Minimal config for a given language and mode, default devices
    pub fn new(language: impl Into<String>, mode: TranslationMode) -> Self {
        Self {
            language: language.into(),
            mode,
            tempo: TranslationTempo::Standard,
            mic_device: None,
            trigger_device: None,
            speaker_device: None,
            enable_transcription: false,
        }
    }
}

/// Timing and threshold constants for the capture/dispatch/playback pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineTuning {
    /// Input sample rate in Hz
    pub input_sample_rate: u32,

    /// Output (synthesized) sample rate in Hz
    pub output_sample_rate: u32,

    /// Samples per capture chunk (20ms at 16kHz)
    pub chunk_samples: usize,

    /// RMS floor above which the energy gate opens for the utterance
    pub gate_open_rms: f32,

    /// Voice probability above which a frame is admitted
    pub vad_admit_threshold: f32,

    /// Buffer length in chunks that forces a flush
    pub burst_threshold_chunks: usize,

    /// Continuous low-voice time that seals a non-empty buffer (endpointing)
    pub endpoint_silence_ms: u64,

    /// Frames of pre-roll retained while the gate is closed
    pub lookback_frames: usize,

    /// Silence appended after a non-simultaneous send to prime remote
    /// endpointing
    pub padding_silence_secs: f32,

    /// Reply-lock watchdog timeout
    pub watchdog_ms: u64,

    /// Reply-lock quick-release timeout (fires only if no reply audio
    /// has started)
    pub quick_release_ms: u64,

    /// Keep-alive silence cadence while awaiting a reply
    pub keepalive_interval_ms: u64,

    /// Samples per keep-alive silence frame
    pub keepalive_samples: usize,

    /// `uploading` dashboard indicator hold time after a send
    pub uploading_hold_ms: u64,

    /// Inactivity window before Connected drops to Sleep
    pub standby_timeout_ms: u64,

    /// Continuous Connected time before the channel is rotated
    pub rotation_interval_ms: u64,

    /// Total outstanding audio above which new segments play fast
    pub pacing_threshold_secs: f32,

    /// Playback rate applied above the pacing threshold
    pub fast_playback_rate: f32,

    /// Cursor drift beyond the output clock that gets clamped back to now
    pub cursor_clamp_secs: f32,

    /// Debounce after the last segment ends before "AI speaking" clears
    pub speech_debounce_ms: u64,

    /// Bound on the inbound segment queue; oldest dropped beyond this
    pub max_queued_segments: usize,

    /// RMS treated as activity in conversational (non-gated) modes
    pub conversational_activity_rms: f32,

    /// Lag history window length
    pub lag_history_len: usize,

    /// Minimum lag samples before a trend is reported
    pub trend_min_samples: usize,

    /// Slope magnitude (lag units per second) separating Stable from
    /// Rising/Falling
    pub trend_slope_threshold: f32,
}

impl Default for EngineTuning {
    fn default() -> Self {
        Self {
            input_sample_rate: 16_000,
            output_sample_rate: 24_000,
            chunk_samples: 320,
            gate_open_rms: 0.005,
            vad_admit_threshold: 0.3,
            burst_threshold_chunks: 12,
            endpoint_silence_ms: 1_500,
            lookback_frames: 2,
            padding_silence_secs: 2.0,
            watchdog_ms: 15_000,
            quick_release_ms: 2_000,
            keepalive_interval_ms: 100,
            keepalive_samples: 2_048,
            uploading_hold_ms: 300,
            standby_timeout_ms: 60_000,
            rotation_interval_ms: 12 * 60 * 1_000,
            pacing_threshold_secs: 15.0,
            fast_playback_rate: 1.1,
            cursor_clamp_secs: 20.0,
            speech_debounce_ms: 150,
            max_queued_segments: 50,
            conversational_activity_rms: 0.01,
            lag_history_len: 20,
            trend_min_samples: 5,
            trend_slope_threshold: 0.5,
        }
    }
}

impl EngineTuning {
    /// Duration of one capture chunk in seconds
    pub fn chunk_secs(&self) -> f32 {
        self.chunk_samples as f32 / self.input_sample_rate as f32
    }

    /// Padding silence length in samples at the input rate
    pub fn padding_samples(&self) -> usize {
        (self.padding_silence_secs * self.input_sample_rate as f32) as usize
    }
}
