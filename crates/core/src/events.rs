//! Event and command types crossing the engine's boundaries
//!
//! Inbound provider traffic is a closed tagged union (`ChannelEvent`) so
//! every message the remote can produce is enumerable in one `match`.
//! Outbound playback is a command stream (`OutputCommand`) consumed by the
//! host audio layer, which keeps the scheduler testable without hardware.

use bytes::Bytes;
use serde::Serialize;
use tokio::time::Instant;

/// Closed set of inbound events a provider channel can deliver
#[derive(Debug, Clone)]
pub enum ChannelEvent {
    /// Connection confirmed open by the provider
    Opened,
    /// A synthesized translated audio segment (PCM16 little-endian mono)
    Audio(Bytes),
    /// Transcription of the user's input audio
    InputTranscript {
        text: String,
        is_final: bool,
    },
    /// Transcription of the model's synthesized output
    OutputTranscript {
        text: String,
        is_final: bool,
    },
    /// The provider cut its own output; queued unplayed audio is invalid
    Interrupted,
    /// The reply turn is complete
    TurnComplete,
    /// Provider-side error, transient unless the channel also closes
    Error(String),
    /// The channel closed
    Closed,
}

/// A channel event tagged with the connection generation it belongs to.
///
/// Rotation and hot swap increment the generation; events still in flight
/// from a superseded channel are discarded on arrival instead of being
/// played out of order.
#[derive(Debug, Clone)]
pub struct TaggedEvent {
    pub generation: u64,
    pub event: ChannelEvent,
}

/// One capture frame as delivered by the host audio layer
#[derive(Debug, Clone)]
pub struct FrameInput {
    /// Mono f32 samples at the input rate
    pub samples: Vec<f32>,
    /// Voice probability from the external VAD, 0.0..=1.0
    pub voice_probability: f32,
}

impl FrameInput {
    pub fn new(samples: Vec<f32>, voice_probability: f32) -> Self {
        Self {
            samples,
            voice_probability,
        }
    }
}

/// Audio pushed to the provider channel
#[derive(Debug, Clone)]
pub enum OutboundAudio {
    /// Captured speech, mono f32 at the input rate
    Pcm(Vec<f32>),
    /// Synthetic silence of the given sample count (endpoint padding and
    /// keep-alive frames)
    Silence(usize),
}

impl OutboundAudio {
    /// Sample count of this payload
    pub fn len(&self) -> usize {
        match self {
            OutboundAudio::Pcm(samples) => samples.len(),
            OutboundAudio::Silence(n) => *n,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Commands emitted to the host audio output layer
#[derive(Debug, Clone)]
pub enum OutputCommand {
    /// Start a segment at `start` with the given playback rate
    Play {
        pcm: Bytes,
        start: Instant,
        rate: f32,
    },
    /// Hard-cut every active and scheduled segment immediately, no fade
    StopAll,
}

/// Traffic-light summary for the dashboard
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TrafficLight {
    /// Line open, listening
    Open,
    /// AI speaking or a reply pending
    Talk,
    /// Capture paused by the user
    Pause,
    /// Auto-standby
    Sleep,
}

/// Instantaneous dashboard snapshot exposed to the UI layer
#[derive(Debug, Clone, Serialize)]
pub struct DashboardSnapshot {
    pub rms: f32,
    pub voice_probability: f32,
    /// True while the admission gate is rejecting frames
    pub gated: bool,
    pub traffic_light: TrafficLight,
    /// Utterance buffer length in chunks
    pub buffer_size: usize,
    /// Scheduled-but-unplayed output in seconds
    pub output_queue_secs: f32,
    pub uploading: bool,
}
