//! VoiceBridge core: the runtime engine of a live speech-to-speech
//! interpretation client.
//!
//! The engine sits between a host audio layer (microphone frames in,
//! playback commands out) and a remote interpretation provider reached
//! through the [`channel::ProviderConnector`] seam. It owns:
//!
//! - capture gating and utterance segmentation ([`capture`])
//! - utterance dispatch with reply-lock recovery timers ([`dispatch`])
//! - the provider channel, its rotation and hot language swaps
//!   ([`channel`])
//! - gapless pacing-aware playback scheduling ([`playback`])
//! - the session lifecycle state machine with auto-standby and voice
//!   wake ([`session`])
//! - multi-source speaker arbitration ([`arbiter`])
//! - lag telemetry and the live transcript ([`metrics`], [`transcript`])
//!
//! Embedders either drive a [`session::SessionEngine`] directly from
//! their own loop, or spawn it behind a [`runner::EngineHandle`].
//!
//! ```no_run
//! use std::sync::Arc;
//! use voicebridge_core::{runner, EngineTuning, SessionConfig, SessionEngine, TranslationMode};
//! use voicebridge_core::session::NullAudioBackend;
//! # use voicebridge_core::channel::ProviderConnector;
//! # async fn example(connector: Arc<dyn ProviderConnector>) -> voicebridge_core::Result<()> {
//! let engine = SessionEngine::new(connector, Box::new(NullAudioBackend), EngineTuning::default());
//! let (handle, mut playback, _task) = runner::spawn(engine);
//! handle.start(SessionConfig::new("german", TranslationMode::Simultaneous)).await?;
//! # Ok(())
//! # }
//! ```

pub mod arbiter;
pub mod capture;
pub mod channel;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod events;
pub mod metrics;
pub mod playback;
pub mod runner;
pub mod session;
pub mod transcript;

pub use arbiter::MutexState;
pub use config::{EngineTuning, SessionConfig, TranslationMode, TranslationTempo};
pub use error::{Error, Result};
pub use events::{
    ChannelEvent, DashboardSnapshot, FrameInput, OutboundAudio, OutputCommand, TaggedEvent,
    TrafficLight,
};
pub use metrics::LagTrend;
pub use runner::{EngineCommand, EngineHandle};
pub use session::{AudioBackend, ConnectionState, SessionEngine};
pub use transcript::{TranscriptItem, TranscriptRole};
