//! Scripted in-process provider for integration tests
//!
//! Records every connect, send and close; connects can be scripted to
//! fail. Tests emit provider events through the connector, which tags
//! them with the generation of the session they belong to, exactly the
//! way a real transport would.

use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use tokio::sync::mpsc;
use voicebridge_core::channel::{ProviderConnector, ProviderSession};
use voicebridge_core::session::{NullAudioBackend, SessionEngine};
use voicebridge_core::{
    ChannelEvent, EngineTuning, Error, OutboundAudio, Result, SessionConfig, TaggedEvent,
};

/// One recorded outbound payload
#[derive(Debug, Clone, PartialEq, Eq)]
#[allow(dead_code)]
pub enum SentAudio {
    /// Captured PCM, sample count
    Pcm(usize),
    /// Synthetic silence, sample count
    Silence(usize),
}

#[derive(Default)]
struct MockState {
    /// Target language of each successful connect, in order
    connects: Vec<String>,
    sent: Vec<SentAudio>,
    closed: usize,
    /// Upcoming connects that fail before a session is produced
    fail_connects: usize,
    fail_sends: bool,
    /// Event sender and generation of every successful connect
    channels: Vec<(u64, mpsc::UnboundedSender<TaggedEvent>)>,
}

pub struct MockConnector {
    state: Arc<Mutex<MockState>>,
}

#[allow(dead_code)]
impl MockConnector {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            state: Arc::new(Mutex::new(MockState::default())),
        })
    }

    /// Script the next `n` connects to fail
    pub fn fail_next_connects(&self, n: usize) {
        self.lock().fail_connects = n;
    }

    /// Script every future send to fail
    pub fn fail_sends(&self, fail: bool) {
        self.lock().fail_sends = fail;
    }

    /// Emit a provider event on the most recent session's channel
    pub fn emit(&self, event: ChannelEvent) {
        let state = self.lock();
        if let Some((generation, tx)) = state.channels.last() {
            let _ = tx.send(TaggedEvent {
                generation: *generation,
                event,
            });
        }
    }

    /// Emit on a specific (possibly superseded) session's channel
    pub fn emit_for(&self, generation: u64, event: ChannelEvent) {
        let state = self.lock();
        if let Some((generation, tx)) = state.channels.iter().find(|(g, _)| *g == generation) {
            let _ = tx.send(TaggedEvent {
                generation: *generation,
                event,
            });
        }
    }

    pub fn connect_count(&self) -> usize {
        self.lock().connects.len()
    }

    /// Target languages of successful connects, in order
    pub fn connect_languages(&self) -> Vec<String> {
        self.lock().connects.clone()
    }

    pub fn close_count(&self) -> usize {
        self.lock().closed
    }

    pub fn sent(&self) -> Vec<SentAudio> {
        self.lock().sent.clone()
    }

    pub fn clear_sent(&self) {
        self.lock().sent.clear();
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap()
    }
}

#[async_trait]
impl ProviderConnector for MockConnector {
    async fn connect(
        &self,
        config: &SessionConfig,
        generation: u64,
        events: mpsc::UnboundedSender<TaggedEvent>,
    ) -> Result<Box<dyn ProviderSession>> {
        let mut state = self.lock();
        if state.fail_connects > 0 {
            state.fail_connects -= 1;
            return Err(Error::ChannelConnect("scripted connect failure".to_string()));
        }
        state.connects.push(config.language.clone());
        state.channels.push((generation, events));
        Ok(Box::new(MockSession {
            state: self.state.clone(),
        }))
    }
}

struct MockSession {
    state: Arc<Mutex<MockState>>,
}

#[async_trait]
impl ProviderSession for MockSession {
    async fn send_audio(&mut self, audio: OutboundAudio) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        if state.fail_sends {
            return Err(Error::ChannelSend("scripted send failure".to_string()));
        }
        state.sent.push(match audio {
            OutboundAudio::Pcm(samples) => SentAudio::Pcm(samples.len()),
            OutboundAudio::Silence(n) => SentAudio::Silence(n),
        });
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        self.state.lock().unwrap().closed += 1;
        Ok(())
    }
}

/// Opt-in test logging: `RUST_LOG=voicebridge_core=debug cargo test`
#[allow(dead_code)]
pub fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Engine wired to a mock provider with the in-memory audio backend
#[allow(dead_code)]
pub fn engine_with(connector: Arc<MockConnector>) -> SessionEngine {
    init_logging();
    SessionEngine::new(connector, Box::new(NullAudioBackend), EngineTuning::default())
}

/// Deliver every queued provider event to the engine
#[allow(dead_code)]
pub async fn pump_events(
    engine: &mut SessionEngine,
    events: &mut mpsc::UnboundedReceiver<TaggedEvent>,
) {
    while let Ok(event) = events.try_recv() {
        engine.on_channel_event(event).await;
    }
}
