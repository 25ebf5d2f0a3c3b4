//! Engine driver loop
//!
//! Owns the `SessionEngine` on a single task and serializes everything
//! that touches it: caller commands, inbound channel events and the timer
//! tick all pass through one `select!`. Playback commands drained after
//! each step are forwarded to the host audio layer over an unbounded
//! channel.

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{Duration, MissedTickBehavior};

use crate::arbiter::MutexState;
use crate::config::SessionConfig;
use crate::error::{Error, Result};
use crate::events::{DashboardSnapshot, FrameInput, OutputCommand};
use crate::session::SessionEngine;

/// Tick cadence; must not exceed the keep-alive interval
const TICK_MS: u64 = 100;

/// Commands accepted by the driver loop
#[derive(Debug)]
pub enum EngineCommand {
    Start {
        config: SessionConfig,
        done: oneshot::Sender<Result<()>>,
    },
    /// `hard` releases every resource; soft stop is the standby path
    Stop {
        hard: bool,
    },
    SetLanguage(String),
    Frame(FrameInput),
    GatewayFrame {
        samples: Vec<f32>,
        voice_probability: f32,
    },
    VoiceOnset,
    VoiceOffset,
    MutexChange(MutexState),
    TogglePause,
    ToggleMute,
    Flush,
    Snapshot(oneshot::Sender<DashboardSnapshot>),
}

/// Cloneable handle for driving a spawned engine
#[derive(Clone)]
pub struct EngineHandle {
    commands: mpsc::UnboundedSender<EngineCommand>,
}

impl EngineHandle {
    fn send(&self, command: EngineCommand) -> Result<()> {
        self.commands
            .send(command)
            .map_err(|_| Error::Other("engine loop has shut down".to_string()))
    }

    /// Start a session; resolves once the channel is open or failed
    pub async fn start(&self, config: SessionConfig) -> Result<()> {
        let (done_tx, done_rx) = oneshot::channel();
        self.send(EngineCommand::Start {
            config,
            done: done_tx,
        })?;
        done_rx
            .await
            .map_err(|_| Error::Other("engine loop has shut down".to_string()))?
    }

    pub fn stop(&self, hard: bool) -> Result<()> {
        self.send(EngineCommand::Stop { hard })
    }

    pub fn set_language(&self, language: impl Into<String>) -> Result<()> {
        self.send(EngineCommand::SetLanguage(language.into()))
    }

    pub fn frame(&self, frame: FrameInput) -> Result<()> {
        self.send(EngineCommand::Frame(frame))
    }

    pub fn gateway_frame(&self, samples: Vec<f32>, voice_probability: f32) -> Result<()> {
        self.send(EngineCommand::GatewayFrame {
            samples,
            voice_probability,
        })
    }

    pub fn voice_onset(&self) -> Result<()> {
        self.send(EngineCommand::VoiceOnset)
    }

    pub fn voice_offset(&self) -> Result<()> {
        self.send(EngineCommand::VoiceOffset)
    }

    pub fn mutex_change(&self, state: MutexState) -> Result<()> {
        self.send(EngineCommand::MutexChange(state))
    }

    pub fn toggle_pause(&self) -> Result<()> {
        self.send(EngineCommand::TogglePause)
    }

    pub fn toggle_mute(&self) -> Result<()> {
        self.send(EngineCommand::ToggleMute)
    }

    pub fn flush(&self) -> Result<()> {
        self.send(EngineCommand::Flush)
    }

    /// Instantaneous dashboard snapshot
    pub async fn snapshot(&self) -> Result<DashboardSnapshot> {
        let (tx, rx) = oneshot::channel();
        self.send(EngineCommand::Snapshot(tx))?;
        rx.await
            .map_err(|_| Error::Other("engine loop has shut down".to_string()))
    }
}

/// Spawn the driver loop. Returns the command handle, the playback command
/// stream for the host audio layer, and the loop's join handle. The loop
/// exits (hard-stopping the session) when every `EngineHandle` is dropped.
pub fn spawn(
    mut engine: SessionEngine,
) -> (
    EngineHandle,
    mpsc::UnboundedReceiver<OutputCommand>,
    JoinHandle<()>,
) {
    let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
    let (out_tx, out_rx) = mpsc::unbounded_channel();

    let events = engine.take_events();
    let task = tokio::spawn(async move {
        let mut events = match events {
            Some(rx) => rx,
            None => {
                tracing::error!("event receiver already taken, driver loop aborting");
                return;
            }
        };
        run(&mut engine, cmd_rx, &mut events, out_tx).await;
    });

    (EngineHandle { commands: cmd_tx }, out_rx, task)
}

async fn run(
    engine: &mut SessionEngine,
    mut commands: mpsc::UnboundedReceiver<EngineCommand>,
    events: &mut mpsc::UnboundedReceiver<crate::events::TaggedEvent>,
    output: mpsc::UnboundedSender<OutputCommand>,
) {
    let mut ticker = tokio::time::interval(Duration::from_millis(TICK_MS));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            command = commands.recv() => {
                match command {
                    Some(command) => handle_command(engine, command).await,
                    None => break,
                }
            }
            Some(event) = events.recv() => {
                engine.on_channel_event(event).await;
            }
            _ = ticker.tick() => {
                engine.on_tick().await;
            }
        }

        for command in engine.drain_output() {
            // A gone audio layer just means nobody is listening anymore
            if output.send(command).is_err() {
                break;
            }
        }
    }

    tracing::info!("driver loop shutting down");
    engine.stop(true).await;
    for command in engine.drain_output() {
        let _ = output.send(command);
    }
}

async fn handle_command(engine: &mut SessionEngine, command: EngineCommand) {
    match command {
        EngineCommand::Start { config, done } => {
            let result = engine.start(config).await;
            let _ = done.send(result);
        }
        EngineCommand::Stop { hard } => engine.stop(hard).await,
        EngineCommand::SetLanguage(language) => engine.set_language(language).await,
        EngineCommand::Frame(frame) => engine.on_frame(frame).await,
        EngineCommand::GatewayFrame {
            samples,
            voice_probability,
        } => engine.on_gateway_frame(&samples, voice_probability).await,
        EngineCommand::VoiceOnset => engine.on_voice_onset().await,
        EngineCommand::VoiceOffset => engine.on_voice_offset().await,
        EngineCommand::MutexChange(state) => engine.on_mutex_change(state),
        EngineCommand::TogglePause => engine.toggle_pause(),
        EngineCommand::ToggleMute => engine.toggle_mute(),
        EngineCommand::Flush => engine.flush_now().await,
        EngineCommand::Snapshot(reply) => {
            let _ = reply.send(engine.dashboard());
        }
    }
}
