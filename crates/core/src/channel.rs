//! Translation channel management
//!
//! `ProviderConnector`/`ProviderSession` are the seams to the remote
//! interpretation provider; everything behind them is a documented
//! black-box protocol. The `ChannelManager` enforces the single-connection
//! discipline: at most one connect in flight (re-entrant requests are
//! rejected, not queued), any existing session force-closed before a fresh
//! open, and a generation counter so in-flight events from a superseded
//! channel are discarded on arrival.
//!
//! Rotation reconnects with identical config every 12 minutes of Connected
//! time, make-before-break, to dodge provider session-lifetime caps without
//! an audible gap. Hot language swaps reuse the same make-before-break
//! path so a failed swap leaves the running session untouched.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::time::{Duration, Instant};

use crate::config::{EngineTuning, SessionConfig};
use crate::error::{Error, Result};
use crate::events::{OutboundAudio, TaggedEvent};

/// An open session with the remote provider
#[async_trait]
pub trait ProviderSession: Send {
    /// Push captured audio or synthetic silence
    async fn send_audio(&mut self, audio: OutboundAudio) -> Result<()>;

    /// Close the session; idempotent
    async fn close(&mut self) -> Result<()>;
}

/// Factory for provider sessions. `connect` resolves once the provider has
/// confirmed the channel open; inbound events flow through `events`,
/// tagged with `generation`.
#[async_trait]
pub trait ProviderConnector: Send + Sync {
    async fn connect(
        &self,
        config: &SessionConfig,
        generation: u64,
        events: mpsc::UnboundedSender<TaggedEvent>,
    ) -> Result<Box<dyn ProviderSession>>;
}

/// Owns the single live provider session and its lifetime policy
pub struct ChannelManager {
    connector: Arc<dyn ProviderConnector>,
    events_tx: mpsc::UnboundedSender<TaggedEvent>,
    tuning: EngineTuning,

    session: Option<Box<dyn ProviderSession>>,

    /// Connect-in-progress guard; re-entrant connects are rejected
    connecting: bool,

    /// Bumped on every successful open; stale events carry older values
    generation: u64,

    /// Proactive reconnect deadline while Connected
    rotation_due: Option<Instant>,
}

impl ChannelManager {
    pub fn new(
        connector: Arc<dyn ProviderConnector>,
        events_tx: mpsc::UnboundedSender<TaggedEvent>,
        tuning: EngineTuning,
    ) -> Self {
        Self {
            connector,
            events_tx,
            tuning,
            session: None,
            connecting: false,
            generation: 0,
            rotation_due: None,
        }
    }

    /// Open a fresh session, force-closing any existing one first
    pub async fn open(&mut self, config: &SessionConfig, now: Instant) -> Result<()> {
        if self.connecting {
            tracing::warn!("connect already in progress, rejecting");
            return Err(Error::ConnectInProgress);
        }

        if self.session.is_some() {
            tracing::warn!("active session found during connect, forcing close");
            self.close().await;
        }

        self.connecting = true;
        let next_generation = self.generation + 1;
        let result = self
            .connector
            .connect(config, next_generation, self.events_tx.clone())
            .await;
        self.connecting = false;

        let session = result?;
        self.session = Some(session);
        self.generation = next_generation;
        self.arm_rotation(now);
        tracing::info!(generation = self.generation, language = %config.language, "channel open");
        Ok(())
    }

    /// Make-before-break replacement with the given config. The existing
    /// session keeps running until the new one is confirmed open; on
    /// failure it is left untouched (fail open).
    pub async fn replace(&mut self, config: &SessionConfig, now: Instant) -> Result<()> {
        if self.connecting {
            return Err(Error::ConnectInProgress);
        }

        self.connecting = true;
        let next_generation = self.generation + 1;
        let result = self
            .connector
            .connect(config, next_generation, self.events_tx.clone())
            .await;
        self.connecting = false;

        match result {
            Ok(new_session) => {
                let old = self.session.replace(new_session);
                self.generation = next_generation;
                if let Some(mut old) = old {
                    if let Err(e) = old.close().await {
                        tracing::warn!(error = %e, "error closing superseded session");
                    }
                }
                self.arm_rotation(now);
                tracing::info!(generation = self.generation, "channel replaced");
                Ok(())
            }
            Err(e) => {
                // Existing session preserved; rotation is not re-armed, the
                // session runs to the provider cap
                self.rotation_due = None;
                Err(e)
            }
        }
    }

    /// Close and drop the session; idempotent
    pub async fn close(&mut self) {
        self.rotation_due = None;
        if let Some(mut session) = self.session.take() {
            if let Err(e) = session.close().await {
                tracing::warn!(error = %e, "error closing session");
            }
        }
    }

    /// Push audio on the live session
    pub async fn send(&mut self, audio: OutboundAudio) -> Result<()> {
        match self.session.as_mut() {
            Some(session) => session.send_audio(audio).await,
            None => Err(Error::ChannelSend("no open session".to_string())),
        }
    }

    pub fn is_open(&self) -> bool {
        self.session.is_some()
    }

    /// Current connection generation; events from older generations are
    /// stale
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Whether `event` belongs to the live session
    pub fn accepts(&self, event: &TaggedEvent) -> bool {
        self.session.is_some() && event.generation == self.generation
    }

    /// True once the continuous-connected window has elapsed
    pub fn rotation_due(&self, now: Instant) -> bool {
        self.rotation_due.is_some_and(|due| now >= due)
    }

    fn arm_rotation(&mut self, now: Instant) {
        self.rotation_due =
            Some(now + Duration::from_millis(self.tuning.rotation_interval_ms));
    }
}
