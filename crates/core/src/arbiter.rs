//! Source arbiter
//!
//! Passive relay of the server-asserted single-speaker mutex shared by
//! every audio source in the room. Ownership changes are pushed by the
//! external gateway; no local voting or consensus happens here. While the
//! mutex is held elsewhere, local admission is computed as silence rather
//! than skipped, so buffer bookkeeping stays uniform.
//!
//! The gateway can also act as an alternate capture source; its 48kHz
//! frames are decimated 3:1 down to the engine's input rate.

/// Server-asserted speaker mutex
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MutexState {
    /// Line open, local capture may be admitted
    Open,
    /// Another source holds the line
    Locked {
        owner: String,
    },
}

/// Relay of the gateway mutex plus the alternate-source frame path
pub struct SourceArbiter {
    state: MutexState,
    status: String,
}

impl SourceArbiter {
    pub fn new() -> Self {
        Self {
            state: MutexState::Open,
            status: "line open".to_string(),
        }
    }

    /// Gateway pushed an ownership change
    pub fn on_mutex_change(&mut self, state: MutexState) {
        match &state {
            MutexState::Locked { owner } => {
                self.status = format!("yield to: {owner}");
                tracing::debug!(owner = %owner, "speaker mutex locked");
            }
            MutexState::Open => {
                self.status = "line open".to_string();
                tracing::debug!("speaker mutex open");
            }
        }
        self.state = state;
    }

    pub fn is_locked(&self) -> bool {
        matches!(self.state, MutexState::Locked { .. })
    }

    pub fn state(&self) -> &MutexState {
        &self.state
    }

    /// Human-readable arbitration status for the UI layer
    pub fn status(&self) -> &str {
        &self.status
    }

    /// Decimate a 48kHz gateway frame to the 16kHz input rate (3:1,
    /// sample-drop; the gateway applies its own anti-alias filtering)
    pub fn decimate_gateway_frame(samples: &[f32]) -> Vec<f32> {
        samples.iter().step_by(3).copied().collect()
    }
}

impl Default for SourceArbiter {
    fn default() -> Self {
        Self::new()
    }
}
