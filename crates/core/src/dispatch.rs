//! Utterance dispatcher
//!
//! Owns the "awaiting reply" lock and its two recovery timers. A flush
//! seals the capture buffer into an outbound payload, sets the lock and
//! arms the 15s watchdog plus the 2s quick-release; whichever of
//! {reply arrival, quick-release, watchdog} resolves the lock first cancels
//! the others. While the lock is held and no reply audio is playing yet,
//! synthetic silence frames go out on a 100ms cadence so providers don't
//! treat the quiet link as dead.
//!
//! Timers are explicit `Option<Instant>` deadlines checked on tick; none of
//! them can leak past a flush or disconnect.

use tokio::time::{Duration, Instant};

use crate::config::{EngineTuning, TranslationMode};
use crate::events::OutboundAudio;

/// Outcome of a flush attempt
#[derive(Debug)]
pub enum FlushOutcome {
    /// Payload ready to send; the reply lock is now set
    Sent {
        payload: Vec<OutboundAudio>,
        chunks: usize,
    },
    /// Non-simultaneous mode with the reply lock still held
    SuppressedByLock,
    /// A language swap is pending; flush is a no-op
    SwapPending,
    /// Nothing buffered
    Empty,
}

/// Actions the orchestrator must take after a dispatcher tick
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DispatchTick {
    /// Emit one keep-alive silence frame
    pub send_keepalive: bool,
    /// The watchdog force-cleared a stalled reply lock
    pub watchdog_fired: bool,
    /// The quick-release cleared the lock before any reply audio
    pub quick_release_fired: bool,
}

/// Reply-lock owner and flush timer set
pub struct UtteranceDispatcher {
    tuning: EngineTuning,

    /// Set on flush; `None` once exactly one of the three resolutions wins
    lock_set_at: Option<Instant>,

    watchdog_at: Option<Instant>,
    quick_release_at: Option<Instant>,

    /// Next keep-alive emission, `None` while the cadence is stopped
    keepalive_next: Option<Instant>,

    /// Dashboard `uploading` indicator hold
    uploading_until: Option<Instant>,

    /// Chunk count of the most recent send
    last_burst_chunks: usize,
}

impl UtteranceDispatcher {
    pub fn new(tuning: EngineTuning) -> Self {
        Self {
            tuning,
            lock_set_at: None,
            watchdog_at: None,
            quick_release_at: None,
            keepalive_next: None,
            uploading_until: None,
            last_burst_chunks: 0,
        }
    }

    /// Seal `chunks` samples into an outbound payload and arm the timers.
    ///
    /// Simultaneous mode is never suppressed by the lock; the other modes
    /// hold their sends until the previous reply resolves.
    pub fn flush(
        &mut self,
        combined: Vec<f32>,
        chunks: usize,
        mode: TranslationMode,
        swap_pending: bool,
        now: Instant,
    ) -> FlushOutcome {
        if swap_pending {
            return FlushOutcome::SwapPending;
        }
        if chunks == 0 || combined.is_empty() {
            return FlushOutcome::Empty;
        }
        if !mode.is_simultaneous() && self.is_awaiting_reply() {
            return FlushOutcome::SuppressedByLock;
        }

        let mut payload = vec![OutboundAudio::Pcm(combined)];
        if !mode.is_simultaneous() {
            // Primes the remote endpointer so the reply starts promptly
            payload.push(OutboundAudio::Silence(self.tuning.padding_samples()));
        }

        self.lock_set_at = Some(now);
        self.watchdog_at = Some(now + Duration::from_millis(self.tuning.watchdog_ms));
        self.quick_release_at = Some(now + Duration::from_millis(self.tuning.quick_release_ms));
        self.keepalive_next = Some(now + Duration::from_millis(self.tuning.keepalive_interval_ms));
        self.uploading_until = Some(now + Duration::from_millis(self.tuning.uploading_hold_ms));
        self.last_burst_chunks = chunks;

        tracing::debug!(chunks, mode = ?mode, "utterance flushed");
        FlushOutcome::Sent { payload, chunks }
    }

    /// Reply audio arrived: the genuine reply wins the lock and both
    /// recovery timers are cancelled
    pub fn on_reply_audio(&mut self) {
        self.resolve_lock();
    }

    /// The provider signalled the turn complete
    pub fn on_turn_complete(&mut self) {
        self.resolve_lock();
    }

    /// Clear the lock without logging a recovery; used when the speech
    /// debounce, a pause or a disconnect resets the waiting state
    pub fn release_lock(&mut self) {
        self.resolve_lock();
    }

    fn resolve_lock(&mut self) {
        self.lock_set_at = None;
        self.watchdog_at = None;
        self.quick_release_at = None;
        self.keepalive_next = None;
    }

    /// Drop every timer and the lock; used on stop and sleep
    pub fn clear(&mut self) {
        self.resolve_lock();
        self.uploading_until = None;
        self.last_burst_chunks = 0;
    }

    /// Advance the timer set. `reply_playing` is the live AI-speaking flag;
    /// it must be re-read by the caller per tick, not cached.
    pub fn tick(&mut self, now: Instant, reply_playing: bool) -> DispatchTick {
        let mut out = DispatchTick::default();

        if let Some(due) = self.quick_release_at {
            if now >= due {
                self.quick_release_at = None;
                if self.lock_set_at.is_some() && !reply_playing {
                    self.resolve_lock();
                    out.quick_release_fired = true;
                    tracing::debug!("quick release: no reply audio within window");
                }
            }
        }

        if let Some(due) = self.watchdog_at {
            if now >= due {
                self.watchdog_at = None;
                if self.lock_set_at.is_some() {
                    self.resolve_lock();
                    out.watchdog_fired = true;
                    tracing::warn!("watchdog reset: reply lock stalled");
                }
            }
        }

        if let Some(due) = self.keepalive_next {
            if self.lock_set_at.is_none() || reply_playing {
                self.keepalive_next = None;
            } else if now >= due {
                self.keepalive_next =
                    Some(due + Duration::from_millis(self.tuning.keepalive_interval_ms));
                out.send_keepalive = true;
            }
        }

        out
    }

    /// Sample count of one keep-alive silence frame
    pub fn keepalive_samples(&self) -> usize {
        self.tuning.keepalive_samples
    }

    pub fn is_awaiting_reply(&self) -> bool {
        self.lock_set_at.is_some()
    }

    pub fn is_uploading(&self, now: Instant) -> bool {
        self.uploading_until.is_some_and(|until| now < until)
    }

    pub fn last_burst_chunks(&self) -> usize {
        self.last_burst_chunks
    }

    /// True if any timer deadline is armed; tests assert this is false
    /// after stop/flush resolution ("no leaked timers")
    pub fn has_armed_timers(&self) -> bool {
        self.watchdog_at.is_some()
            || self.quick_release_at.is_some()
            || self.keepalive_next.is_some()
    }
}
