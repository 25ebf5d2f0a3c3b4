//! Audio capture gate
//!
//! Turns the continuous per-frame stream into discrete utterance buffers.
//! Admission is decided per frame from RMS energy and the external VAD's
//! voice probability; a two-frame lookback ring avoids clipping the
//! utterance onset. Suppressed frames (mute, mutex held by another source)
//! are computed as silence rather than skipped, so buffer bookkeeping stays
//! uniform and no spurious short bursts occur.
//!
//! Nothing in here is fatal: a gate that never observes voice stays idle
//! forever, which is a valid steady state.

use std::collections::VecDeque;

use tokio::time::Instant;

use crate::config::EngineTuning;
use crate::events::FrameInput;

/// Per-frame context read fresh from the orchestrator. State may change
/// between frames, so callers must rebuild this every callback rather than
/// caching it.
#[derive(Debug, Clone, Copy)]
pub struct FrameContext {
    /// Mute or a foreign mutex hold; samples are zeroed
    pub suppressed: bool,
    /// User pause; buffer is discarded, nothing flushes
    pub paused: bool,
    /// A language swap is pending; admission fully suspended
    pub swap_pending: bool,
    pub now: Instant,
}

/// Outcome of ingesting one frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    /// Frame not admitted, nothing else to do
    Idle,
    /// Frame admitted into the utterance buffer
    Admitted,
    /// Buffer exceeded the burst threshold; flush now
    FlushBurst,
    /// Voice/energy stayed low past the endpoint window; flush now
    FlushEndpoint,
    /// Frame discarded (paused or swap pending)
    Discarded,
}

/// Soft-clip and optionally silence a frame, returning the shaped samples
/// and their RMS. Shared by the gated (simultaneous) and pass-through
/// (conversational) capture paths.
pub(crate) fn shape_frame(samples: &[f32], suppressed: bool) -> (Vec<f32>, f32) {
    let shaped: Vec<f32> = if suppressed {
        vec![0.0; samples.len()]
    } else {
        samples.iter().map(|s| s.tanh()).collect()
    };

    let rms = if shaped.is_empty() {
        0.0
    } else {
        let sum_squares: f32 = shaped.iter().map(|s| s * s).sum();
        (sum_squares / shaped.len() as f32).sqrt()
    };

    (shaped, rms)
}

/// Energy/VAD-gated utterance buffer
pub struct CaptureGate {
    tuning: EngineTuning,

    /// Chunks admitted since the last flush; exclusively owned here
    buffer: Vec<Vec<f32>>,

    /// Pre-roll retained while the gate is closed, FIFO-overwritten
    lookback: VecDeque<Vec<f32>>,

    /// Opens on the first frame above the RMS floor and stays open for the
    /// rest of the utterance; it does not reclose mid-utterance
    gate_open: bool,

    /// Start of the current continuous low-voice span, if any
    low_volume_since: Option<Instant>,

    last_rms: f32,
    last_voice_probability: f32,
}

impl CaptureGate {
    pub fn new(tuning: EngineTuning) -> Self {
        Self {
            tuning,
            buffer: Vec::new(),
            lookback: VecDeque::new(),
            gate_open: false,
            low_volume_since: None,
            last_rms: 0.0,
            last_voice_probability: 0.0,
        }
    }

    /// Ingest one frame in simultaneous (gated) mode
    pub fn ingest(&mut self, frame: &FrameInput, ctx: &FrameContext) -> GateDecision {
        let (shaped, rms) = shape_frame(&frame.samples, ctx.suppressed);
        self.last_rms = rms;
        self.last_voice_probability = frame.voice_probability;

        if ctx.paused {
            // Discarded every frame, never flushed
            self.buffer.clear();
            self.low_volume_since = None;
            return GateDecision::Discarded;
        }

        self.lookback.push_back(shaped.clone());
        while self.lookback.len() > self.tuning.lookback_frames {
            self.lookback.pop_front();
        }

        if rms > self.tuning.gate_open_rms {
            self.gate_open = true;
        }

        if ctx.swap_pending {
            // Dropped outright so two languages never share one buffer
            return GateDecision::Discarded;
        }

        let admitted = !ctx.suppressed
            && frame.voice_probability > self.tuning.vad_admit_threshold
            && (self.gate_open || rms > self.tuning.gate_open_rms);

        if admitted {
            if self.buffer.is_empty() {
                // Prepend the pre-roll so the onset isn't clipped
                self.buffer.extend(self.lookback.iter().cloned());
            }
            self.buffer.push(shaped);
            self.low_volume_since = None;

            if self.buffer.len() > self.tuning.burst_threshold_chunks {
                return GateDecision::FlushBurst;
            }
            return GateDecision::Admitted;
        }

        if !self.buffer.is_empty() {
            let since = *self.low_volume_since.get_or_insert(ctx.now);
            if ctx.now.duration_since(since).as_millis() as u64 > self.tuning.endpoint_silence_ms {
                self.low_volume_since = None;
                return GateDecision::FlushEndpoint;
            }
        } else {
            self.low_volume_since = None;
        }

        GateDecision::Idle
    }

    /// Seal the buffer: concatenate the chunks and leave it empty
    pub fn take_buffer(&mut self) -> Vec<f32> {
        let total: usize = self.buffer.iter().map(|c| c.len()).sum();
        let mut combined = Vec::with_capacity(total);
        for chunk in self.buffer.drain(..) {
            combined.extend_from_slice(&chunk);
        }
        self.low_volume_since = None;
        combined
    }

    /// Reset everything, including the lookback ring and the open gate.
    /// Used on pause, disconnect and sleep.
    pub fn reset(&mut self) {
        self.buffer.clear();
        self.lookback.clear();
        self.gate_open = false;
        self.low_volume_since = None;
    }

    /// Buffer length in chunks
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Not-yet-flushed input audio in seconds
    pub fn buffered_secs(&self) -> f32 {
        self.buffer.len() as f32 * self.tuning.chunk_secs()
    }

    pub fn last_rms(&self) -> f32 {
        self.last_rms
    }

    pub fn last_voice_probability(&self) -> f32 {
        self.last_voice_probability
    }

    /// True while the admission gate is rejecting frames
    pub fn is_gated(&self) -> bool {
        self.last_voice_probability < self.tuning.vad_admit_threshold
    }
}
