//! Playback scheduler
//!
//! Queues synthesized segments and schedules gapless output against the
//! output clock. Scheduling keeps a monotonic cursor: each segment starts
//! at max(previous end, now), so segments never overlap and never start in
//! the past. A cursor that drifted far ahead of the clock (waking from
//! standby) is clamped back to now instead of forcing a long silent wait.
//!
//! The scheduler emits `OutputCommand`s for the host audio layer; it owns
//! no audio hardware, which keeps every invariant testable.

use std::collections::VecDeque;

use bytes::Bytes;
use tokio::time::{Duration, Instant};

use crate::config::EngineTuning;
use crate::events::OutputCommand;

/// A segment with its reserved slice of the output timeline
#[derive(Debug, Clone)]
struct ScheduledSegment {
    start: Instant,
    end: Instant,
}

/// Result of a scheduler tick
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PlaybackTick {
    /// The debounce after the last segment elapsed; the reply lock should
    /// be released, the standby timer reset and any deferred swap run
    pub speech_ended: bool,
}

/// Gapless, pacing-aware output scheduler
pub struct PlaybackScheduler {
    tuning: EngineTuning,

    /// Arrived, not yet scheduled; bounded, oldest dropped
    inbox: VecDeque<Bytes>,

    /// Segments holding a slice of the timeline (playing or about to)
    scheduled: Vec<ScheduledSegment>,

    /// Next free point on the output timeline
    cursor: Option<Instant>,

    /// Armed when the last scheduled segment retires
    debounce_at: Option<Instant>,

    /// True from first schedule until the post-playback debounce elapses
    ai_speaking: bool,
}

impl PlaybackScheduler {
    pub fn new(tuning: EngineTuning) -> Self {
        Self {
            tuning,
            inbox: VecDeque::new(),
            scheduled: Vec::new(),
            cursor: None,
            debounce_at: None,
            ai_speaking: false,
        }
    }

    /// Accept an inbound segment (PCM16 mono at the output rate)
    pub fn enqueue(&mut self, pcm: Bytes) {
        self.inbox.push_back(pcm);
        while self.inbox.len() > self.tuning.max_queued_segments {
            self.inbox.pop_front();
            tracing::warn!("segment queue overflow, dropped oldest");
        }
    }

    /// Schedule everything in the inbox. `input_buffer_secs` is the
    /// not-yet-flushed capture buffer duration, which counts toward the
    /// pacing decision.
    pub fn pump(&mut self, now: Instant, input_buffer_secs: f32) -> Vec<OutputCommand> {
        let mut commands = Vec::new();

        while let Some(pcm) = self.inbox.pop_front() {
            let mut start = match self.cursor {
                Some(cursor) if cursor > now => cursor,
                _ => now,
            };

            // Woke up with a stale cursor: clamp instead of waiting it out
            if start > now + Duration::from_secs_f32(self.tuning.cursor_clamp_secs) {
                start = now;
            }

            let outstanding = (start - now).as_secs_f32() + input_buffer_secs;
            let rate = if outstanding > self.tuning.pacing_threshold_secs {
                self.tuning.fast_playback_rate
            } else {
                1.0
            };

            let duration_secs = self.segment_secs(&pcm) / rate;
            let end = start + Duration::from_secs_f32(duration_secs);

            self.scheduled.push(ScheduledSegment { start, end });
            self.cursor = Some(end);
            self.ai_speaking = true;
            self.debounce_at = None;

            tracing::debug!(
                rate,
                duration_secs,
                outstanding_secs = outstanding,
                "segment scheduled"
            );
            commands.push(OutputCommand::Play { pcm, start, rate });
        }

        commands
    }

    /// Retire finished segments and run the end-of-speech debounce
    pub fn tick(&mut self, now: Instant) -> PlaybackTick {
        let before = self.scheduled.len();
        self.scheduled.retain(|seg| seg.end > now);

        if before > 0 && self.scheduled.is_empty() && self.debounce_at.is_none() {
            self.debounce_at =
                Some(now + Duration::from_millis(self.tuning.speech_debounce_ms));
        }

        let mut out = PlaybackTick::default();
        if let Some(due) = self.debounce_at {
            if now >= due && self.scheduled.is_empty() && self.inbox.is_empty() {
                self.debounce_at = None;
                self.ai_speaking = false;
                out.speech_ended = true;
                tracing::debug!("reply playback finished");
            }
        }
        out
    }

    /// Provider interruption or hard stop: drop the unplayed queue and cut
    /// active segments immediately. Returns the command stream to emit.
    pub fn interrupt(&mut self, now: Instant) -> Vec<OutputCommand> {
        let had_output = !self.inbox.is_empty() || !self.scheduled.is_empty();
        self.inbox.clear();
        self.scheduled.clear();
        self.cursor = None;

        if had_output {
            // Debounce still applies so back-to-back turns don't flap the flag
            self.debounce_at =
                Some(now + Duration::from_millis(self.tuning.speech_debounce_ms));
            vec![OutputCommand::StopAll]
        } else {
            Vec::new()
        }
    }

    /// Absolute stop: output silences now and the speaking flag drops
    /// without a debounce
    pub fn hard_stop(&mut self) -> Vec<OutputCommand> {
        self.inbox.clear();
        self.scheduled.clear();
        self.cursor = None;
        self.debounce_at = None;
        self.ai_speaking = false;
        vec![OutputCommand::StopAll]
    }

    /// Scheduled-but-unplayed output in seconds
    pub fn output_queue_secs(&self, now: Instant) -> f32 {
        match self.cursor {
            Some(cursor) if cursor > now => (cursor - now).as_secs_f32(),
            _ => 0.0,
        }
    }

    /// True while at least one segment is active or the debounce is pending
    pub fn ai_speaking(&self) -> bool {
        self.ai_speaking
    }

    /// Number of segments holding timeline slices
    pub fn active_segments(&self) -> usize {
        self.scheduled.len()
    }

    fn segment_secs(&self, pcm: &Bytes) -> f32 {
        // PCM16 mono
        (pcm.len() / 2) as f32 / self.tuning.output_sample_rate as f32
    }
}
