//! Derived session telemetry
//!
//! Total lag (queued output plus unflushed input, in seconds) is the one
//! number that feeds back into control: the playback scheduler's pacing
//! threshold reads it. Trend and efficiency are observability-only.

use std::collections::VecDeque;

use serde::Serialize;
use tokio::time::Instant;

use crate::config::EngineTuning;

/// Direction the lag is moving over the sampled window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LagTrend {
    Rising,
    Falling,
    Stable,
}

/// Sliding-window lag estimator
pub struct MetricsEstimator {
    tuning: EngineTuning,
    history: VecDeque<(Instant, f32)>,
    last_lag: f32,
}

impl MetricsEstimator {
    pub fn new(tuning: EngineTuning) -> Self {
        Self {
            tuning,
            history: VecDeque::new(),
            last_lag: 0.0,
        }
    }

    /// Record one lag sample
    pub fn record(&mut self, now: Instant, total_lag_secs: f32) {
        self.last_lag = total_lag_secs;
        self.history.push_back((now, total_lag_secs));
        while self.history.len() > self.tuning.lag_history_len {
            self.history.pop_front();
        }
    }

    /// Most recent total lag in seconds
    pub fn total_lag(&self) -> f32 {
        self.last_lag
    }

    /// Slope-based trend over the window; Stable until enough samples exist
    pub fn trend(&self) -> LagTrend {
        if self.history.len() < self.tuning.trend_min_samples {
            return LagTrend::Stable;
        }
        let (first_t, first_v) = match self.history.front() {
            Some(s) => *s,
            None => return LagTrend::Stable,
        };
        let (last_t, last_v) = match self.history.back() {
            Some(s) => *s,
            None => return LagTrend::Stable,
        };

        let elapsed = last_t.duration_since(first_t).as_secs_f32();
        if elapsed <= 0.0 {
            return LagTrend::Stable;
        }
        let slope = (last_v - first_v) / elapsed;

        if slope > self.tuning.trend_slope_threshold {
            LagTrend::Rising
        } else if slope < -self.tuning.trend_slope_threshold {
            LagTrend::Falling
        } else {
            LagTrend::Stable
        }
    }

    /// Presentational efficiency percentage
    pub fn efficiency(&self) -> f32 {
        (100.0 - self.last_lag * 10.0).max(0.0)
    }

    /// Drop the window; used on stop
    pub fn reset(&mut self) {
        self.history.clear();
        self.last_lag = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::Duration;

    fn estimator() -> MetricsEstimator {
        MetricsEstimator::new(EngineTuning::default())
    }

    #[test]
    fn test_trend_needs_min_samples() {
        let mut m = estimator();
        let now = Instant::now();
        for i in 0..4u64 {
            m.record(now + Duration::from_secs(i), i as f32 * 10.0);
        }
        assert_eq!(m.trend(), LagTrend::Stable);
    }

    #[test]
    fn test_trend_rising_and_falling() {
        let mut m = estimator();
        let now = Instant::now();
        for i in 0..6u64 {
            m.record(now + Duration::from_secs(i), i as f32);
        }
        // +1 unit/sec
        assert_eq!(m.trend(), LagTrend::Rising);

        let mut m = estimator();
        for i in 0..6u64 {
            m.record(now + Duration::from_secs(i), 10.0 - i as f32);
        }
        assert_eq!(m.trend(), LagTrend::Falling);
    }

    #[test]
    fn test_trend_stable_within_threshold() {
        let mut m = estimator();
        let now = Instant::now();
        for i in 0..10u64 {
            m.record(now + Duration::from_secs(i), 2.0 + (i as f32) * 0.01);
        }
        assert_eq!(m.trend(), LagTrend::Stable);
    }

    #[test]
    fn test_history_bounded() {
        let mut m = estimator();
        let now = Instant::now();
        for i in 0..40u64 {
            m.record(now + Duration::from_millis(i * 100), 1.0);
        }
        assert_eq!(m.history.len(), 20);
    }

    #[test]
    fn test_efficiency_floor() {
        let mut m = estimator();
        let now = Instant::now();
        m.record(now, 0.5);
        assert!((m.efficiency() - 95.0).abs() < 1e-3);
        m.record(now, 30.0);
        assert_eq!(m.efficiency(), 0.0);
    }
}
