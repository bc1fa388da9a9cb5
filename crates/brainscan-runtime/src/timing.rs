// Copyright © 2026, Brainscan contributors.
// Created: 19 October 2026
use std::time::Duration;

/// Running processing-time statistics for one model.
#[derive(Debug, Clone, Copy, Default)]
pub struct TimingStats {
    state: WelfordState,
}

impl TimingStats {
    pub(crate) fn new(elapsed: Duration) -> TimingStats {
        Self {
            state: WelfordState::new(elapsed),
        }
    }

    pub(crate) fn add(&mut self, elapsed: Duration) {
        self.state.update(elapsed);
    }

    /// The mean processing time over all recorded rounds.
    pub fn mean(&self) -> Duration {
        self.state.mean()
    }

    /// The standard deviation over all recorded rounds.
    pub fn std_dev(&self) -> Duration {
        self.state.std_dev()
    }

    /// The number of recorded rounds.
    pub fn count(&self) -> usize {
        self.state.count
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct WelfordState {
    mean: f64,
    mean2: f64,

    count: usize,
}

impl WelfordState {
    fn new(elapsed: Duration) -> Self {
        let mut this = Self::default();
        this.update(elapsed);
        this
    }

    fn update(&mut self, value: Duration) {
        let value = value.as_secs_f64() * 1000.0;

        self.count += 1;
        let delta = value - self.mean;
        self.mean += delta / (self.count as f64);

        let delta2 = value - self.mean;
        self.mean2 += delta * delta2;
    }

    fn mean(&self) -> Duration {
        Duration::from_secs_f64(self.mean.max(0.0) / 1000.0)
    }

    fn std_dev(&self) -> Duration {
        if self.count < 2 {
            return Duration::ZERO;
        }

        let variance = self.mean2 / (self.count - 1) as f64;
        Duration::from_secs_f64(variance.max(0.0).sqrt() / 1000.0)
    }
}
