//! Per-channel smoothing for decoded samples.
//!
//! All three filters work one sample at a time so they can run while a
//! capture is still streaming in.

use std::collections::VecDeque;

/// Exponential moving average, starting from 0.
#[derive(Debug, Clone)]
pub struct LowPassFilter {
    alpha: f64,
    state: f64,
}

impl LowPassFilter {
    pub fn new(alpha: f64) -> Self {
        Self { alpha, state: 0.0 }
    }

    pub fn filter(&mut self, x: f64) -> f64 {
        self.state = self.alpha * x + (1.0 - self.alpha) * self.state;
        self.state
    }

    pub fn set_alpha(&mut self, alpha: f64) {
        self.alpha = alpha;
    }
}

/// First-difference high-pass with a low-pass term fed back in. The first
/// sample only primes the difference.
#[derive(Debug, Clone)]
pub struct HighPassFilter {
    alpha: f64,
    prev_raw: Option<f64>,
    prev_out: f64,
    lowpass: LowPassFilter,
}

impl HighPassFilter {
    pub fn new(alpha: f64) -> Self {
        Self { alpha, prev_raw: None, prev_out: 0.0, lowpass: LowPassFilter::new(alpha) }
    }

    pub fn filter(&mut self, x: f64) -> f64 {
        let prev_raw = self.prev_raw.unwrap_or(x);
        let out = self.prev_out + self.alpha * (x - prev_raw + self.lowpass.filter(x));
        self.prev_raw = Some(x);
        self.prev_out = out;
        out
    }

    pub fn set_alpha(&mut self, alpha: f64) {
        self.alpha = alpha;
        self.lowpass.set_alpha(alpha);
    }
}

/// Feed-forward comb: `y[n] = x[n] - gain * x[n - (delay - 1)]` once `delay`
/// samples have been seen. Until then, and always for `delay == 0`, the
/// input passes through.
#[derive(Debug, Clone)]
pub struct CombFilter {
    delay: usize,
    gain: f64,
    history: VecDeque<f64>,
}

impl CombFilter {
    pub fn new(delay: usize, gain: f64) -> Self {
        Self { delay, gain, history: VecDeque::with_capacity(delay) }
    }

    pub fn filter(&mut self, x: f64) -> f64 {
        if self.delay == 0 {
            return x;
        }
        if self.history.len() == self.delay {
            self.history.pop_front();
        }
        self.history.push_back(x);
        match self.history.front() {
            Some(&oldest) if self.history.len() == self.delay => x - self.gain * oldest,
            _ => x,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FilterSettings {
    pub alpha: f64,
    pub delay: usize,
    pub gain: f64,
}

impl Default for FilterSettings {
    fn default() -> Self {
        Self { alpha: 0.05, delay: 25, gain: 1.0 }
    }
}

/// Comb, then low-pass, then high-pass.
#[derive(Debug, Clone)]
pub struct FilterChain {
    comb: CombFilter,
    lowpass: LowPassFilter,
    highpass: HighPassFilter,
}

impl FilterChain {
    pub fn new(settings: FilterSettings) -> Self {
        Self {
            comb: CombFilter::new(settings.delay, settings.gain),
            lowpass: LowPassFilter::new(settings.alpha),
            highpass: HighPassFilter::new(settings.alpha),
        }
    }

    pub fn filter(&mut self, x: f64) -> f64 {
        let x = self.comb.filter(x);
        let x = self.lowpass.filter(x);
        self.highpass.filter(x)
    }
}
