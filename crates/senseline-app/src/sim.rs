//! Simulated sensor board for running the framer without hardware.

use std::time::Instant;

use rand::Rng;
use senseline_core::{AnalogSink, RawLoadCell, SensorBus};

/// EMG-like analog inputs (resting baseline plus periodic bursts) and
/// touch pads that close for a while every few seconds.
pub struct SimBus {
    start: Instant,
    full_scale: u16,
    rng: rand::rngs::ThreadRng,
}

impl SimBus {
    pub fn new(full_scale: u16) -> Self {
        Self { start: Instant::now(), full_scale, rng: rand::rng() }
    }
}

impl SensorBus for SimBus {
    fn configure_input(&mut self, pin: u8) {
        tracing::debug!("sim: pin {pin} configured as input");
    }

    fn read_analog(&mut self, pin: u8) -> u16 {
        let t = self.start.elapsed().as_secs_f64();
        let phase = f64::from(pin) * 0.7;
        // 0..1 envelope, one contraction roughly every two seconds
        let envelope = ((t * std::f64::consts::PI + phase).sin()).max(0.0).powi(4);
        let fs = f64::from(self.full_scale);
        let baseline = fs * 0.05;
        let burst = envelope * fs * 0.6 * self.rng.random_range(0.2..1.0);
        let noise = self.rng.random_range(-0.01..0.01) * fs;
        (baseline + burst + noise).clamp(0.0, fs) as u16
    }

    fn read_digital(&mut self, pin: u8) -> bool {
        let t = self.start.elapsed().as_secs() + u64::from(pin);
        t % 5 == 0
    }
}

/// HX711 stand-in: a new conversion becomes ready every `period` polls.
pub struct SimLoadCell {
    start: Instant,
    period: u32,
    polls: u32,
    rng: rand::rngs::ThreadRng,
}

impl SimLoadCell {
    pub fn new(period: u32) -> Self {
        Self { start: Instant::now(), period: period.max(1), polls: 0, rng: rand::rng() }
    }
}

impl RawLoadCell for SimLoadCell {
    fn is_ready(&mut self) -> bool {
        self.polls = self.polls.wrapping_add(1);
        self.polls % self.period == 0
    }

    fn read_raw(&mut self) -> Option<i32> {
        let t = self.start.elapsed().as_secs_f64();
        let load = (t * 0.5).sin() * 200_000.0 - 150_000.0;
        Some((load + self.rng.random_range(-500.0..500.0)) as i32)
    }
}

/// Prints each DAC level to stdout.
pub struct PrintSink;

impl AnalogSink for PrintSink {
    fn write_analog(&mut self, value: i32) {
        println!("{value}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn analog_stays_in_full_scale() {
        let mut bus = SimBus::new(1023);
        for pin in 14..18 {
            for _ in 0..200 {
                assert!(bus.read_analog(pin) <= 1023);
            }
        }
    }

    #[test]
    fn load_cell_ready_once_per_period() {
        let mut cell = SimLoadCell::new(4);
        let ready: Vec<bool> = (0..8).map(|_| cell.is_ready()).collect();
        assert_eq!(ready, vec![false, false, false, true, false, false, false, true]);
        assert!(cell.read_raw().is_some());
    }
}
