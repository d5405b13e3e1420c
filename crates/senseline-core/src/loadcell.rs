//! Load-cell support: calibration on top of a raw 24-bit source, plus a
//! bit-banged HX711 driver.

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{InputPin, OutputPin};

use crate::sensor::LowRateSensor;

/// Raw conversions from a load-cell amplifier.
pub trait RawLoadCell {
    fn is_ready(&mut self) -> bool;
    /// One conversion. `None` on a bus fault.
    fn read_raw(&mut self) -> Option<i32>;
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Calibration {
    /// Raw counts per unit (e.g. per gram).
    pub scale: f32,
    /// Raw reading at zero load.
    pub offset: i64,
}

impl Default for Calibration {
    fn default() -> Self {
        Self { scale: 1.0, offset: 0 }
    }
}

impl Calibration {
    pub fn units(&self, raw: i64) -> f32 {
        (raw - self.offset) as f32 / self.scale
    }
}

pub struct LoadCell<R> {
    raw: R,
    calibration: Calibration,
}

impl<R: RawLoadCell> LoadCell<R> {
    pub fn new(raw: R) -> Self {
        Self::with_calibration(raw, Calibration::default())
    }

    pub fn with_calibration(raw: R, calibration: Calibration) -> Self {
        Self { raw, calibration }
    }

    pub fn calibration(&self) -> Calibration {
        self.calibration
    }

    pub fn set_scale(&mut self, scale: f32) {
        self.calibration.scale = scale;
    }

    pub fn set_offset(&mut self, offset: i64) {
        self.calibration.offset = offset;
    }

    /// Blocking average of `times` raw reads. Busy-waits on readiness.
    /// Faulted reads are skipped; returns `None` if none succeeded.
    pub fn read_average(&mut self, times: u8) -> Option<i64> {
        let times = times.max(1);
        let mut sum = 0i64;
        let mut good = 0i64;
        for _ in 0..times {
            while !self.raw.is_ready() {
                std::hint::spin_loop();
            }
            if let Some(v) = self.raw.read_raw() {
                sum += v as i64;
                good += 1;
            }
        }
        (good > 0).then(|| sum / good)
    }

    /// Takes the current average reading as the new zero.
    pub fn tare(&mut self, times: u8) -> bool {
        match self.read_average(times) {
            Some(avg) => {
                log::debug!("load cell tared at offset {avg}");
                self.calibration.offset = avg;
                true
            }
            None => false,
        }
    }

    pub fn read_units(&mut self, times: u8) -> Option<f32> {
        self.read_average(times).map(|raw| self.calibration.units(raw))
    }

    pub fn into_inner(self) -> R {
        self.raw
    }
}

impl<R: RawLoadCell> LowRateSensor for LoadCell<R> {
    fn is_ready(&mut self) -> bool {
        self.raw.is_ready()
    }

    fn read_value(&mut self) -> Option<f32> {
        let raw = self.raw.read_raw()?;
        Some(self.calibration.units(i64::from(raw)))
    }
}

/// HX711 gain, which also selects the input channel of the next conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Gain {
    #[default]
    ChannelA128,
    ChannelB32,
    ChannelA64,
}

impl Gain {
    fn extra_pulses(self) -> u8 {
        match self {
            Gain::ChannelA128 => 1,
            Gain::ChannelB32 => 2,
            Gain::ChannelA64 => 3,
        }
    }
}

pub struct Hx711<DOUT, SCK, D> {
    dout: DOUT,
    sck: SCK,
    delay: D,
    gain: Gain,
}

impl<DOUT, SCK, D> Hx711<DOUT, SCK, D>
where
    DOUT: InputPin,
    SCK: OutputPin,
    D: DelayNs,
{
    pub fn new(dout: DOUT, mut sck: SCK, delay: D, gain: Gain) -> Self {
        let _ = sck.set_low();
        Self { dout, sck, delay, gain }
    }

    pub fn gain(&self) -> Gain {
        self.gain
    }

    /// Takes effect after the next conversion.
    pub fn set_gain(&mut self, gain: Gain) {
        self.gain = gain;
    }

    /// Holding SCK high for more than 60 us powers the chip down.
    pub fn power_down(&mut self) {
        let _ = self.sck.set_low();
        let _ = self.sck.set_high();
        self.delay.delay_us(80);
    }

    /// The chip resets to channel A, gain 128 on power up.
    pub fn power_up(&mut self) {
        let _ = self.sck.set_low();
        self.delay.delay_us(100);
    }

    fn pulse(&mut self) -> Option<()> {
        self.sck.set_high().ok()?;
        self.delay.delay_us(1);
        self.sck.set_low().ok()?;
        self.delay.delay_us(1);
        Some(())
    }

    fn shift_in(&mut self) -> Option<i32> {
        let mut value: u32 = 0;
        for _ in 0..24 {
            self.pulse()?;
            let bit = self.dout.is_high().ok()?;
            value = (value << 1) | bit as u32;
        }
        for _ in 0..self.gain.extra_pulses() {
            self.pulse()?;
        }
        // 24-bit two's complement
        Some(((value << 8) as i32) >> 8)
    }

    pub fn into_parts(self) -> (DOUT, SCK, D) {
        (self.dout, self.sck, self.delay)
    }
}

impl<DOUT, SCK, D> RawLoadCell for Hx711<DOUT, SCK, D>
where
    DOUT: InputPin,
    SCK: OutputPin,
    D: DelayNs,
{
    /// DOUT goes low when a conversion is available. A pin fault reads as not ready.
    fn is_ready(&mut self) -> bool {
        self.dout.is_low().unwrap_or(false)
    }

    fn read_raw(&mut self) -> Option<i32> {
        let value = self.shift_in();
        if value.is_none() {
            log::trace!("hx711 read aborted on pin fault");
        }
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::collections::VecDeque;
    use std::convert::Infallible;
    use std::rc::Rc;

    /// DOUT level is sampled from a queue; SCK edges and time spent high are recorded.
    #[derive(Default)]
    struct Wire {
        dout_levels: VecDeque<bool>,
        rising_edges: usize,
        sck_high: bool,
        high_ns: u64,
        longest_high_ns: u64,
    }

    struct Dout(Rc<RefCell<Wire>>);
    struct Sck(Rc<RefCell<Wire>>);
    struct Delay(Rc<RefCell<Wire>>);

    impl embedded_hal::digital::ErrorType for Dout {
        type Error = Infallible;
    }

    impl InputPin for Dout {
        fn is_high(&mut self) -> Result<bool, Infallible> {
            Ok(self.0.borrow_mut().dout_levels.pop_front().unwrap_or(true))
        }

        fn is_low(&mut self) -> Result<bool, Infallible> {
            self.is_high().map(|h| !h)
        }
    }

    impl embedded_hal::digital::ErrorType for Sck {
        type Error = Infallible;
    }

    impl OutputPin for Sck {
        fn set_high(&mut self) -> Result<(), Infallible> {
            let mut w = self.0.borrow_mut();
            if !w.sck_high {
                w.rising_edges += 1;
                w.high_ns = 0;
            }
            w.sck_high = true;
            Ok(())
        }

        fn set_low(&mut self) -> Result<(), Infallible> {
            self.0.borrow_mut().sck_high = false;
            Ok(())
        }
    }

    impl DelayNs for Delay {
        fn delay_ns(&mut self, ns: u32) {
            let mut w = self.0.borrow_mut();
            if w.sck_high {
                w.high_ns += u64::from(ns);
                w.longest_high_ns = w.longest_high_ns.max(w.high_ns);
            }
        }
    }

    fn bits_of(value: u32) -> Vec<bool> {
        (0..24).rev().map(|i| (value >> i) & 1 == 1).collect()
    }

    fn driver(wire: &Rc<RefCell<Wire>>, gain: Gain) -> Hx711<Dout, Sck, Delay> {
        Hx711::new(Dout(wire.clone()), Sck(wire.clone()), Delay(wire.clone()), gain)
    }

    #[test]
    fn reads_positive_value_and_sends_gain_pulses() {
        let wire = Rc::new(RefCell::new(Wire::default()));
        wire.borrow_mut().dout_levels.push_back(false);
        wire.borrow_mut().dout_levels.extend(bits_of(0x01_2345));
        let mut hx = driver(&wire, Gain::ChannelA64);

        assert!(hx.is_ready());
        assert_eq!(hx.read_raw(), Some(0x01_2345));
        assert_eq!(wire.borrow().rising_edges, 24 + 3);
    }

    #[test]
    fn sign_extends_negative_readings() {
        let wire = Rc::new(RefCell::new(Wire::default()));
        wire.borrow_mut().dout_levels.extend(bits_of(0xFF_FFFE));
        let mut hx = driver(&wire, Gain::ChannelA128);
        assert_eq!(hx.read_raw(), Some(-2));
        assert_eq!(wire.borrow().rising_edges, 25);
    }

    #[test]
    fn gain_change_applies_to_following_read() {
        let wire = Rc::new(RefCell::new(Wire::default()));
        wire.borrow_mut().dout_levels.extend(bits_of(7));
        let mut hx = driver(&wire, Gain::ChannelA128);
        hx.set_gain(Gain::ChannelB32);
        assert_eq!(hx.gain(), Gain::ChannelB32);
        assert_eq!(hx.read_raw(), Some(7));
        assert_eq!(wire.borrow().rising_edges, 24 + 2);
    }

    #[test]
    fn clock_pulses_stay_short_during_reads() {
        let wire = Rc::new(RefCell::new(Wire::default()));
        wire.borrow_mut().dout_levels.extend(bits_of(1));
        let mut hx = driver(&wire, Gain::default());
        hx.read_raw();
        assert!(wire.borrow().longest_high_ns < 60_000);
        assert!(!wire.borrow().sck_high);
    }

    #[test]
    fn power_down_holds_clock_high_past_60us() {
        let wire = Rc::new(RefCell::new(Wire::default()));
        let mut hx = driver(&wire, Gain::default());
        hx.power_down();
        assert!(wire.borrow().sck_high);
        assert!(wire.borrow().longest_high_ns >= 60_000);

        hx.power_up();
        assert!(!wire.borrow().sck_high);
    }

    #[test]
    fn not_ready_while_dout_high() {
        let wire = Rc::new(RefCell::new(Wire::default()));
        wire.borrow_mut().dout_levels.push_back(true);
        let mut hx = driver(&wire, Gain::default());
        assert!(!hx.is_ready());
    }

    struct FixedRaw(Vec<i32>);

    impl RawLoadCell for FixedRaw {
        fn is_ready(&mut self) -> bool {
            true
        }

        fn read_raw(&mut self) -> Option<i32> {
            if self.0.is_empty() {
                None
            } else {
                Some(self.0.remove(0))
            }
        }
    }

    #[test]
    fn tare_then_units() {
        let mut cell = LoadCell::new(FixedRaw(vec![100, 102, 98, 100, 2380]));
        assert!(cell.tare(4));
        assert_eq!(cell.calibration().offset, 100);
        cell.set_scale(2280.0);
        assert!((cell.read_value().unwrap() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn uncalibrated_value_is_raw() {
        let mut cell = LoadCell::new(FixedRaw(vec![-550_000]));
        assert_eq!(cell.read_value(), Some(-550_000.0));
    }

    #[test]
    fn read_units_with_manual_offset() {
        let mut cell = LoadCell::new(FixedRaw(vec![8_000, 8_400]));
        cell.set_offset(7_000);
        cell.set_scale(500.0);
        assert_eq!(cell.read_units(2), Some(2.4));
        assert_eq!(cell.read_units(1), None);
    }

    #[test]
    fn faulted_conversion_reads_as_none() {
        let mut cell = LoadCell::new(FixedRaw(vec![]));
        assert_eq!(cell.read_value(), None);
    }

    #[test]
    fn average_skips_faults() {
        let mut cell = LoadCell::new(FixedRaw(vec![10, 20]));
        assert_eq!(cell.read_average(3), Some(15));
        assert_eq!(cell.read_average(2), None);
    }
}
