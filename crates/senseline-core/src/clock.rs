use std::time::Instant;

/// Microseconds since boot on a 32-bit counter. Wraps every 2^32 us (about 71.6 minutes).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Timestamp(pub u32);

impl Timestamp {
    pub fn as_micros(&self) -> u32 {
        self.0
    }

    /// Elapsed time from `earlier` to `self`, modulo 2^32.
    pub fn elapsed_since(&self, earlier: Timestamp) -> u32 {
        self.0.wrapping_sub(earlier.0)
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

pub trait Clock {
    fn now(&mut self) -> Timestamp;
}

/// Host clock that truncates to 32 bits, so it wraps like the device counter.
pub struct MonotonicClock {
    start: Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self { start: Instant::now() }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now(&mut self) -> Timestamp {
        Timestamp(self.start.elapsed().as_micros() as u32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn elapsed_is_modular_across_wrap() {
        let before = Timestamp(u32::MAX - 99);
        let after = Timestamp(400);
        assert_eq!(after.elapsed_since(before), 500);
    }

    #[test]
    fn elapsed_without_wrap() {
        assert_eq!(Timestamp(1500).elapsed_since(Timestamp(1000)), 500);
    }

    #[test]
    fn monotonic_clock_advances() {
        let mut clock = MonotonicClock::new();
        let a = clock.now();
        std::thread::sleep(std::time::Duration::from_millis(2));
        let b = clock.now();
        assert!(b.elapsed_since(a) >= 2_000);
    }
}
