use crate::sensor::LowRateSensor;

/// Single-slot forward-fill cache for a low-rate sensor.
///
/// The slot only changes on a ready cycle whose read succeeds; a faulted
/// read keeps the previous value. Until the first successful read it holds
/// the default (zero unless overridden).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LastSeen {
    value: f32,
    updates: u64,
}

impl LastSeen {
    pub fn new() -> Self {
        Self::with_default(0.0)
    }

    pub fn with_default(value: f32) -> Self {
        Self { value, updates: 0 }
    }

    /// Non-blocking poll. Returns true if the slot was replaced.
    pub fn poll<S: LowRateSensor + ?Sized>(&mut self, sensor: &mut S) -> bool {
        if !sensor.is_ready() {
            return false;
        }
        match sensor.read_value() {
            Some(value) => {
                self.value = value;
                self.updates += 1;
                true
            }
            None => false,
        }
    }

    pub fn value(&self) -> f32 {
        self.value
    }

    /// Number of successful reads so far.
    pub fn updates(&self) -> u64 {
        self.updates
    }
}

impl Default for LastSeen {
    fn default() -> Self {
        Self::new()
    }
}
