use crate::lowrate::LastSeen;
use crate::sensor::{AnalogSink, LowRateSensor};
use crate::{Error, Result};

/// Integer linear map from one range onto another. Values outside the input
/// range extrapolate; the only limit is the `i32` range of the drive level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RangeMap {
    in_min: i64,
    in_max: i64,
    out_min: i64,
    out_max: i64,
}

impl RangeMap {
    pub fn new(in_min: i64, in_max: i64, out_min: i64, out_max: i64) -> Result<Self> {
        if in_min == in_max {
            return Err(Error::Config(format!(
                "input range is empty ({in_min}..{in_max})"
            )));
        }
        Ok(Self { in_min, in_max, out_min, out_max })
    }

    pub fn apply(&self, x: i64) -> i32 {
        let dx = i128::from(x) - i128::from(self.in_min);
        let dout = i128::from(self.out_max) - i128::from(self.out_min);
        let din = i128::from(self.in_max) - i128::from(self.in_min);
        let scaled = match dx.checked_mul(dout) {
            Some(product) => product / din,
            // only reachable with spans near the full i64 range
            None => (dx as f64 * dout as f64 / din as f64) as i128,
        };
        scaled
            .saturating_add(i128::from(self.out_min))
            .clamp(i128::from(i32::MIN), i128::from(i32::MAX)) as i32
    }
}

/// Reads a low-rate sensor and re-emits it as an analog drive level.
pub struct DacMirror<L, A> {
    sensor: L,
    sink: A,
    map: RangeMap,
    last: LastSeen,
}

impl<L: LowRateSensor, A: AnalogSink> DacMirror<L, A> {
    pub fn new(sensor: L, sink: A, map: RangeMap) -> Self {
        Self { sensor, sink, map, last: LastSeen::new() }
    }

    /// One pass of read, remap, write. Returns the level written.
    pub fn run_cycle(&mut self) -> i32 {
        self.last.poll(&mut self.sensor);
        let level = self.map.apply(self.last.value() as i64);
        self.sink.write_analog(level);
        level
    }

    pub fn run(&mut self) -> ! {
        loop {
            self.run_cycle();
        }
    }

    pub fn into_parts(self) -> (L, A) {
        (self.sensor, self.sink)
    }
}
