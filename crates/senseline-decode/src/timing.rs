//! The device timestamp is a 32-bit microsecond counter that wraps roughly
//! every 71.6 minutes. Never subtract raw timestamps as plain integers.

const HALF: u32 = 1 << 31;

/// Microseconds from `t1` to `t2`, modulo 2^32.
pub fn elapsed_us(t1: u32, t2: u32) -> u32 {
    t2.wrapping_sub(t1)
}

/// How a timestamp related to the one before it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    First,
    Forward,
    /// The counter passed 2^32 between the two records.
    Wrapped,
    /// Not explainable as forward time: a device reset, a torn line, or a
    /// jump of half the counter range or more. The timeline does not advance.
    Reset,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Unwrapped {
    pub timeline: u64,
    pub step: Step,
}

/// Extends a stream of wrapping u32 timestamps into a monotonic u64 timeline.
///
/// A decrease is a wrap only when the previous value sits in the upper half
/// of the counter and the new one in the lower half. Any other decrease, and
/// any increase of 2^31 us or more, is a [`Step::Reset`]; the timeline holds
/// still across it and resumes from the new value.
#[derive(Debug, Clone, Default)]
pub struct TimestampUnwrapper {
    last: Option<u32>,
    timeline: u64,
    wraps: u64,
    resets: u64,
}

impl TimestampUnwrapper {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, ts: u32) -> u64 {
        self.push_checked(ts).timeline
    }

    pub fn push_checked(&mut self, ts: u32) -> Unwrapped {
        let step = match self.last {
            None => {
                self.timeline = u64::from(ts);
                Step::First
            }
            Some(last) if ts >= last && ts - last < HALF => {
                self.timeline += u64::from(ts - last);
                Step::Forward
            }
            Some(last) if ts < last && last >= HALF && ts < HALF => {
                self.timeline += u64::from(elapsed_us(last, ts));
                self.wraps += 1;
                Step::Wrapped
            }
            Some(_) => {
                self.resets += 1;
                Step::Reset
            }
        };
        self.last = Some(ts);
        Unwrapped { timeline: self.timeline, step }
    }

    pub fn wraps(&self) -> u64 {
        self.wraps
    }

    pub fn resets(&self) -> u64 {
        self.resets
    }
}
