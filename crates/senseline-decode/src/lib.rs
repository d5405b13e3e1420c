//! Host side of the sensor stream: positional line decoding, wrap-aware
//! timestamp handling, capture statistics and per-channel filters.

pub mod assembler;
pub mod filter;
pub mod frame;
pub mod stats;
pub mod timing;

pub use assembler::LineAssembler;
pub use filter::{CombFilter, FilterChain, FilterSettings, HighPassFilter, LowPassFilter};
pub use frame::{decode_line, DecodeError, DecodedRecord, FrameLayout};
pub use stats::CaptureStats;
pub use timing::{elapsed_us, Step, TimestampUnwrapper, Unwrapped};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SampleRate(pub f64); // Hz

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeSpan {
    pub start_s: f64,
    pub end_s: f64,
}

impl TimeSpan {
    pub fn duration_s(&self) -> f64 {
        self.end_s - self.start_s
    }
}
