use crate::{SampleRate, TimeSpan};

/// Running summary over unwrapped (u64) timestamps.
#[derive(Debug, Clone, Default)]
pub struct CaptureStats {
    first_us: Option<u64>,
    last_us: Option<u64>,
    count: u64,
    max_gap_us: u64,
}

impl CaptureStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, unwrapped_us: u64) {
        if let Some(last) = self.last_us {
            self.max_gap_us = self.max_gap_us.max(unwrapped_us.saturating_sub(last));
        } else {
            self.first_us = Some(unwrapped_us);
        }
        self.last_us = Some(unwrapped_us);
        self.count += 1;
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    /// Largest interval between consecutive records; a stall or dropped data shows up here.
    pub fn max_gap_us(&self) -> u64 {
        self.max_gap_us
    }

    pub fn span(&self) -> Option<TimeSpan> {
        Some(TimeSpan {
            start_s: self.first_us? as f64 / 1e6,
            end_s: self.last_us? as f64 / 1e6,
        })
    }

    /// Mean record rate. Needs at least two records spanning non-zero time.
    pub fn sample_rate(&self) -> Option<SampleRate> {
        let span = self.span()?.duration_s();
        (self.count >= 2 && span > 0.0).then(|| SampleRate((self.count - 1) as f64 / span))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::TimestampUnwrapper;

    #[test]
    fn empty_has_no_rate() {
        let stats = CaptureStats::new();
        assert!(stats.span().is_none());
        assert!(stats.sample_rate().is_none());
    }

    #[test]
    fn rate_over_wrapped_stream() {
        let mut unwrap = TimestampUnwrapper::new();
        let mut stats = CaptureStats::new();
        // 1 kHz straddling the 2^32 boundary
        let mut t = u32::MAX - 2_499;
        for _ in 0..11 {
            stats.push(unwrap.push(t));
            t = t.wrapping_add(1000);
        }
        assert_eq!(stats.count(), 11);
        assert_eq!(stats.max_gap_us(), 1000);
        let rate = stats.sample_rate().unwrap();
        assert!((rate.0 - 1000.0).abs() < 1e-6);
        assert!((stats.span().unwrap().duration_s() - 0.01).abs() < 1e-9);
    }
}
