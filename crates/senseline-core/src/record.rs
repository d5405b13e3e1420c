use std::fmt::Write;

use crate::clock::Timestamp;

/// How the low-rate field is rendered. Always two fractional digits.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum LowRateFormat {
    #[default]
    Plain,
    /// Appends a unit marker such as `g`. Breaks naive numeric parsers, so opt-in only.
    UnitSuffix(String),
}

/// One sampling cycle: timestamp, one sample per channel in declaration
/// order, and the forward-filled low-rate value if one is configured.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub timestamp: Timestamp,
    pub samples: Vec<u16>,
    pub low_rate: Option<f32>,
}

impl Record {
    pub fn field_count(&self) -> usize {
        1 + self.samples.len() + usize::from(self.low_rate.is_some())
    }

    /// Comma-separated decimal fields, without the line terminator.
    pub fn format_line(&self, low_rate_format: &LowRateFormat) -> String {
        let mut line = String::with_capacity(8 + self.samples.len() * 5 + 12);
        let _ = write!(line, "{}", self.timestamp);
        for sample in &self.samples {
            let _ = write!(line, ",{sample}");
        }
        if let Some(value) = self.low_rate {
            let _ = write!(line, ",{value:.2}");
            if let LowRateFormat::UnitSuffix(unit) = low_rate_format {
                line.push_str(unit);
            }
        }
        line
    }
}
