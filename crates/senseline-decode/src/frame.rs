use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Shape of a line: timestamp, `channels` samples, optional low-rate value.
/// Fields are positional; names never appear on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameLayout {
    pub channels: usize,
    pub low_rate: bool,
}

impl FrameLayout {
    pub fn expected_fields(&self) -> usize {
        1 + self.channels + usize::from(self.low_rate)
    }

    /// Column names for a CSV header, e.g. `timestamp,ch0,ch1,low_rate`.
    pub fn header(&self) -> Vec<String> {
        let mut cols = vec!["timestamp".to_string()];
        cols.extend((0..self.channels).map(|i| format!("ch{i}")));
        if self.low_rate {
            cols.push("low_rate".to_string());
        }
        cols
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecodedRecord {
    pub timestamp: u32,
    pub samples: Vec<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub low_rate: Option<f64>,
    /// Unit marker stripped from the low-rate field, if the device appends one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
}

#[derive(Debug, Error, PartialEq)]
pub enum DecodeError {
    #[error("expected {expected} fields, got {got}")]
    FieldCount { expected: usize, got: usize },
    #[error("bad timestamp {0:?}")]
    Timestamp(String),
    #[error("bad sample {value:?} in column {index}")]
    Sample { index: usize, value: String },
    #[error("bad low-rate value {0:?}")]
    LowRate(String),
}

pub fn decode_line(line: &str, layout: &FrameLayout) -> Result<DecodedRecord, DecodeError> {
    let line = line.trim();
    let fields: Vec<&str> = line.split(',').map(str::trim).collect();
    if fields.len() != layout.expected_fields() {
        return Err(DecodeError::FieldCount {
            expected: layout.expected_fields(),
            got: fields.len(),
        });
    }

    let timestamp = fields[0]
        .parse::<u32>()
        .map_err(|_| DecodeError::Timestamp(fields[0].to_string()))?;

    let samples = fields[1..=layout.channels]
        .iter()
        .enumerate()
        .map(|(index, value)| {
            value.parse::<u16>().map_err(|_| DecodeError::Sample {
                index,
                value: value.to_string(),
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    let (low_rate, unit) = if layout.low_rate {
        let (value, unit) = parse_low_rate(fields[layout.channels + 1])?;
        (Some(value), unit)
    } else {
        (None, None)
    };

    Ok(DecodedRecord { timestamp, samples, low_rate, unit })
}

fn parse_low_rate(field: &str) -> Result<(f64, Option<String>), DecodeError> {
    let number = field.trim_end_matches(|c: char| c.is_ascii_alphabetic());
    let unit = &field[number.len()..];
    let value = number
        .parse::<f64>()
        .map_err(|_| DecodeError::LowRate(field.to_string()))?;
    Ok((value, (!unit.is_empty()).then(|| unit.to_string())))
}

#[cfg(test)]
mod tests {
    use super::*;

    const TWO: FrameLayout = FrameLayout { channels: 2, low_rate: false };
    const TWO_LOW: FrameLayout = FrameLayout { channels: 2, low_rate: true };

    #[test]
    fn decodes_plain_line_with_crlf() {
        let rec = decode_line("1000,512,300\r\n", &TWO).unwrap();
        assert_eq!(rec.timestamp, 1000);
        assert_eq!(rec.samples, vec![512, 300]);
        assert_eq!(rec.low_rate, None);
    }

    #[test]
    fn rejects_wrong_field_count() {
        assert_eq!(
            decode_line("1000,512", &TWO),
            Err(DecodeError::FieldCount { expected: 3, got: 2 })
        );
        // a line torn by reconnect
        assert!(decode_line("00,512,300,12", &TWO).is_err());
    }

    #[test]
    fn reports_bad_columns() {
        assert_eq!(
            decode_line("-5,1,2", &TWO),
            Err(DecodeError::Timestamp("-5".into()))
        );
        assert_eq!(
            decode_line("5,1,x", &TWO),
            Err(DecodeError::Sample { index: 1, value: "x".into() })
        );
        assert_eq!(
            decode_line("5,1,2,abc", &TWO_LOW),
            Err(DecodeError::LowRate("abc".into()))
        );
    }

    #[test]
    fn strips_unit_suffix() {
        let rec = decode_line("7,3,4,12.50g", &TWO_LOW).unwrap();
        assert_eq!(rec.low_rate, Some(12.5));
        assert_eq!(rec.unit.as_deref(), Some("g"));

        let rec = decode_line("7,3,4,-412345.00", &TWO_LOW).unwrap();
        assert_eq!(rec.low_rate, Some(-412_345.0));
        assert_eq!(rec.unit, None);
    }

    #[test]
    fn header_matches_layout() {
        assert_eq!(TWO_LOW.header(), vec!["timestamp", "ch0", "ch1", "low_rate"]);
    }
}
