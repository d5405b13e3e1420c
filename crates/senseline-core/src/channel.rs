use crate::{Error, Result};

/// How a pin is sampled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelKind {
    /// ADC magnitude in `0..=2^resolution_bits - 1`.
    Analog { resolution_bits: u8 },
    /// Binary level, emitted as 0 or 1.
    Digital,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Channel {
    pin: u8,
    kind: ChannelKind,
}

impl Channel {
    /// Analog input sampled at 1 to 16 bits.
    pub fn analog(pin: u8, resolution_bits: u8) -> Result<Self> {
        if !(1..=16).contains(&resolution_bits) {
            return Err(Error::Config(format!(
                "pin {pin}: analog resolution {resolution_bits} bits out of range 1..=16"
            )));
        }
        Ok(Self { pin, kind: ChannelKind::Analog { resolution_bits } })
    }

    pub fn digital(pin: u8) -> Self {
        Self { pin, kind: ChannelKind::Digital }
    }

    pub fn pin(&self) -> u8 {
        self.pin
    }

    pub fn kind(&self) -> ChannelKind {
        self.kind
    }

    /// Largest value this channel can emit.
    pub fn max_value(&self) -> u16 {
        match self.kind {
            ChannelKind::Analog { resolution_bits } => 1u32
                .checked_shl(u32::from(resolution_bits))
                .map_or(u32::MAX, |v| v - 1)
                .min(u32::from(u16::MAX)) as u16,
            ChannelKind::Digital => 1,
        }
    }
}

/// Ordered, immutable list of inputs. Order is the field order on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelSet {
    channels: Vec<Channel>,
}

impl ChannelSet {
    pub fn new(channels: Vec<Channel>) -> Result<Self> {
        if channels.is_empty() {
            return Err(Error::Config("channel set must not be empty".into()));
        }
        Ok(Self { channels })
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Channel> {
        self.channels.iter()
    }

    pub fn len(&self) -> usize {
        self.channels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }
}

impl<'a> IntoIterator for &'a ChannelSet {
    type Item = &'a Channel;
    type IntoIter = std::slice::Iter<'a, Channel>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
