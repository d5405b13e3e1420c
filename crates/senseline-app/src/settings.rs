use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use senseline_core::{
    Calibration, Channel, ChannelSet, FramerConfig, LineEnding, LowRateFormat, RangeMap,
    SerialConfig,
};
use senseline_decode::FrameLayout;

/// Arduino-style analog pin numbering: A0 is pin 14.
const A0: u8 = 14;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub serial: SerialSettings,
    pub channels: Vec<ChannelSpec>,
    pub load_cell: Option<LoadCellSettings>,
    pub cycle_delay_ms: Option<u64>,
    pub dac: DacSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            serial: SerialSettings::default(),
            channels: vec![
                ChannelSpec::Analog { analog: A0, bits: 10 },
                ChannelSpec::Analog { analog: A0 + 1, bits: 10 },
            ],
            load_cell: None,
            cycle_delay_ms: None,
            dac: DacSettings::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SerialSettings {
    pub port: String,
    pub baud: u32,
    pub line_ending: String,
}

impl Default for SerialSettings {
    fn default() -> Self {
        Self {
            port: String::new(),
            baud: 115_200,
            line_ending: "CRLF".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ChannelSpec {
    Analog {
        analog: u8,
        #[serde(default = "default_bits")]
        bits: u8,
    },
    Digital {
        digital: u8,
    },
}

fn default_bits() -> u8 {
    10
}

impl TryFrom<ChannelSpec> for Channel {
    type Error = senseline_core::Error;

    fn try_from(spec: ChannelSpec) -> Result<Self, Self::Error> {
        match spec {
            ChannelSpec::Analog { analog, bits } => Channel::analog(analog, bits),
            ChannelSpec::Digital { digital } => Ok(Channel::digital(digital)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoadCellSettings {
    pub scale: f32,
    pub offset: i64,
    /// e.g. `"g"`; appended to the value on the wire when set.
    pub unit_suffix: Option<String>,
}

impl Default for LoadCellSettings {
    fn default() -> Self {
        Self { scale: 1.0, offset: 0, unit_suffix: None }
    }
}

/// Device-specific bounds for mirroring the load cell onto a DAC pin.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct DacSettings {
    pub in_min: i64,
    pub in_max: i64,
    pub out_min: i64,
    pub out_max: i64,
}

impl Default for DacSettings {
    fn default() -> Self {
        Self { in_min: -550_000, in_max: 250_000, out_min: 0, out_max: 4095 }
    }
}

impl Settings {
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("senseline").join("settings.json"))
    }

    /// An explicit path must exist; the default location falls back to built-in settings.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(p) => Self::read(p),
            None => match Self::default_path() {
                Some(p) if p.exists() => Self::read(&p),
                _ => {
                    tracing::debug!("no settings file, using defaults");
                    Ok(Self::default())
                }
            },
        }
    }

    fn read(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading settings {}", path.display()))?;
        let settings = serde_json::from_str(&text)
            .with_context(|| format!("parsing settings {}", path.display()))?;
        tracing::info!("loaded settings from {}", path.display());
        Ok(settings)
    }

    pub fn channel_set(&self) -> Result<ChannelSet> {
        let channels = self
            .channels
            .iter()
            .copied()
            .map(Channel::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(ChannelSet::new(channels)?)
    }

    pub fn line_ending(&self) -> Result<LineEnding> {
        Ok(self.serial.line_ending.parse()?)
    }

    pub fn serial_config(&self, port_override: Option<&str>) -> Result<SerialConfig> {
        let port_name = port_override.unwrap_or(&self.serial.port).to_string();
        if port_name.is_empty() {
            anyhow::bail!("no serial port given; pass --port or set serial.port in the settings file");
        }
        Ok(SerialConfig {
            port_name,
            baud_rate: self.serial.baud,
            line_ending: self.line_ending()?,
            ..Default::default()
        })
    }

    pub fn framer_config(&self) -> FramerConfig {
        let low_rate_format = match self.load_cell.as_ref().and_then(|lc| lc.unit_suffix.clone()) {
            Some(unit) => LowRateFormat::UnitSuffix(unit),
            None => LowRateFormat::Plain,
        };
        FramerConfig {
            low_rate_format,
            cycle_delay: self.cycle_delay_ms.map(std::time::Duration::from_millis),
        }
    }

    pub fn calibration(&self) -> Option<Calibration> {
        self.load_cell
            .as_ref()
            .map(|lc| Calibration { scale: lc.scale, offset: lc.offset })
    }

    pub fn range_map(&self) -> Result<RangeMap> {
        let d = self.dac;
        Ok(RangeMap::new(d.in_min, d.in_max, d.out_min, d.out_max)?)
    }

    pub fn frame_layout(&self) -> FrameLayout {
        FrameLayout {
            channels: self.channels.len(),
            low_rate: self.load_cell.is_some(),
        }
    }
}
