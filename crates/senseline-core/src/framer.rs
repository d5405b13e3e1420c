//! The sampling loop: one timestamped record per cycle, framed as a text
//! line and written straight to the transport.

use std::time::Duration;

use crate::channel::{Channel, ChannelKind, ChannelSet};
use crate::clock::Clock;
use crate::lowrate::LastSeen;
use crate::record::{LowRateFormat, Record};
use crate::sensor::{LowRateSensor, SensorBus};
use crate::transport::Transport;
use crate::Result;

#[derive(Debug, Clone, Default)]
pub struct FramerConfig {
    pub low_rate_format: LowRateFormat,
    /// Pause after each cycle. `None` runs at the natural cadence.
    pub cycle_delay: Option<Duration>,
}

struct LowRateField {
    sensor: Box<dyn LowRateSensor>,
    last: LastSeen,
}

pub struct SampleFramer<B, C, T> {
    channels: ChannelSet,
    bus: B,
    clock: C,
    transport: T,
    config: FramerConfig,
    low_rate: Option<LowRateField>,
}

impl<B, C, T> SampleFramer<B, C, T>
where
    B: SensorBus,
    C: Clock,
    T: Transport,
{
    pub fn new(channels: ChannelSet, bus: B, clock: C, transport: T, config: FramerConfig) -> Self {
        Self { channels, bus, clock, transport, config, low_rate: None }
    }

    /// Adds a trailing forward-filled field fed by `sensor`.
    pub fn with_low_rate<L: LowRateSensor + 'static>(mut self, sensor: L) -> Self {
        self.low_rate = Some(LowRateField { sensor: Box::new(sensor), last: LastSeen::new() });
        self
    }

    pub fn channels(&self) -> &ChannelSet {
        &self.channels
    }

    /// Number of comma-separated fields in every emitted line.
    pub fn field_count(&self) -> usize {
        1 + self.channels.len() + usize::from(self.low_rate.is_some())
    }

    /// Configures every channel as an input, then opens the transport.
    /// A transport that cannot be opened is the only start-up failure.
    pub fn initialize(&mut self, baud_rate: u32) -> Result<()> {
        for ch in &self.channels {
            self.bus.configure_input(ch.pin());
        }
        self.transport.open(baud_rate)?;
        log::info!(
            "framer ready: {} channel(s), low-rate field {}, {} baud",
            self.channels.len(),
            if self.low_rate.is_some() { "on" } else { "off" },
            baud_rate
        );
        Ok(())
    }

    pub fn run_cycle(&mut self) -> Record {
        let timestamp = self.clock.now();

        let samples = self
            .channels
            .iter()
            .map(|ch| sample(&mut self.bus, ch))
            .collect();

        let low_rate = self.low_rate.as_mut().map(|field| {
            field.last.poll(field.sensor.as_mut());
            field.last.value()
        });

        let record = Record { timestamp, samples, low_rate };
        let line = record.format_line(&self.config.low_rate_format);
        log::trace!("{line}");
        self.transport.write_line(&line);
        record
    }

    pub fn run_cycles(&mut self, cycles: u64) {
        for _ in 0..cycles {
            self.run_cycle();
            self.pause();
        }
    }

    /// Runs forever. There is no stop condition.
    pub fn run(&mut self) -> ! {
        loop {
            self.run_cycle();
            self.pause();
        }
    }

    fn pause(&self) {
        if let Some(delay) = self.config.cycle_delay {
            std::thread::sleep(delay);
        }
    }

    pub fn into_parts(self) -> (B, C, T) {
        (self.bus, self.clock, self.transport)
    }
}

fn sample<B: SensorBus>(bus: &mut B, ch: &Channel) -> u16 {
    match ch.kind() {
        ChannelKind::Analog { .. } => bus.read_analog(ch.pin()).min(ch.max_value()),
        ChannelKind::Digital => u16::from(bus.read_digital(ch.pin())),
    }
}
