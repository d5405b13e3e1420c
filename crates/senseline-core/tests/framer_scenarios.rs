use std::collections::{HashMap, VecDeque};

use senseline_core::{
    Channel, ChannelSet, Clock, FramerConfig, LineEnding, LoadCell, LowRateFormat,
    LowRateSensor, RawLoadCell, SampleFramer, SensorBus, Timestamp, WriterTransport,
};

const A0: u8 = 14;
const A1: u8 = 15;
const A2: u8 = 16;

fn analog(pin: u8, bits: u8) -> Channel {
    Channel::analog(pin, bits).unwrap()
}

#[derive(Default)]
struct PinBus {
    analog: HashMap<u8, u16>,
    digital: HashMap<u8, bool>,
}

impl SensorBus for PinBus {
    fn configure_input(&mut self, _pin: u8) {}

    fn read_analog(&mut self, pin: u8) -> u16 {
        self.analog.get(&pin).copied().unwrap_or(0)
    }

    fn read_digital(&mut self, pin: u8) -> bool {
        self.digital.get(&pin).copied().unwrap_or(false)
    }
}

struct ScriptedClock(VecDeque<u32>);

impl Clock for ScriptedClock {
    fn now(&mut self) -> Timestamp {
        Timestamp(self.0.pop_front().expect("clock script exhausted"))
    }
}

/// Ready only on the listed (1-based) cycles; each ready read returns the next value.
struct SlowSensor {
    cycle: u32,
    ready_on: Vec<u32>,
    values: VecDeque<f32>,
}

impl LowRateSensor for SlowSensor {
    fn is_ready(&mut self) -> bool {
        self.cycle += 1;
        self.ready_on.contains(&self.cycle)
    }

    fn read_value(&mut self) -> Option<f32> {
        Some(self.values.pop_front().expect("value script exhausted"))
    }
}

fn lines(transport: WriterTransport<Vec<u8>>) -> Vec<String> {
    String::from_utf8(transport.into_inner())
        .unwrap()
        .lines()
        .map(str::to_owned)
        .collect()
}

#[test]
fn two_analog_channels() {
    let channels = ChannelSet::new(vec![analog(A0, 10), analog(A1, 10)]).unwrap();
    let mut bus = PinBus::default();
    bus.analog.insert(A0, 512);
    bus.analog.insert(A1, 300);

    let mut framer = SampleFramer::new(
        channels,
        bus,
        ScriptedClock([1000].into()),
        WriterTransport::new(Vec::new(), LineEnding::CRLF),
        FramerConfig::default(),
    );
    framer.initialize(115_200).unwrap();
    framer.run_cycle();

    let (_, _, transport) = framer.into_parts();
    assert_eq!(transport.get_ref().as_slice(), b"1000,512,300\r\n");
}

#[test]
fn analog_and_digital_channel() {
    let channels = ChannelSet::new(vec![analog(A0, 10), Channel::digital(10)]).unwrap();
    let mut bus = PinBus::default();
    bus.analog.insert(A0, 77);
    bus.digital.insert(10, true);

    let mut framer = SampleFramer::new(
        channels,
        bus,
        ScriptedClock([999_999].into()),
        WriterTransport::new(Vec::new(), LineEnding::LF),
        FramerConfig::default(),
    );
    framer.run_cycle();

    let (_, _, transport) = framer.into_parts();
    assert_eq!(lines(transport), vec!["999999,77,1"]);
}

#[test]
fn low_rate_field_defaults_to_zero_before_first_read() {
    let channels = ChannelSet::new(vec![analog(A0, 12)]).unwrap();
    let sensor = SlowSensor { cycle: 0, ready_on: vec![], values: VecDeque::new() };

    let mut framer = SampleFramer::new(
        channels,
        PinBus::default(),
        ScriptedClock([4, 8].into()),
        WriterTransport::new(Vec::new(), LineEnding::LF),
        FramerConfig::default(),
    )
    .with_low_rate(sensor);
    framer.run_cycles(2);

    let (_, _, transport) = framer.into_parts();
    assert_eq!(lines(transport), vec!["4,0,0.00", "8,0,0.00"]);
}

#[test]
fn low_rate_field_is_forward_filled() {
    let channels = ChannelSet::new(vec![
        analog(A0, 10),
        analog(A1, 10),
        analog(A2, 10),
    ])
    .unwrap();
    let sensor = SlowSensor {
        cycle: 0,
        ready_on: vec![1, 5],
        values: [-412_345.0, 98_765.0].into(),
    };

    let mut framer = SampleFramer::new(
        channels,
        PinBus::default(),
        ScriptedClock((1..=6).map(|i| i * 100).collect()),
        WriterTransport::new(Vec::new(), LineEnding::LF),
        FramerConfig::default(),
    )
    .with_low_rate(sensor);
    assert_eq!(framer.field_count(), 5);

    let records: Vec<_> = (0..6).map(|_| framer.run_cycle()).collect();
    let low: Vec<f32> = records.iter().map(|r| r.low_rate.unwrap()).collect();
    assert_eq!(
        low,
        vec![-412_345.0, -412_345.0, -412_345.0, -412_345.0, 98_765.0, 98_765.0]
    );

    let (_, _, transport) = framer.into_parts();
    let out = lines(transport);
    assert_eq!(out[0], "100,0,0,0,-412345.00");
    assert_eq!(out[3], "400,0,0,0,-412345.00");
    assert_eq!(out[4], "500,0,0,0,98765.00");
    assert!(out.iter().all(|l| l.split(',').count() == 5));
}

/// Always ready; each conversion comes from the script, `None` being a bus fault.
struct FlakyAmplifier(VecDeque<Option<i32>>);

impl RawLoadCell for FlakyAmplifier {
    fn is_ready(&mut self) -> bool {
        true
    }

    fn read_raw(&mut self) -> Option<i32> {
        self.0.pop_front().flatten()
    }
}

#[test]
fn faulted_load_cell_read_keeps_last_value() {
    let channels = ChannelSet::new(vec![Channel::digital(10)]).unwrap();
    let mut bus = PinBus::default();
    bus.digital.insert(10, true);
    let cell = LoadCell::new(FlakyAmplifier([Some(500), None, None].into()));

    let mut framer = SampleFramer::new(
        channels,
        bus,
        ScriptedClock([1, 2, 3].into()),
        WriterTransport::new(Vec::new(), LineEnding::LF),
        FramerConfig::default(),
    )
    .with_low_rate(cell);
    framer.run_cycles(3);

    let (_, _, transport) = framer.into_parts();
    assert_eq!(lines(transport), vec!["1,1,500.00", "2,1,500.00", "3,1,500.00"]);
}

#[test]
fn unit_suffix_variant() {
    let channels = ChannelSet::new(vec![analog(A0, 10), analog(A1, 10)]).unwrap();
    let sensor = SlowSensor { cycle: 0, ready_on: vec![1], values: [12.5].into() };
    let config = FramerConfig {
        low_rate_format: LowRateFormat::UnitSuffix("g".into()),
        ..Default::default()
    };

    let mut framer = SampleFramer::new(
        channels,
        PinBus::default(),
        ScriptedClock([42].into()),
        WriterTransport::new(Vec::new(), LineEnding::LF),
        config,
    )
    .with_low_rate(sensor);
    framer.run_cycle();

    let (_, _, transport) = framer.into_parts();
    assert_eq!(lines(transport), vec!["42,0,0,12.50g"]);
}

#[test]
fn samples_stay_in_declared_range() {
    let channels = ChannelSet::new(vec![
        analog(A0, 10),
        analog(A1, 12),
        Channel::digital(10),
    ])
    .unwrap();
    let mut bus = PinBus::default();
    bus.analog.insert(A0, u16::MAX);
    bus.analog.insert(A1, 5000);
    bus.digital.insert(10, true);

    let mut framer = SampleFramer::new(
        channels.clone(),
        bus,
        ScriptedClock([1].into()),
        WriterTransport::new(Vec::new(), LineEnding::LF),
        FramerConfig::default(),
    );
    let record = framer.run_cycle();
    for (sample, ch) in record.samples.iter().zip(channels.iter()) {
        assert!(*sample <= ch.max_value());
    }
    assert_eq!(record.samples, vec![1023, 4095, 1]);
}
