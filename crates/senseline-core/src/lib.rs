//! Device side of the sensor stream: channels, sampling, record framing and
//! the serial transport, plus the host-side serial reader used to capture it.

pub mod channel;
pub mod clock;
pub mod encoding;
pub mod error;
pub mod framer;
pub mod loadcell;
pub mod logbuf;
pub mod lowrate;
pub mod record;
pub mod remap;
pub mod sensor;
pub mod serial_service;
pub mod transport;

pub use channel::{Channel, ChannelKind, ChannelSet};
pub use clock::{Clock, MonotonicClock, Timestamp};
pub use encoding::TextEncoding;
pub use error::{Error, Result};
pub use framer::{FramerConfig, SampleFramer};
pub use loadcell::{Calibration, Gain, Hx711, LoadCell, RawLoadCell};
pub use logbuf::{CaptureEntry, CaptureLog, LineStatus, SharedCaptureLog};
pub use lowrate::LastSeen;
pub use record::{LowRateFormat, Record};
pub use remap::{DacMirror, RangeMap};
pub use sensor::{AnalogSink, LowRateSensor, SensorBus};
pub use serial_service::{LineEnding, PortInfo, SerialConfig, SerialEvent, SerialService};
pub use transport::{SerialTransport, Transport, WriterTransport};
