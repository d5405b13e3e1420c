use crossbeam_channel::{unbounded, Receiver, Sender};
use serialport::{SerialPort, SerialPortInfo, SerialPortType};
use std::io::Read;
use std::time::Duration;

use crate::{Error, Result};

/// A port as reported by the OS. USB adapters also carry their descriptors,
/// which is usually the only way to tell two boards apart.
#[derive(Debug, Clone, Default)]
pub struct PortInfo {
    pub port_name: String,
    pub port_type: String,
    pub vid: Option<u16>,
    pub pid: Option<u16>,
    pub serial_number: Option<String>,
    pub manufacturer: Option<String>,
    pub product: Option<String>,
}

impl From<SerialPortInfo> for PortInfo {
    fn from(info: SerialPortInfo) -> Self {
        let mut port = PortInfo { port_name: info.port_name, ..Default::default() };
        port.port_type = match info.port_type {
            SerialPortType::UsbPort(usb) => {
                port.vid = Some(usb.vid);
                port.pid = Some(usb.pid);
                port.serial_number = usb.serial_number;
                port.manufacturer = usb.manufacturer;
                port.product = usb.product;
                "USB"
            }
            SerialPortType::PciPort => "PCI",
            SerialPortType::BluetoothPort => "Bluetooth",
            SerialPortType::Unknown => "Unknown",
        }
        .to_string();
        port
    }
}

impl std::fmt::Display for PortInfo {
    /// `/dev/ttyACM0 (2341:0043) Arduino LLC Arduino Uno [SN 7563]`
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.port_name)?;
        match (self.vid, self.pid) {
            (Some(vid), Some(pid)) => write!(f, " ({vid:04X}:{pid:04X})")?,
            _ => write!(f, " [{}]", self.port_type)?,
        }
        for text in [&self.manufacturer, &self.product].into_iter().flatten() {
            write!(f, " {text}")?;
        }
        if let Some(sn) = &self.serial_number {
            write!(f, " [SN {sn}]")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LineEnding {
    LF,
    CR,
    CRLF,
}

impl LineEnding {
    pub fn as_bytes(&self) -> &'static [u8] {
        match self {
            LineEnding::LF => b"\n",
            LineEnding::CR => b"\r",
            LineEnding::CRLF => b"\r\n",
        }
    }
}

impl std::str::FromStr for LineEnding {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_uppercase().as_str() {
            "LF" => Ok(Self::LF),
            "CR" => Ok(Self::CR),
            "CRLF" => Ok(Self::CRLF),
            other => Err(Error::Config(format!("unknown line ending {other:?}"))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SerialConfig {
    pub port_name: String,
    pub baud_rate: u32,
    pub data_bits: serialport::DataBits,
    pub parity: serialport::Parity,
    pub stop_bits: serialport::StopBits,
    pub flow_control: serialport::FlowControl,
    pub line_ending: LineEnding,
}

impl Default for SerialConfig {
    /// 8N1 at 115200 with the CRLF terminator microcontroller `println` emits.
    fn default() -> Self {
        Self {
            port_name: String::new(),
            baud_rate: 115_200,
            data_bits: serialport::DataBits::Eight,
            parity: serialport::Parity::None,
            stop_bits: serialport::StopBits::One,
            flow_control: serialport::FlowControl::None,
            line_ending: LineEnding::CRLF,
        }
    }
}

impl SerialConfig {
    pub(crate) fn open_port(&self, baud_rate: u32) -> Result<Box<dyn SerialPort>> {
        serialport::new(&self.port_name, baud_rate)
            .data_bits(self.data_bits)
            .parity(self.parity)
            .stop_bits(self.stop_bits)
            .flow_control(self.flow_control)
            .timeout(Duration::from_millis(50))
            .open()
            .map_err(|e| Error::TransportOpen {
                port: self.port_name.clone(),
                source: e.into(),
            })
    }
}

#[derive(Debug, Clone)]
pub enum SerialEvent {
    Rx(Vec<u8>),
    Opened(String),
    Closed,
    Error(String),
}

enum Command {
    Close,
}

/// Host-side reader: owns the port on a background thread and forwards
/// received bytes as events.
pub struct SerialService {
    cfg: SerialConfig,
    tx_cmd: Sender<Command>,
    rx_evt: Receiver<SerialEvent>,
}

impl SerialService {
    pub fn list_ports() -> Vec<PortInfo> {
        serialport::available_ports()
            .unwrap_or_default()
            .into_iter()
            .map(PortInfo::from)
            .collect()
    }

    /// Opens the port on the calling thread so failure is reported here, then
    /// hands it to the reader thread.
    pub fn open(cfg: SerialConfig) -> Result<Self> {
        let port = cfg.open_port(cfg.baud_rate)?;
        log::info!("opened {} at {} baud", cfg.port_name, cfg.baud_rate);
        Ok(Self::spawn(cfg, port))
    }

    /// Runs the reader over any byte source. Used for replaying captures.
    pub fn from_reader<R: Read + Send + 'static>(cfg: SerialConfig, reader: R) -> Self {
        Self::spawn(cfg, reader)
    }

    fn spawn<R: Read + Send + 'static>(cfg: SerialConfig, mut port: R) -> Self {
        let (tx_cmd, rx_cmd) = unbounded::<Command>();
        let (tx_evt, rx_evt) = unbounded::<SerialEvent>();
        let name = cfg.port_name.clone();

        std::thread::spawn(move || {
            let _ = tx_evt.send(SerialEvent::Opened(name));
            let mut buf = [0u8; 4096];
            loop {
                match port.read(&mut buf) {
                    Ok(0) => {
                        let _ = tx_evt.send(SerialEvent::Closed);
                        return;
                    }
                    Ok(n) => {
                        let _ = tx_evt.send(SerialEvent::Rx(buf[..n].to_vec()));
                    }
                    Err(e) if e.kind() == std::io::ErrorKind::TimedOut => {}
                    Err(e) if e.kind() == std::io::ErrorKind::Interrupted => {}
                    Err(e) => {
                        let _ = tx_evt.send(SerialEvent::Error(e.to_string()));
                        let _ = tx_evt.send(SerialEvent::Closed);
                        return;
                    }
                }
                if let Ok(Command::Close) = rx_cmd.try_recv() {
                    let _ = tx_evt.send(SerialEvent::Closed);
                    return;
                }
            }
        });

        Self { cfg, tx_cmd, rx_evt }
    }

    pub fn close(&self) {
        let _ = self.tx_cmd.send(Command::Close);
    }

    pub fn events(&self) -> &Receiver<SerialEvent> {
        &self.rx_evt
    }

    pub fn config(&self) -> &SerialConfig { &self.cfg }
}
