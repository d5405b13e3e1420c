use std::io::Write;

use serialport::SerialPort;

use crate::serial_service::{LineEnding, SerialConfig};
use crate::Result;

/// Sink for framed lines.
///
/// Writes are fire-and-forget: a failed or stalled write is not reported to
/// the caller, and the stream consumer is expected to notice gaps.
pub trait Transport {
    fn open(&mut self, baud_rate: u32) -> Result<()>;
    /// Writes `line` followed by the transport's terminator.
    fn write_line(&mut self, line: &str);
}

pub struct SerialTransport {
    cfg: SerialConfig,
    port: Option<Box<dyn SerialPort>>,
}

impl SerialTransport {
    pub fn new(cfg: SerialConfig) -> Self {
        Self { cfg, port: None }
    }

    pub fn config(&self) -> &SerialConfig {
        &self.cfg
    }
}

impl Transport for SerialTransport {
    fn open(&mut self, baud_rate: u32) -> Result<()> {
        let port = self.cfg.open_port(baud_rate)?;
        self.cfg.baud_rate = baud_rate;
        log::info!("transport open on {} at {} baud", self.cfg.port_name, baud_rate);
        self.port = Some(port);
        Ok(())
    }

    fn write_line(&mut self, line: &str) {
        let Some(port) = self.port.as_mut() else {
            log::trace!("dropping line, transport not open");
            return;
        };
        let ending = self.cfg.line_ending.as_bytes();
        if let Err(e) = port.write_all(line.as_bytes()).and_then(|_| port.write_all(ending)) {
            log::trace!("write to {} failed: {e}", self.cfg.port_name);
        }
    }
}

/// Transport over any `Write`, e.g. stdout or a file.
pub struct WriterTransport<W> {
    writer: W,
    line_ending: LineEnding,
}

impl<W: Write> WriterTransport<W> {
    pub fn new(writer: W, line_ending: LineEnding) -> Self {
        Self { writer, line_ending }
    }

    pub fn get_ref(&self) -> &W {
        &self.writer
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> Transport for WriterTransport<W> {
    fn open(&mut self, baud_rate: u32) -> Result<()> {
        log::debug!("writer transport ignores baud rate {baud_rate}");
        Ok(())
    }

    fn write_line(&mut self, line: &str) {
        let ending = self.line_ending.as_bytes();
        let res = self
            .writer
            .write_all(line.as_bytes())
            .and_then(|_| self.writer.write_all(ending))
            .and_then(|_| self.writer.flush());
        if let Err(e) = res {
            log::trace!("write failed: {e}");
        }
    }
}
