//! Host-side logger: turns the device's line stream into a CSV file with a
//! host receive time and an unwrapped timestamp column.

use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use senseline_core::{LineStatus, SerialEvent, SerialService, SharedCaptureLog, TextEncoding};
use senseline_decode::{
    decode_line, CaptureStats, DecodedRecord, FilterChain, FilterSettings, FrameLayout,
    LineAssembler, Step, TimestampUnwrapper,
};

pub struct CaptureOptions {
    pub layout: FrameLayout,
    pub encoding: TextEncoding,
    pub max_records: Option<u64>,
    /// Set for a live port: attaching mid-stream usually tears the first line.
    pub resync_on_open: bool,
    /// Adds a filtered column per channel when set.
    pub filter: Option<FilterSettings>,
}

pub struct CaptureWriter<W> {
    out: W,
    layout: FrameLayout,
    encoding: TextEncoding,
    assembler: LineAssembler,
    unwrap: TimestampUnwrapper,
    stats: CaptureStats,
    filters: Vec<FilterChain>,
    log: SharedCaptureLog,
}

impl<W: Write> CaptureWriter<W> {
    pub fn new(out: W, opts: &CaptureOptions, log: SharedCaptureLog) -> Self {
        Self {
            out,
            layout: opts.layout,
            encoding: opts.encoding,
            assembler: LineAssembler::new(),
            unwrap: TimestampUnwrapper::new(),
            stats: CaptureStats::new(),
            filters: opts
                .filter
                .map(|f| vec![FilterChain::new(f); opts.layout.channels])
                .unwrap_or_default(),
            log,
        }
    }

    pub fn write_header(&mut self) -> Result<()> {
        let mut cols = vec!["global_time".to_string()];
        cols.extend(self.layout.header());
        cols.push("timeline_us".to_string());
        cols.extend((0..self.filters.len()).map(|i| format!("ch{i}_filtered")));
        writeln!(self.out, "{}", cols.join(","))?;
        Ok(())
    }

    /// Feeds received bytes and returns how many records were written. At
    /// most `limit` records are written; lines past it are discarded.
    pub fn feed(&mut self, data: &[u8], limit: Option<u64>) -> Result<u64> {
        let mut written = 0;
        for raw in self.assembler.push(data) {
            if limit.is_some_and(|max| written >= max) {
                break;
            }
            written += self.handle_line(&raw)?;
        }
        Ok(written)
    }

    /// Handles whatever partial line is left at end of stream, unless the
    /// record budget is already spent.
    pub fn finish(&mut self, limit: Option<u64>) -> Result<u64> {
        let written = match self.assembler.flush() {
            Some(raw) if limit != Some(0) => self.handle_line(&raw)?,
            _ => 0,
        };
        self.out.flush()?;
        Ok(written)
    }

    /// Discards input up to the next line break.
    pub fn resync(&mut self) {
        self.assembler.resync();
    }

    fn handle_line(&mut self, raw: &[u8]) -> Result<u64> {
        let text = self.encoding.decode(raw);
        if text.trim().is_empty() {
            return Ok(0);
        }
        match decode_line(&text, &self.layout) {
            Ok(rec) => {
                let received_ms = self.log.lock().push(LineStatus::Accepted, text);
                self.write_record(received_ms, &rec)?;
                Ok(1)
            }
            Err(e) => {
                tracing::debug!("dropping line ({e}): {}", hex::encode(raw));
                self.log.lock().push(LineStatus::Malformed, text);
                Ok(0)
            }
        }
    }

    fn write_record(&mut self, received_ms: u64, rec: &DecodedRecord) -> Result<()> {
        let step = self.unwrap.push_checked(rec.timestamp);
        if step.step == Step::Reset {
            tracing::warn!(
                "timestamp {} does not follow the previous record; treating it as a reset",
                rec.timestamp
            );
        }
        let timeline = step.timeline;
        self.stats.push(timeline);

        let global_time = chrono::DateTime::from_timestamp_millis(received_ms as i64)
            .map(|t| t.format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string())
            .unwrap_or_default();
        write!(self.out, "{global_time},{}", rec.timestamp)?;
        for s in &rec.samples {
            write!(self.out, ",{s}")?;
        }
        if let Some(v) = rec.low_rate {
            write!(self.out, ",{v:.2}")?;
        }
        write!(self.out, ",{timeline}")?;
        for (filter, &s) in self.filters.iter_mut().zip(&rec.samples) {
            write!(self.out, ",{:.3}", filter.filter(f64::from(s)))?;
        }
        writeln!(self.out)?;
        Ok(())
    }

    pub fn stats(&self) -> &CaptureStats {
        &self.stats
    }

    pub fn wraps(&self) -> u64 {
        self.unwrap.wraps()
    }

    pub fn resets(&self) -> u64 {
        self.unwrap.resets()
    }
}

/// Pumps serial events into `writer` until the port closes or the record
/// limit is reached.
pub fn run<W: Write>(
    service: &SerialService,
    writer: &mut CaptureWriter<W>,
    opts: &CaptureOptions,
) -> Result<u64> {
    let mut total = 0u64;
    let remaining = |total: u64| opts.max_records.map(|max| max.saturating_sub(total));
    for event in service.events().iter() {
        match event {
            SerialEvent::Opened(name) => {
                tracing::info!("capturing from {name}");
                if opts.resync_on_open {
                    writer.resync();
                }
            }
            SerialEvent::Rx(data) => {
                total += writer.feed(&data, remaining(total))?;
                if remaining(total) == Some(0) {
                    service.close();
                    break;
                }
            }
            SerialEvent::Error(e) => tracing::warn!("serial error: {e}"),
            SerialEvent::Closed => break,
        }
    }
    total += writer.finish(remaining(total))?;
    Ok(total)
}

/// Logs running counters every `every` until `running` is cleared.
pub fn spawn_status(
    log: SharedCaptureLog,
    running: Arc<AtomicBool>,
    every: Duration,
) -> std::thread::JoinHandle<()> {
    std::thread::spawn(move || {
        let tick = Duration::from_millis(100);
        let mut waited = Duration::ZERO;
        while running.load(Ordering::Relaxed) {
            std::thread::sleep(tick);
            waited += tick;
            if waited >= every {
                waited = Duration::ZERO;
                let log = log.lock();
                tracing::info!("{} records, {} malformed lines", log.accepted(), log.malformed());
            }
        }
    })
}
