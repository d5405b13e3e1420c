//! senseline: sample sensor channels into a timestamped CSV line stream, and
//! capture that stream on the host.
//!
//! ```bash
//! # list serial ports
//! senseline ports
//!
//! # run the sampling loop on simulated sensors, framed to stdout
//! senseline emit --stdout --cycles 1000
//!
//! # capture a device stream into a CSV file
//! senseline log --port /dev/ttyACM0 --out session.csv
//!
//! # same, with a filtered column per channel
//! senseline log --port /dev/ttyACM0 --out session.csv --filter --filter-alpha 0.1
//! ```

mod capture;
mod settings;
mod sim;

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{info, Level};

use senseline_core::{
    CaptureLog, ChannelKind, DacMirror, LoadCell, MonotonicClock, SampleFramer, SerialService,
    SerialTransport, TextEncoding, Transport, WriterTransport,
};
use senseline_decode::FilterSettings;

use crate::capture::{CaptureOptions, CaptureWriter};
use crate::settings::Settings;
use crate::sim::{PrintSink, SimBus, SimLoadCell};

/// HX711 at 10 SPS against a loop running at a few kHz.
const SIM_LOAD_CELL_PERIOD: u32 = 400;

#[derive(Parser, Debug)]
#[command(name = "senseline")]
#[command(author, version, about = "Timestamped multi-channel sensor sampling over serial", long_about = None)]
struct Cli {
    /// Logging verbosity level
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Settings file (defaults to <config dir>/senseline/settings.json)
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List available serial ports
    Ports,

    /// Print the effective settings as JSON
    Config,

    /// Run the sampling loop against simulated sensors
    Emit {
        /// Serial port to write records to
        #[arg(short, long)]
        port: Option<String>,

        /// Write records to stdout instead of a serial port
        #[arg(long, conflicts_with = "port")]
        stdout: bool,

        /// Stop after this many cycles (runs forever otherwise)
        #[arg(long)]
        cycles: Option<u64>,
    },

    /// Mirror the simulated load cell onto a DAC level, printed to stdout
    Mirror {
        #[arg(long)]
        cycles: Option<u64>,
    },

    /// Capture a record stream into CSV
    Log {
        /// Serial port to read from
        #[arg(short, long)]
        port: Option<String>,

        /// Replay a previously saved raw stream instead of a port
        #[arg(long, conflicts_with = "port")]
        replay: Option<PathBuf>,

        /// Output CSV file (stdout if omitted)
        #[arg(short, long)]
        out: Option<PathBuf>,

        /// Text encoding of the stream: auto, utf-8, ascii, latin1
        #[arg(long, default_value = "auto")]
        encoding: String,

        /// Stop after this many records
        #[arg(long)]
        max_records: Option<u64>,

        /// Append a comb/low-pass/high-pass filtered column per channel
        #[arg(long)]
        filter: bool,

        /// Low-pass and high-pass smoothing factor
        #[arg(long, default_value_t = 0.05, requires = "filter")]
        filter_alpha: f64,

        /// Comb filter delay in samples (0 disables the comb stage)
        #[arg(long, default_value_t = 25, requires = "filter")]
        filter_delay: usize,

        /// Comb filter gain
        #[arg(long, default_value_t = 1.0, requires = "filter")]
        filter_gain: f64,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = match cli.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    // stderr only: stdout may be carrying records
    tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    info!("senseline v{}", env!("CARGO_PKG_VERSION"));

    let settings = Settings::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Ports => list_ports(),
        Commands::Config => {
            println!("{}", serde_json::to_string_pretty(&settings)?);
            Ok(())
        }
        Commands::Emit { port, stdout, cycles } => {
            if stdout {
                let transport = WriterTransport::new(std::io::stdout(), settings.line_ending()?);
                emit(&settings, transport, cycles)
            } else {
                let cfg = settings.serial_config(port.as_deref())?;
                emit(&settings, SerialTransport::new(cfg), cycles)
            }
        }
        Commands::Mirror { cycles } => mirror(&settings, cycles),
        Commands::Log {
            port,
            replay,
            out,
            encoding,
            max_records,
            filter,
            filter_alpha,
            filter_delay,
            filter_gain,
        } => {
            let encoding: TextEncoding = encoding
                .parse()
                .map_err(|_| anyhow::anyhow!("unknown encoding {encoding:?}"))?;
            let opts = CaptureOptions {
                layout: settings.frame_layout(),
                encoding,
                max_records,
                resync_on_open: replay.is_none(),
                filter: filter.then_some(FilterSettings {
                    alpha: filter_alpha,
                    delay: filter_delay,
                    gain: filter_gain,
                }),
            };
            let service = match replay {
                Some(path) => {
                    let file = File::open(&path)
                        .with_context(|| format!("opening replay {}", path.display()))?;
                    SerialService::from_reader(settings.serial_config(Some("replay"))?, file)
                }
                None => SerialService::open(settings.serial_config(port.as_deref())?)?,
            };
            match out {
                Some(path) => {
                    let file = File::create(&path)
                        .with_context(|| format!("creating {}", path.display()))?;
                    log_stream(&service, BufWriter::new(file), &opts)
                }
                None => log_stream(&service, std::io::stdout().lock(), &opts),
            }
        }
    }
}

fn list_ports() -> Result<()> {
    let ports = SerialService::list_ports();
    if ports.is_empty() {
        info!("no serial ports found");
    }
    for port in ports {
        println!("{port}");
    }
    Ok(())
}

fn emit<T: Transport>(settings: &Settings, transport: T, cycles: Option<u64>) -> Result<()> {
    let channels = settings.channel_set()?;
    let full_scale = channels
        .iter()
        .filter(|c| matches!(c.kind(), ChannelKind::Analog { .. }))
        .map(|c| c.max_value())
        .max()
        .unwrap_or(1023);

    let mut framer = SampleFramer::new(
        channels,
        SimBus::new(full_scale),
        MonotonicClock::new(),
        transport,
        settings.framer_config(),
    );
    if let Some(calibration) = settings.calibration() {
        let cell = LoadCell::with_calibration(SimLoadCell::new(SIM_LOAD_CELL_PERIOD), calibration);
        framer = framer.with_low_rate(cell);
    }

    framer
        .initialize(settings.serial.baud)
        .context("start-up failed")?;

    match cycles {
        Some(n) => {
            framer.run_cycles(n);
            info!("emitted {n} records");
            Ok(())
        }
        None => framer.run(),
    }
}

fn mirror(settings: &Settings, cycles: Option<u64>) -> Result<()> {
    let calibration = settings.calibration().unwrap_or_default();
    let cell = LoadCell::with_calibration(SimLoadCell::new(SIM_LOAD_CELL_PERIOD), calibration);
    let mut mirror = DacMirror::new(cell, PrintSink, settings.range_map()?);
    match cycles {
        Some(n) => {
            for _ in 0..n {
                mirror.run_cycle();
            }
            Ok(())
        }
        None => mirror.run(),
    }
}

fn log_stream<W: Write>(service: &SerialService, out: W, opts: &CaptureOptions) -> Result<()> {
    let log = CaptureLog::shared(10_000);
    let running = Arc::new(AtomicBool::new(true));
    let status = capture::spawn_status(log.clone(), running.clone(), Duration::from_secs(5));

    let mut writer = CaptureWriter::new(out, opts, log.clone());
    writer.write_header()?;
    let result = capture::run(service, &mut writer, opts);

    running.store(false, Ordering::Relaxed);
    let _ = status.join();

    let total = result?;
    let stats = writer.stats();
    let rate = stats.sample_rate().map(|r| r.0).unwrap_or(0.0);
    let span = stats.span().map(|s| s.duration_s()).unwrap_or(0.0);
    info!(
        "captured {total} records over {span:.3} s ({rate:.1} Hz), {} malformed, {} timestamp wraps, {} resets, max gap {} us",
        log.lock().malformed(),
        writer.wraps(),
        writer.resets(),
        stats.max_gap_us()
    );
    Ok(())
}
