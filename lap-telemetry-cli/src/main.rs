//! Lap Telemetry CLI Application
//!
//! Console front end for the lap telemetry decoder. It adds:
//! - Serial port enumeration and interactive port selection
//! - Opening and configuring the serial link
//! - Text or JSON rendering of refresh latency and lap events

use anyhow::{Context, Result};
use clap::Parser;
use lap_telemetry_decoder::{Decoder, DecoderConfig, ProtocolVariant, Session, SessionConfig};
use std::io::{self, BufRead, Write};
use std::sync::Arc;
use std::thread;

mod config;
mod report;
mod serial;

use config::{FlowControlMode, SerialSettings};
use report::Reporter;

/// Lap Telemetry - live refresh latency and lap tracking from a lap-counting controller
#[derive(Parser, Debug)]
#[command(name = "lap-telemetry")]
#[command(about = "Decode live transponder telemetry from a lap-counting controller", long_about = None)]
#[command(version)]
struct Args {
    /// Serial port to open (prompts when omitted)
    #[arg(short, long, value_name = "PORT")]
    port: Option<String>,

    /// List available serial ports and exit
    #[arg(long)]
    list: bool,

    /// Controller protocol variant (a | lap-counter, b | refresh-only)
    #[arg(long, value_name = "VARIANT", default_value = "lap-counter")]
    variant: ProtocolVariant,

    /// Baud rate
    #[arg(long, value_name = "RATE", default_value_t = 9600)]
    baud: u32,

    /// Flow control
    #[arg(long, value_enum, default_value_t = FlowControlMode::Software)]
    flow_control: FlowControlMode,

    /// Serial read/write timeout in milliseconds
    #[arg(long, value_name = "MS", default_value_t = 300)]
    timeout_ms: u64,

    /// Refresh latency above which a transponder is flagged
    #[arg(long, value_name = "MS", default_value_t = 310)]
    latency_threshold_ms: u64,

    /// Print events as JSON lines
    #[arg(long)]
    json: bool,

    /// Verbosity level (can be repeated: -v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress all log output except errors
    #[arg(short, long)]
    quiet: bool,
}

impl Args {
    fn serial_settings(&self) -> SerialSettings {
        SerialSettings {
            baud_rate: self.baud,
            flow_control: self.flow_control,
            timeout_ms: self.timeout_ms,
            ..SerialSettings::default()
        }
    }

    fn decoder_config(&self) -> DecoderConfig {
        DecoderConfig::new()
            .with_variant(self.variant)
            .with_latency_threshold(self.latency_threshold_ms)
    }
}

fn main() -> Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    // Initialize logging
    init_logging(args.verbose, args.quiet);

    log::info!("Lap Telemetry CLI v{}", env!("CARGO_PKG_VERSION"));
    log::info!("Using decoder library v{}", lap_telemetry_decoder::VERSION);

    if args.list {
        choose_port(true)?;
        return Ok(());
    }

    let port_name = match &args.port {
        Some(name) => name.clone(),
        None => match choose_port(false)? {
            Some(name) => name,
            None => return Ok(()),
        },
    };

    run_session(&args, &port_name)
}

/// List ports and ask the user to pick one
///
/// Returns None when there is nothing to open or the input is not a valid choice.
fn choose_port(list_only: bool) -> Result<Option<String>> {
    let ports = serial::list_ports()?;
    if ports.is_empty() {
        println!("There are no serial ports.");
        return Ok(None);
    }

    for (index, name) in ports.iter().enumerate() {
        println!(" {}. {}", index + 1, name);
    }
    if list_only {
        return Ok(None);
    }

    print!("Please select a serial port: ");
    io::stdout().flush()?;

    let mut input = String::new();
    io::stdin().lock().read_line(&mut input)?;

    Ok(serial::parse_selection(&input, ports.len()).map(|index| ports[index].clone()))
}

fn run_session(args: &Args, port_name: &str) -> Result<()> {
    let decoder = Arc::new(Decoder::with_config(args.decoder_config())?);
    let reporter = Reporter::new(args.json, decoder.config().tracks_laps());

    println!("Opening {}...", port_name);
    let (rx, tx) = serial::open(port_name, &args.serial_settings())?;
    println!("{} opened.", port_name);

    let session = Session::start(rx, tx, Arc::clone(&decoder), SessionConfig::default())
        .with_context(|| format!("Failed to start session on {}", port_name))?;

    // Enter on stdin ends the session
    let shutdown = session.shutdown_handle();
    thread::spawn(move || {
        let mut line = String::new();
        if let Err(e) = io::stdin().lock().read_line(&mut line) {
            log::warn!("Failed to read stdin: {}", e);
        }
        shutdown.shutdown();
    });

    let summary = session.run(|event| match reporter.render(&event) {
        Ok(Some(text)) => println!("{}", text),
        Ok(None) => {}
        Err(e) => log::warn!("Failed to render event: {}", e),
    })?;

    println!("{} closed.", port_name);
    println!("{}", report::summary_line(&summary));
    Ok(())
}

/// Initialize logging based on verbosity level
fn init_logging(verbose: u8, quiet: bool) {
    use env_logger::Builder;
    use log::LevelFilter;

    let level = if quiet {
        LevelFilter::Error
    } else {
        match verbose {
            0 => LevelFilter::Info,
            1 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    };

    Builder::new()
        .filter_level(level)
        .format(|buf, record| {
            writeln!(
                buf,
                "[{} {}] {}",
                record.level(),
                record.target(),
                record.args()
            )
        })
        .init();
}
