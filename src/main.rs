//! HandLink - Main Entry Point
//!
//! Reads the glove over its serial link (or a synthetic glove), runs the
//! processing tick at a fixed rate against an in-memory rig and prints the
//! display snapshot. Type `c` + Enter to recalibrate, `q` + Enter to quit.

use anyhow::Context;
use handlink_rs::{
    backend::{ByteLink, LinkBackend, PacketReceiver, ReaderHandle, SerialLink, SyntheticGlove},
    config::{self, AppConfig, LoggingConfig},
    pose::{CalibrationTrigger, MemoryRig},
    session::GloveSession,
};
use std::io::BufRead;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// Packet rate of the synthetic glove
const SYNTHETIC_RATE_HZ: f32 = 100.0;

/// How often the text display is printed
const TEXT_RENDER_INTERVAL: Duration = Duration::from_secs(1);

const USAGE: &str = "\
Usage: handlink [OPTIONS]

Options:
  --config <path>   Load settings from this TOML file
  --synthetic       Use a generated glove instead of the serial port
  --json            Print display snapshots as JSON lines
  --list-ports      List serial ports and exit
  -h, --help        Print this help";

#[derive(Debug, Default)]
struct Args {
    config: Option<PathBuf>,
    synthetic: bool,
    json: bool,
    list_ports: bool,
}

fn parse_args() -> anyhow::Result<Option<Args>> {
    let mut args = Args::default();
    let mut iter = std::env::args().skip(1);
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--config" => {
                let path = iter.next().context("--config requires a path")?;
                args.config = Some(PathBuf::from(path));
            }
            "--synthetic" => args.synthetic = true,
            "--json" => args.json = true,
            "--list-ports" => args.list_ports = true,
            "-h" | "--help" => {
                println!("{}", USAGE);
                return Ok(None);
            }
            other => anyhow::bail!("Unknown argument '{}'\n\n{}", other, USAGE),
        }
    }
    Ok(Some(args))
}

fn init_logging(logging: &LoggingConfig) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let filter = || {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,handlink_rs=debug"))
    };

    let (file_layer, guard) = match &logging.log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "handlink.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(writer)
                .with_filter(filter());
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_filter(filter()))
        .with(file_layer)
        .init();

    guard
}

/// Load the requested config, or the default file if one exists
///
/// An explicit path must load; a broken default file falls back to defaults.
fn load_config(explicit: Option<&PathBuf>) -> anyhow::Result<(AppConfig, Option<String>)> {
    if let Some(path) = explicit {
        let config = AppConfig::load(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?;
        return Ok((config, None));
    }

    match config::default_config_path().filter(|p| p.exists()) {
        Some(path) => match AppConfig::load(&path) {
            Ok(config) => Ok((config, None)),
            Err(e) => Ok((
                AppConfig::default(),
                Some(format!("Ignoring {}: {}", path.display(), e)),
            )),
        },
        None => Ok((AppConfig::default(), None)),
    }
}

fn open_link(config: &AppConfig, synthetic: bool) -> (PacketReceiver, Option<ReaderHandle>) {
    let link: Box<dyn ByteLink> = if synthetic {
        Box::new(SyntheticGlove::new(SYNTHETIC_RATE_HZ).with_timestamp_jitter(300.0))
    } else {
        match SerialLink::open(&config.link) {
            Ok(link) => Box::new(link),
            Err(e) => {
                tracing::warn!("{}", e);
                let ports = SerialLink::list_ports();
                if !ports.is_empty() {
                    tracing::info!("Available ports: {}", ports.join(", "));
                }
                tracing::warn!("Continuing without a link; no samples will arrive");
                return (PacketReceiver::disconnected(), None);
            }
        }
    };

    tracing::info!("Reading from {}", link.describe());
    let (backend, packets) = LinkBackend::new(link, &config.link);
    match backend.spawn() {
        Ok(reader) => (packets, Some(reader)),
        Err(e) => {
            tracing::error!("{}", e);
            (PacketReceiver::disconnected(), None)
        }
    }
}

/// Read operator commands from stdin on a background thread
fn spawn_input(trigger: CalibrationTrigger, quit: Arc<AtomicBool>) -> anyhow::Result<()> {
    std::thread::Builder::new()
        .name("handlink-input".to_string())
        .spawn(move || {
            let stdin = std::io::stdin();
            for line in stdin.lock().lines() {
                let Ok(line) = line else {
                    break;
                };
                match line.trim() {
                    "c" | "C" => trigger.fire(),
                    "q" | "Q" => break,
                    "" => {}
                    other => tracing::info!("Unknown command '{}' (c = calibrate, q = quit)", other),
                }
            }
            quit.store(true, Ordering::Release);
        })
        .context("Failed to spawn input thread")?;
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let Some(args) = parse_args()? else {
        return Ok(());
    };

    if args.list_ports {
        for port in SerialLink::list_ports() {
            println!("{}", port);
        }
        return Ok(());
    }

    let (config, config_warning) = load_config(args.config.as_ref())?;
    let _log_guard = init_logging(&config.logging);
    if let Some(warning) = config_warning {
        tracing::warn!("{}", warning);
    }

    tracing::info!("Starting HandLink");

    let mut rig = MemoryRig::for_chains(&config.fingers);
    let (packets, reader) = open_link(&config, args.synthetic);
    let mut session = GloveSession::new(&config, packets, reader, &rig);

    let quit = Arc::new(AtomicBool::new(false));
    spawn_input(session.calibration_trigger(), quit.clone())?;

    let tick_interval = Duration::from_secs_f64(1.0 / f64::from(config.runtime.tick_rate_hz.max(1)));
    let snapshots = session.snapshots();
    let start = Instant::now();
    let mut last_tick = start;
    let mut last_render: Option<Instant> = None;

    while !quit.load(Ordering::Acquire) {
        let tick_start = Instant::now();
        let dt = tick_start.duration_since(last_tick).as_secs_f32();
        last_tick = tick_start;

        let report = session.tick(tick_start.duration_since(start), dt, &mut rig);

        if report.snapshot_published {
            if args.json {
                println!("{}", snapshots.latest().to_json()?);
            } else if last_render.map_or(true, |t| t.elapsed() >= TEXT_RENDER_INTERVAL) {
                println!("{}\n", snapshots.latest().render());
                last_render = Some(Instant::now());
            }
        }

        // Sleep to maintain tick rate
        let elapsed = tick_start.elapsed();
        if elapsed < tick_interval {
            std::thread::sleep(tick_interval - elapsed);
        }
    }

    tracing::info!("Shutting down...");
    session.shutdown();

    Ok(())
}
