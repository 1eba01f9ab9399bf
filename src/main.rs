//! # DroneLog
//!
//! Headless field data logger for a drone-mounted sensor platform.
//!
//! Launched from `/etc/rc.local` at boot, the logger polls a CS215
//! temperature/humidity probe over an SDI-12 bus, a BMP280 pressure sensor
//! over I2C, and the gpsd position stream, appending one CSV record per
//! cycle to a per-boot log file on the desktop.

use anyhow::Result;
use chrono::Local;
use tokio::sync::watch;
use tracing::{error, info};

use dronelog::baro::Bmp280Sensor;
use dronelog::config;
use dronelog::gps;
use dronelog::logfile::{self, LogFile};
use dronelog::probe::ProbeDriver;
use dronelog::serial::Sdi12Serial;
use dronelog::session::{self, LogSession};
use dronelog::status::{GpioLedLines, LedState, StatusLed};

/// Main entry point for the logger
///
/// # Control Flow
///
/// 1. **Initialization**
///    - Set up logging with tracing subscriber (non-blocking writer)
///    - Status LED solid red
///    - Launch the background position stream reader
///    - Open the SDI-12 bus (first enumerated port, settle delay)
///    - Discover the probe; magenta blinks confirm, solid red means a
///      device answered at the wrong address
///    - Open the BMP280 and create the per-boot log file
///
/// 2. **Acquisition Loop**
///    - One cycle per iteration: latest fix, probe exchange, pressure
///      read, one appended CSV row; green LED with a fix, blue without
///    - No enforced pacing; cycles take roughly a second on real hardware
///    - Runs until power loss; Ctrl+C exits cleanly on the bench
///
/// # Errors
///
/// Returns an error if any startup step fails, if discovery finds the
/// wrong address (with the halt switch enabled), or if a transport
/// failure ends the acquisition loop. The deployed platform relies on an
/// external restart to recover from all of these.
#[tokio::main]
async fn main() -> Result<()> {
    // Diagnostics must never stall the acquisition loop
    let (writer, _guard) = tracing_appender::non_blocking(std::io::stderr());
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(writer)
        .init();

    info!("DroneLog v{} starting...", env!("CARGO_PKG_VERSION"));

    let lines = GpioLedLines::new()?;
    let mut led = StatusLed::new(lines);
    led.set_state(LedState::Initializing);

    // The reader fills the latest-fix slot while the serial adapter boots
    let (fix_tx, fix_rx) = watch::channel(None);
    let (stop_tx, stop_rx) = watch::channel(false);
    tokio::spawn(async move {
        if let Err(e) = gps::poll_fixes(config::GPSD_ADDR, fix_tx, stop_rx).await {
            // Recovery would need hardware intervention; keep logging
            // probe and pressure data against the stale slot
            error!("Position stream reader terminated: {}", e);
        }
    });

    let bus = Sdi12Serial::open().await?;
    info!("SDI-12 bus ready at {}", bus.device_path());
    led.set_state(LedState::Off);
    led.set_state(LedState::BusOpened);

    let mut probe = ProbeDriver::new(bus);
    let found = session::discover_probe(&mut probe, &mut led).await?;
    if !found && config::HALT_ON_ADDRESS_MISMATCH {
        anyhow::bail!("no probe at address '{}'", config::PROBE_ADDRESS);
    }

    let baro = Bmp280Sensor::open()?;

    let path = logfile::log_path(Local::now());
    let log = LogFile::create(&path)?;
    info!("Logging to {}", path.display());

    let mut session = LogSession::new(probe, baro, led, log, fix_rx);

    loop {
        tokio::select! {
            result = session.run_cycle() => {
                if let Err(e) = result {
                    error!("Acquisition cycle failed: {}", e);
                    stop_tx.send(true).ok();
                    return Err(e.into());
                }
            }

            _ = tokio::signal::ctrl_c() => {
                info!("Received Ctrl+C, shutting down...");
                break;
            }
        }
    }

    stop_tx.send(true).ok();
    info!("Total records written: {}", session.records_written());
    Ok(())
}
