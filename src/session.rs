//! # Logging Session
//!
//! The record assembler: an owned structure holding the probe driver, the
//! pressure sensor, the status LED, the open log file, the record counter,
//! and the reader side of the latest-fix slot. One `run_cycle` call
//! produces exactly one log record.
//!
//! Cycle-by-cycle resampling is the error-recovery strategy: a malformed
//! probe response costs one row's tokens, while a transport failure ends
//! the run for the external restart mechanism to handle.

use chrono::Local;
use tokio::sync::watch;
use tracing::{info, warn};

use crate::baro::PressureSensor;
use crate::config;
use crate::error::{DroneLogError, Result};
use crate::gps::GpsFix;
use crate::logfile::{LogFile, LogRecord, NO_FIX_TOKEN};
use crate::probe::{ProbeDriver, ProbeReading};
use crate::serial::Sdi12PortIo;
use crate::status::{LedLines, LedState, StatusLed};

/// One boot's logging session
pub struct LogSession<P, S, L>
where
    P: Sdi12PortIo,
    S: PressureSensor,
    L: LedLines,
{
    probe: ProbeDriver<P>,
    baro: S,
    led: StatusLed<L>,
    log: LogFile,
    fix_rx: watch::Receiver<Option<GpsFix>>,
    record: u64,
}

impl<P, S, L> LogSession<P, S, L>
where
    P: Sdi12PortIo,
    S: PressureSensor,
    L: LedLines,
{
    /// Assemble a session around its collaborators
    ///
    /// The record counter starts at zero; the first cycle writes record 1.
    pub fn new(
        probe: ProbeDriver<P>,
        baro: S,
        led: StatusLed<L>,
        log: LogFile,
        fix_rx: watch::Receiver<Option<GpsFix>>,
    ) -> Self {
        Self {
            probe,
            baro,
            led,
            log,
            fix_rx,
            record: 0,
        }
    }

    /// Records written so far this run
    pub fn records_written(&self) -> u64 {
        self.record
    }

    /// Run one acquisition cycle and append one record
    ///
    /// Reads the latest fix from the slot, triggers and reads the probe,
    /// reads the pressure sensor, reflects fix state on the LED, appends
    /// the CSV row, and turns the LED off. There is no enforced pacing:
    /// cycle duration is whatever the serial round-trips and the sensor
    /// read take.
    ///
    /// # Errors
    ///
    /// Propagates serial transport failures, pressure sensor failures, and
    /// log write failures; all are fatal to the run.
    pub async fn run_cycle(&mut self) -> Result<()> {
        self.record += 1;
        let local_time = Local::now().format(config::TIMESTAMP_FORMAT).to_string();

        // Non-blocking read of whatever the reader task stored last
        let fix = self.fix_rx.borrow().clone();

        let reading = self.sample_probe().await?;
        let baro = self.baro.read()?;

        let (usable, gps_time, altitude, latitude, longitude) = match &fix {
            Some(fix) if fix.is_usable() => (
                true,
                fix.time.clone().unwrap_or_else(|| NO_FIX_TOKEN.to_string()),
                fix.altitude,
                fix.latitude,
                fix.longitude,
            ),
            // Stale numerics are still emitted; only the time column
            // carries the sentinel
            Some(fix) => (
                false,
                NO_FIX_TOKEN.to_string(),
                fix.altitude,
                fix.latitude,
                fix.longitude,
            ),
            None => (false, NO_FIX_TOKEN.to_string(), f64::NAN, f64::NAN, f64::NAN),
        };

        self.led.set_state(if usable {
            LedState::LoggingWithFix
        } else {
            LedState::LoggingNoFix
        });

        let record = LogRecord {
            record: self.record,
            gps_time,
            local_time,
            altitude,
            latitude,
            longitude,
            probe_temperature: reading.temperature,
            relative_humidity: reading.relative_humidity,
            baro_temperature: baro.temperature,
            baro_pressure: baro.pressure,
        };
        self.log.append(&record.to_csv_row())?;

        self.led.set_state(LedState::Off);
        Ok(())
    }

    /// Trigger and read the probe, substituting placeholders when the
    /// response decodes badly
    async fn sample_probe(&mut self) -> Result<ProbeReading> {
        self.probe
            .trigger_measurement(config::PROBE_ADDRESS)
            .await?;

        match self.probe.read_measurement(config::PROBE_ADDRESS).await {
            Ok(reading) => Ok(reading),
            Err(DroneLogError::Sdi12Protocol(msg)) => {
                warn!("Undecodable measurement ({}), logging placeholders", msg);
                Ok(ProbeReading::invalid())
            }
            Err(e) => Err(e),
        }
    }
}

/// Check that the one probe on the bus answers at the expected address
///
/// Sends the address query and maps the outcome onto the indicator: a
/// match blinks the magenta confirmation pattern, a mismatch latches the
/// `BusError` state. Whether a mismatch halts startup is the caller's
/// decision (see [`config::HALT_ON_ADDRESS_MISMATCH`]).
///
/// # Errors
///
/// Propagates transport failures from the discovery exchange.
pub async fn discover_probe<P, L>(
    probe: &mut ProbeDriver<P>,
    led: &mut StatusLed<L>,
) -> Result<bool>
where
    P: Sdi12PortIo,
    L: LedLines,
{
    let address = probe.discover().await?;

    if address == config::PROBE_ADDRESS {
        info!("Probe found at address '{}'", address);
        led.set_state(LedState::ProbeFound);
        Ok(true)
    } else {
        warn!(
            "Expected probe at '{}', bus answered '{}'",
            config::PROBE_ADDRESS,
            address
        );
        led.set_state(LedState::BusError);
        Ok(false)
    }
}
