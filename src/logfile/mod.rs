//! # Log File Module
//!
//! One CSV log file per boot: a two-line header written at creation, then
//! one appended row per acquisition cycle.
//!
//! Every append is an independent open/write/close so a mid-run power loss
//! cannot corrupt rows already on disk. The file is named from the
//! boot-time local clock, which guarantees a fresh file each restart even
//! though the clock itself is untrustworthy.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};

use crate::config;
use crate::error::Result;

/// Header line 1: column names
pub const HEADER_NAMES: &str =
    "record,gps_time,rpi_time,altitude,latitude,longitude,probe_temp,relHumidity,bmp_temp,bmp_press";

/// Header line 2: column units
pub const HEADER_UNITS: &str = "NA,UTC(GPS),NA,m,DDMM.MMMM,DDDMM.MMMM,degC,percent,degC,Pa";

/// Literal written to the `gps_time` column when the receiver has no fix
pub const NO_FIX_TOKEN: &str = "no_fix";

/// One assembled log record, appended immutably and never read back
#[derive(Debug, Clone, PartialEq)]
pub struct LogRecord {
    /// Record number; resets to 1 on every boot
    pub record: u64,

    /// Receiver UTC time string, or [`NO_FIX_TOKEN`]
    pub gps_time: String,

    /// Local wall-clock time at assembly
    pub local_time: String,

    /// Altitude in meters (NaN until the receiver reports)
    pub altitude: f64,

    /// Latitude (NaN until the receiver reports)
    pub latitude: f64,

    /// Longitude (NaN until the receiver reports)
    pub longitude: f64,

    /// Probe temperature token, logged verbatim
    pub probe_temperature: String,

    /// Probe relative humidity token, logged verbatim
    pub relative_humidity: String,

    /// Pressure sensor temperature in degC
    pub baro_temperature: f64,

    /// Barometric pressure in Pa
    pub baro_pressure: f64,
}

impl LogRecord {
    /// Render the record as one CSV row (no trailing newline)
    ///
    /// Fields are comma-separated with no quoting or escaping; none of the
    /// sources can produce a comma.
    pub fn to_csv_row(&self) -> String {
        format!(
            "{},{},{},{},{},{},{},{},{},{}",
            self.record,
            self.gps_time,
            self.local_time,
            fmt_float(self.altitude),
            fmt_float(self.latitude),
            fmt_float(self.longitude),
            self.probe_temperature,
            self.relative_humidity,
            fmt_float(self.baro_temperature),
            fmt_float(self.baro_pressure),
        )
    }
}

/// Format a float for the log: always with a decimal point ("5.0", never
/// "5"), and "NaN" for values the receiver never reported
fn fmt_float(value: f64) -> String {
    format!("{:?}", value)
}

/// Per-boot CSV log file
///
/// Holds only the path; no file descriptor survives between operations.
#[derive(Debug, Clone)]
pub struct LogFile {
    path: PathBuf,
}

impl LogFile {
    /// Create the file and write both header lines
    ///
    /// Truncates anything already at `path`; the timestamped naming makes
    /// collisions a non-issue in deployment.
    ///
    /// # Errors
    ///
    /// Returns `Io` if the file cannot be created or written.
    pub fn create(path: &Path) -> Result<Self> {
        let mut file = std::fs::File::create(path)?;
        writeln!(file, "{}", HEADER_NAMES)?;
        writeln!(file, "{}", HEADER_UNITS)?;

        Ok(Self {
            path: path.to_path_buf(),
        })
    }

    /// Append one row, with a trailing newline
    ///
    /// Opens, writes, and closes on every call.
    ///
    /// # Errors
    ///
    /// Returns `Io` if the file cannot be opened or written.
    pub fn append(&self, line: &str) -> Result<()> {
        let mut file = OpenOptions::new().append(true).open(&self.path)?;
        writeln!(file, "{}", line)?;
        Ok(())
    }

    /// Path of the log file
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Build the per-boot log path from the boot-time local clock
pub fn log_path(now: DateTime<Local>) -> PathBuf {
    let name = format!(
        "{}{}.csv",
        config::LOG_FILE_PREFIX,
        now.format(config::TIMESTAMP_FORMAT)
    );
    Path::new(config::LOG_DIR).join(name)
}
