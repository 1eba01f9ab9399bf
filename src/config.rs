//! # Configuration Module
//!
//! Compile-time constants for the logger.
//!
//! The logger runs headless from `/etc/rc.local` on boot: there are no
//! command-line flags, no environment variables, and no configuration file.
//! Everything that varies between deployments (pin wiring, bus address,
//! output directory) is fixed here and baked into the binary.

use std::time::Duration;

/// BCM pin driving the red LED line (physical pin 40)
pub const LED_RED_PIN: u8 = 21;

/// BCM pin driving the green LED line (physical pin 38)
pub const LED_GREEN_PIN: u8 = 20;

/// BCM pin driving the blue LED line (physical pin 36)
pub const LED_BLUE_PIN: u8 = 16;

/// SDI-12 address of the one probe on the bus
///
/// The bus carries a single CS215, which factory-defaults to address `0`.
pub const PROBE_ADDRESS: char = '0';

/// Abort startup when the discovered probe address does not match
/// [`PROBE_ADDRESS`]
///
/// With this set to `false` the logger signals `BusError` on the LED but
/// keeps cycling, appending whatever the bus returns. That matches the
/// original field deployments; halting is the safer default because an
/// unattended unit would otherwise log meaningless rows until power-off.
pub const HALT_ON_ADDRESS_MISMATCH: bool = true;

/// gpsd socket address on the local host
pub const GPSD_ADDR: &str = "127.0.0.1:2947";

/// Directory that receives the per-boot log file
pub const LOG_DIR: &str = "/home/pi/Desktop";

/// Log file name prefix; the boot-time local timestamp follows it
pub const LOG_FILE_PREFIX: &str = "DroneLog-";

/// Timestamp format used both in file names and in the `rpi_time` column
///
/// The Pi has no RTC battery, so these times are only as good as whatever
/// the clock happens to hold; they still guarantee a fresh file per boot.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Number of on/off pulses in the startup confirmation blinks
pub const STARTUP_BLINK_COUNT: usize = 5;

/// Half-period of a startup confirmation blink
pub const STARTUP_BLINK_INTERVAL: Duration = Duration::from_millis(250);
