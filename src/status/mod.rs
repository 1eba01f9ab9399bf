//! # Status Indicator Module
//!
//! Drives the three-line RGB status LED.
//!
//! The LED is the only operator-visible channel on the unattended
//! platform: solid red while initializing (or on a bus error), five red
//! blinks once the bus is open, five magenta blinks when the probe answers
//! discovery, then blue or green per cycle depending on fix state.

use std::time::Duration;

use rppal::gpio::{Gpio, OutputPin};

use crate::config;
use crate::error::{DroneLogError, Result};

/// Trait for the three binary output lines behind the indicator
///
/// Driving a line never fails; all fallible setup happens when the
/// implementation is constructed.
pub trait LedLines: Send {
    /// Drive all three lines to the given on/off combination
    fn set(&mut self, red: bool, green: bool, blue: bool);
}

/// Logger states reflected on the indicator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedState {
    /// Script starting up (solid red)
    Initializing,
    /// Serial bus opened (red blink pattern, then off)
    BusOpened,
    /// Probe answered discovery (magenta blink pattern, then off)
    ProbeFound,
    /// Logging without a position fix (solid blue)
    LoggingNoFix,
    /// Logging with a position fix (solid green)
    LoggingWithFix,
    /// All lines off
    Off,
    /// No probe found at the expected address (solid red)
    BusError,
}

/// Colors available to the blink patterns
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlinkColor {
    Red,
    Magenta,
}

/// Status LED over a set of output lines
pub struct StatusLed<L: LedLines> {
    lines: L,
    blink_count: usize,
    blink_interval: Duration,
}

impl<L: LedLines> StatusLed<L> {
    /// Create an indicator using the configured startup blink pattern
    pub fn new(lines: L) -> Self {
        Self::with_blink(
            lines,
            config::STARTUP_BLINK_COUNT,
            config::STARTUP_BLINK_INTERVAL,
        )
    }

    /// Create an indicator with an explicit blink pattern
    ///
    /// Tests pass a zero interval so blink states can be asserted without
    /// wall-clock delays.
    pub fn with_blink(lines: L, blink_count: usize, blink_interval: Duration) -> Self {
        Self {
            lines,
            blink_count,
            blink_interval,
        }
    }

    /// Drive the indicator to the combination for a logger state
    ///
    /// Never fails. The blink-pattern states (`BusOpened`, `ProbeFound`)
    /// block the caller for the full pattern and leave the lines off;
    /// they are only used at startup checkpoints, never inside the
    /// acquisition loop.
    pub fn set_state(&mut self, state: LedState) {
        match state {
            LedState::Initializing | LedState::BusError => self.lines.set(true, false, false),
            LedState::BusOpened => {
                self.blink(self.blink_count, self.blink_interval, BlinkColor::Red)
            }
            LedState::ProbeFound => {
                self.blink(self.blink_count, self.blink_interval, BlinkColor::Magenta)
            }
            LedState::LoggingNoFix => self.lines.set(false, false, true),
            LedState::LoggingWithFix => self.lines.set(false, true, false),
            LedState::Off => self.lines.set(false, false, false),
        }
    }

    /// Blink the indicator `count` times at the given half-period
    ///
    /// Blocks the caller for `count * 2 * interval` wall-clock time and
    /// leaves all lines off. A deliberate sequential handshake signal, not
    /// an animation.
    pub fn blink(&mut self, count: usize, interval: Duration, color: BlinkColor) {
        for _ in 0..count {
            match color {
                BlinkColor::Red => self.lines.set(true, false, false),
                BlinkColor::Magenta => self.lines.set(true, false, true),
            }
            std::thread::sleep(interval);
            self.lines.set(false, false, false);
            std::thread::sleep(interval);
        }
    }
}

/// The real indicator: three GPIO output pins
pub struct GpioLedLines {
    red: OutputPin,
    green: OutputPin,
    blue: OutputPin,
}

impl GpioLedLines {
    /// Claim the configured pins as outputs
    ///
    /// # Errors
    ///
    /// Returns `Gpio` if the GPIO peripheral or any pin cannot be claimed
    /// (typically: not running on a Pi, or another process holds a pin).
    pub fn new() -> Result<Self> {
        let gpio =
            Gpio::new().map_err(|e| DroneLogError::Gpio(format!("Failed to open GPIO: {}", e)))?;

        let claim = |pin: u8| -> Result<OutputPin> {
            Ok(gpio
                .get(pin)
                .map_err(|e| DroneLogError::Gpio(format!("Failed to claim pin {}: {}", pin, e)))?
                .into_output())
        };

        Ok(Self {
            red: claim(config::LED_RED_PIN)?,
            green: claim(config::LED_GREEN_PIN)?,
            blue: claim(config::LED_BLUE_PIN)?,
        })
    }
}

impl LedLines for GpioLedLines {
    fn set(&mut self, red: bool, green: bool, blue: bool) {
        fn drive(pin: &mut OutputPin, on: bool) {
            if on {
                pin.set_high();
            } else {
                pin.set_low();
            }
        }

        drive(&mut self.red, red);
        drive(&mut self.green, green);
        drive(&mut self.blue, blue);
    }
}
