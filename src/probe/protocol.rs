//! # SDI-12 Protocol Constants and Types
//!
//! Wire-level definitions for the CS215 probe exchanges.
//!
//! SDI-12 is a shared single-wire ASCII bus addressing instruments by a
//! single character. Every command ends in `!`; every response is one line
//! terminated by `\r\n`.

use std::time::Duration;

/// Address query command: every device on the bus answers with its address
pub const CMD_ADDRESS_QUERY: &[u8] = b"?!";

/// Minimum usable length of a measurement acknowledgment (`atttn`)
///
/// Address character, three-digit delay in seconds, one-digit value count.
pub const MEASURE_ACK_LEN: usize = 5;

/// Minimum usable length of a measurement response line
///
/// Address/sign marker plus two 7-character fields.
pub const MEASUREMENT_RESPONSE_LEN: usize = 15;

/// Fixed-width field position inside a measurement response
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    /// Character offset of the field start
    pub offset: usize,
    /// Field width in characters
    pub width: usize,
}

impl FieldSpec {
    /// One past the last character of the field
    pub const fn end(&self) -> usize {
        self.offset + self.width
    }
}

/// Temperature field: characters 1-7 of the response
pub const TEMPERATURE_FIELD: FieldSpec = FieldSpec { offset: 1, width: 7 };

/// Relative humidity field: characters 8-14 of the response
pub const HUMIDITY_FIELD: FieldSpec = FieldSpec { offset: 8, width: 7 };

/// Build the trigger-measurement command (`aM!`) for a probe address
pub fn measure_command(address: char) -> Vec<u8> {
    format!("{}M!", address).into_bytes()
}

/// Build the read-measurement command (`aD0!`) for channel 0
pub fn data_command(address: char) -> Vec<u8> {
    format!("{}D0!", address).into_bytes()
}

/// One decoded probe measurement
///
/// The tokens are fixed-width slices of the response, written to the log
/// verbatim. No numeric validation is performed: a probe that answers with
/// garbage in the right shape gets its garbage logged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeReading {
    /// Temperature token in degC
    pub temperature: String,

    /// Relative humidity token in percent
    pub relative_humidity: String,
}

impl ProbeReading {
    /// The deterministic substitute for an undecodable response
    ///
    /// Written to the log in place of the real tokens so a malformed line
    /// costs one row's data, not the cycle.
    pub fn invalid() -> Self {
        Self {
            temperature: "nan".to_string(),
            relative_humidity: "nan".to_string(),
        }
    }
}

/// Decoded acknowledgment of a trigger-measurement command (`atttn`)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MeasureAck {
    /// Responding probe address
    pub address: char,

    /// Advertised time until the measurement is ready
    pub delay: Duration,

    /// Number of values the probe will return
    pub value_count: u8,
}

impl MeasureAck {
    /// An ack claiming the measurement is ready immediately
    ///
    /// Used as the fallback when the real ack cannot be parsed; the bus
    /// read timeout still bounds the exchange.
    pub fn immediate(address: char) -> Self {
        Self {
            address,
            delay: Duration::ZERO,
            value_count: 0,
        }
    }
}
