//! # SDI-12 Response Decoder
//!
//! Decodes the probe's response lines: address query replies, measurement
//! acknowledgments, and fixed-width measurement data.

use std::time::Duration;

use super::protocol::*;
use crate::error::{DroneLogError, Result};

/// Strip trailing `\r` and `\n` from a response line
///
/// The probe terminates every response with `\r\n`, but a response that
/// arrives truncated may carry one, both, or neither.
pub fn strip_line_terminators(line: &[u8]) -> &[u8] {
    let mut end = line.len();
    while end > 0 && (line[end - 1] == b'\r' || line[end - 1] == b'\n') {
        end -= 1;
    }
    &line[..end]
}

/// Extract the responding address from an address-query reply
///
/// The reply is the bare address character, but adapters sometimes prefix
/// echo noise, so only the trailing character is trusted.
///
/// # Errors
///
/// Returns `Sdi12Protocol` if the line is empty or the trailing character
/// is not ASCII alphanumeric.
pub fn parse_address(line: &[u8]) -> Result<char> {
    let body = strip_line_terminators(line);

    let last = *body.last().ok_or_else(|| {
        DroneLogError::Sdi12Protocol("empty address query response".to_string())
    })?;

    if !last.is_ascii_alphanumeric() {
        return Err(DroneLogError::Sdi12Protocol(format!(
            "address query response ends in non-address byte 0x{:02X}",
            last
        )));
    }

    Ok(last as char)
}

/// Decode a trigger-measurement acknowledgment (`atttn`)
///
/// # Arguments
///
/// * `line` - Raw acknowledgment line, terminators included
///
/// # Errors
///
/// Returns `Sdi12Protocol` if the line is shorter than five characters or
/// the delay/count digits do not parse.
pub fn decode_measure_ack(line: &[u8]) -> Result<MeasureAck> {
    let body = strip_line_terminators(line);

    if body.len() < MEASURE_ACK_LEN {
        return Err(DroneLogError::Sdi12Protocol(format!(
            "measurement ack too short: expected {} characters, got {}",
            MEASURE_ACK_LEN,
            body.len()
        )));
    }

    let address = body[0] as char;

    let delay_digits = std::str::from_utf8(&body[1..4])
        .map_err(|_| DroneLogError::Sdi12Protocol("non-ASCII delay field".to_string()))?;
    let delay_secs: u64 = delay_digits.parse().map_err(|_| {
        DroneLogError::Sdi12Protocol(format!("non-numeric delay field: {:?}", delay_digits))
    })?;

    let count_digit = body[4] as char;
    let value_count = count_digit.to_digit(10).ok_or_else(|| {
        DroneLogError::Sdi12Protocol(format!("non-numeric value count: {:?}", count_digit))
    })? as u8;

    Ok(MeasureAck {
        address,
        delay: Duration::from_secs(delay_secs),
        value_count,
    })
}

/// Decode a measurement response into its two fixed-width tokens
///
/// Character 0 is the sign/channel marker and is discarded; characters 1-7
/// form the temperature token and 8-14 the humidity token. ASCII-space
/// padding inside a field is trimmed; nothing else is validated, so a
/// response with unexpected characters in the right places produces
/// garbage tokens rather than an error.
///
/// # Errors
///
/// Returns `Sdi12Protocol` if fewer than 15 usable characters remain after
/// terminator stripping.
pub fn decode_measurement(line: &[u8]) -> Result<ProbeReading> {
    let body = strip_line_terminators(line);

    if body.len() < MEASUREMENT_RESPONSE_LEN {
        return Err(DroneLogError::Sdi12Protocol(format!(
            "measurement response too short: expected {} characters, got {}",
            MEASUREMENT_RESPONSE_LEN,
            body.len()
        )));
    }

    Ok(ProbeReading {
        temperature: extract_field(body, TEMPERATURE_FIELD),
        relative_humidity: extract_field(body, HUMIDITY_FIELD),
    })
}

/// Slice one fixed-width field out of a length-checked response body
fn extract_field(body: &[u8], spec: FieldSpec) -> String {
    let raw: String = body[spec.offset..spec.end()]
        .iter()
        .map(|&b| b as char)
        .collect();
    raw.trim_matches(' ').to_string()
}
