//! # Serial Communication Module
//!
//! Handles serial communication with the SDI-12 USB adapter.
//!
//! This module handles:
//! - Locating the adapter (first enumerated port; it is the only device)
//! - Opening the port at 9,600 baud with the post-open settle delay
//! - Line-oriented command/response I/O under a fixed bus timeout

use crate::error::{DroneLogError, Result};
use async_trait::async_trait;
use std::io;
use std::time::Duration;
use tokio::io::AsyncReadExt;
use tokio_serial::SerialPortBuilderExt;
use tracing::{debug, info, warn};

pub mod port_trait;

pub use port_trait::Sdi12PortIo;

/// SDI-12 adapter baud rate
pub const SDI12_BAUD_RATE: u32 = 9_600;

/// Bus-wide read timeout
///
/// Long enough to cover the probe's worst-case measurement delay; a bus
/// that stays silent this long is treated as dead for the rest of the run.
pub const READ_TIMEOUT: Duration = Duration::from_secs(10);

/// Delay after opening the port before the adapter will accept commands
pub const SETTLE_DELAY: Duration = Duration::from_millis(2_500);

/// SDI-12 Serial Port Handler
///
/// Manages the connection to the SDI-12 USB adapter.
pub struct Sdi12Serial {
    /// Serial port handle
    port: tokio_serial::SerialStream,
    /// Device path (e.g., /dev/ttyUSB0)
    device_path: String,
}

impl std::fmt::Debug for Sdi12Serial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Sdi12Serial")
            .field("device_path", &self.device_path)
            .finish_non_exhaustive()
    }
}

impl Sdi12Serial {
    /// Open the connection to the SDI-12 adapter
    ///
    /// Takes the first enumerated serial port: in this deployment the
    /// adapter is the only serial device plugged into the Pi. A better
    /// check would match the adapter's USB vendor ID from the port info,
    /// but in practice the adapter has always enumerated first.
    ///
    /// # Errors
    ///
    /// Returns an error if no serial ports are present or the port cannot
    /// be opened.
    pub async fn open() -> Result<Self> {
        let ports = tokio_serial::available_ports()
            .map_err(|e| DroneLogError::Serial(format!("Failed to enumerate ports: {}", e)))?;

        let first = ports.first().ok_or_else(|| {
            DroneLogError::SerialPortNotFound("no serial ports enumerated".to_string())
        })?;

        Self::open_path(&first.port_name).await
    }

    /// Open a specific device path as the SDI-12 bus
    ///
    /// Applies the post-open settle delay before returning, so the caller
    /// can talk to the bus immediately.
    ///
    /// # Arguments
    ///
    /// * `path` - Device path (e.g., "/dev/ttyUSB0")
    pub async fn open_path(path: &str) -> Result<Self> {
        debug!("Trying to open serial port: {}", path);
        let port = Self::open_port(path)?;
        info!("Opened SDI-12 bus at {} ({} baud)", path, SDI12_BAUD_RATE);

        // Let the adapter boot before the first command
        tokio::time::sleep(SETTLE_DELAY).await;

        Ok(Self {
            port,
            device_path: path.to_string(),
        })
    }

    /// Open a specific serial port with SDI-12 adapter settings
    fn open_port(path: &str) -> Result<tokio_serial::SerialStream> {
        let port = tokio_serial::new(path, SDI12_BAUD_RATE)
            .data_bits(tokio_serial::DataBits::Eight)
            .parity(tokio_serial::Parity::None)
            .stop_bits(tokio_serial::StopBits::One)
            .flow_control(tokio_serial::FlowControl::None)
            .open_native_async()
            .map_err(|e| DroneLogError::Serial(format!("Failed to open {}: {}", path, e)))?;

        Ok(port)
    }

    /// Get the device path of the opened serial port
    pub fn device_path(&self) -> &str {
        &self.device_path
    }
}

#[async_trait]
impl Sdi12PortIo for Sdi12Serial {
    async fn write_all(&mut self, data: &[u8]) -> io::Result<()> {
        use tokio::io::AsyncWriteExt;
        self.port.write_all(data).await?;
        self.port.flush().await?;
        debug!("Sent SDI-12 command ({} bytes)", data.len());
        Ok(())
    }

    async fn read_line(&mut self) -> io::Result<Vec<u8>> {
        let read = async {
            let mut line = Vec::new();
            let mut byte = [0u8; 1];
            loop {
                let n = self.port.read(&mut byte).await?;
                if n == 0 {
                    return Err(io::Error::new(
                        io::ErrorKind::UnexpectedEof,
                        "serial port closed mid-response",
                    ));
                }
                line.push(byte[0]);
                if byte[0] == b'\n' {
                    return Ok(line);
                }
            }
        };

        match tokio::time::timeout(READ_TIMEOUT, read).await {
            Ok(result) => result,
            Err(_) => {
                warn!("SDI-12 bus silent for {:?}", READ_TIMEOUT);
                Err(io::Error::new(
                    io::ErrorKind::TimedOut,
                    format!("no response within {:?}", READ_TIMEOUT),
                ))
            }
        }
    }
}
