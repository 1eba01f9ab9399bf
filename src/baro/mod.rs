//! # Pressure Sensor Module
//!
//! Synchronous two-value read (temperature, pressure) from the BMP280 over
//! the Pi's I2C bus. No caching: the acquisition loop reads the sensor
//! fresh each cycle.

use bmp280::{Bmp280, Bmp280Builder};

use crate::error::{DroneLogError, Result};

/// One pressure sensor sample
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BaroReading {
    /// Sensor die temperature in degC
    pub temperature: f64,

    /// Barometric pressure in Pa
    pub pressure: f64,
}

/// Trait for the cycle-synchronous pressure sensor read
pub trait PressureSensor: Send {
    /// Read temperature and pressure
    ///
    /// # Errors
    ///
    /// Returns `Baro` on an I2C read failure; the cycle treats this as
    /// fatal, the same as a dead serial bus.
    fn read(&mut self) -> Result<BaroReading>;
}

/// BMP280 over Linux I2C
pub struct Bmp280Sensor {
    inner: Bmp280,
}

impl Bmp280Sensor {
    /// Open the sensor on the default I2C bus and address
    ///
    /// # Errors
    ///
    /// Returns `Baro` if the I2C device cannot be opened or the sensor
    /// does not respond.
    pub fn open() -> Result<Self> {
        let inner = Bmp280Builder::new()
            .build()
            .map_err(|e| DroneLogError::Baro(format!("Failed to open BMP280: {:?}", e)))?;

        Ok(Self { inner })
    }
}

impl PressureSensor for Bmp280Sensor {
    fn read(&mut self) -> Result<BaroReading> {
        let temperature = self
            .inner
            .temperature_celsius()
            .map_err(|e| DroneLogError::Baro(format!("Temperature read failed: {:?}", e)))?;

        let pressure_kpa = self
            .inner
            .pressure_kpa()
            .map_err(|e| DroneLogError::Baro(format!("Pressure read failed: {:?}", e)))?;

        Ok(BaroReading {
            temperature: temperature as f64,
            // The log column is Pa
            pressure: pressure_kpa as f64 * 1000.0,
        })
    }
}
