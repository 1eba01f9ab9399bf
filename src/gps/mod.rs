//! # Position Stream Module
//!
//! Background reader for the gpsd position stream.
//!
//! This module handles:
//! - Connecting to gpsd and enabling the JSON watch stream
//! - Parsing TPV reports into [`GpsFix`] values
//! - Draining the stream into a single shared "latest fix" slot
//!
//! The reader exists to decouple the acquisition loop from the stream's
//! own blocking read cadence: the loop reads the slot at will and always
//! sees the most recent fix, with intermediate fixes overwritten.

use serde::Deserialize;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::sync::watch;
use tracing::{debug, info};

use crate::error::{DroneLogError, Result};

/// Command enabling gpsd's JSON report stream
pub const GPSD_WATCH_COMMAND: &str = "?WATCH={\"enable\":true,\"json\":true};\n";

/// Fix modes above this value carry a usable position solution
///
/// gpsd reports mode 0/1 for no fix, 2 for 2D, 3 for 3D; anything better
/// than 2 means more than 2 tracked satellites.
pub const USABLE_FIX_MODE: i32 = 2;

/// One position/time solution reported by the receiver
#[derive(Debug, Clone, PartialEq)]
pub struct GpsFix {
    /// UTC time string as reported, absent until the receiver has time
    pub time: Option<String>,

    /// Fix mode (satellite count proxy)
    pub mode: i32,

    /// Latitude in degrees, NaN when unreported
    pub latitude: f64,

    /// Longitude in degrees, NaN when unreported
    pub longitude: f64,

    /// Altitude in meters, NaN when unreported
    pub altitude: f64,
}

impl GpsFix {
    /// Whether this fix carries a usable position solution
    pub fn is_usable(&self) -> bool {
        self.mode > USABLE_FIX_MODE
    }
}

/// The subset of a gpsd TPV report the logger consumes
#[derive(Debug, Deserialize)]
struct TpvReport {
    #[serde(default)]
    mode: i32,
    time: Option<String>,
    lat: Option<f64>,
    lon: Option<f64>,
    alt: Option<f64>,
}

/// Parse one line of the gpsd stream into a fix
///
/// Returns `None` for anything that is not a well-formed TPV report:
/// VERSION/DEVICES/SKY reports and junk lines are simply skipped, since
/// the stream keeps flowing either way.
fn parse_report(line: &str) -> Option<GpsFix> {
    let value: serde_json::Value = serde_json::from_str(line).ok()?;
    if value.get("class")?.as_str()? != "TPV" {
        return None;
    }
    let tpv: TpvReport = serde_json::from_value(value).ok()?;

    Some(GpsFix {
        time: tpv.time,
        mode: tpv.mode,
        latitude: tpv.lat.unwrap_or(f64::NAN),
        longitude: tpv.lon.unwrap_or(f64::NAN),
        altitude: tpv.alt.unwrap_or(f64::NAN),
    })
}

/// Continuously drain the gpsd stream into the shared fix slot
///
/// Runs until the stop signal fires or the stream dies. Every TPV report
/// replaces the slot's value whole; the receiving side never observes a
/// partially written fix.
///
/// # Arguments
///
/// * `addr` - gpsd socket address (host:port)
/// * `tx` - slot writer; `None` stays in place until the first fix arrives
/// * `stop` - cooperative stop signal, checked between reads
///
/// # Errors
///
/// Returns `Gps` if the connection fails or the stream ends. Recovery
/// would need hardware-level intervention, so the spawner logs the error
/// and the acquisition loop carries on with the stale slot.
pub async fn poll_fixes(
    addr: &str,
    tx: watch::Sender<Option<GpsFix>>,
    mut stop: watch::Receiver<bool>,
) -> Result<()> {
    let stream = TcpStream::connect(addr)
        .await
        .map_err(|e| DroneLogError::Gps(format!("Failed to connect to gpsd at {}: {}", addr, e)))?;
    info!("Connected to gpsd at {}", addr);

    let (read_half, mut write_half) = stream.into_split();
    write_half
        .write_all(GPSD_WATCH_COMMAND.as_bytes())
        .await
        .map_err(|e| DroneLogError::Gps(format!("Failed to enable watch stream: {}", e)))?;

    let mut lines = BufReader::new(read_half).lines();

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let line = line
                    .map_err(|e| DroneLogError::Gps(format!("Stream read failed: {}", e)))?;
                match line {
                    Some(line) => {
                        if let Some(fix) = parse_report(&line) {
                            debug!("TPV: mode {} at {:?}", fix.mode, fix.time);
                            tx.send_replace(Some(fix));
                        }
                    }
                    None => {
                        return Err(DroneLogError::Gps("position stream ended".to_string()));
                    }
                }
            }
            changed = stop.changed() => {
                // A dropped stop sender also means the session is over
                if changed.is_err() || *stop.borrow() {
                    info!("Position stream reader stopping");
                    return Ok(());
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::io::AsyncWriteExt;
    use tokio::net::TcpListener;

    #[test]
    fn test_parse_tpv_report() {
        let line = r#"{"class":"TPV","mode":3,"time":"2020-01-01T00:00:00.000Z","lat":48.0,"lon":7.85,"alt":236.9}"#;
        let fix = parse_report(line).unwrap();

        assert_eq!(fix.mode, 3);
        assert_eq!(fix.time.as_deref(), Some("2020-01-01T00:00:00.000Z"));
        assert_eq!(fix.latitude, 48.0);
        assert_eq!(fix.longitude, 7.85);
        assert_eq!(fix.altitude, 236.9);
    }

    #[test]
    fn test_parse_tpv_without_solution_keeps_nan_placeholders() {
        // Before a fix, gpsd emits TPV reports with mode but no position
        let fix = parse_report(r#"{"class":"TPV","mode":1}"#).unwrap();

        assert_eq!(fix.mode, 1);
        assert!(fix.time.is_none());
        assert!(fix.latitude.is_nan());
        assert!(fix.longitude.is_nan());
        assert!(fix.altitude.is_nan());
    }

    #[test]
    fn test_parse_skips_other_report_classes() {
        assert!(parse_report(r#"{"class":"SKY","satellites":[]}"#).is_none());
        assert!(parse_report(r#"{"class":"VERSION","release":"3.17"}"#).is_none());
    }

    #[test]
    fn test_parse_skips_junk_lines() {
        assert!(parse_report("not json").is_none());
        assert!(parse_report(r#"{"no_class":true}"#).is_none());
        assert!(parse_report("").is_none());
    }

    #[test]
    fn test_fix_usability_threshold() {
        let mut fix = parse_report(r#"{"class":"TPV","mode":3}"#).unwrap();
        assert!(fix.is_usable());

        fix.mode = 2;
        assert!(!fix.is_usable());

        fix.mode = 0;
        assert!(!fix.is_usable());
    }

    #[tokio::test]
    async fn test_poller_stores_latest_fix_and_stops_on_signal() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();

        // Fake gpsd: greet, then report two fixes so the second overwrites
        // the first in the slot
        let server = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            socket
                .write_all(b"{\"class\":\"VERSION\",\"release\":\"3.17\"}\n")
                .await
                .unwrap();
            socket
                .write_all(b"{\"class\":\"TPV\",\"mode\":2}\n")
                .await
                .unwrap();
            socket
                .write_all(
                    b"{\"class\":\"TPV\",\"mode\":3,\"time\":\"2020-01-01T00:00:00Z\",\"lat\":10.0,\"lon\":20.0,\"alt\":5.0}\n",
                )
                .await
                .unwrap();
            // Keep the stream open until the reader is told to stop
            tokio::time::sleep(Duration::from_secs(30)).await;
            drop(socket);
        });

        let (fix_tx, mut fix_rx) = watch::channel(None);
        let (stop_tx, stop_rx) = watch::channel(false);
        let reader = tokio::spawn(async move { poll_fixes(&addr, fix_tx, stop_rx).await });

        // Wait until the usable fix lands in the slot
        let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
        loop {
            tokio::time::timeout_at(deadline, fix_rx.changed())
                .await
                .expect("timed out waiting for a fix")
                .expect("slot writer dropped");
            if fix_rx.borrow().as_ref().map(|f| f.mode) == Some(3) {
                break;
            }
        }

        let fix = fix_rx.borrow().clone().unwrap();
        assert!(fix.is_usable());
        assert_eq!(fix.time.as_deref(), Some("2020-01-01T00:00:00Z"));
        assert_eq!(fix.latitude, 10.0);

        // Cooperative stop terminates the reader cleanly
        stop_tx.send(true).unwrap();
        let result = tokio::time::timeout(Duration::from_secs(5), reader)
            .await
            .expect("reader did not stop")
            .unwrap();
        assert!(result.is_ok());

        server.abort();
    }

    #[tokio::test]
    async fn test_poller_reports_stream_termination() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();

        let server = tokio::spawn(async move {
            let (socket, _) = listener.accept().await.unwrap();
            // Close immediately: the receiver process died
            drop(socket);
        });

        let (fix_tx, _fix_rx) = watch::channel(None);
        let (_stop_tx, stop_rx) = watch::channel(false);
        let result = poll_fixes(&addr, fix_tx, stop_rx).await;

        assert!(matches!(result, Err(DroneLogError::Gps(_))));
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_poller_connection_refused() {
        // Nothing is listening on this port
        let (fix_tx, _fix_rx) = watch::channel(None);
        let (_stop_tx, stop_rx) = watch::channel(false);
        let result = poll_fixes("127.0.0.1:1", fix_tx, stop_rx).await;

        assert!(matches!(result, Err(DroneLogError::Gps(_))));
    }
}
