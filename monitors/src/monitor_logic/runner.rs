//! Drives a [`TelemetrySession`] for one monitor run and prints what it
//! observes.

use std::future::Future;
use std::io::Write;

use anyhow::{anyhow, Result};
use lib_telemetry::{
    default_catalog, find_sensor, ConnectionStatus, HistoricSource, LiveTransport, Reading,
    Sensor, SensorSource, TelemetrySession,
};

pub fn format_reading(reading: &Reading, unit: &str) -> String {
    format!(
        "{} {} {}",
        reading.timestamp.format("%Y-%m-%d %H:%M:%S%.3f"),
        reading.value,
        unit
    )
}

/// Finds `sensor_id` in the backend listing, falling back to the built-in
/// catalog only when the listing could not be loaded.
pub async fn pick_sensor<T, H, S>(session: &TelemetrySession<T, H, S>, sensor_id: &str) -> Result<Sensor>
where
    T: LiveTransport,
    H: HistoricSource,
    S: SensorSource,
{
    if let Some(task) = session.load_sensors() {
        task.await?;
    }
    if let Some(sensor) = session.listed_sensor(sensor_id) {
        return Ok(sensor);
    }

    match session.sensors_error() {
        Some(e) => {
            log::warn!("Sensor listing unavailable ({}), using the built-in catalog.", e);
            find_sensor(&default_catalog(), sensor_id)
                .cloned()
                .ok_or_else(|| anyhow!("unknown sensor '{}'", sensor_id))
        }
        None => Err(anyhow!(
            "unknown sensor '{}' (listed: {})",
            sensor_id,
            session
                .sensors()
                .iter()
                .map(|s| s.id.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        )),
    }
}

/// Streams `sensor` until `shutdown` resolves or the connection fails.
/// Prints every new latest reading to `out`.
pub async fn run_live<T, H, S, W>(
    session: &TelemetrySession<T, H, S>,
    sensor: Sensor,
    shutdown: impl Future<Output = ()>,
    out: &mut W,
) -> Result<()>
where
    T: LiveTransport,
    H: HistoricSource,
    S: SensorSource,
    W: Write,
{
    let mut readings = session.subscribe_live_readings();
    let mut status = session.subscribe_connection_status();
    readings.mark_unchanged();
    status.mark_unchanged();

    session.select_live(sensor.clone());
    tokio::pin!(shutdown);

    let outcome = loop {
        // A synchronous transport may already have failed.
        if session.connection_status() == ConnectionStatus::Error {
            break Err(live_failure(session));
        }

        tokio::select! {
            _ = &mut shutdown => {
                log::info!("Shutdown requested, leaving live mode.");
                break Ok(());
            }
            changed = readings.changed() => {
                if changed.is_err() {
                    break Ok(());
                }
                let latest = readings.borrow_and_update().last().cloned();
                if let Some(reading) = latest {
                    if let Err(e) = writeln!(out, "{}", format_reading(&reading, &sensor.unit)) {
                        break Err(e.into());
                    }
                }
            }
            changed = status.changed() => {
                if changed.is_err() {
                    break Ok(());
                }
                let current = *status.borrow_and_update();
                log::info!("Connection status: {:?}", current);
            }
        }
    };

    session.reset();
    outcome
}

fn live_failure<T, H, S>(session: &TelemetrySession<T, H, S>) -> anyhow::Error
where
    T: LiveTransport,
    H: HistoricSource,
    S: SensorSource,
{
    match session.live_error() {
        Some(e) => anyhow!("live stream failed: {}", e),
        None => anyhow!("live stream failed"),
    }
}

/// Loads the historic window of `sensor` and prints it to `out`.
pub async fn run_historic<T, H, S, W>(
    session: &TelemetrySession<T, H, S>,
    sensor: Sensor,
    window_minutes: u32,
    out: &mut W,
) -> Result<usize>
where
    T: LiveTransport,
    H: HistoricSource,
    S: SensorSource,
    W: Write,
{
    if let Some(task) = session.select_historic(sensor.clone(), window_minutes) {
        task.await?;
    }

    if let Some(e) = session.historic_error() {
        return Err(anyhow!("historic fetch failed: {}", e));
    }

    let readings = session.historic_readings();
    for reading in &readings {
        writeln!(out, "{}", format_reading(reading, &sensor.unit))?;
    }
    log::info!("{} readings in the last {} minutes", readings.len(), window_minutes);
    Ok(readings.len())
}
