use anyhow::Result;
use lib_telemetry::ingestors::WsTransport;
use lib_telemetry::retrieve::{ApiClient, HttpHistoricSource, HttpSensorSource};
use lib_telemetry::{SessionSettings, TelemetrySession};
use tokio::signal;

mod monitor_logic;
use monitor_logic::config::{self, MonitorMode};
use monitor_logic::{logger, runner};

async fn shutdown_signal() {
    tokio::select! {
        _ = signal::ctrl_c() => {
            log::info!("Ctrl-C received, initiating shutdown.");
        }
        _ = async {
            #[cfg(unix)]
            {
                match signal::unix::signal(signal::unix::SignalKind::terminate()) {
                    Ok(mut term_signal) => {
                        term_signal.recv().await;
                        log::info!("SIGTERM received, initiating shutdown.");
                    }
                    Err(e) => {
                        log::warn!("Cannot listen for SIGTERM: {}", e);
                        std::future::pending::<()>().await;
                    }
                }
            }
            #[cfg(not(unix))]
            {
                std::future::pending::<()>().await;
            }
        } => {}
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();

    let layered = config::load_config();
    let settings = match layered.config.clone().resolve() {
        Ok(settings) => settings,
        Err(e) => {
            // No logger yet.
            for (level, message) in &layered.notes {
                eprintln!("[{}] {}", level, message);
            }
            return Err(e.into());
        }
    };
    logger::setup_logging(&settings.log_dir, &settings.log_level)?;
    layered.log_notes();

    let client = ApiClient::new(
        &settings.api_base_url,
        settings.auth_token.clone(),
        settings.http_retries,
        settings.http_timeout,
    )?;
    let history = HttpHistoricSource::with_client(client.clone()).with_path(settings.history_path.clone());
    let sensors = HttpSensorSource::with_client(client).with_path(settings.sensors_path.clone());
    let transport = WsTransport::new(settings.connect_timeout);

    let session = TelemetrySession::with_sensor_source(
        transport,
        history,
        sensors,
        SessionSettings {
            live_base_url: settings.live_base_url.clone(),
            ..SessionSettings::default()
        },
    );
    session.set_tenant(settings.tenant.clone());

    let sensor = runner::pick_sensor(&session, &settings.sensor_id).await?;
    log::info!("Monitoring '{}' ({:?} mode)", sensor.name, settings.mode);

    let mut stdout = std::io::stdout();
    match settings.mode {
        MonitorMode::Live => {
            runner::run_live(&session, sensor, shutdown_signal(), &mut stdout).await?;
        }
        MonitorMode::Historic => {
            runner::run_historic(&session, sensor, settings.window_minutes, &mut stdout).await?;
        }
    }

    log::info!("Shutdown complete.");
    Ok(())
}
