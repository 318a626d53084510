use clap::{Parser, ValueEnum};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use lib_telemetry::TenantIdentity;

const DEFAULT_CONFIG_FILE: &str = "sensor_monitor.conf";

#[derive(ValueEnum, Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MonitorMode {
    Live,
    Historic,
}

#[derive(Parser, Deserialize, Serialize, Debug, Clone, Default)]
#[clap(about = "Sensor telemetry monitor (live stream or historic window)", version)]
#[serde(rename_all = "camelCase")]
pub struct MonitorConfig {
    #[clap(long, env = "MONITOR_CONFIG_PATH", help = "Path to the JSON configuration file.")]
    pub config_path: Option<PathBuf>,

    #[clap(long, env = "MONITOR_LOG_DIR", help = "Directory for log files.")]
    pub log_dir: Option<PathBuf>,

    #[clap(long, env = "MONITOR_LOG_LEVEL", help = "Logging level (trace, debug, info, warn, error).")]
    pub log_level: Option<String>,

    #[clap(long, env = "MONITOR_LIVE_URL", help = "Live stream base URL; the routing key is appended.")]
    pub live_base_url: Option<String>,

    #[clap(long, env = "MONITOR_API_URL", help = "Base URL of the REST API.")]
    pub api_base_url: Option<String>,

    #[clap(long, env = "MONITOR_HISTORY_PATH", help = "History endpoint path relative to the API base.")]
    pub history_path: Option<String>,

    #[clap(long, env = "MONITOR_SENSORS_PATH", help = "Sensor listing path relative to the API base.")]
    pub sensors_path: Option<String>,

    #[clap(long, env = "MONITOR_HTTP_RETRIES", help = "Retries for transient HTTP failures.")]
    pub http_retries: Option<u32>,

    #[clap(long, env = "MONITOR_HTTP_TIMEOUT_MS", help = "Per-request HTTP timeout in milliseconds.")]
    pub http_timeout_ms: Option<u64>,

    #[clap(long, env = "MONITOR_CONNECT_TIMEOUT_MS", help = "WebSocket handshake timeout in milliseconds (0 waits forever).")]
    pub connect_timeout_ms: Option<u64>,

    #[clap(long, env = "MONITOR_AUTH_TOKEN", help = "Bearer token for the REST API.")]
    pub auth_token: Option<String>,

    #[clap(long, env = "MONITOR_ROUTING_KEY", help = "Tenant routing key used by the live stream.")]
    pub routing_key: Option<String>,

    #[clap(long, env = "MONITOR_TENANT_ID", help = "Numeric tenant id used by the history endpoint.")]
    pub tenant_id: Option<u64>,

    #[clap(long, env = "MONITOR_SENSOR", help = "Sensor id as listed by the backend (heart_rate, blood_oxygen).")]
    pub sensor: Option<String>,

    #[clap(long, value_enum, env = "MONITOR_MODE", help = "live or historic.")]
    pub mode: Option<MonitorMode>,

    #[clap(long, env = "MONITOR_WINDOW_MINUTES", help = "Historic window in minutes.")]
    pub window_minutes: Option<u32>,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing setting '{0}'")]
    Missing(&'static str),
}

/// Layered config plus what happened while reading the file. The notes are
/// kept until the logger exists.
#[derive(Debug, Clone)]
pub struct LayeredConfig {
    pub config: MonitorConfig,
    pub notes: Vec<(log::Level, String)>,
}

impl LayeredConfig {
    pub fn log_notes(&self) {
        for (level, message) in &self.notes {
            log::log!(*level, "{}", message);
        }
    }
}

/// Fully resolved settings for one monitor run.
#[derive(Debug, Clone)]
pub struct MonitorSettings {
    pub mode: MonitorMode,
    pub sensor_id: String,
    pub tenant: TenantIdentity,
    pub window_minutes: u32,
    pub live_base_url: String,
    pub api_base_url: String,
    pub history_path: String,
    pub sensors_path: String,
    pub http_retries: u32,
    pub http_timeout: Duration,
    pub connect_timeout: Option<Duration>,
    pub auth_token: Option<String>,
    pub log_dir: PathBuf,
    pub log_level: String,
}

impl MonitorConfig {
    // Merge two configs, where 'other' overrides 'self' for Some values
    fn merge(self, other: MonitorConfig) -> MonitorConfig {
        MonitorConfig {
            config_path: other.config_path.or(self.config_path),
            log_dir: other.log_dir.or(self.log_dir),
            log_level: other.log_level.or(self.log_level),
            live_base_url: other.live_base_url.or(self.live_base_url),
            api_base_url: other.api_base_url.or(self.api_base_url),
            history_path: other.history_path.or(self.history_path),
            sensors_path: other.sensors_path.or(self.sensors_path),
            http_retries: other.http_retries.or(self.http_retries),
            http_timeout_ms: other.http_timeout_ms.or(self.http_timeout_ms),
            connect_timeout_ms: other.connect_timeout_ms.or(self.connect_timeout_ms),
            auth_token: other.auth_token.or(self.auth_token),
            routing_key: other.routing_key.or(self.routing_key),
            tenant_id: other.tenant_id.or(self.tenant_id),
            sensor: other.sensor.or(self.sensor),
            mode: other.mode.or(self.mode),
            window_minutes: other.window_minutes.or(self.window_minutes),
        }
    }

    pub fn defaults() -> MonitorConfig {
        MonitorConfig {
            log_dir: Some(PathBuf::from("./logs")),
            log_level: Some("info".to_string()),
            live_base_url: Some("ws://localhost:8080/ws/sensors/".to_string()),
            api_base_url: Some("http://localhost:8080/".to_string()),
            history_path: Some("api/history".to_string()),
            sensors_path: Some("api/sensors".to_string()),
            http_retries: Some(3),
            http_timeout_ms: Some(10_000),
            connect_timeout_ms: Some(10_000),
            sensor: Some("heart_rate".to_string()),
            mode: Some(MonitorMode::Live),
            window_minutes: Some(60),
            ..Default::default()
        }
    }

    /// Turns the merged layers into settings. The sensor id is checked
    /// later against the backend listing.
    pub fn resolve(self) -> Result<MonitorSettings, ConfigError> {
        let sensor_id = self
            .sensor
            .filter(|id| !id.trim().is_empty())
            .ok_or(ConfigError::Missing("sensor"))?;

        let tenant = TenantIdentity {
            routing_key: self.routing_key,
            tenant_id: self.tenant_id,
            name: None,
        };

        Ok(MonitorSettings {
            mode: self.mode.ok_or(ConfigError::Missing("mode"))?,
            sensor_id,
            tenant,
            window_minutes: self.window_minutes.ok_or(ConfigError::Missing("windowMinutes"))?,
            live_base_url: self.live_base_url.ok_or(ConfigError::Missing("liveBaseUrl"))?,
            api_base_url: self.api_base_url.ok_or(ConfigError::Missing("apiBaseUrl"))?,
            history_path: self.history_path.ok_or(ConfigError::Missing("historyPath"))?,
            sensors_path: self.sensors_path.ok_or(ConfigError::Missing("sensorsPath"))?,
            http_retries: self.http_retries.unwrap_or(0),
            http_timeout: Duration::from_millis(self.http_timeout_ms.ok_or(ConfigError::Missing("httpTimeoutMs"))?),
            connect_timeout: self
                .connect_timeout_ms
                .filter(|ms| *ms > 0)
                .map(Duration::from_millis),
            auth_token: self.auth_token.filter(|t| !t.trim().is_empty()),
            log_dir: self.log_dir.ok_or(ConfigError::Missing("logDir"))?,
            log_level: self.log_level.unwrap_or_else(|| "info".to_string()),
        })
    }
}

fn read_config_file(path: &Path, notes: &mut Vec<(log::Level, String)>) -> Option<MonitorConfig> {
    if !path.exists() {
        notes.push((
            log::Level::Info,
            format!("Config file not found at {}. Using defaults and environment/CLI variables.", path.display()),
        ));
        return None;
    }
    match fs::read_to_string(path) {
        Ok(config_str) => match serde_json::from_str::<MonitorConfig>(&config_str) {
            Ok(file_config) => {
                notes.push((log::Level::Info, format!("Loaded config file {}", path.display())));
                Some(file_config)
            }
            Err(e) => {
                notes.push((
                    log::Level::Warn,
                    format!("Failed to parse config file {}: {}. Falling back to other sources.", path.display(), e),
                ));
                None
            }
        },
        Err(e) => {
            notes.push((
                log::Level::Warn,
                format!("Failed to read config file {}: {}. Falling back to other sources.", path.display(), e),
            ));
            None
        }
    }
}

/// Layers defaults, the JSON config file and `cli` (flags plus environment).
pub fn layer_config(cli: MonitorConfig) -> LayeredConfig {
    let config_file_path = cli
        .config_path
        .clone()
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));

    let mut notes = Vec::new();
    let mut current_config = MonitorConfig::defaults();
    if let Some(file_config) = read_config_file(&config_file_path, &mut notes) {
        current_config = current_config.merge(file_config);
    }
    LayeredConfig {
        config: current_config.merge(cli),
        notes,
    }
}

pub fn load_config() -> LayeredConfig {
    layer_config(MonitorConfig::parse())
}
