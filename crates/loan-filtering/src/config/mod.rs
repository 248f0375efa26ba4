use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

/// Distinguishes runtime behavior for different stages of the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }
}

/// Top-level configuration for the application.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub pipeline: PipelineConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort)?;

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
        let log_format = LogFormat::from_str(
            &env::var("APP_LOG_FORMAT").unwrap_or_else(|_| "compact".to_string()),
        );

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig {
                log_level,
                log_format,
            },
            pipeline: PipelineConfig::from_env()?,
        })
    }
}

/// Settings controlling the HTTP server binding.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        if self.host.eq_ignore_ascii_case("localhost") {
            return Ok(SocketAddr::new(IpAddr::from([127, 0, 0, 1]), self.port));
        }

        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|source| ConfigError::InvalidHost { source })?;

        Ok(SocketAddr::new(ip, self.port))
    }
}

/// Tracing and metrics controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
    pub log_format: LogFormat,
}

/// Line format for emitted events; decision audits are usually shipped as JSON.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Compact,
    Json,
}

impl LogFormat {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "json" => Self::Json,
            _ => Self::Compact,
        }
    }
}

/// Environment-sourced settings for the decision pipeline, passed by value into
/// each component instead of being read from ambient state.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    pub line_of_business: String,
    pub provider_base_url: String,
    pub provider_timeout: Duration,
    pub bureau_timeout: Duration,
    pub provider_retries: u8,
    /// BPKB ownership codes accepted by the document-validator override.
    pub alternate_owner_codes: Vec<String>,
    pub threshold_dir: PathBuf,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            line_of_business: "NEW_CAR".to_string(),
            provider_base_url: "http://127.0.0.1:8080".to_string(),
            provider_timeout: Duration::from_millis(10_000),
            bureau_timeout: Duration::from_millis(30_000),
            provider_retries: 1,
            alternate_owner_codes: Vec::new(),
            threshold_dir: PathBuf::from("config/thresholds"),
        }
    }
}

impl PipelineConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        Ok(Self {
            line_of_business: env::var("FILTERING_LOB").unwrap_or(defaults.line_of_business),
            provider_base_url: env::var("PROVIDER_BASE_URL")
                .unwrap_or(defaults.provider_base_url),
            provider_timeout: millis_var("PROVIDER_TIMEOUT_MS", defaults.provider_timeout)?,
            bureau_timeout: millis_var("BUREAU_TIMEOUT_MS", defaults.bureau_timeout)?,
            provider_retries: match env::var("PROVIDER_RETRIES") {
                Ok(raw) => raw
                    .trim()
                    .parse::<u8>()
                    .map_err(|_| ConfigError::InvalidNumber {
                        variable: "PROVIDER_RETRIES",
                    })?,
                Err(_) => defaults.provider_retries,
            },
            alternate_owner_codes: env::var("ALTERNATE_OWNER_CODES")
                .map(|raw| parse_list(&raw))
                .unwrap_or(defaults.alternate_owner_codes),
            threshold_dir: env::var("THRESHOLD_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.threshold_dir),
        })
    }

    pub fn is_alternate_owner(&self, ownership: &str) -> bool {
        let ownership = ownership.trim();
        self.alternate_owner_codes
            .iter()
            .any(|code| code.eq_ignore_ascii_case(ownership))
    }
}

fn millis_var(variable: &'static str, default: Duration) -> Result<Duration, ConfigError> {
    match env::var(variable) {
        Ok(raw) => raw
            .trim()
            .parse::<u64>()
            .map(Duration::from_millis)
            .map_err(|_| ConfigError::InvalidNumber { variable }),
        Err(_) => Ok(default),
    }
}

fn parse_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
        .collect()
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidNumber { variable: &'static str },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidNumber { variable } => {
                write!(f, "{variable} must be a non-negative integer")
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidPort | ConfigError::InvalidNumber { .. } => None,
            ConfigError::InvalidHost { source } => Some(source),
        }
    }
}
