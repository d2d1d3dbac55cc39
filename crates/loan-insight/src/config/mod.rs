use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::str::FromStr;

use crate::portfolio::action::{MAX_TOP_N, MIN_TOP_N};
use crate::portfolio::{AnalysisConfig, AnalysisError, RiskBandThresholds};

pub const DEFAULT_DATASET_PATH: &str = "data/Loan_default.csv";

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
    pub dataset: DatasetConfig,
    pub analysis: AnalysisConfig,
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

        let dataset_path = env::var("LOAN_DATASET_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_DATASET_PATH));

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            dataset: DatasetConfig { path: dataset_path },
            analysis: load_analysis()?,
        })
    }
}

fn load_analysis() -> Result<AnalysisConfig, ConfigError> {
    let defaults = AnalysisConfig::default();

    let critical_dti_threshold =
        parse_var("LOAN_CRITICAL_DTI", defaults.critical_dti_threshold)?;
    if !critical_dti_threshold.is_finite() {
        return Err(ConfigError::InvalidValue {
            variable: "LOAN_CRITICAL_DTI",
            value: critical_dti_threshold.to_string(),
        });
    }

    let min_segment_volume = parse_var("LOAN_MIN_SEGMENT_VOLUME", defaults.min_segment_volume)?;

    let default_top_n = parse_var("LOAN_TOP_N", defaults.default_top_n)?;
    if !(MIN_TOP_N..=MAX_TOP_N).contains(&default_top_n) {
        return Err(ConfigError::InvalidValue {
            variable: "LOAN_TOP_N",
            value: default_top_n.to_string(),
        });
    }

    let bands = RiskBandThresholds::new(
        parse_var("LOAN_BAND_ALERT", defaults.bands.alert)?,
        parse_var("LOAN_BAND_CRITICAL", defaults.bands.critical)?,
    )
    .map_err(ConfigError::InvalidBands)?;

    Ok(AnalysisConfig {
        critical_dti_threshold,
        min_segment_volume,
        default_top_n,
        bands,
    })
}

fn parse_var<T: FromStr>(variable: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(variable) {
        Ok(value) => value
            .trim()
            .parse::<T>()
            .map_err(|_| ConfigError::InvalidValue { variable, value }),
        Err(_) => Ok(default),
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

/// Tracing controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

/// Where the loan dataset is read from.
#[derive(Debug, Clone)]
pub struct DatasetConfig {
    pub path: PathBuf,
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidValue { variable: &'static str, value: String },
    InvalidBands(AnalysisError),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidValue { variable, value } => {
                write!(f, "{variable} has an invalid value '{value}'")
            }
            ConfigError::InvalidBands(err) => {
                write!(f, "LOAN_BAND_ALERT/LOAN_BAND_CRITICAL are invalid: {err}")
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidPort | ConfigError::InvalidValue { .. } => None,
            ConfigError::InvalidHost { source } => Some(source),
            ConfigError::InvalidBands(err) => Some(err),
        }
    }
}
