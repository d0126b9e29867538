use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_VACANCY_URL: &str = "https://sgtes.unasus.gov.br/apoiasus/login/listadevagas.asp";
pub const DEFAULT_REGISTRY_URL: &str =
    "https://github.com/romulokps/apoiasus/raw/master/populacaoBR2.csv";
pub const DEFAULT_COORDINATES_URL: &str =
    "https://github.com/kelvins/Municipios-Brasileiros/raw/main/csv/municipios.csv";

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
    pub sources: SourceConfig,
    pub dashboard: DashboardConfig,
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

        let timeout_secs = env::var("APP_FETCH_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".to_string())
            .parse::<u64>()
            .ok()
            .filter(|secs| *secs > 0)
            .ok_or(ConfigError::InvalidTimeout)?;

        let default_max_distance_km = env::var("APP_DEFAULT_MAX_DISTANCE_KM")
            .unwrap_or_else(|_| "200".to_string())
            .parse::<u32>()
            .map_err(|_| ConfigError::InvalidMaxDistance)?;

        let corrections_path = env::var("APP_CORRECTIONS_PATH")
            .ok()
            .filter(|value| !value.trim().is_empty())
            .map(PathBuf::from);

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            sources: SourceConfig {
                vacancy_url: url_or_default("APP_VACANCY_URL", DEFAULT_VACANCY_URL),
                registry_url: url_or_default("APP_REGISTRY_URL", DEFAULT_REGISTRY_URL),
                coordinates_url: url_or_default("APP_COORDINATES_URL", DEFAULT_COORDINATES_URL),
                request_timeout: Duration::from_secs(timeout_secs),
                corrections_path,
            },
            dashboard: DashboardConfig {
                default_max_distance_km,
            },
        })
    }
}

fn url_or_default(key: &str, default: &str) -> String {
    env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .unwrap_or_else(|| default.to_string())
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
}

/// Where the three upstream tables live and how to fetch them.
#[derive(Debug, Clone)]
pub struct SourceConfig {
    pub vacancy_url: String,
    pub registry_url: String,
    pub coordinates_url: String,
    pub request_timeout: Duration,
    /// Optional CSV (`uf,municipio,ibge_id`) extending the built-in corrections.
    pub corrections_path: Option<PathBuf>,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            vacancy_url: DEFAULT_VACANCY_URL.to_string(),
            registry_url: DEFAULT_REGISTRY_URL.to_string(),
            coordinates_url: DEFAULT_COORDINATES_URL.to_string(),
            request_timeout: Duration::from_secs(30),
            corrections_path: None,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct DashboardConfig {
    /// Initial slider position when the user has not picked a distance yet.
    pub default_max_distance_km: u32,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            default_max_distance_km: 200,
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidTimeout,
    InvalidMaxDistance,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidTimeout => {
                write!(f, "APP_FETCH_TIMEOUT_SECS must be a positive number of seconds")
            }
            ConfigError::InvalidMaxDistance => {
                write!(f, "APP_DEFAULT_MAX_DISTANCE_KM must be a non-negative integer")
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            ConfigError::InvalidPort
            | ConfigError::InvalidTimeout
            | ConfigError::InvalidMaxDistance => None,
        }
    }
}
