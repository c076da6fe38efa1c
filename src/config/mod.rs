use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};

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
    pub courier: CourierConfig,
    pub outreach: OutreachConfig,
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

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            courier: CourierConfig::from_env(),
            outreach: OutreachConfig::from_env(),
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
}

/// Connection settings for the Courier automation API.
///
/// The bearer credential stays inside this struct: it is redacted from Debug
/// output and must never be written into compiled programs, enrollment
/// records, or logs.
#[derive(Clone)]
pub struct CourierConfig {
    pub api_base: String,
    pub api_key: String,
}

impl CourierConfig {
    fn from_env() -> Self {
        let api_base = env::var("COURIER_API_BASE")
            .unwrap_or_else(|_| "https://api.courier.com".to_string());
        let api_key = env::var("COURIER_API_KEY").unwrap_or_default();
        Self { api_base, api_key }
    }
}

impl fmt::Debug for CourierConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CourierConfig")
            .field("api_base", &self.api_base)
            .finish_non_exhaustive()
    }
}

/// Values baked into every compiled automation program.
///
/// `webhook_authorization` is a template placeholder expanded by the
/// automation service at run time (e.g. `Bearer {{env.RECRUIT_API_KEY}}`),
/// not a live credential.
#[derive(Debug, Clone)]
pub struct OutreachConfig {
    pub company_name: String,
    pub status_webhook_base: String,
    pub webhook_authorization: Option<String>,
}

impl OutreachConfig {
    fn from_env() -> Self {
        let company_name =
            env::var("OUTREACH_COMPANY_NAME").unwrap_or_else(|_| "Recruit Flow".to_string());
        let status_webhook_base = env::var("OUTREACH_STATUS_WEBHOOK_BASE")
            .unwrap_or_else(|_| "https://api.recruitflow.io".to_string());
        let webhook_authorization = env::var("OUTREACH_WEBHOOK_AUTHORIZATION").ok();

        Self {
            company_name,
            status_webhook_base,
            webhook_authorization,
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidPort => None,
            ConfigError::InvalidHost { source } => Some(source),
        }
    }
}
