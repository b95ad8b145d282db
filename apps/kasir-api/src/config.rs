//! API server configuration.
//!
//! Configuration is loaded from environment variables with fallback to
//! defaults suitable for local development.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use tracing::warn;

/// Snap endpoints.
const MIDTRANS_SANDBOX_URL: &str = "https://app.sandbox.midtrans.com";
const MIDTRANS_PRODUCTION_URL: &str = "https://app.midtrans.com";

const DEV_JWT_SECRET: &str = "kasir-dev-secret-change-in-production";

/// API server configuration.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub host: String,
    pub port: u16,

    /// SQLite database file.
    pub database_path: PathBuf,
    pub database_max_connections: u32,

    /// Shared secret of the auth provider (HS256).
    pub jwt_secret: String,

    pub midtrans: MidtransConfig,
}

#[derive(Debug, Clone)]
pub struct MidtransConfig {
    /// Server key: basic auth user for Snap and the notification signature
    /// secret.
    pub server_key: String,
    pub client_key: String,
    pub is_production: bool,
    pub timeout: Duration,
}

impl MidtransConfig {
    pub fn base_url(&self) -> &'static str {
        if self.is_production {
            MIDTRANS_PRODUCTION_URL
        } else {
            MIDTRANS_SANDBOX_URL
        }
    }
}

impl ApiConfig {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from `lookup`, which stands in for the
    /// process environment.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let jwt_secret = lookup("JWT_SECRET").unwrap_or_else(|| {
            warn!("JWT_SECRET not set, using the development secret");
            DEV_JWT_SECRET.to_string()
        });

        let server_key = lookup("MIDTRANS_SERVER_KEY").unwrap_or_default();
        if server_key.is_empty() {
            warn!("MIDTRANS_SERVER_KEY not set, payment notifications cannot be verified");
        }

        Ok(ApiConfig {
            host: lookup("HTTP_HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port: parse_or(&lookup, "HTTP_PORT", 3000)?,
            database_path: lookup("DATABASE_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("./kasir.db")),
            database_max_connections: parse_or(&lookup, "DATABASE_MAX_CONNECTIONS", 5)?,
            jwt_secret,
            midtrans: MidtransConfig {
                server_key,
                client_key: lookup("MIDTRANS_CLIENT_KEY").unwrap_or_default(),
                is_production: parse_or(&lookup, "MIDTRANS_IS_PRODUCTION", false)?,
                timeout: Duration::from_secs(parse_or(&lookup, "GATEWAY_TIMEOUT_SECS", 15)?),
            },
        })
    }

    pub fn bind_addr(&self) -> Result<SocketAddr, ConfigError> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|_| ConfigError::InvalidValue("HTTP_HOST".to_string()))
    }
}

fn parse_or<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
) -> Result<T, ConfigError> {
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue(key.to_string())),
        None => Ok(default),
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}")]
    InvalidValue(String),
}
