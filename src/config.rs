//! Runtime configuration for the feedback portal
//!
//! Values are layered: built-in defaults, then an optional TOML file, then
//! environment variables (`DATABASE_URL`, `DATABASE_AUTH_TOKEN`, `JWT_SECRET`,
//! `HOST`, `PORT`, `API_URL`). Command-line flags are applied on top by the
//! binary.

use crate::error::{PortalError, Result};
use crate::services::auth::generate_secret;
use crate::storage::libsql::ConnectionMode;
use config::{Config, Environment, File};
use serde::Deserialize;
use std::net::SocketAddr;
use std::path::Path;
use tracing::{debug, warn};

pub const DEFAULT_DATABASE_URL: &str = "feedback_portal.db";
pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 4000;

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PortalConfig {
    pub database_url: String,
    #[serde(default)]
    pub database_auth_token: Option<String>,
    #[serde(default)]
    pub jwt_secret: Option<String>,
    pub host: String,
    pub port: u16,
    /// Public base URL the dashboards call
    #[serde(default)]
    pub api_url: Option<String>,
}

impl Default for PortalConfig {
    fn default() -> Self {
        Self {
            database_url: DEFAULT_DATABASE_URL.to_string(),
            database_auth_token: None,
            jwt_secret: None,
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            api_url: None,
        }
    }
}

impl PortalConfig {
    /// Load defaults, the optional file, then the environment
    pub fn load(file: Option<&Path>) -> Result<Self> {
        let mut builder = Config::builder()
            .set_default("database_url", DEFAULT_DATABASE_URL)?
            .set_default("host", DEFAULT_HOST)?
            .set_default("port", i64::from(DEFAULT_PORT))?;

        if let Some(path) = file {
            debug!("Reading configuration from {}", path.display());
            builder = builder.add_source(File::from(path).required(true));
        }

        let config: PortalConfig = builder
            .add_source(Environment::default())
            .build()?
            .try_deserialize()?;

        debug!(
            "Configuration: database={}, bind={}:{}",
            config.database_url, config.host, config.port
        );
        Ok(config)
    }

    pub fn connection_mode(&self) -> Result<ConnectionMode> {
        ConnectionMode::from_url(&self.database_url, self.database_auth_token.as_deref())
    }

    pub fn bind_addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|e| PortalError::InvalidInput(format!("Invalid bind address: {}", e)))
    }

    /// Configured token signing secret, or a random one for this process
    pub fn signing_secret(&self) -> String {
        match self.jwt_secret.as_deref().filter(|s| !s.is_empty()) {
            Some(secret) => secret.to_string(),
            None => {
                warn!("JWT_SECRET is not set; using a random secret, sessions end on restart");
                generate_secret()
            }
        }
    }

    pub fn public_url(&self) -> String {
        self.api_url
            .clone()
            .unwrap_or_else(|| format!("http://localhost:{}", self.port))
    }
}
