use anyhow::{Context, Result};
use dotenvy::dotenv;
use secrecy::Secret;
use std::env;

#[derive(Clone, Debug)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    /// Minutes a portal magic link stays valid.
    pub portal_login_ttl_minutes: i64,
    /// Minutes a portal session stays valid after login.
    pub portal_session_ttl_minutes: i64,
    pub service_name: String,
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Clone, Debug)]
pub struct DatabaseConfig {
    pub url: Secret<String>,
    pub max_connections: u32,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();

        let host = env::var("BACKOFFICE_HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let port = env::var("BACKOFFICE_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse()
            .context("BACKOFFICE_PORT must be a valid port number")?;

        let db_url =
            env::var("BACKOFFICE_DATABASE_URL").context("BACKOFFICE_DATABASE_URL must be set")?;
        let max_connections = env::var("BACKOFFICE_DATABASE_MAX_CONNECTIONS")
            .unwrap_or_else(|_| "10".to_string())
            .parse()
            .context("BACKOFFICE_DATABASE_MAX_CONNECTIONS must be a number")?;

        let portal_login_ttl_minutes = env::var("BACKOFFICE_PORTAL_LOGIN_TTL_MINUTES")
            .unwrap_or_else(|_| "30".to_string())
            .parse()
            .context("BACKOFFICE_PORTAL_LOGIN_TTL_MINUTES must be a number")?;
        let portal_session_ttl_minutes = env::var("BACKOFFICE_PORTAL_SESSION_TTL_MINUTES")
            .unwrap_or_else(|_| "1440".to_string())
            .parse()
            .context("BACKOFFICE_PORTAL_SESSION_TTL_MINUTES must be a number")?;

        Ok(Self {
            server: ServerConfig { host, port },
            database: DatabaseConfig {
                url: Secret::new(db_url),
                max_connections,
            },
            portal_login_ttl_minutes,
            portal_session_ttl_minutes,
            service_name: "backoffice-service".to_string(),
        })
    }
}
