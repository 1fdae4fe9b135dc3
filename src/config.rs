//! Service configuration read from the environment.
//!
//! `main` loads a `.env` file through `dotenvy` first, so every key below can
//! live there during development.

use thiserror::Error;

use crate::domain::aggregates::TransitionPolicy;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    Missing(&'static str),

    #[error("invalid value for {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
}

#[derive(Clone, Debug)]
pub struct Config {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub jwt_secret: String,
    pub max_connections: u32,
    pub nats_url: Option<String>,
    pub transitions: TransitionPolicy,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let required = |key: &'static str| get(key).ok_or(ConfigError::Missing(key));

        let port = match get("PORT") {
            Some(raw) => raw.parse().map_err(|e: std::num::ParseIntError| ConfigError::Invalid { key: "PORT", reason: e.to_string() })?,
            None => 8083,
        };
        let max_connections = match get("DB_MAX_CONNECTIONS") {
            Some(raw) => raw
                .parse()
                .map_err(|e: std::num::ParseIntError| ConfigError::Invalid { key: "DB_MAX_CONNECTIONS", reason: e.to_string() })?,
            None => 10,
        };
        let transitions = match get("ORDER_TRANSITIONS") {
            Some(raw) => raw.parse().map_err(|reason| ConfigError::Invalid { key: "ORDER_TRANSITIONS", reason })?,
            None => TransitionPolicy::Open,
        };

        Ok(Self {
            database_url: required("DATABASE_URL")?,
            host: get("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port,
            jwt_secret: required("JWT_SECRET")?,
            max_connections,
            nats_url: get("NATS_URL"),
            transitions,
        })
    }

    pub fn bind_address(&self) -> String { format!("{}:{}", self.host, self.port) }
}
