//! Database primitives: environment-driven settings and pooled connection bootstrap.

use std::time::Duration;

use sea_orm::{
    ConnectOptions, ConnectionTrait, Database, DatabaseConnection, DbErr, Statement,
};
use serde::Deserialize;
use thiserror::Error;
use tracing::info;

/// Shared pooled connection. Every statement checks a connection out of the pool
/// and returns it when the statement completes or fails.
pub type DbPool = DatabaseConnection;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("database url missing (set {0})")]
    MissingUrl(String),
    #[error("invalid value {value:?} for {key}")]
    InvalidSetting { key: String, value: String },
    #[error("failed to connect to database")]
    Connect(#[source] DbErr),
}

pub type DbResult<T> = Result<T, DbError>;

const DEFAULT_MAX_CONNECTIONS: u32 = 10;
const DEFAULT_MIN_CONNECTIONS: u32 = 1;
const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 5;
const DEFAULT_ACQUIRE_TIMEOUT_SECS: u64 = 5;

/// Pool sizing and timeouts. Retry policy is left to the caller.
#[derive(Clone, Debug, Deserialize)]
pub struct DatabaseSettings {
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
    #[serde(default = "default_acquire_timeout")]
    pub acquire_timeout_secs: u64,
    #[serde(default)]
    pub sql_logging: bool,
}

fn default_max_connections() -> u32 {
    DEFAULT_MAX_CONNECTIONS
}

fn default_min_connections() -> u32 {
    DEFAULT_MIN_CONNECTIONS
}

fn default_connect_timeout() -> u64 {
    DEFAULT_CONNECT_TIMEOUT_SECS
}

fn default_acquire_timeout() -> u64 {
    DEFAULT_ACQUIRE_TIMEOUT_SECS
}

impl DatabaseSettings {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            max_connections: DEFAULT_MAX_CONNECTIONS,
            min_connections: DEFAULT_MIN_CONNECTIONS,
            connect_timeout_secs: DEFAULT_CONNECT_TIMEOUT_SECS,
            acquire_timeout_secs: DEFAULT_ACQUIRE_TIMEOUT_SECS,
            sql_logging: false,
        }
    }

    /// Read `DATABASE_*` variables from the process environment.
    pub fn from_env() -> DbResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`DatabaseSettings::from_env`] with an injectable variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> DbResult<Self> {
        let url = lookup("DATABASE_URL")
            .filter(|value| !value.trim().is_empty())
            .ok_or_else(|| DbError::MissingUrl("DATABASE_URL".into()))?;
        let mut settings = Self::new(url);
        if let Some(value) = parse_var(&lookup, "DATABASE_MAX_CONNECTIONS")? {
            settings.max_connections = value;
        }
        if let Some(value) = parse_var(&lookup, "DATABASE_MIN_CONNECTIONS")? {
            settings.min_connections = value;
        }
        if let Some(value) = parse_var(&lookup, "DATABASE_CONNECT_TIMEOUT_SECS")? {
            settings.connect_timeout_secs = value;
        }
        if let Some(value) = parse_var(&lookup, "DATABASE_ACQUIRE_TIMEOUT_SECS")? {
            settings.acquire_timeout_secs = value;
        }
        if let Some(value) = lookup("DATABASE_SQL_LOGGING") {
            settings.sql_logging = matches!(value.to_lowercase().as_str(), "1" | "true" | "yes");
        }
        if settings.min_connections > settings.max_connections {
            return Err(DbError::InvalidSetting {
                key: "DATABASE_MIN_CONNECTIONS".into(),
                value: settings.min_connections.to_string(),
            });
        }
        Ok(settings)
    }

    fn connect_options(&self) -> ConnectOptions {
        let mut options = ConnectOptions::new(self.url.clone());
        options
            .max_connections(self.max_connections)
            .min_connections(self.min_connections)
            .connect_timeout(Duration::from_secs(self.connect_timeout_secs))
            .acquire_timeout(Duration::from_secs(self.acquire_timeout_secs))
            .sqlx_logging(self.sql_logging);
        options
    }
}

fn parse_var<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
) -> DbResult<Option<T>> {
    match lookup(key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| DbError::InvalidSetting {
                key: key.to_string(),
                value: raw,
            }),
    }
}

/// Open the connection pool described by `settings`.
pub async fn connect(settings: &DatabaseSettings) -> DbResult<DbPool> {
    let pool = Database::connect(settings.connect_options())
        .await
        .map_err(DbError::Connect)?;
    info!(
        backend = ?pool.get_database_backend(),
        max_connections = settings.max_connections,
        "database pool ready"
    );
    Ok(pool)
}

/// Cheap liveness probe used by the health endpoint.
pub async fn ping(pool: &DbPool) -> bool {
    let backend = pool.get_database_backend();
    pool.execute(Statement::from_string(backend, "SELECT 1".to_string()))
        .await
        .is_ok()
}
