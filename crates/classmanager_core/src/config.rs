//! Runtime configuration from environment variables and `.env` files.
//!
//! # Responsibility
//! - Resolve where the database lives and how logging is set up.
//! - Keep lookups injectable so resolution is testable without touching
//!   process environment.
//!
//! # Invariants
//! - Process environment wins over `.env` values; `.env` wins over defaults.
//! - `DB_NAME` defaults to `classmanager`.
//! - A missing `DB_URI` is a configuration error, never a silent default.

use std::collections::HashMap;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::db::DEFAULT_BUSY_TIMEOUT;

pub const ENV_DB_URI: &str = "DB_URI";
pub const ENV_DB_NAME: &str = "DB_NAME";
pub const ENV_DB_TIMEOUT_MS: &str = "DB_TIMEOUT_MS";
pub const ENV_LOG_LEVEL: &str = "LOG_LEVEL";
pub const ENV_LOG_DIR: &str = "LOG_DIR";

pub const DEFAULT_DB_NAME: &str = "classmanager";
const MEMORY_URI: &str = ":memory:";
const SQLITE_SCHEME: &str = "sqlite://";
const DB_FILE_EXTENSION: &str = "sqlite3";

/// Configuration resolution failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Required variable is unset or blank.
    Missing(&'static str),
    /// Variable is set but unusable.
    Invalid { key: &'static str, reason: String },
    /// `.env` file exists but cannot be parsed.
    EnvFile(String),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Missing(key) => write!(f, "missing required setting `{key}`"),
            Self::Invalid { key, reason } => write!(f, "invalid setting `{key}`: {reason}"),
            Self::EnvFile(details) => write!(f, "cannot read .env file: {details}"),
        }
    }
}

impl Error for ConfigError {}

/// Where the document database lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DbLocation {
    Memory,
    File(PathBuf),
}

/// Resolved application configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub db_location: DbLocation,
    pub db_name: String,
    pub busy_timeout: Duration,
    pub log_level: Option<String>,
    pub log_dir: Option<PathBuf>,
}

impl AppConfig {
    /// Loads from process environment layered over `./.env` when present.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_with_env_file(Path::new(".env"))
    }

    /// Loads from process environment layered over `env_file` when present.
    pub fn load_with_env_file(env_file: &Path) -> Result<Self, ConfigError> {
        Self::load_layered(env_file, |key| std::env::var(key).ok())
    }

    /// Loads from `primary` layered over `env_file` when present.
    ///
    /// A key set in `primary` wins even when `env_file` also sets it.
    pub fn load_layered(
        env_file: &Path,
        primary: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let file_values = read_env_file(env_file)?;
        Self::from_lookup(|key| primary(key).or_else(|| file_values.get(key).cloned()))
    }

    /// Resolves configuration from an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let db_name = get(ENV_DB_NAME).unwrap_or_else(|| DEFAULT_DB_NAME.to_string());
        validate_db_name(&db_name)?;

        let uri = get(ENV_DB_URI).ok_or(ConfigError::Missing(ENV_DB_URI))?;
        let db_location = parse_db_uri(&uri, &db_name)?;

        let busy_timeout = match get(ENV_DB_TIMEOUT_MS) {
            Some(raw) => parse_timeout_ms(&raw)?,
            None => DEFAULT_BUSY_TIMEOUT,
        };

        let log_dir = get(ENV_LOG_DIR).map(PathBuf::from);

        Ok(Self {
            db_location,
            db_name,
            busy_timeout,
            log_level: get(ENV_LOG_LEVEL),
            log_dir,
        })
    }

    /// In-memory configuration with defaults, used by tests and demos.
    pub fn in_memory() -> Self {
        Self {
            db_location: DbLocation::Memory,
            db_name: DEFAULT_DB_NAME.to_string(),
            busy_timeout: DEFAULT_BUSY_TIMEOUT,
            log_level: None,
            log_dir: None,
        }
    }
}

fn read_env_file(path: &Path) -> Result<HashMap<String, String>, ConfigError> {
    if !path.exists() {
        return Ok(HashMap::new());
    }

    let iter = dotenvy::from_path_iter(path).map_err(|err| ConfigError::EnvFile(err.to_string()))?;
    let mut values = HashMap::new();
    for item in iter {
        let (key, value) = item.map_err(|err| ConfigError::EnvFile(err.to_string()))?;
        values.insert(key, value);
    }
    Ok(values)
}

fn validate_db_name(name: &str) -> Result<(), ConfigError> {
    let valid = name
        .chars()
        .all(|ch| ch.is_ascii_alphanumeric() || ch == '_' || ch == '-');
    if !valid {
        return Err(ConfigError::Invalid {
            key: ENV_DB_NAME,
            reason: format!("`{name}` must contain only letters, digits, `_` or `-`"),
        });
    }
    Ok(())
}

fn parse_db_uri(uri: &str, db_name: &str) -> Result<DbLocation, ConfigError> {
    let stripped = uri.strip_prefix(SQLITE_SCHEME).unwrap_or(uri);
    if stripped == MEMORY_URI {
        return Ok(DbLocation::Memory);
    }
    if stripped.is_empty() {
        return Err(ConfigError::Invalid {
            key: ENV_DB_URI,
            reason: format!("`{uri}` names no directory"),
        });
    }

    let file_name = format!("{db_name}.{DB_FILE_EXTENSION}");
    Ok(DbLocation::File(Path::new(stripped).join(file_name)))
}

fn parse_timeout_ms(raw: &str) -> Result<Duration, ConfigError> {
    match raw.parse::<u64>() {
        Ok(0) | Err(_) => Err(ConfigError::Invalid {
            key: ENV_DB_TIMEOUT_MS,
            reason: format!("`{raw}` is not a positive number of milliseconds"),
        }),
        Ok(millis) => Ok(Duration::from_millis(millis)),
    }
}
