//! Fallback Pool Configuration
//!
//! Settings consumed by the fallback pool constructors. Handle resolution
//! itself never reads configuration; only the host's pool-construction step
//! does, before any resolution happens.
//!
//! # Configuration Locations
//! - Local: `.dbtap/config.json` (team-shareable, per-project)
//! - Global: `~/.config/dbtap/config.json` (per-user)
//!
//! # Resolution Precedence
//! 1. Environment variables (`DBTAP_HOST`, `DBTAP_PORT`, `DBTAP_USER`,
//!    `DBTAP_PASSWORD`, `DBTAP_DATABASE`, `DBTAP_MAX_CONNECTIONS`)
//! 2. Local config file (`.dbtap/config.json`)
//! 3. Global config file (`~/.config/dbtap/config.json`)
//! 4. Built-in defaults
//!
//! Passwords may be deferred to an environment variable via `password_env`
//! instead of being stored in a file.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{DbTapError, Result};

/// Connection settings for the fallback pool
///
/// Fields default to a local PostgreSQL development setup; any subset may be
/// overridden by config files or environment variables.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolSettings {
    /// Hostname
    pub host: String,

    /// Port number
    pub port: u16,

    /// Username
    pub user: String,

    /// Password
    /// WARNING: Sensitive data, do not log or include in error messages
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,

    /// Environment variable name for password (if not storing password directly)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password_env: Option<String>,

    /// Database name
    pub database: String,

    /// Maximum pool size
    pub max_connections: u32,
}

impl Default for PoolSettings {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 5432,
            user: "postgres".to_string(),
            password: None,
            password_env: None,
            database: "postgres".to_string(),
            max_connections: 10,
        }
    }
}

impl PoolSettings {
    /// Load settings with the documented precedence
    ///
    /// Missing files are not an error; they simply do not contribute.
    pub fn load() -> Result<Self> {
        let mut settings = Self::default();

        if let Some(global) = load_file(&global_config_path()?)? {
            settings = global;
        }
        if let Some(local) = load_file(&local_config_path()?)? {
            settings = local;
        }

        apply_env_with(&mut settings, |name| std::env::var(name).ok())?;
        Ok(settings)
    }

    /// Resolve the effective password, honoring `password_env` indirection
    ///
    /// A `password_env` naming a missing variable is a configuration error;
    /// no password at all is valid (trust auth, socket auth).
    pub fn resolve_password(&self) -> Result<Option<String>> {
        if let Some(env_var) = &self.password_env {
            return match std::env::var(env_var) {
                Ok(password) => Ok(Some(password)),
                Err(_) => Err(DbTapError::config_error(format!(
                    "Environment variable {env_var} not found for password"
                ))),
            };
        }

        Ok(self.password.clone())
    }
}

/// Get path to local config file (`.dbtap/config.json`)
pub fn local_config_path() -> Result<PathBuf> {
    let current_dir = std::env::current_dir().map_err(|e| {
        DbTapError::config_error(format!("Could not determine current directory: {e}"))
    })?;

    Ok(current_dir.join(".dbtap").join("config.json"))
}

/// Get path to global config file (`~/.config/dbtap/config.json`)
pub fn global_config_path() -> Result<PathBuf> {
    let config_dir = dirs::config_dir()
        .ok_or_else(|| DbTapError::config_error("Could not determine user config directory"))?;

    Ok(config_dir.join("dbtap").join("config.json"))
}

/// Load settings from a config file, `None` if the file does not exist
fn load_file(path: &Path) -> Result<Option<PoolSettings>> {
    if !path.exists() {
        return Ok(None);
    }

    let contents = fs::read_to_string(path)
        .map_err(|e| DbTapError::config_error(format!("Could not read config file: {e}")))?;

    let settings = serde_json::from_str::<PoolSettings>(&contents)
        .map_err(|e| DbTapError::config_error(format!("Invalid config file format: {e}")))?;

    Ok(Some(settings))
}

/// Overlay `DBTAP_*` environment variables onto `settings`
///
/// Takes the lookup as a closure so the overlay is testable without touching
/// process-wide environment state.
fn apply_env_with<F>(settings: &mut PoolSettings, get: F) -> Result<()>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(host) = get("DBTAP_HOST") {
        settings.host = host;
    }
    if let Some(port) = get("DBTAP_PORT") {
        settings.port = port
            .parse()
            .map_err(|e| DbTapError::config_error(format!("Invalid DBTAP_PORT value: {e}")))?;
    }
    if let Some(user) = get("DBTAP_USER") {
        settings.user = user;
    }
    if let Some(password) = get("DBTAP_PASSWORD") {
        settings.password = Some(password);
    }
    if let Some(database) = get("DBTAP_DATABASE") {
        settings.database = database;
    }
    if let Some(max) = get("DBTAP_MAX_CONNECTIONS") {
        settings.max_connections = max.parse().map_err(|e| {
            DbTapError::config_error(format!("Invalid DBTAP_MAX_CONNECTIONS value: {e}"))
        })?;
    }

    Ok(())
}
