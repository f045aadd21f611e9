//! Application configuration module
//!
//! Settings come from a JSON file. A `.env` file and the process environment
//! can override the connection: `HISTORY_SYNC_DATABASE_URL` replaces every
//! connection field, `HISTORY_SYNC_PASSWORD` only the password. A plain
//! `DATABASE_URL` belongs to whatever else runs in the shell and is ignored.

use crate::connection::ConnectionParams;
use crate::error::{config_error, AppResult};
use serde::{Deserialize, Deserializer};
use std::path::Path;
use tracing::debug;
use validator::Validate;

/// Template printed by `--gen-config`
pub const CONFIG_TEMPLATE: &str = r#"
{
	"Ip": "127.0.0.1",
	"Port": "3306",
	"User": "root",
	"Password": "root",
	"Database": "mydatabase",
	"HisSuffix": "his",
	"Tables": ["hello", "test"]
}
"#;

/// Environment variable holding a `mysql://` URL for the whole connection
pub const DATABASE_URL_VAR: &str = "HISTORY_SYNC_DATABASE_URL";

/// Environment variable holding only the password
pub const PASSWORD_VAR: &str = "HISTORY_SYNC_PASSWORD";

fn default_port() -> u16 {
    3306
}

fn default_suffix() -> String {
    "his".to_string()
}

/// Complete application settings
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "PascalCase")]
pub struct Settings {
    #[validate(length(min = 1, message = "Ip must not be empty"))]
    pub ip: String,

    #[serde(default = "default_port", deserialize_with = "port_from_any")]
    pub port: u16,

    #[validate(length(min = 1, message = "User must not be empty"))]
    pub user: String,

    #[serde(default)]
    pub password: String,

    #[validate(length(min = 1, message = "Database must not be empty"))]
    pub database: String,

    /// Suffix of the history tables and of their reserved columns
    #[serde(default = "default_suffix")]
    #[validate(length(min = 1, message = "HisSuffix must not be empty"))]
    pub his_suffix: String,

    #[validate(length(min = 1, message = "At least one table is required"))]
    pub tables: Vec<String>,
}

/// Accept `"3306"` as well as `3306`
fn port_from_any<'de, D>(deserializer: D) -> Result<u16, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Port {
        Number(u16),
        Text(String),
    }

    match Port::deserialize(deserializer)? {
        Port::Number(port) => Ok(port),
        Port::Text(text) => text
            .trim()
            .parse()
            .map_err(|_| serde::de::Error::custom(format!("invalid port `{}`", text))),
    }
}

impl Settings {
    /// Load settings from `path`, apply the `-t` table list and environment
    /// overrides, then validate.
    ///
    /// A non-empty `tables` replaces the configured list before validation,
    /// so a config with `"Tables": []` is usable together with `-t`.
    pub fn load(path: &Path, tables: &[String]) -> AppResult<Self> {
        // Load .env file if it exists (ignore errors if file not found)
        let _ = dotenvy::dotenv();

        Self::load_with(path, tables, |key| std::env::var(key).ok())
    }

    fn load_with<F>(path: &Path, tables: &[String], env: F) -> AppResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            config_error(format!("Failed to read {}: {}", path.display(), e))
        })?;

        let mut settings = Self::from_json(&raw)?;
        if !tables.is_empty() {
            debug!("Table list overridden on the command line ({} tables)", tables.len());
            settings.tables = tables.to_vec();
        }
        settings.apply_overrides(env(DATABASE_URL_VAR), env(PASSWORD_VAR))?;
        settings.validate()?;

        debug!(
            "Loaded configuration from {} ({} tables)",
            path.display(),
            settings.tables.len()
        );
        Ok(settings)
    }

    /// Parse settings from JSON text
    pub fn from_json(raw: &str) -> AppResult<Self> {
        serde_json::from_str(raw)
            .map_err(|e| config_error(format!("Failed to parse configuration: {}", e)))
    }

    /// Replace connection fields from a `mysql://` URL and/or a bare password
    pub fn apply_overrides(
        &mut self,
        database_url: Option<String>,
        password: Option<String>,
    ) -> AppResult<()> {
        if let Some(url) = database_url {
            let params = ConnectionParams::from_connection_string(&url)?;
            debug!("{} overrides connection to {}", DATABASE_URL_VAR, params.to_display_string());
            self.ip = params.host;
            self.port = params.port;
            self.user = params.user;
            self.password = params.password;
            self.database = params.database;
        }
        if let Some(password) = password {
            self.password = password;
        }
        Ok(())
    }

    pub fn connection_params(&self) -> ConnectionParams {
        ConnectionParams {
            host: self.ip.clone(),
            port: self.port,
            user: self.user.clone(),
            password: self.password.clone(),
            database: self.database.clone(),
        }
    }
}
