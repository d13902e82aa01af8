//! Connection descriptor and `.env` parsing

use crate::error::{CoreError, CoreResult};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::str::FromStr;

/// Env key selecting the backend
pub const BACKEND_KEY: &str = "LDBT_BACKEND";

/// Connection parameters, keyed by backend-specific parameter name.
///
/// Values are optional because a `.env` file may leave any of them unset.
pub type ConnectionParams = BTreeMap<String, Option<String>>;

/// Query engine backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// DuckDB, file-backed or in-memory
    DuckDb,
    /// PostgreSQL
    Postgres,
    /// Google BigQuery
    BigQuery,
    /// Snowflake
    Snowflake,
}

impl Backend {
    /// Every recognized backend, in display order
    pub const ALL: [Backend; 4] = [
        Backend::DuckDb,
        Backend::Postgres,
        Backend::BigQuery,
        Backend::Snowflake,
    ];

    /// The lowercase tag used in `.env` files and error messages
    pub fn as_str(&self) -> &'static str {
        match self {
            Backend::DuckDb => "duckdb",
            Backend::Postgres => "postgres",
            Backend::BigQuery => "bigquery",
            Backend::Snowflake => "snowflake",
        }
    }

    /// Comma-separated list of valid tags
    pub fn valid_tags() -> String {
        Self::ALL
            .iter()
            .map(|b| b.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Mapping of connection parameter name to the `.env` key it is read from
    pub fn env_keys(&self) -> &'static [(&'static str, &'static str)] {
        match self {
            Backend::DuckDb => &[("path", "DUCKDB_PATH")],
            Backend::Postgres => &[
                ("host", "PG_HOST"),
                ("port", "PG_PORT"),
                ("user", "PG_USER"),
                ("password", "PG_PASSWORD"),
                ("database", "PG_DATABASE"),
            ],
            Backend::BigQuery => &[
                ("project_id", "BQ_PROJECT"),
                ("credentials_path", "BQ_CREDENTIALS"),
            ],
            Backend::Snowflake => &[
                ("account", "SF_ACCOUNT"),
                ("user", "SF_USER"),
                ("password", "SF_PASSWORD"),
                ("database", "SF_DATABASE"),
                ("warehouse", "SF_WAREHOUSE"),
            ],
        }
    }
}

impl std::fmt::Display for Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Backend {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|b| b.as_str() == s)
            .ok_or_else(|| CoreError::UnsupportedBackend {
                backend: s.to_string(),
                valid: Self::valid_tags(),
            })
    }
}

/// Validated connection descriptor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionConfig {
    /// Which engine to connect to
    pub backend: Backend,

    /// Backend-specific parameters
    pub connection_params: ConnectionParams,
}

impl ConnectionConfig {
    /// Build a descriptor from explicit parameters
    pub fn new(backend: Backend, connection_params: ConnectionParams) -> Self {
        Self {
            backend,
            connection_params,
        }
    }

    /// Descriptor for a private in-memory DuckDB engine
    pub fn duckdb_in_memory() -> Self {
        let mut params = ConnectionParams::new();
        params.insert("path".to_string(), Some(":memory:".to_string()));
        Self::new(Backend::DuckDb, params)
    }

    /// Load the descriptor from a dotenv file.
    ///
    /// Values are read from the file only; the process environment is
    /// neither consulted nor modified.
    pub fn from_env_file(path: &Path) -> CoreResult<Self> {
        if !path.is_file() {
            return Err(CoreError::EnvFileNotFound {
                path: path.display().to_string(),
            });
        }

        let iter = dotenvy::from_path_iter(path).map_err(|e| CoreError::EnvParse {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;

        let mut vars = HashMap::new();
        for item in iter {
            let (key, value) = item.map_err(|e| CoreError::EnvParse {
                path: path.display().to_string(),
                message: e.to_string(),
            })?;
            vars.insert(key, value);
        }

        Self::from_vars(&vars)
    }

    /// Build the descriptor from already-parsed `.env` variables
    pub fn from_vars(vars: &HashMap<String, String>) -> CoreResult<Self> {
        let tag = vars
            .get(BACKEND_KEY)
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| CoreError::MissingBackend {
                key: BACKEND_KEY.to_string(),
            })?;
        let backend: Backend = tag.parse()?;

        let mut params = ConnectionParams::new();
        for (param, env_key) in backend.env_keys() {
            let value = vars.get(*env_key).filter(|v| !v.is_empty()).cloned();
            params.insert(param.to_string(), value);
        }

        // DuckDB is the only backend with a usable default
        if backend == Backend::DuckDb {
            params
                .entry("path".to_string())
                .and_modify(|v| {
                    if v.is_none() {
                        *v = Some(":memory:".to_string());
                    }
                })
                .or_insert_with(|| Some(":memory:".to_string()));
        }

        log::debug!("Loaded {} connection config", backend);
        Ok(Self::new(backend, params))
    }

    /// Look up a parameter that is present and set
    pub fn param(&self, key: &str) -> Option<&str> {
        self.connection_params
            .get(key)
            .and_then(|v| v.as_deref())
    }

    /// Names of parameters the backend expects but that are unset
    pub fn missing_params(&self) -> Vec<&str> {
        self.backend
            .env_keys()
            .iter()
            .map(|(param, _)| *param)
            .filter(|param| self.param(param).is_none())
            .collect()
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
