//! Connection factory

use crate::duckdb::DuckDbBackend;
use crate::error::DbResult;
use crate::remote::RemoteBackend;
use crate::traits::Database;
use ld_core::{Backend, ConnectionConfig, ConnectionParams};
use std::sync::Arc;

/// Open a handle for a validated connection descriptor.
///
/// DuckDB opens the configured file, or a private in-memory engine when
/// the path is unset or `:memory:`. Remote backends yield compile-only
/// handles.
pub fn connect(config: &ConnectionConfig) -> DbResult<Arc<dyn Database>> {
    match config.backend {
        Backend::DuckDb => {
            let path = config.param("path").unwrap_or(":memory:");
            log::debug!("Opening duckdb connection at {}", path);
            Ok(Arc::new(DuckDbBackend::new(path)?))
        }
        remote => {
            let missing = config.missing_params();
            if !missing.is_empty() {
                log::warn!(
                    "{} connection is missing parameters: {}",
                    remote,
                    missing.join(", ")
                );
            }
            Ok(Arc::new(RemoteBackend::new(
                remote,
                config.connection_params.clone(),
            )))
        }
    }
}

/// Open a handle from a backend tag and explicit parameters.
///
/// Unknown tags fail with `UnsupportedBackend`.
pub fn connect_tagged(tag: &str, params: ConnectionParams) -> DbResult<Arc<dyn Database>> {
    let backend: Backend = tag.parse()?;
    connect(&ConnectionConfig::new(backend, params))
}

/// Open a private in-memory DuckDB engine
pub fn connect_in_memory() -> DbResult<Arc<dyn Database>> {
    connect(&ConnectionConfig::duckdb_in_memory())
}

#[cfg(test)]
#[path = "connect_test.rs"]
mod tests;
