//! wirefront/src/logging.rs
//! Logging initialization and runtime updates.

use crate::error::ConfigError;
use crate::state::RELOAD_HANDLE;
use std::sync::Once;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{filter::EnvFilter, fmt, reload::Layer as ReloadLayer};

static LOG_INIT: Once = Once::new();

// Initialize logging once
pub fn init_logging(default: &str) {
    LOG_INIT.call_once(|| {
        let filter = EnvFilter::try_new(default).unwrap_or_else(|_| EnvFilter::new("info"));
        let (reload_layer, handle) = ReloadLayer::new(filter);
        let subscriber = tracing_subscriber::registry()
            .with(reload_layer)
            .with(fmt::layer());
        // Someone else may own the global subscriber already; keep theirs.
        if tracing::subscriber::set_global_default(subscriber).is_ok() {
            if let Ok(mut slot) = RELOAD_HANDLE.lock() {
                *slot = Some(handle);
            }
        }
    });
}

/// Set log level at runtime
pub fn set_log_level(level: &str) -> Result<(), ConfigError> {
    let filter = EnvFilter::try_new(level).map_err(|e| ConfigError::Logging(e.to_string()))?;
    let guard = RELOAD_HANDLE
        .lock()
        .map_err(|_| ConfigError::Logging("reload handle poisoned".to_string()))?;
    let handle = guard
        .as_ref()
        .ok_or_else(|| ConfigError::Logging("logging is not initialized".to_string()))?;
    handle
        .reload(filter)
        .map_err(|e| ConfigError::Logging(e.to_string()))
}
