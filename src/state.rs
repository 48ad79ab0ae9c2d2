//! wirefront/src/state.rs
//! Global state management.

use crate::error::ConfigError;
use crate::registry::TableRegistry;
use crate::types::FrontendOptions;
use lazy_static::lazy_static;
use std::sync::{Arc, RwLock};
use tracing::info;
use tracing_subscriber::{filter::EnvFilter, reload::Handle as ReloadHandle};

lazy_static! {
    pub static ref OPTIONS: RwLock<FrontendOptions> = RwLock::new(FrontendOptions::default());
    // Built once, then only read by every connection's decoder.
    pub static ref HANDSHAKE_REGISTRY: Arc<TableRegistry> = Arc::new(TableRegistry::handshake());
    pub static ref RELOAD_HANDLE: std::sync::Mutex<Option<ReloadHandle<EnvFilter, tracing_subscriber::Registry>>> =
        std::sync::Mutex::new(None);
}

/// Snapshot of the current options.
pub fn options() -> FrontendOptions {
    match OPTIONS.read() {
        Ok(guard) => guard.clone(),
        Err(poisoned) => poisoned.into_inner().clone(),
    }
}

/// Replace the global options from a JSON string.
pub fn set_options_json(options_json: &str) -> Result<(), ConfigError> {
    let options = FrontendOptions::from_json(options_json)?;
    set_options(options);
    Ok(())
}

pub fn set_options(options: FrontendOptions) {
    let mut guard = match OPTIONS.write() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    };
    *guard = options;
    info!("Updated global options");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_options_keep_previous() {
        let before = options();
        assert!(set_options_json("{\"maxClientsidePluginChannels\": 0}").is_err());
        assert_eq!(options(), before);
    }
}
