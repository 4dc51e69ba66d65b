/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 8/10/26
******************************************************************************/
use std::env;
use std::sync::Once;
use tracing::debug;
use tracing_subscriber::EnvFilter;

static INIT: Once = Once::new();

/// Installs the global `tracing` subscriber once per process.
///
/// The level comes from `LOGLEVEL` (`DEBUG`, `INFO`, `WARN`, `ERROR`, `TRACE`) and
/// defaults to `INFO`. Later calls are no-ops, so tests can call it freely.
pub fn setup_logger() {
    INIT.call_once(|| {
        let log_level = env::var("LOGLEVEL")
            .unwrap_or_else(|_| "INFO".to_string())
            .to_uppercase();

        let filter = EnvFilter::try_new(log_level.to_lowercase())
            .unwrap_or_else(|_| EnvFilter::new("info"));

        let installed = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .try_init()
            .is_ok();

        if installed {
            debug!("Log level set to: {}", log_level);
        }
    });
}
