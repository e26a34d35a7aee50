//! Service Configuration Module
//!
//! Runtime configuration loaded from TOML, with every section optional.
//!
//! ## Loading Order
//!
//! 1. `TURBINE_CONFIG` environment variable (path to TOML file)
//! 2. `turbine_config.toml` in the current working directory
//! 3. Built-in defaults (see [`defaults`])
//!
//! `TURBINE_SERVER_ADDR` and `TURBINE_REMOTE_URL` override the file.
//!
//! ## Usage
//!
//! The binary calls `config::init()` once at startup. Library components never
//! read the global; they take their section as a constructor argument:
//!
//! ```ignore
//! config::init(SentinelConfig::load());
//! let dispatcher = Dispatcher::from_config(&config::get().remote, seed)?;
//! ```

mod sentinel_config;
pub mod defaults;

pub use sentinel_config::*;

use std::sync::OnceLock;

/// Global service configuration, initialized once at startup.
static SENTINEL_CONFIG: OnceLock<SentinelConfig> = OnceLock::new();

/// Initialize the global configuration.
///
/// Later calls are ignored with a warning.
pub fn init(config: SentinelConfig) {
    if SENTINEL_CONFIG.set(config).is_err() {
        tracing::warn!("config::init() called more than once, ignoring");
    }
}

/// Get a reference to the global configuration.
///
/// Panics if `init()` has not been called; a missing config is a startup bug.
pub fn get() -> &'static SentinelConfig {
    SENTINEL_CONFIG
        .get()
        .expect("config::get() called before config::init(); this is a startup bug")
}

/// Check whether the config has been initialized.
pub fn is_initialized() -> bool {
    SENTINEL_CONFIG.get().is_some()
}
