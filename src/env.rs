//! Environment variable names used by this crate for convenient
//! configuration from the hosting service.
//!
//! These are purely helpers; the core router and sink types remain
//! decoupled from environment access.

use crate::router::RunMode;

/// Runtime mode of the hosting service; `"development"` selects the
/// console + local-file emission path, anything else means production.
pub const RUN_MODE_ENV: &str = "APP_ENV";

/// Message-bus address, e.g. `127.0.0.1:5555`.
pub const BUS_ADDR_ENV: &str = "CORRELOG_BUS_ADDR";

/// Log-aggregator host name.
pub const AGGREGATOR_HOST_ENV: &str = "CORRELOG_AGGREGATOR_HOST";

/// Log-aggregator port.
pub const AGGREGATOR_PORT_ENV: &str = "CORRELOG_AGGREGATOR_PORT";

/// Read an environment variable or fall back to a provided default.
pub fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Emission mode of the current process.
pub fn run_mode_from_env() -> RunMode {
    if env_or(RUN_MODE_ENV, "") == "development" {
        RunMode::Development
    } else {
        RunMode::Production
    }
}
