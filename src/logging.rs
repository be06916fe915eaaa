//! ## Logging Configuration
//!
//! This module sets up logging automatically at program startup using the `ctor` crate.
//! Logging behavior is controlled by the `DEBUG_HOUSING_PREP` environment variable:
//!
//! - **Disabled** (default): If the variable is unset, empty, or explicitly set to `"0"` or `"false"`,
//!   no subscriber is installed and stage events are dropped.
//! - **Enabled**: Any other value installs a formatting subscriber with a maximum level of `DEBUG`,
//!   which prints per-stage summaries and per-column decisions.
//!
//! ### Usage Example
//!
//! ```sh
//! export DEBUG_HOUSING_PREP=true
//! ```

use ctor::ctor;
use tracing::Level;

/// Environment variable that switches stage logging on.
pub const DEBUG_ENV_VAR: &str = "DEBUG_HOUSING_PREP";

/// Returns true when the given value of [`DEBUG_ENV_VAR`] enables logging.
pub fn logging_enabled(value: Option<&str>) -> bool {
    value.is_some_and(|v| !(v == "0" || v == "false" || v.is_empty()))
}

#[ctor]
fn set_debug_level() {
    let value = std::env::var(DEBUG_ENV_VAR).ok();
    if logging_enabled(value.as_deref()) {
        // A host application may already own the global subscriber.
        let _ = tracing_subscriber::fmt()
            .with_max_level(Level::DEBUG)
            .try_init();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_logging_switch() {
        assert!(!logging_enabled(None));
        assert!(!logging_enabled(Some("")));
        assert!(!logging_enabled(Some("0")));
        assert!(!logging_enabled(Some("false")));
        assert!(logging_enabled(Some("1")));
        assert!(logging_enabled(Some("true")));
    }
}
