//! CLI command implementations
//!
//! Each command returns its process exit code:
//!
//! | Code | Meaning |
//! |------|---------|
//! | 0 | Success |
//! | 2 | Configuration error |
//! | 3 | Batch size or format error |
//! | 4 | Relay connection error |
//! | 5 | Fatal error |

pub mod compile;
pub mod schedule;
pub mod serve;
pub mod status;
pub mod subscribe;
pub mod validate;

use crate::config::{load_config, StudyhubConfig};

/// Load and validate the configuration, printing the failure
///
/// Returns `None` when the command should exit with code 2.
pub(crate) fn load_validated_config(config_path: &str) -> Option<StudyhubConfig> {
    let config = match load_config(config_path) {
        Ok(c) => c,
        Err(e) => {
            tracing::error!(error = %e, config_path, "Failed to load configuration");
            eprintln!("❌ Failed to load configuration file: {e}");
            return None;
        }
    };

    if let Err(e) = config.validate() {
        tracing::error!(error = %e, "Configuration validation failed");
        eprintln!("❌ Configuration validation failed: {e}");
        return None;
    }

    Some(config)
}
