//! Tracing subscriber setup
//!
//! Library code only emits `tracing` events; binaries and tests call
//! [`init_tracing`] once to print them. `RUST_LOG` overrides the default
//! directive.

use tracing_subscriber::filter::ParseError;
use tracing_subscriber::EnvFilter;

/// Errors from subscriber setup.
#[derive(Debug, thiserror::Error)]
pub enum TracingError {
    /// The default directive is not a valid filter.
    #[error("Invalid log filter directive '{directive}': {source}")]
    InvalidDirective {
        directive: String,
        #[source]
        source: ParseError,
    },
}

/// Install a formatting subscriber filtered by `RUST_LOG`, falling back to
/// `default_directive` (e.g. `"skylist_core=debug,info"`).
///
/// Returns `Ok(false)` when a global subscriber was already installed, so
/// repeated calls are harmless.
///
/// # Errors
/// Returns [`TracingError::InvalidDirective`] if `default_directive` does not
/// parse.
pub fn init_tracing(default_directive: &str) -> Result<bool, TracingError> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(default_directive).map_err(|source| {
            TracingError::InvalidDirective { directive: default_directive.to_string(), source }
        })?,
    };

    let installed =
        tracing_subscriber::fmt().with_env_filter(filter).with_target(true).try_init().is_ok();
    if installed {
        tracing::debug!(default_directive, "Tracing subscriber installed");
    }
    Ok(installed)
}
