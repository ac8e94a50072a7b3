//! Tracing setup.
//!
//! Filter comes from `PROMPTGUARD_LOG` (EnvFilter syntax), falling back to
//! info for both crates. Safe to call more than once.

use tracing_subscriber::EnvFilter;

/// Environment variable holding the log filter.
pub const LOG_ENV_VAR: &str = "PROMPTGUARD_LOG";

const DEFAULT_FILTER: &str = "promptguard_core=info,promptguard_engine=info";

/// Install the global fmt subscriber. Returns false if one was already set.
pub fn init_tracing() -> bool {
    let filter = EnvFilter::try_from_env(LOG_ENV_VAR)
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init()
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_init_is_a_no_op() {
        let _ = init_tracing();
        assert!(!init_tracing());
    }
}
