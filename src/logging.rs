//! Console logging for the plugin.
//!
//! The host owns the process, so the plugin only installs a subscriber if
//! none is present yet. The filter comes from `$LIGHTGROUP_TOOLS_LOG`
//! (standard `EnvFilter` syntax) and defaults to `info`.

use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

use crate::constants::LOG_ENV;

/// Build the filter used by [`init`].
pub fn env_filter(default: LevelFilter) -> EnvFilter {
    EnvFilter::builder().with_default_directive(default.into()).with_env_var(LOG_ENV).from_env_lossy()
}

/// Install the console subscriber.
///
/// Returns `false` if the host already installed one; that subscriber is
/// left in place and receives the plugin's events.
pub fn init() -> bool {
    tracing_subscriber::fmt()
        .with_env_filter(env_filter(LevelFilter::INFO))
        .with_target(false)
        .with_ansi(false)
        .try_init()
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn test_env_filter_reads_plugin_variable() {
        unsafe {
            std::env::set_var(LOG_ENV, "lightgroup_tools=debug");
        }
        let filter = env_filter(LevelFilter::INFO);
        assert!(filter.to_string().contains("lightgroup_tools=debug"));
        unsafe {
            std::env::remove_var(LOG_ENV);
        }
    }

    #[test]
    #[serial]
    fn test_env_filter_default() {
        unsafe {
            std::env::remove_var(LOG_ENV);
        }
        assert_eq!(env_filter(LevelFilter::WARN).to_string(), "warn");
    }
}
