//! Logging setup for the sqldeploy binary.
//!
//! Diagnostics go to stderr so the per-batch console report on stdout stays
//! clean. The driver's own connection chatter is held at WARN between the
//! quiet and full-trace levels, and `SQLDEPLOY_LOG` replaces the filter entirely
//! (for example `SQLDEPLOY_LOG=sqldeploy_core=debug,tiberius=debug`).

use tracing_subscriber::EnvFilter;

use crate::Result;

/// Environment variable holding an explicit filter directive.
pub const LOG_ENV: &str = "SQLDEPLOY_LOG";

/// Maps CLI verbosity flags to a tracing level.
///
/// `quiet` wins over any verbosity; 0 is INFO, 1 is DEBUG, 2+ is TRACE.
pub fn level_for(verbose: u8, quiet: bool) -> tracing::Level {
    match (quiet, verbose) {
        (true, _) => tracing::Level::ERROR,
        (false, 0) => tracing::Level::INFO,
        (false, 1) => tracing::Level::DEBUG,
        (false, _) => tracing::Level::TRACE,
    }
}

/// Filter directives used when `SQLDEPLOY_LOG` is not set.
pub fn default_directives(level: tracing::Level) -> String {
    let directive = level.as_str().to_ascii_lowercase();
    if level == tracing::Level::TRACE || level == tracing::Level::ERROR {
        directive
    } else {
        format!("{directive},tiberius=warn")
    }
}

/// Builds the event filter for the given flags.
///
/// `--quiet` ignores `SQLDEPLOY_LOG`; otherwise a valid `SQLDEPLOY_LOG`
/// takes precedence over the verbosity flags.
pub fn filter_for(verbose: u8, quiet: bool) -> EnvFilter {
    let defaults = || EnvFilter::new(default_directives(level_for(verbose, quiet)));
    if quiet {
        return defaults();
    }
    EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| defaults())
}

/// Initializes the stderr subscriber for a deployment run.
///
/// # Errors
/// Returns a configuration error if a global subscriber is already set.
///
/// # Example
/// ```rust,no_run
/// use sqldeploy_core::logging::init_logging;
///
/// init_logging(1, false).expect("Failed to initialize logging");
/// ```
pub fn init_logging(verbose: u8, quiet: bool) -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(filter_for(verbose, quiet))
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .try_init()
        .map_err(|e| {
            crate::error::DeployError::configuration(format!(
                "Failed to initialize logging: {}",
                e
            ))
        })?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing::level_filters::LevelFilter;

    // Logging can only be initialized once per test process, so only the
    // level mapping and filter construction are exercised here.
    #[test]
    fn test_verbosity_levels() {
        let test_cases = [
            ((true, 0), tracing::Level::ERROR),
            ((true, 5), tracing::Level::ERROR),
            ((false, 0), tracing::Level::INFO),
            ((false, 1), tracing::Level::DEBUG),
            ((false, 2), tracing::Level::TRACE),
            ((false, 10), tracing::Level::TRACE),
        ];

        for ((quiet, verbose), expected) in test_cases {
            assert_eq!(
                level_for(verbose, quiet),
                expected,
                "Failed for quiet={}, verbose={}",
                quiet,
                verbose
            );
        }
    }

    #[test]
    fn test_default_directives_quiet_the_driver() {
        assert_eq!(default_directives(tracing::Level::INFO), "info,tiberius=warn");
        assert_eq!(default_directives(tracing::Level::DEBUG), "debug,tiberius=warn");
        assert_eq!(default_directives(tracing::Level::TRACE), "trace");
        assert_eq!(default_directives(tracing::Level::ERROR), "error");
    }

    #[test]
    fn test_env_filter_overrides_flags() {
        temp_env::with_var(LOG_ENV, Some("sqldeploy_core=trace"), || {
            assert_eq!(filter_for(0, false).max_level_hint(), Some(LevelFilter::TRACE));
            assert_eq!(filter_for(0, true).max_level_hint(), Some(LevelFilter::ERROR));
        });
    }

    #[test]
    fn test_env_filter_defaults_without_env() {
        temp_env::with_var_unset(LOG_ENV, || {
            assert_eq!(filter_for(0, false).max_level_hint(), Some(LevelFilter::INFO));
            assert_eq!(filter_for(1, false).max_level_hint(), Some(LevelFilter::DEBUG));
        });
    }
}
