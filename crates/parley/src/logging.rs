//! Process-wide log subscriber.
//!
//! Everything is routed through `tracing`. Records emitted with the `log`
//! macros (the CLI uses them) reach the same subscriber through the
//! `tracing-log` bridge that `try_init` installs.

use anyhow::{Context, Result};
use log::LevelFilter;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::APP_NAME;

/// How the subscriber renders records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogSettings {
    pub level: LevelFilter,
    /// One JSON object per line instead of human-readable output.
    pub json: bool,
    /// ANSI colors for human-readable output.
    pub ansi: bool,
}

/// Pick the effective level. Command-line verbosity wins over the
/// configured `logging.level`; an unparsable configured level means `info`.
pub fn resolve_level(configured: &str, verbose: u8, debug: bool, trace: bool) -> LevelFilter {
    if trace || verbose >= 2 {
        LevelFilter::Trace
    } else if debug || verbose == 1 {
        LevelFilter::Debug
    } else {
        configured.trim().parse().unwrap_or(LevelFilter::Info)
    }
}

/// Default filter when `RUST_LOG` is unset: our crate and the HTTP tracing
/// layer at `level`, everything else at the subscriber default.
pub fn default_directives(level: LevelFilter) -> String {
    let level = level.as_str().to_ascii_lowercase();
    format!("{APP_NAME}={level},tower_http={level}")
}

/// Install the global subscriber. Fails if one is already installed.
pub fn init(settings: LogSettings) -> Result<()> {
    if settings.level == LevelFilter::Off {
        log::set_max_level(LevelFilter::Off);
        return Ok(());
    }

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(settings.level)));
    let registry = tracing_subscriber::registry().with(filter);

    let installed = if settings.json {
        registry
            .with(tracing_subscriber::fmt::layer().json())
            .try_init()
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_ansi(settings.ansi))
            .try_init()
    };
    installed.context("installing log subscriber")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_level() {
        assert_eq!(resolve_level("warn", 0, false, false), LevelFilter::Warn);
        assert_eq!(resolve_level("not-a-level", 0, false, false), LevelFilter::Info);
        assert_eq!(resolve_level("warn", 1, false, false), LevelFilter::Debug);
        assert_eq!(resolve_level("warn", 0, true, false), LevelFilter::Debug);
        assert_eq!(resolve_level("warn", 3, false, false), LevelFilter::Trace);
        assert_eq!(resolve_level("error", 0, true, true), LevelFilter::Trace);
    }

    #[test]
    fn test_default_directives() {
        assert_eq!(
            default_directives(LevelFilter::Debug),
            "parley=debug,tower_http=debug"
        );
    }

    // The only test in this crate that touches the global subscriber.
    #[test]
    fn test_init_routes_log_macros_into_tracing() {
        let settings = LogSettings {
            level: LevelFilter::Debug,
            json: false,
            ansi: false,
        };
        init(settings).unwrap();

        let metadata = log::MetadataBuilder::new()
            .level(log::Level::Debug)
            .target("parley::cli")
            .build();
        assert!(log::logger().enabled(&metadata));

        // A second install is reported instead of silently ignored.
        assert!(init(settings).is_err());
    }
}
