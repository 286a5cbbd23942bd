//! Tracing subscriber setup
//!
//! Tracing starts before configuration is loaded so config warnings are not
//! lost. The filter sits behind a reload layer; once the config file is read
//! its `logging.level` replaces the bootstrap level. `RUST_LOG` takes
//! precedence over both.

use crate::{Error, Result};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, reload, EnvFilter, Registry};

/// Handle to adjust the installed filter
pub struct LogHandle {
    handle: reload::Handle<EnvFilter, Registry>,
    from_env: bool,
}

impl LogHandle {
    /// Switch to `level` unless `RUST_LOG` pinned the filter
    pub fn set_level(&self, level: &str) -> Result<()> {
        if self.from_env {
            return Ok(());
        }
        let filter = parse_level(level)?;
        self.handle
            .reload(filter)
            .map_err(|e| Error::Internal(format!("Failed to update log filter: {}", e)))
    }
}

fn parse_level(level: &str) -> Result<EnvFilter> {
    EnvFilter::try_new(level).map_err(|e| Error::Config(format!("Invalid log level '{}': {}", level, e)))
}

/// Install the global fmt subscriber with `bootstrap_level` as the initial filter
pub fn init_tracing(bootstrap_level: &str) -> Result<LogHandle> {
    let (filter, from_env) = match EnvFilter::try_from_default_env() {
        Ok(filter) => (filter, true),
        Err(_) => (parse_level(bootstrap_level)?, false),
    };
    let (filter, handle) = reload::Layer::new(filter);

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .try_init()
        .map_err(|e| Error::Internal(format!("Tracing already initialized: {}", e)))?;

    Ok(LogHandle { handle, from_env })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_level_rejects_garbage() {
        assert!(parse_level("info").is_ok());
        assert!(parse_level("persona_analyzer=debug,warn").is_ok());
        assert!(matches!(parse_level("persona=loud"), Err(Error::Config(_))));
    }

    // The only test in this binary that installs the global subscriber
    #[test]
    fn test_level_switches_after_bootstrap() {
        std::env::remove_var("RUST_LOG");

        let handle = init_tracing("warn").unwrap();
        assert!(tracing::enabled!(tracing::Level::WARN));
        assert!(!tracing::enabled!(tracing::Level::INFO));

        handle.set_level("debug").unwrap();
        assert!(tracing::enabled!(tracing::Level::DEBUG));

        assert!(handle.set_level("persona=loud").is_err());
        assert!(init_tracing("info").is_err());
    }
}
