// src/logging.rs

//! Logging setup for `wesqueue` using `tracing` + `tracing-subscriber`.
//!
//! Priority for determining the filter:
//! 1. `--log-level` CLI flag (if provided)
//! 2. `WESQUEUE_LOG` environment variable: either a bare level ("debug")
//!    or full filter directives ("wesqueue=debug,reqwest=trace")
//! 3. default to `info`
//!
//! A bare level applies to `wesqueue` itself. The HTTP stack stays at `warn`
//! unless the level is `trace`, so per-request connection chatter does not
//! drown out run updates.
//!
//! Logs are sent to STDERR so that stdout carries only command output
//! (status listings, the monitor table).

use anyhow::{Context, Result};
use tracing::Level;
use tracing_subscriber::{EnvFilter, fmt};

use crate::cli::LogLevel;

pub const LOG_ENV: &str = "WESQUEUE_LOG";

/// Crates whose logs are capped below `trace`.
const HTTP_CRATES: [&str; 5] = ["reqwest", "hyper", "hyper_util", "h2", "rustls"];

/// Initialise global logging subscriber.
///
/// Safe to call once at startup.
pub fn init_logging(cli_level: Option<LogLevel>) -> Result<()> {
    let directives = match cli_level {
        Some(lvl) => default_directives(level_from_log_level(lvl)),
        None => std::env::var(LOG_ENV)
            .ok()
            .map(|s| env_directives(&s))
            .unwrap_or_else(|| default_directives(Level::INFO)),
    };
    let filter = EnvFilter::try_new(&directives)
        .with_context(|| format!("invalid {LOG_ENV} filter: {directives}"))?;

    // Send logs to stderr; keep stdout free for the monitor table.
    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_writer(std::io::stderr)
        .init();

    Ok(())
}

/// Filter directives for a single level.
pub fn default_directives(level: Level) -> String {
    let level_str = level.as_str().to_lowercase();
    let mut directives = vec![level_str.clone()];
    if level != Level::TRACE {
        let http_level = if level < Level::WARN { level_str } else { "warn".to_string() };
        directives.extend(HTTP_CRATES.iter().map(|c| format!("{c}={http_level}")));
    }
    directives.join(",")
}

/// Directives for a `WESQUEUE_LOG` value: a bare level expands to the
/// defaults, anything else is taken as filter directives.
pub fn env_directives(value: &str) -> String {
    match parse_level_str(value) {
        Some(level) => default_directives(level),
        None => value.trim().to_string(),
    }
}

fn level_from_log_level(lvl: LogLevel) -> Level {
    match lvl {
        LogLevel::Error => Level::ERROR,
        LogLevel::Warn => Level::WARN,
        LogLevel::Info => Level::INFO,
        LogLevel::Debug => Level::DEBUG,
        LogLevel::Trace => Level::TRACE,
    }
}

fn parse_level_str(s: &str) -> Option<Level> {
    match s.trim().to_lowercase().as_str() {
        "error" => Some(Level::ERROR),
        "warn" | "warning" => Some(Level::WARN),
        "info" => Some(Level::INFO),
        "debug" => Some(Level::DEBUG),
        "trace" => Some(Level::TRACE),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_level_caps_http_crates_at_warn() {
        assert_eq!(
            default_directives(Level::INFO),
            "info,reqwest=warn,hyper=warn,hyper_util=warn,h2=warn,rustls=warn"
        );
        assert_eq!(
            default_directives(Level::ERROR),
            "error,reqwest=error,hyper=error,hyper_util=error,h2=error,rustls=error"
        );
        assert_eq!(default_directives(Level::TRACE), "trace");
    }

    #[test]
    fn env_value_is_a_level_or_directives() {
        assert_eq!(env_directives(" Debug "), default_directives(Level::DEBUG));
        assert_eq!(env_directives("warning"), default_directives(Level::WARN));
        assert_eq!(
            env_directives(" wesqueue=debug,reqwest=trace "),
            "wesqueue=debug,reqwest=trace"
        );
        for value in [default_directives(Level::DEBUG), env_directives("wesqueue=trace")] {
            assert!(EnvFilter::try_new(&value).is_ok(), "{value}");
        }
    }
}
