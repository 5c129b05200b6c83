//! Structured logging using the tracing crate
//!
//! ## Environment Variables
//!
//! - `LOG_LEVEL`: ERROR, WARN, INFO, DEBUG, TRACE - defaults to INFO
//! - `LOG_FORMAT`: json, pretty, compact - defaults to json
//! - `LOG_SPANS`: emit span open/close events (true/false) - defaults to false
//! - `RUST_LOG`: replaces the level filter entirely (env_logger syntax)
//!
//! ```bash
//! LOG_FORMAT=pretty LOG_LEVEL=DEBUG ./pallet-worker
//! ```

use std::env;
use tracing::Level;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::util::TryInitError;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Dependencies that are only interesting when something is wrong
const NOISY_TARGETS: &[&str] = &["rumqttc", "hyper", "reqwest", "tokio"];

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Machine-readable JSON lines
    Json,
    Pretty,
    Compact,
}

impl LogFormat {
    /// Unknown values fall back to JSON
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "pretty" => LogFormat::Pretty,
            "compact" => LogFormat::Compact,
            _ => LogFormat::Json,
        }
    }
}

/// Logging settings resolved from the environment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogSettings {
    pub level: Level,
    pub format: LogFormat,
    pub include_spans: bool,
    pub rust_log: Option<String>,
}

impl LogSettings {
    pub fn from_env() -> Self {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Resolve settings through `lookup` instead of the process environment
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        Self {
            level: parse_level(lookup("LOG_LEVEL").as_deref().unwrap_or("INFO")),
            format: LogFormat::parse(lookup("LOG_FORMAT").as_deref().unwrap_or("json")),
            include_spans: lookup("LOG_SPANS")
                .map(|v| v.eq_ignore_ascii_case("true"))
                .unwrap_or(false),
            rust_log: lookup("RUST_LOG").filter(|v| !v.trim().is_empty()),
        }
    }
}

/// Unknown levels fall back to INFO
pub fn parse_level(s: &str) -> Level {
    match s.to_uppercase().as_str() {
        "ERROR" => Level::ERROR,
        "WARN" => Level::WARN,
        "DEBUG" => Level::DEBUG,
        "TRACE" => Level::TRACE,
        _ => Level::INFO,
    }
}

/// Filter directives for `level` with dependency noise capped at WARN
pub fn default_directives(level: Level) -> String {
    let mut directives = level.to_string().to_lowercase();
    for target in NOISY_TARGETS {
        directives.push_str(&format!(",{target}=warn"));
    }
    directives
}

fn build_filter(level: Level, rust_log: Option<&str>) -> EnvFilter {
    match rust_log {
        Some(rust_log) => EnvFilter::new(rust_log),
        None => EnvFilter::new(default_directives(level)),
    }
}

fn span_events(include_spans: bool) -> FmtSpan {
    if include_spans {
        FmtSpan::NEW | FmtSpan::CLOSE
    } else {
        FmtSpan::NONE
    }
}

/// Install the global subscriber
///
/// Fails if a global subscriber is already set.
pub fn init_logging(settings: &LogSettings) -> Result<(), TryInitError> {
    let filter = build_filter(settings.level, settings.rust_log.as_deref());
    let subscriber = tracing_subscriber::registry().with(filter);
    let spans = span_events(settings.include_spans);

    match settings.format {
        LogFormat::Json => subscriber
            .with(fmt::layer().json().with_span_events(spans))
            .try_init(),
        LogFormat::Pretty => subscriber
            .with(fmt::layer().pretty().with_ansi(true).with_span_events(spans))
            .try_init(),
        LogFormat::Compact => subscriber
            .with(
                fmt::layer()
                    .compact()
                    .with_ansi(true)
                    .with_target(false)
                    .with_span_events(spans),
            )
            .try_init(),
    }
}

/// Initialize logging from `LOG_LEVEL`, `LOG_FORMAT`, `LOG_SPANS` and `RUST_LOG`
pub fn init_default_logging() -> Result<(), TryInitError> {
    init_logging(&LogSettings::from_env())
}

/// Span covering one pallet's processing
#[macro_export]
macro_rules! pallet_span {
    ($($field:tt)*) => {
        tracing::info_span!("pallet_processing", $($field)*)
    };
}

/// Span covering a broker operation
#[macro_export]
macro_rules! mqtt_span {
    ($($field:tt)*) => {
        tracing::info_span!("mqtt_operation", $($field)*)
    };
}

pub use {mqtt_span, pallet_span};

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn settings(vars: &[(&str, &str)]) -> LogSettings {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        LogSettings::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn test_log_format_parse() {
        assert_eq!(LogFormat::parse("JSON"), LogFormat::Json);
        assert_eq!(LogFormat::parse("PrEtTy"), LogFormat::Pretty);
        assert_eq!(LogFormat::parse("compact"), LogFormat::Compact);
        assert_eq!(LogFormat::parse("xml"), LogFormat::Json);
        assert_eq!(LogFormat::parse(""), LogFormat::Json);
    }

    #[test]
    fn test_parse_level() {
        let cases = [
            ("ERROR", Level::ERROR),
            ("warn", Level::WARN),
            ("Info", Level::INFO),
            ("DEBUG", Level::DEBUG),
            ("trace", Level::TRACE),
            ("verbose", Level::INFO),
        ];
        for (input, expected) in cases {
            assert_eq!(parse_level(input), expected, "Failed for input: {input}");
        }
    }

    #[test]
    fn test_settings_defaults() {
        let settings = settings(&[]);
        assert_eq!(settings.level, Level::INFO);
        assert_eq!(settings.format, LogFormat::Json);
        assert!(!settings.include_spans);
        assert_eq!(settings.rust_log, None);
    }

    #[test]
    fn test_settings_from_lookup() {
        let settings = settings(&[
            ("LOG_LEVEL", "debug"),
            ("LOG_FORMAT", "compact"),
            ("LOG_SPANS", "TRUE"),
            ("RUST_LOG", "pallet_worker=trace"),
        ]);
        assert_eq!(settings.level, Level::DEBUG);
        assert_eq!(settings.format, LogFormat::Compact);
        assert!(settings.include_spans);
        assert_eq!(settings.rust_log.as_deref(), Some("pallet_worker=trace"));
    }

    #[test]
    fn test_log_spans_only_accepts_true() {
        for value in ["yes", "1", "", "false"] {
            assert!(!settings(&[("LOG_SPANS", value)]).include_spans, "{value}");
        }
    }

    #[test]
    fn test_blank_rust_log_is_ignored() {
        assert_eq!(settings(&[("RUST_LOG", "  ")]).rust_log, None);
    }

    #[test]
    fn test_default_directives_quiet_dependencies() {
        let directives = default_directives(Level::DEBUG);
        assert!(directives.starts_with("debug"));
        for target in ["rumqttc=warn", "hyper=warn", "reqwest=warn", "tokio=warn"] {
            assert!(directives.contains(target), "missing {target}");
        }
    }

    #[test]
    fn test_span_macros_build_spans() {
        let _pallet = pallet_span!(pallet_id = "P1");
        let _mqtt = mqtt_span!(topic = "quality/pallets/new");
    }
}
