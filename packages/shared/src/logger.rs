//! Logging setup utilities for the Roomcast binaries.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Output format of the log lines
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human readable, colored output
    #[default]
    Pretty,
    /// One JSON object per line
    Json,
}

impl LogFormat {
    /// Parse a format name (`pretty` or `json`), falling back to `Pretty`.
    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "json" => Self::Json,
            _ => Self::Pretty,
        }
    }
}

/// Build the default filter directive for the given crate targets.
///
/// `build_default_filter(&["roomcast_server", "server"], "debug")` returns
/// `"roomcast_server=debug,server=debug"`.
pub fn build_default_filter(targets: &[&str], default_log_level: &str) -> String {
    targets
        .iter()
        .map(|target| format!("{}={}", target.replace('-', "_"), default_log_level))
        .collect::<Vec<_>>()
        .join(",")
}

/// Initialize the tracing subscriber with the specified default log level.
///
/// The log level can be overridden using the `RUST_LOG` environment variable.
///
/// # Arguments
///
/// * `targets` - The crate / binary targets to enable (e.g., `["roomcast_server", "roomcast_server_bin"]`)
/// * `default_log_level` - The default log level (e.g., "debug", "info", "warn", "error")
/// * `format` - Pretty or JSON output
///
/// # Examples
///
/// ```no_run
/// use roomcast_shared::logger::{LogFormat, setup_logger};
///
/// setup_logger(&["roomcast_server", "tower_http"], "debug", LogFormat::Pretty);
/// ```
pub fn setup_logger(targets: &[&str], default_log_level: &str, format: LogFormat) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| build_default_filter(targets, default_log_level).into());

    let registry = tracing_subscriber::registry().with(filter);
    match format {
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).init(),
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json())
            .init(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_default_filter_joins_targets() {
        // テスト項目: 複数のターゲットがカンマ区切りのディレクティブになる
        // given (前提条件):
        let targets = ["roomcast-server", "tower_http"];

        // when (操作):
        let filter = build_default_filter(&targets, "debug");

        // then (期待する結果):
        assert_eq!(filter, "roomcast_server=debug,tower_http=debug");
    }

    #[test]
    fn test_log_format_parse() {
        // テスト項目: 不明な値は Pretty にフォールバックする
        // given (前提条件):

        // when (操作):
        let json = LogFormat::parse("JSON");
        let pretty = LogFormat::parse("pretty");
        let unknown = LogFormat::parse("xml");

        // then (期待する結果):
        assert_eq!(json, LogFormat::Json);
        assert_eq!(pretty, LogFormat::Pretty);
        assert_eq!(unknown, LogFormat::Pretty);
    }
}
