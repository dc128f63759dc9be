//! Shared configuration for the `dcictl` device-control client.
//!
//! Configuration is layered by `ortho_config`: built-in defaults, then an
//! optional configuration file, then `DCICTL_*` environment variables, then
//! command-line flags. Per-invocation flags such as `--port` and `--format`
//! are applied later by the CLI and never persisted.

mod defaults;
mod endpoint;

use std::time::Duration;

use ortho_config::OrthoConfig;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

pub use defaults::{
    DEFAULT_CONNECT_TIMEOUT_MS, DEFAULT_DEVICE_PORT, DEFAULT_IO_TIMEOUT_MS, DEFAULT_LOG_FILTER,
    DEFAULT_OUTPUT_FORMAT, DEFAULT_SNMP_COMMUNITY, DEFAULT_SNMP_PORT, DEFAULT_SNMP_TIMEOUT_MS,
    default_connect_timeout_ms, default_device_port, default_io_timeout_ms, default_log_filter,
    default_log_filter_string, default_log_format, default_output_format,
    default_snmp_community, default_snmp_port, default_snmp_timeout_ms,
};
pub use endpoint::DeviceEndpoint;

/// Supported logging output formats.
#[derive(
    Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq, EnumString, Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum LogFormat {
    /// Human-readable single line output on stderr.
    #[default]
    Compact,
    /// Structured JSON suitable for ingestion by logging stacks.
    Json,
}

/// Errors encountered while parsing a [`LogFormat`] from text.
pub type LogFormatParseError = strum::ParseError;

/// Resolved configuration for the CLI.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, OrthoConfig)]
#[ortho_config(prefix = "DCICTL")]
pub struct Config {
    /// `tracing` filter expression applied to stderr logging.
    #[serde(default = "default_log_filter_string")]
    #[ortho_config(default = default_log_filter_string())]
    pub log_filter: String,
    /// Log line format.
    #[serde(default = "default_log_format")]
    #[ortho_config(default = default_log_format())]
    pub log_format: LogFormat,
    /// Port used when an invocation does not pass `--port`.
    #[serde(default = "default_device_port")]
    #[ortho_config(default = DEFAULT_DEVICE_PORT)]
    pub device_port: u16,
    /// Upper bound for establishing a device session.
    #[serde(default = "default_connect_timeout_ms")]
    #[ortho_config(default = DEFAULT_CONNECT_TIMEOUT_MS)]
    pub connect_timeout_ms: u64,
    /// Upper bound for each socket read or write during a round trip.
    #[serde(default = "default_io_timeout_ms")]
    #[ortho_config(default = DEFAULT_IO_TIMEOUT_MS)]
    pub io_timeout_ms: u64,
    /// Output format used when an invocation does not pass `--format`.
    #[serde(default = "default_output_format")]
    #[ortho_config(default = default_output_format())]
    pub output_format: String,
    /// UDP port of the device's SNMP agent.
    #[serde(default = "default_snmp_port")]
    #[ortho_config(default = DEFAULT_SNMP_PORT)]
    pub snmp_port: u16,
    /// SNMP community string.
    #[serde(default = "default_snmp_community")]
    #[ortho_config(default = default_snmp_community())]
    pub snmp_community: String,
    /// Upper bound for a single SNMP request.
    #[serde(default = "default_snmp_timeout_ms")]
    #[ortho_config(default = DEFAULT_SNMP_TIMEOUT_MS)]
    pub snmp_timeout_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_filter: default_log_filter_string(),
            log_format: default_log_format(),
            device_port: DEFAULT_DEVICE_PORT,
            connect_timeout_ms: DEFAULT_CONNECT_TIMEOUT_MS,
            io_timeout_ms: DEFAULT_IO_TIMEOUT_MS,
            output_format: default_output_format(),
            snmp_port: DEFAULT_SNMP_PORT,
            snmp_community: default_snmp_community(),
            snmp_timeout_ms: DEFAULT_SNMP_TIMEOUT_MS,
        }
    }
}

impl Config {
    /// Filter expression for the telemetry subscriber.
    #[must_use]
    pub fn log_filter(&self) -> &str {
        &self.log_filter
    }

    /// Log line format for the telemetry subscriber.
    #[must_use]
    pub const fn log_format(&self) -> LogFormat {
        self.log_format
    }

    /// Default device port.
    #[must_use]
    pub const fn device_port(&self) -> u16 {
        self.device_port
    }

    /// Connect timeout as a [`Duration`].
    #[must_use]
    pub const fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    /// Per-operation socket timeout as a [`Duration`].
    #[must_use]
    pub const fn io_timeout(&self) -> Duration {
        Duration::from_millis(self.io_timeout_ms)
    }

    /// Configured output format name. Validation happens in the renderer.
    #[must_use]
    pub fn output_format(&self) -> &str {
        &self.output_format
    }

    /// SNMP agent port.
    #[must_use]
    pub const fn snmp_port(&self) -> u16 {
        self.snmp_port
    }

    /// SNMP community string.
    #[must_use]
    pub fn snmp_community(&self) -> &str {
        &self.snmp_community
    }

    /// SNMP request timeout as a [`Duration`].
    #[must_use]
    pub const fn snmp_timeout(&self) -> Duration {
        Duration::from_millis(self.snmp_timeout_ms)
    }

    /// Builds the device endpoint for `address`, preferring `port` when given.
    #[must_use]
    pub fn endpoint_for(&self, address: &str, port: Option<u16>) -> DeviceEndpoint {
        DeviceEndpoint::new(address, port.unwrap_or(self.device_port))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn defaults_match_documented_values() {
        let config = Config::default();
        assert_eq!(config.log_filter(), "warn");
        assert_eq!(config.log_format(), LogFormat::Compact);
        assert_eq!(config.device_port(), 11730);
        assert_eq!(config.connect_timeout(), Duration::from_secs(5));
        assert_eq!(config.io_timeout(), Duration::from_secs(10));
        assert_eq!(config.output_format(), "text");
        assert_eq!(config.snmp_port(), 161);
        assert_eq!(config.snmp_community(), "public");
    }

    #[rstest]
    #[case::configured_port(None, 11730)]
    #[case::explicit_port(Some(9000), 9000)]
    fn endpoint_prefers_explicit_port(#[case] port: Option<u16>, #[case] expected: u16) {
        let endpoint = Config::default().endpoint_for("10.0.0.5", port);
        assert_eq!(endpoint.host(), "10.0.0.5");
        assert_eq!(endpoint.port(), expected);
    }

    #[rstest]
    #[case("json", LogFormat::Json)]
    #[case("COMPACT", LogFormat::Compact)]
    fn parses_log_format_case_insensitively(#[case] input: &str, #[case] expected: LogFormat) {
        let parsed: LogFormat = input.parse().expect("parse log format");
        assert_eq!(parsed, expected);
    }
}
