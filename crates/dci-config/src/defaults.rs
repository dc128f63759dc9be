use crate::LogFormat;

/// Port the Doremi DCP-2000 control service listens on.
pub const DEFAULT_DEVICE_PORT: u16 = 11730;

/// Default log filter expression. The CLI stays quiet unless asked.
pub const DEFAULT_LOG_FILTER: &str = "warn";

/// Default bound for opening a device session, in milliseconds.
pub const DEFAULT_CONNECT_TIMEOUT_MS: u64 = 5_000;

/// Default bound for each socket read or write, in milliseconds.
pub const DEFAULT_IO_TIMEOUT_MS: u64 = 10_000;

/// Default output format name.
pub const DEFAULT_OUTPUT_FORMAT: &str = "text";

/// Standard SNMP agent port.
pub const DEFAULT_SNMP_PORT: u16 = 161;

/// Default SNMP read community.
pub const DEFAULT_SNMP_COMMUNITY: &str = "public";

/// Default bound for one SNMP request, in milliseconds.
pub const DEFAULT_SNMP_TIMEOUT_MS: u64 = 2_000;

/// Default log filter expression used by the binary.
#[must_use]
pub const fn default_log_filter() -> &'static str {
    DEFAULT_LOG_FILTER
}

/// Owned log filter value used where allocation is required (e.g. serde).
#[must_use]
pub fn default_log_filter_string() -> String {
    DEFAULT_LOG_FILTER.to_owned()
}

/// Default logging format for the binary.
#[must_use]
pub const fn default_log_format() -> LogFormat {
    LogFormat::Compact
}

/// Default device port (serde helper).
#[must_use]
pub const fn default_device_port() -> u16 {
    DEFAULT_DEVICE_PORT
}

/// Default connect timeout (serde helper).
#[must_use]
pub const fn default_connect_timeout_ms() -> u64 {
    DEFAULT_CONNECT_TIMEOUT_MS
}

/// Default socket timeout (serde helper).
#[must_use]
pub const fn default_io_timeout_ms() -> u64 {
    DEFAULT_IO_TIMEOUT_MS
}

/// Default output format (serde helper).
#[must_use]
pub fn default_output_format() -> String {
    DEFAULT_OUTPUT_FORMAT.to_owned()
}

/// Default SNMP port (serde helper).
#[must_use]
pub const fn default_snmp_port() -> u16 {
    DEFAULT_SNMP_PORT
}

/// Default SNMP community (serde helper).
#[must_use]
pub fn default_snmp_community() -> String {
    DEFAULT_SNMP_COMMUNITY.to_owned()
}

/// Default SNMP timeout (serde helper).
#[must_use]
pub const fn default_snmp_timeout_ms() -> u64 {
    DEFAULT_SNMP_TIMEOUT_MS
}
