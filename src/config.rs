use std::env;

use anyhow::{anyhow, ensure, Result};

const DEFAULT_ENDPOINT: &str = "127.0.0.1:6996";
const DEFAULT_TIMEOUT_MS: u64 = 5_000;
const DEFAULT_MAX_BODY_BYTES: usize = 64 * 1024;
const DEFAULT_BUFFER_INITIAL_BYTES: usize = 64 * 1024;
const DEFAULT_BUFFER_MAX_BYTES: usize = 500 * 1024;

/// Immutable gate configuration. Read once at startup (or constructed
/// programmatically) and never mutated afterwards; every check sees the same
/// values.
#[derive(Debug, Clone)]
pub struct GateConfig {
    /// Master switch; a disabled gate allows everything without I/O.
    pub enabled: bool,
    /// Decision service endpoint as `host:port`.
    pub endpoint: String,
    /// Budget for one whole exchange (connect + write + read), milliseconds.
    pub timeout_ms: u64,
    /// Failure policy: allow on pipeline errors when true, answer an internal
    /// error when false.
    pub fail_open: bool,
    /// Emit a warn-level event (and a block-log line, if configured) for
    /// every blocked request.
    pub log_blocked: bool,
    /// Optional JSON-lines file receiving one record per blocked request.
    pub block_log_file: Option<String>,
    /// Size guard for the block log; reaching it rotates to a `.1` backup.
    pub block_log_max_bytes: Option<u64>,
    /// Request bodies above this size are encoded as absent.
    pub max_body_bytes: usize,
    /// Starting size of the response read buffer.
    pub buffer_initial_bytes: usize,
    /// Hard cap for the response read buffer; responses that would exceed it
    /// fail the exchange.
    pub buffer_max_bytes: usize,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            // programmatic construction means the caller wants the gate on;
            // from_env keeps the module off unless AEGIS_ENABLE says so
            enabled: true,
            endpoint: DEFAULT_ENDPOINT.to_string(),
            timeout_ms: DEFAULT_TIMEOUT_MS,
            fail_open: true,
            log_blocked: true,
            block_log_file: None,
            block_log_max_bytes: None,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
            buffer_initial_bytes: DEFAULT_BUFFER_INITIAL_BYTES,
            buffer_max_bytes: DEFAULT_BUFFER_MAX_BYTES,
        }
    }
}

impl GateConfig {
    /// Build the configuration from `AEGIS_*` environment variables, falling
    /// back to the defaults above for anything unset.
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();

        let enabled = parse_bool_env("AEGIS_ENABLE")?.unwrap_or(false);
        let endpoint = env::var("AEGIS_ENDPOINT")
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or(defaults.endpoint);
        let timeout_ms = parse_optional_u64("AEGIS_TIMEOUT_MS")?.unwrap_or(defaults.timeout_ms);
        let fail_open = parse_bool_env("AEGIS_FAIL_OPEN")?.unwrap_or(defaults.fail_open);
        let log_blocked = parse_bool_env("AEGIS_LOG_BLOCKED")?.unwrap_or(defaults.log_blocked);
        let block_log_file = env::var("AEGIS_BLOCK_LOG_FILE")
            .ok()
            .filter(|s| !s.trim().is_empty());
        let block_log_max_bytes = parse_optional_u64("AEGIS_BLOCK_LOG_MAX_BYTES")?;
        let max_body_bytes = parse_optional_u64("AEGIS_MAX_BODY_BYTES")?
            .map(|v| v as usize)
            .unwrap_or(defaults.max_body_bytes);
        let buffer_initial_bytes = parse_optional_u64("AEGIS_BUFFER_INITIAL_BYTES")?
            .map(|v| v as usize)
            .unwrap_or(defaults.buffer_initial_bytes);
        let buffer_max_bytes = parse_optional_u64("AEGIS_BUFFER_MAX_BYTES")?
            .map(|v| v as usize)
            .unwrap_or(defaults.buffer_max_bytes);

        ensure!(timeout_ms > 0, "AEGIS_TIMEOUT_MS must be greater than zero");
        ensure!(
            buffer_max_bytes >= buffer_initial_bytes,
            "AEGIS_BUFFER_MAX_BYTES ({}) must be at least AEGIS_BUFFER_INITIAL_BYTES ({})",
            buffer_max_bytes,
            buffer_initial_bytes
        );

        Ok(Self {
            enabled,
            endpoint,
            timeout_ms,
            fail_open,
            log_blocked,
            block_log_file,
            block_log_max_bytes,
            max_body_bytes,
            buffer_initial_bytes,
            buffer_max_bytes,
        })
    }
}

fn parse_optional_u64(var: &str) -> Result<Option<u64>> {
    match env::var(var) {
        Ok(value) if !value.trim().is_empty() => value
            .trim()
            .parse::<u64>()
            .map(Some)
            .map_err(|_| anyhow!("{} must be a positive integer", var)),
        Ok(_) => Ok(None),
        Err(env::VarError::NotPresent) => Ok(None),
        Err(err) => Err(err.into()),
    }
}

fn parse_bool_env(var: &str) -> Result<Option<bool>> {
    match env::var(var) {
        Ok(value) if !value.trim().is_empty() => parse_bool(&value)
            .map(Some)
            .ok_or_else(|| anyhow!("{} must be a boolean (true/false/1/0)", var)),
        Ok(_) => Ok(None),
        Err(env::VarError::NotPresent) => Ok(None),
        Err(err) => Err(err.into()),
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
