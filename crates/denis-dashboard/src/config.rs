//! Dashboard configuration.

use std::net::SocketAddr;
use std::time::Duration;

use crate::error::{Error, Result};

/// Border router of the reference DENIS-SDN deployment.
pub const DEFAULT_BORDER_NODE: &str = "00.00";

/// Address the controller pushes topology snapshots to.
pub const DEFAULT_LISTEN_ADDR: &str = "127.0.0.1:8993";

pub const DEFAULT_HTTP_ADDR: &str = "127.0.0.1:3000";

/// CODET refresh time in minutes.
pub const DEFAULT_MONITOR_PERIOD_MIN: u64 = 10;

pub const DEFAULT_MAX_MESSAGE_BYTES: usize = 4 * 1024 * 1024;

/// Configuration for a dashboard instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DashboardConfig {
    /// Identifier of the border node connectivity is checked against
    pub border_node: String,

    /// Snapshot ingestion listen address
    pub listen_addr: SocketAddr,

    /// HTTP/WebSocket API listen address
    pub http_addr: SocketAddr,

    /// Monitor period in whole minutes
    pub monitor_period_minutes: u64,

    /// Upper bound on one inbound snapshot
    pub max_message_bytes: usize,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            border_node: DEFAULT_BORDER_NODE.to_string(),
            listen_addr: SocketAddr::from(([127, 0, 0, 1], 8993)),
            http_addr: SocketAddr::from(([127, 0, 0, 1], 3000)),
            monitor_period_minutes: DEFAULT_MONITOR_PERIOD_MIN,
            max_message_bytes: DEFAULT_MAX_MESSAGE_BYTES,
        }
    }
}

impl DashboardConfig {
    /// Create config from environment variables with sensible defaults.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Create config from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let border_node = lookup("DENIS_BORDER_NODE").unwrap_or_else(|| DEFAULT_BORDER_NODE.to_string());

        let listen_addr = parse_var(&lookup, "DENIS_LISTEN_ADDR", DEFAULT_LISTEN_ADDR)?;
        let http_addr = parse_var(&lookup, "DENIS_HTTP_ADDR", DEFAULT_HTTP_ADDR)?;

        let monitor_period_minutes = match lookup("DENIS_MONITOR_PERIOD_MIN") {
            Some(raw) => parse_value("DENIS_MONITOR_PERIOD_MIN", &raw)?,
            None => DEFAULT_MONITOR_PERIOD_MIN,
        };

        let max_message_bytes = match lookup("DENIS_MAX_MESSAGE_BYTES") {
            Some(raw) => parse_value("DENIS_MAX_MESSAGE_BYTES", &raw)?,
            None => DEFAULT_MAX_MESSAGE_BYTES,
        };

        let config = Self {
            border_node,
            listen_addr,
            http_addr,
            monitor_period_minutes,
            max_message_bytes,
        };
        config.validate()?;
        Ok(config)
    }

    /// Reject configurations the dashboard cannot start with.
    pub fn validate(&self) -> Result<()> {
        if self.border_node.trim().is_empty() {
            return Err(Error::Configuration("border node identifier is empty".into()));
        }
        if self.monitor_period_minutes == 0 {
            return Err(Error::Configuration("monitor period must be at least one minute".into()));
        }
        if self.monitor_period_minutes.checked_mul(60).is_none() {
            return Err(Error::Configuration("monitor period is too long".into()));
        }
        if self.max_message_bytes == 0 {
            return Err(Error::Configuration("max message size must be positive".into()));
        }
        Ok(())
    }

    /// Monitor period as a duration.
    pub fn monitor_period(&self) -> Duration {
        Duration::from_secs(self.monitor_period_minutes.saturating_mul(60))
    }
}

fn parse_var<F, T>(lookup: &F, key: &str, default: &str) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    let raw = lookup(key).unwrap_or_else(|| default.to_string());
    parse_value(key, &raw)
}

fn parse_value<T>(key: &str, raw: &str) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse()
        .map_err(|e| Error::Configuration(format!("invalid {}={:?}: {}", key, raw, e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_without_env() {
        let config = DashboardConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, DashboardConfig::default());
        assert_eq!(config.listen_addr.port(), 8993);
        assert_eq!(config.monitor_period(), Duration::from_secs(600));
    }

    #[test]
    fn overrides_applied() {
        let config = DashboardConfig::from_lookup(lookup(&[
            ("DENIS_BORDER_NODE", "01.00"),
            ("DENIS_LISTEN_ADDR", "0.0.0.0:9000"),
            ("DENIS_MONITOR_PERIOD_MIN", "3"),
        ]))
        .unwrap();
        assert_eq!(config.border_node, "01.00");
        assert_eq!(config.listen_addr.port(), 9000);
        assert_eq!(config.monitor_period_minutes, 3);
    }

    #[test]
    fn zero_period_rejected() {
        let err = DashboardConfig::from_lookup(lookup(&[("DENIS_MONITOR_PERIOD_MIN", "0")])).unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
    }

    #[test]
    fn negative_period_rejected() {
        let err = DashboardConfig::from_lookup(lookup(&[("DENIS_MONITOR_PERIOD_MIN", "-5")])).unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
    }

    #[test]
    fn empty_border_rejected() {
        let err = DashboardConfig::from_lookup(lookup(&[("DENIS_BORDER_NODE", "  ")])).unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
    }

    #[test]
    fn bad_address_rejected() {
        let err = DashboardConfig::from_lookup(lookup(&[("DENIS_LISTEN_ADDR", "localhost")])).unwrap_err();
        assert!(err.to_string().contains("DENIS_LISTEN_ADDR"));
    }
}
