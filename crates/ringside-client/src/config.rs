//! Client configuration.

use std::str::FromStr;
use std::time::Duration;

use crate::ClientError;

/// Timing and addressing for a client.
///
/// `Default` gives the tuned values; [`ClientConfig::from_env`] overrides
/// them from `RINGSIDE_*` variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Coordinator address, `host:port`.
    pub server_addr: String,
    /// Liveness listener address, `host:port`.
    pub liveness_addr: String,
    /// Deadline for every single request.
    pub request_timeout: Duration,
    /// How often a ready player asks whether the opponent is ready.
    pub ready_poll_interval: Duration,
    /// Push/pull cadence once both players are ready (50 ms = 20 Hz).
    pub sync_interval: Duration,
    /// How often the liveness prober measures the round trip.
    pub probe_interval: Duration,
    /// Consecutive failed cycles before the loop reports `Disconnected`.
    pub max_consecutive_failures: u32,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_addr: "127.0.0.1:7700".into(),
            liveness_addr: "127.0.0.1:7701".into(),
            request_timeout: Duration::from_secs(2),
            ready_poll_interval: Duration::from_secs(1),
            sync_interval: Duration::from_millis(50),
            probe_interval: Duration::from_secs(2),
            max_consecutive_failures: 20,
        }
    }
}

impl ClientConfig {
    /// Reads overrides from the process environment.
    ///
    /// | Variable | Field |
    /// |---|---|
    /// | `RINGSIDE_SERVER` | `server_addr` |
    /// | `RINGSIDE_LIVENESS_SERVER` | `liveness_addr` |
    /// | `RINGSIDE_SYNC_INTERVAL_MS` | `sync_interval` |
    /// | `RINGSIDE_REQUEST_TIMEOUT_MS` | `request_timeout` |
    pub fn from_env() -> Result<Self, ClientError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Like [`from_env`](Self::from_env), reading variables through
    /// `lookup` instead.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ClientError> {
        let mut config = Self::default();
        if let Some(addr) = lookup("RINGSIDE_SERVER") {
            config.server_addr = addr;
        }
        if let Some(addr) = lookup("RINGSIDE_LIVENESS_SERVER") {
            config.liveness_addr = addr;
        }
        if let Some(ms) = parse::<u64>(&lookup, "RINGSIDE_SYNC_INTERVAL_MS")? {
            config.sync_interval = Duration::from_millis(ms.max(1));
        }
        if let Some(ms) = parse::<u64>(&lookup, "RINGSIDE_REQUEST_TIMEOUT_MS")? {
            config.request_timeout = Duration::from_millis(ms.max(1));
        }
        Ok(config)
    }
}

fn parse<T>(lookup: &impl Fn(&str) -> Option<String>, var: &'static str) -> Result<Option<T>, ClientError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    lookup(var)
        .map(|value| {
            value.trim().parse().map_err(|e: T::Err| ClientError::InvalidConfig {
                var,
                reason: e.to_string(),
                value,
            })
        })
        .transpose()
}
