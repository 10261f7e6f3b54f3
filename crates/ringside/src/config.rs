//! Server configuration.

use std::str::FromStr;
use std::time::Duration;

use ringside_room::RegistryConfig;
use ringside_transport::TransportLimits;

/// A `RINGSIDE_*` variable that could not be parsed.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid {var}={value:?}: {reason}")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },
}

/// Everything the coordinator binary needs to start.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Interface all listeners bind to.
    pub host: String,
    /// Coordinator port.
    pub port: u16,
    /// Liveness (`PING`/`PONG`) port.
    pub liveness_port: u16,
    /// Stats port; `None` leaves the stats listener off.
    pub stats_port: Option<u16>,
    /// Deadline for reading a request and for writing its response.
    pub io_timeout: Duration,
    /// How often the reaper sweeps for idle rooms.
    pub reap_interval: Duration,
    /// Payload size bound.
    pub limits: TransportLimits,
    /// Registry tunables, including the idle threshold.
    pub registry: RegistryConfig,
    /// Default log filter when `RUST_LOG` is unset.
    pub log_level: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".into(),
            port: 7700,
            liveness_port: 7701,
            stats_port: None,
            io_timeout: Duration::from_secs(5),
            reap_interval: Duration::from_secs(30),
            limits: TransportLimits::default(),
            registry: RegistryConfig::default(),
            log_level: "info".into(),
        }
    }
}

impl ServerConfig {
    /// Reads overrides from the process environment.
    ///
    /// | Variable | Field |
    /// |---|---|
    /// | `RINGSIDE_HOST` | `host` |
    /// | `RINGSIDE_PORT` | `port` |
    /// | `RINGSIDE_LIVENESS_PORT` | `liveness_port` |
    /// | `RINGSIDE_STATS_PORT` | `stats_port` |
    /// | `RINGSIDE_IDLE_TIMEOUT_SECS` | `registry.idle_timeout` |
    /// | `RINGSIDE_REAP_INTERVAL_SECS` | `reap_interval` |
    /// | `RINGSIDE_MAX_ROOMS_PER_CALLER` | `registry.max_rooms_per_caller` |
    /// | `RINGSIDE_IO_TIMEOUT_MS` | `io_timeout` |
    /// | `RINGSIDE_LOG` | `log_level` |
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Like [`from_env`](Self::from_env), reading variables through
    /// `lookup` instead.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        if let Some(host) = lookup("RINGSIDE_HOST") {
            config.host = host;
        }
        if let Some(port) = parse(&lookup, "RINGSIDE_PORT")? {
            config.port = port;
        }
        if let Some(port) = parse(&lookup, "RINGSIDE_LIVENESS_PORT")? {
            config.liveness_port = port;
        }
        if let Some(port) = parse(&lookup, "RINGSIDE_STATS_PORT")? {
            config.stats_port = Some(port);
        }
        if let Some(secs) = parse::<u64>(&lookup, "RINGSIDE_IDLE_TIMEOUT_SECS")? {
            config.registry.idle_timeout = Duration::from_secs(secs);
        }
        if let Some(secs) = parse::<u64>(&lookup, "RINGSIDE_REAP_INTERVAL_SECS")? {
            config.reap_interval = Duration::from_secs(secs.max(1));
        }
        if let Some(max) = parse(&lookup, "RINGSIDE_MAX_ROOMS_PER_CALLER")? {
            config.registry.max_rooms_per_caller = max;
        }
        if let Some(ms) = parse::<u64>(&lookup, "RINGSIDE_IO_TIMEOUT_MS")? {
            config.io_timeout = Duration::from_millis(ms.max(1));
        }
        if let Some(level) = lookup("RINGSIDE_LOG") {
            config.log_level = level;
        }
        Ok(config)
    }

    /// `host:port` of the coordinator listener.
    pub fn coordinator_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// `host:port` of the liveness listener.
    pub fn liveness_addr(&self) -> String {
        format!("{}:{}", self.host, self.liveness_port)
    }

    /// `host:port` of the stats listener, if enabled.
    pub fn stats_addr(&self) -> Option<String> {
        self.stats_port.map(|port| format!("{}:{}", self.host, port))
    }
}

fn parse<T>(lookup: &impl Fn(&str) -> Option<String>, var: &'static str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    lookup(var)
        .map(|value| {
            value.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
                var,
                reason: e.to_string(),
                value,
            })
        })
        .transpose()
}
