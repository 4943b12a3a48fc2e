//! Server configuration and environment parsing.

use std::time::Duration;

/// Port used when `PORT` is unset.
pub const DEFAULT_PORT: u16 = 3001;

/// Host used when `HOST` is unset.
pub const DEFAULT_HOST: &str = "0.0.0.0";

/// Settings for one server instance.
///
/// Start from [`ServerConfig::default()`] or [`ServerConfig::from_env()`]
/// and override fields as needed, or set them through
/// [`UtttServerBuilder`](crate::UtttServerBuilder).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Address the WebSocket listener binds to, as `host:port`.
    pub bind_addr: String,

    /// When set, a connection that sends nothing for this long is closed.
    ///
    /// Any inbound frame counts, WebSocket pings and pongs included, and
    /// the server pings twice per period so listening clients answer.
    /// Default: `None`, connections live as long as the socket.
    pub idle_timeout: Option<Duration>,

    /// When set, WebSocket upgrades from browsers on any other origin are
    /// refused with 403.
    pub allowed_origin: Option<String>,

    /// Capacity of the lobby's command queue. Default: 256.
    pub lobby_channel_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: format!("{DEFAULT_HOST}:{DEFAULT_PORT}"),
            idle_timeout: None,
            allowed_origin: None,
            lobby_channel_size: 256,
        }
    }
}

impl ServerConfig {
    /// Reads the configuration from process environment variables.
    ///
    /// | Variable | Meaning | Default |
    /// |---|---|---|
    /// | `PORT` | listening port | `3001` |
    /// | `HOST` | listening address | `0.0.0.0` |
    /// | `CLIENT_ORIGIN` | allowed browser origin | any |
    /// | `UTTT_IDLE_TIMEOUT_SECS` | idle connection timeout | off |
    ///
    /// # Errors
    /// Returns [`ConfigError::Invalid`] if a variable is set but malformed.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) but reads variables through
    /// `lookup`, so callers can supply them from anywhere.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        let port = match non_empty(lookup("PORT")) {
            Some(raw) => raw.parse::<u16>().map_err(|_| ConfigError::Invalid {
                key: "PORT",
                value: raw.clone(),
                reason: "expected a port number between 0 and 65535".into(),
            })?,
            None => DEFAULT_PORT,
        };
        let host = non_empty(lookup("HOST")).unwrap_or_else(|| DEFAULT_HOST.to_string());
        config.bind_addr = join_host_port(&host, port);

        config.allowed_origin = non_empty(lookup("CLIENT_ORIGIN"));

        if let Some(raw) = non_empty(lookup("UTTT_IDLE_TIMEOUT_SECS")) {
            let secs = raw
                .parse::<u64>()
                .ok()
                .filter(|secs| *secs > 0)
                .ok_or_else(|| ConfigError::Invalid {
                    key: "UTTT_IDLE_TIMEOUT_SECS",
                    value: raw.clone(),
                    reason: "expected a positive number of seconds".into(),
                })?;
            config.idle_timeout = Some(Duration::from_secs(secs));
        }

        Ok(config)
    }
}

/// Errors raised while reading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A variable is set but cannot be used.
    #[error("invalid value {value:?} for {key}: {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// `host:port`, bracketing bare IPv6 hosts.
fn join_host_port(host: &str, port: u16) -> String {
    if host.contains(':') && !host.starts_with('[') {
        format!("[{host}]:{port}")
    } else {
        format!("{host}:{port}")
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_from_lookup_defaults() {
        let config = ServerConfig::from_lookup(lookup_from(&[])).unwrap();
        assert_eq!(config, ServerConfig::default());
        assert_eq!(config.bind_addr, "0.0.0.0:3001");
        assert_eq!(config.idle_timeout, None);
        assert_eq!(config.allowed_origin, None);
    }

    #[test]
    fn test_from_lookup_reads_every_variable() {
        let config = ServerConfig::from_lookup(lookup_from(&[
            ("PORT", "8080"),
            ("HOST", "127.0.0.1"),
            ("CLIENT_ORIGIN", "http://localhost:3000"),
            ("UTTT_IDLE_TIMEOUT_SECS", "15"),
        ]))
        .unwrap();

        assert_eq!(config.bind_addr, "127.0.0.1:8080");
        assert_eq!(config.allowed_origin.as_deref(), Some("http://localhost:3000"));
        assert_eq!(config.idle_timeout, Some(Duration::from_secs(15)));
    }

    #[test]
    fn test_from_lookup_brackets_ipv6_host() {
        let config =
            ServerConfig::from_lookup(lookup_from(&[("HOST", "::1"), ("PORT", "9000")])).unwrap();
        assert_eq!(config.bind_addr, "[::1]:9000");
    }

    #[test]
    fn test_from_lookup_empty_values_use_defaults() {
        let config =
            ServerConfig::from_lookup(lookup_from(&[("PORT", ""), ("CLIENT_ORIGIN", "  ")]))
                .unwrap();
        assert_eq!(config.bind_addr, "0.0.0.0:3001");
        assert_eq!(config.allowed_origin, None);
    }

    #[test]
    fn test_from_lookup_rejects_bad_port() {
        for raw in ["abc", "-1", "70000"] {
            let err = ServerConfig::from_lookup(lookup_from(&[("PORT", raw)])).unwrap_err();
            assert!(
                matches!(err, ConfigError::Invalid { key: "PORT", .. }),
                "{raw}: {err}"
            );
        }
    }

    #[test]
    fn test_from_lookup_empty_idle_timeout_stays_off() {
        let config =
            ServerConfig::from_lookup(lookup_from(&[("UTTT_IDLE_TIMEOUT_SECS", " ")])).unwrap();
        assert_eq!(config.idle_timeout, None);
    }

    #[test]
    fn test_from_lookup_rejects_bad_idle_timeout() {
        for raw in ["0", "soon", "1.5"] {
            let err = ServerConfig::from_lookup(lookup_from(&[("UTTT_IDLE_TIMEOUT_SECS", raw)]))
                .unwrap_err();
            assert!(matches!(
                err,
                ConfigError::Invalid {
                    key: "UTTT_IDLE_TIMEOUT_SECS",
                    ..
                }
            ));
        }
    }
}
