//! Client configuration from environment variables.

use std::time::Duration;

use url::Url;

use crate::error::ClientError;
use crate::ws::ReconnectConfig;

/// Default endpoint of the chat server's real-time gateway.
pub const DEFAULT_ENDPOINT: &str = "ws://localhost:5555/ws";

/// How long a local typing pulse stays armed without renewal.
pub const DEFAULT_TYPING_TIMEOUT: Duration = Duration::from_millis(3000);

/// Process-wide settings for the real-time core.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Gateway URL; the credential is appended as the `token` query parameter.
    pub endpoint: Url,
    pub reconnect: ReconnectConfig,
    pub typing_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            endpoint: Url::parse(DEFAULT_ENDPOINT).expect("default endpoint is a valid URL"),
            reconnect: ReconnectConfig::default(),
            typing_timeout: DEFAULT_TYPING_TIMEOUT,
        }
    }
}

impl ClientConfig {
    pub fn new(endpoint: &str) -> Result<Self, ClientError> {
        Ok(Self {
            endpoint: Url::parse(endpoint)?,
            ..Self::default()
        })
    }

    /// Parse configuration from environment variables.
    ///
    /// Environment variables:
    /// - `PARLEY_WS_URL`: gateway URL (default: `ws://localhost:5555/ws`)
    /// - `PARLEY_RECONNECT_DELAY_MS`: first backoff delay (default: 1000)
    /// - `PARLEY_RECONNECT_DELAY_MAX_MS`: backoff cap (default: 5000)
    /// - `PARLEY_RECONNECT_ATTEMPTS`: attempts before giving up (default: 10)
    /// - `PARLEY_TYPING_TIMEOUT_MS`: typing pulse window (default: 3000)
    pub fn from_env() -> Result<Self, ClientError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`ClientConfig::from_env`], reading values through `lookup`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ClientError> {
        let mut config = Self::default();

        if let Some(endpoint) = lookup("PARLEY_WS_URL") {
            config.endpoint = Url::parse(&endpoint).map_err(|e| ClientError::Config {
                key: "PARLEY_WS_URL",
                value: endpoint.clone(),
                reason: e.to_string(),
            })?;
        }
        if let Some(ms) = parse_u64(&lookup, "PARLEY_RECONNECT_DELAY_MS")? {
            config.reconnect.initial_delay = Duration::from_millis(ms);
        }
        if let Some(ms) = parse_u64(&lookup, "PARLEY_RECONNECT_DELAY_MAX_MS")? {
            config.reconnect.max_delay = Duration::from_millis(ms);
        }
        if let Some(attempts) = parse_u64(&lookup, "PARLEY_RECONNECT_ATTEMPTS")? {
            config.reconnect.max_attempts =
                u32::try_from(attempts).map_err(|e| ClientError::Config {
                    key: "PARLEY_RECONNECT_ATTEMPTS",
                    value: attempts.to_string(),
                    reason: e.to_string(),
                })?;
        }
        if let Some(ms) = parse_u64(&lookup, "PARLEY_TYPING_TIMEOUT_MS")? {
            config.typing_timeout = Duration::from_millis(ms);
        }

        Ok(config)
    }
}

fn parse_u64(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
) -> Result<Option<u64>, ClientError> {
    let Some(raw) = lookup(key) else {
        return Ok(None);
    };
    raw.trim()
        .parse::<u64>()
        .map(Some)
        .map_err(|e| ClientError::Config {
            key,
            value: raw.clone(),
            reason: e.to_string(),
        })
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
    fn empty_environment_yields_defaults() {
        let config = ClientConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.endpoint.as_str(), DEFAULT_ENDPOINT);
        assert_eq!(config.typing_timeout, Duration::from_secs(3));
        assert_eq!(config.reconnect.max_attempts, 10);
        assert_eq!(config.reconnect.initial_delay, Duration::from_secs(1));
        assert_eq!(config.reconnect.max_delay, Duration::from_secs(5));
    }

    #[test]
    fn overrides_are_applied() {
        let config = ClientConfig::from_lookup(lookup(&[
            ("PARLEY_WS_URL", "wss://chat.example.com/ws"),
            ("PARLEY_RECONNECT_ATTEMPTS", "3"),
            ("PARLEY_RECONNECT_DELAY_MS", " 250 "),
            ("PARLEY_TYPING_TIMEOUT_MS", "1500"),
        ]))
        .unwrap();
        assert_eq!(config.endpoint.host_str(), Some("chat.example.com"));
        assert_eq!(config.reconnect.max_attempts, 3);
        assert_eq!(config.reconnect.initial_delay, Duration::from_millis(250));
        assert_eq!(config.typing_timeout, Duration::from_millis(1500));
    }

    #[test]
    fn unparsable_value_names_the_key() {
        let err = ClientConfig::from_lookup(lookup(&[("PARLEY_RECONNECT_ATTEMPTS", "lots")]))
            .unwrap_err();
        match err {
            ClientError::Config { key, value, .. } => {
                assert_eq!(key, "PARLEY_RECONNECT_ATTEMPTS");
                assert_eq!(value, "lots");
            }
            other => panic!("unexpected error {other:?}"),
        }
    }
}
