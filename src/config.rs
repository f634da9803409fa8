use std::time::Duration;

use anyhow::{Context, Result};

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Config {
    /// Root URL of the greenhouse REST backend, without a trailing slash.
    pub backend_base_url: String,
    /// Bearer token for the session. `None` sends requests unauthenticated.
    pub backend_token: Option<String>,
    /// Gardener whose greenhouse the dashboard is compiled for.
    pub gardener_id: i64,
    pub server_host: String,
    pub server_port: u16,
    /// Dashboard recompilation interval in seconds.
    pub refresh_interval_secs: u64,
    /// Path of the push-notification hub on the backend.
    pub hub_path: String,
    /// Hub method name that carries new notifications.
    pub hub_method: String,
    /// Delay before reopening a dropped hub connection, in seconds.
    pub hub_reconnect_secs: u64,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from an arbitrary key lookup so tests don't touch the
    /// process environment.
    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let required = |key: &str| -> Result<String> {
            lookup(key).with_context(|| format!("missing required env var: {key}"))
        };
        let optional =
            |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_owned());

        Ok(Self {
            backend_base_url: normalize_base_url(&required("BACKEND_BASE_URL")?),
            backend_token: lookup("BACKEND_TOKEN").filter(|t| !t.trim().is_empty()),
            gardener_id: required("GARDENER_ID")?
                .trim()
                .parse()
                .context("GARDENER_ID must be an integer")?,
            server_host: optional("SERVER_HOST", "0.0.0.0"),
            server_port: optional("SERVER_PORT", "8080")
                .parse()
                .context("SERVER_PORT must be a valid port number")?,
            refresh_interval_secs: optional("REFRESH_INTERVAL_SECS", "30")
                .parse()
                .context("REFRESH_INTERVAL_SECS must be a positive integer")?,
            hub_path: optional("NOTIFICATION_HUB_PATH", "/notificationHub"),
            hub_method: optional("NOTIFICATION_HUB_METHOD", "ReceiveNotification"),
            hub_reconnect_secs: optional("HUB_RECONNECT_SECS", "5")
                .parse()
                .context("HUB_RECONNECT_SECS must be a positive integer")?,
        })
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_secs)
    }

    pub fn hub_reconnect_delay(&self) -> Duration {
        Duration::from_secs(self.hub_reconnect_secs)
    }
}

/// Strip trailing slashes so paths can always be appended as `/Resource/...`.
fn normalize_base_url(raw: &str) -> String {
    raw.trim().trim_end_matches('/').to_owned()
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config_from(pairs: &[(&str, &str)]) -> Result<Config> {
        let env: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| env.get(key).cloned())
    }

    #[test]
    fn defaults_apply_when_optional_vars_absent() {
        let c = config_from(&[
            ("BACKEND_BASE_URL", "https://api.example.com/"),
            ("GARDENER_ID", "7"),
        ])
        .unwrap();

        assert_eq!(c.backend_base_url, "https://api.example.com");
        assert_eq!(c.backend_token, None);
        assert_eq!(c.gardener_id, 7);
        assert_eq!(c.server_host, "0.0.0.0");
        assert_eq!(c.server_port, 8080);
        assert_eq!(c.refresh_interval(), Duration::from_secs(30));
        assert_eq!(c.hub_path, "/notificationHub");
        assert_eq!(c.hub_method, "ReceiveNotification");
        assert_eq!(c.hub_reconnect_delay(), Duration::from_secs(5));
    }

    #[test]
    fn missing_base_url_errors() {
        let err = config_from(&[("GARDENER_ID", "1")]).unwrap_err();
        assert!(err.to_string().contains("BACKEND_BASE_URL"));
    }

    #[test]
    fn non_numeric_gardener_id_errors() {
        let err = config_from(&[
            ("BACKEND_BASE_URL", "http://localhost"),
            ("GARDENER_ID", "abc"),
        ])
        .unwrap_err();
        assert!(err.to_string().contains("GARDENER_ID"));
    }

    #[test]
    fn blank_token_is_treated_as_absent() {
        let c = config_from(&[
            ("BACKEND_BASE_URL", "http://localhost"),
            ("GARDENER_ID", "1"),
            ("BACKEND_TOKEN", "   "),
        ])
        .unwrap();
        assert_eq!(c.backend_token, None);
    }

    #[test]
    fn token_and_overrides_are_read() {
        let c = config_from(&[
            ("BACKEND_BASE_URL", "http://localhost:5000"),
            ("GARDENER_ID", "3"),
            ("BACKEND_TOKEN", "abc.def"),
            ("SERVER_PORT", "9000"),
            ("REFRESH_INTERVAL_SECS", "300"),
        ])
        .unwrap();
        assert_eq!(c.backend_token.as_deref(), Some("abc.def"));
        assert_eq!(c.server_port, 9000);
        assert_eq!(c.refresh_interval_secs, 300);
    }

    #[test]
    fn bad_port_errors() {
        let err = config_from(&[
            ("BACKEND_BASE_URL", "http://localhost"),
            ("GARDENER_ID", "1"),
            ("SERVER_PORT", "99999"),
        ])
        .unwrap_err();
        assert!(err.to_string().contains("SERVER_PORT"));
    }
}
