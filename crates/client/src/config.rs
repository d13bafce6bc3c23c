use std::time::Duration;

/// Client configuration loaded from environment variables.
///
/// All fields have sensible defaults suitable for local development.
/// In production, override via environment variables.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the FormCheck backend (default: `http://localhost:3000`).
    pub base_url: String,
    /// HTTP request timeout (default: 30 seconds).
    pub request_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:3000".to_string(),
            request_timeout: Duration::from_secs(30),
        }
    }
}

impl ClientConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                    | Default                 |
    /// |----------------------------|-------------------------|
    /// | `FORMCHECK_API_URL`        | `http://localhost:3000` |
    /// | `FORMCHECK_TIMEOUT_SECS`   | `30`                    |
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let base_url = std::env::var("FORMCHECK_API_URL")
            .ok()
            .map(|u| u.trim_end_matches('/').to_string())
            .filter(|u| !u.is_empty())
            .unwrap_or(defaults.base_url);

        let request_timeout = std::env::var("FORMCHECK_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .map(Duration::from_secs)
            .unwrap_or(defaults.request_timeout);

        Self {
            base_url,
            request_timeout,
        }
    }
}
