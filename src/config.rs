//! API client configuration parsed from environment variables.

use reqwest::Url;

pub const DEFAULT_API_URL: &str = "/api";
pub const DEFAULT_ORIGIN: &str = "http://127.0.0.1:8080";
pub const DEFAULT_RETRY: u32 = 1;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid URL in {var}: {value:?} ({message})")]
    InvalidUrl { var: &'static str, value: String, message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ApiTimeouts {
    pub request_secs: u64,
    pub connect_secs: u64,
}

impl Default for ApiTimeouts {
    fn default() -> Self {
        Self { request_secs: DEFAULT_REQUEST_TIMEOUT_SECS, connect_secs: DEFAULT_CONNECT_TIMEOUT_SECS }
    }
}

/// Settings fixed when the HTTP adapter is constructed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiConfig {
    /// Absolute API base URL without a trailing slash (e.g. `http://127.0.0.1:8080/api`).
    pub base_url: String,
    /// Automatic retries on transient failure, applied to every method.
    pub retry: u32,
    pub timeouts: ApiTimeouts,
}

impl ApiConfig {
    /// Config for an already-absolute base URL with default retry and timeouts.
    #[must_use]
    pub fn for_base_url(base_url: impl Into<String>) -> Self {
        let base_url: String = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_owned(),
            retry: DEFAULT_RETRY,
            timeouts: ApiTimeouts::default(),
        }
    }

    /// Build typed API config from environment variables.
    ///
    /// Optional:
    /// - `SESSIONGATE_API_URL`: default `/api`; relative values are joined to the origin
    /// - `SESSIONGATE_ORIGIN`: default `http://127.0.0.1:8080`
    /// - `SESSIONGATE_RETRY`: default 1
    /// - `SESSIONGATE_REQUEST_TIMEOUT_SECS`: default 30
    /// - `SESSIONGATE_CONNECT_TIMEOUT_SECS`: default 10
    ///
    /// # Errors
    ///
    /// Returns an error if the origin or base URL cannot be parsed.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`ApiConfig::from_env`], reading values through `lookup`.
    ///
    /// # Errors
    ///
    /// Returns an error if the origin or base URL cannot be parsed.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        let api_url = non_empty("SESSIONGATE_API_URL").unwrap_or_else(|| DEFAULT_API_URL.to_owned());
        let origin = non_empty("SESSIONGATE_ORIGIN").unwrap_or_else(|| DEFAULT_ORIGIN.to_owned());
        let base_url = resolve_base_url(&api_url, &origin)?;

        let parse_or = |key: &str, default: u64| {
            lookup(key)
                .and_then(|raw| raw.trim().parse::<u64>().ok())
                .unwrap_or(default)
        };
        let retry = lookup("SESSIONGATE_RETRY")
            .and_then(|raw| raw.trim().parse::<u32>().ok())
            .unwrap_or(DEFAULT_RETRY);
        let timeouts = ApiTimeouts {
            request_secs: parse_or("SESSIONGATE_REQUEST_TIMEOUT_SECS", DEFAULT_REQUEST_TIMEOUT_SECS),
            connect_secs: parse_or("SESSIONGATE_CONNECT_TIMEOUT_SECS", DEFAULT_CONNECT_TIMEOUT_SECS),
        };

        Ok(Self { base_url, retry, timeouts })
    }
}

/// Resolve `api_url` to an absolute URL, joining relative values onto `origin`.
///
/// # Errors
///
/// Returns an error if either value is not a usable URL.
pub fn resolve_base_url(api_url: &str, origin: &str) -> Result<String, ConfigError> {
    let api_url = api_url.trim();
    let resolved = if api_url.starts_with("http://") || api_url.starts_with("https://") {
        Url::parse(api_url).map_err(|e| ConfigError::InvalidUrl {
            var: "SESSIONGATE_API_URL",
            value: api_url.to_owned(),
            message: e.to_string(),
        })?
    } else {
        let origin_url = Url::parse(origin.trim()).map_err(|e| ConfigError::InvalidUrl {
            var: "SESSIONGATE_ORIGIN",
            value: origin.to_owned(),
            message: e.to_string(),
        })?;
        origin_url.join(api_url).map_err(|e| ConfigError::InvalidUrl {
            var: "SESSIONGATE_API_URL",
            value: api_url.to_owned(),
            message: e.to_string(),
        })?
    };
    Ok(resolved.as_str().trim_end_matches('/').to_owned())
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
