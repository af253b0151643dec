//! Client configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Optional
//! - `OREBI_API_BASE_URL` - Backend base URL (default: `http://localhost:9000`)
//! - `OREBI_STATE_PATH` - Persisted session/cart file (default: `.orebi/state.json`)
//! - `OREBI_CACHE_TTL_SECS` - Catalog cache TTL, 0 disables caching (default: 300)
//! - `OREBI_REQUEST_TIMEOUT_SECS` - HTTP request timeout (default: 30)
//! - `OREBI_ERROR_DISMISS_SECS` - Catalog error auto-dismiss delay (default: 3)
//! - `OREBI_PHONE_PREFIX` - Country calling code required on checkout phone numbers (default: +94)
//! - `OREBI_DEFAULT_COUNTRY` - Country prefilled on the checkout form (default: Sri Lanka)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;
use url::Url;

const DEFAULT_API_BASE_URL: &str = "http://localhost:9000";
const DEFAULT_STATE_PATH: &str = ".orebi/state.json";
const DEFAULT_CACHE_TTL_SECS: u64 = 300;
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
const DEFAULT_ERROR_DISMISS_SECS: u64 = 3;
const DEFAULT_COUNTRY: &str = "Sri Lanka";

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Storefront client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Backend base URL
    pub api_base_url: Url,
    /// Location of the persisted session/cart state
    pub state_path: PathBuf,
    /// Catalog cache TTL (zero disables the cache)
    pub cache_ttl: Duration,
    /// Per-request HTTP timeout
    pub request_timeout: Duration,
    /// How long a catalog error stays visible
    pub error_dismiss_after: Duration,
    /// Country calling code required on checkout phone numbers
    pub phone_prefix: String,
    /// Country prefilled on the checkout form
    pub default_country: String,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment name
    pub sentry_environment: Option<String>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base_url: Url::parse(DEFAULT_API_BASE_URL)
                .unwrap_or_else(|_| unreachable!("default base URL is valid")),
            state_path: PathBuf::from(DEFAULT_STATE_PATH),
            cache_ttl: Duration::from_secs(DEFAULT_CACHE_TTL_SECS),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            error_dismiss_after: Duration::from_secs(DEFAULT_ERROR_DISMISS_SECS),
            phone_prefix: orebi_core::phone::DEFAULT_COUNTRY_PREFIX.to_string(),
            default_country: DEFAULT_COUNTRY.to_string(),
            sentry_dsn: None,
            sentry_environment: None,
        }
    }
}

impl ClientConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is set but invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary variable source.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is set but invalid.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let api_base_url = parse_base_url(
            "OREBI_API_BASE_URL",
            &get_env_or_default(&lookup, "OREBI_API_BASE_URL", DEFAULT_API_BASE_URL),
        )?;
        let state_path = PathBuf::from(get_env_or_default(
            &lookup,
            "OREBI_STATE_PATH",
            DEFAULT_STATE_PATH,
        ));
        let cache_ttl = get_secs(&lookup, "OREBI_CACHE_TTL_SECS", DEFAULT_CACHE_TTL_SECS)?;
        let request_timeout = get_secs(
            &lookup,
            "OREBI_REQUEST_TIMEOUT_SECS",
            DEFAULT_REQUEST_TIMEOUT_SECS,
        )?;
        if request_timeout.is_zero() {
            return Err(ConfigError::InvalidEnvVar(
                "OREBI_REQUEST_TIMEOUT_SECS".to_string(),
                "must be greater than zero".to_string(),
            ));
        }
        let error_dismiss_after = get_secs(
            &lookup,
            "OREBI_ERROR_DISMISS_SECS",
            DEFAULT_ERROR_DISMISS_SECS,
        )?;

        let phone_prefix = get_env_or_default(
            &lookup,
            "OREBI_PHONE_PREFIX",
            orebi_core::phone::DEFAULT_COUNTRY_PREFIX,
        );
        validate_phone_prefix(&phone_prefix)?;

        Ok(Self {
            api_base_url,
            state_path,
            cache_ttl,
            request_timeout,
            error_dismiss_after,
            phone_prefix,
            default_country: get_env_or_default(&lookup, "OREBI_DEFAULT_COUNTRY", DEFAULT_COUNTRY),
            sentry_dsn: get_optional_env(&lookup, "SENTRY_DSN"),
            sentry_environment: get_optional_env(&lookup, "SENTRY_ENVIRONMENT"),
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get an optional environment variable, treating blank values as unset.
fn get_optional_env(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<String> {
    lookup(key).filter(|value| !value.trim().is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: &str,
) -> String {
    get_optional_env(lookup, key).unwrap_or_else(|| default.to_string())
}

/// Get a duration given in whole seconds.
fn get_secs(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: u64,
) -> Result<Duration, ConfigError> {
    let Some(raw) = get_optional_env(lookup, key) else {
        return Ok(Duration::from_secs(default));
    };
    raw.trim()
        .parse::<u64>()
        .map(Duration::from_secs)
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

/// Parse and validate the backend base URL.
fn parse_base_url(key: &str, raw: &str) -> Result<Url, ConfigError> {
    let url = Url::parse(raw).map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::InvalidEnvVar(
            key.to_string(),
            format!("unsupported scheme '{}'", url.scheme()),
        ));
    }
    Ok(url)
}

/// Validate that a phone prefix is `+` followed by one to three digits.
fn validate_phone_prefix(prefix: &str) -> Result<(), ConfigError> {
    let valid = prefix.strip_prefix('+').is_some_and(|digits| {
        (1..=3).contains(&digits.len()) && digits.bytes().all(|b| b.is_ascii_digit())
    });
    if valid {
        Ok(())
    } else {
        Err(ConfigError::InvalidEnvVar(
            "OREBI_PHONE_PREFIX".to_string(),
            format!("expected '+' followed by a country code, got '{prefix}'"),
        ))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = ClientConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.api_base_url.as_str(), "http://localhost:9000/");
        assert_eq!(config.state_path, PathBuf::from(".orebi/state.json"));
        assert_eq!(config.cache_ttl, Duration::from_secs(300));
        assert_eq!(config.request_timeout, Duration::from_secs(30));
        assert_eq!(config.error_dismiss_after, Duration::from_secs(3));
        assert_eq!(config.phone_prefix, "+94");
        assert_eq!(config.default_country, "Sri Lanka");
        assert!(config.sentry_dsn.is_none());
    }

    #[test]
    fn test_overrides() {
        let config = ClientConfig::from_lookup(lookup(&[
            ("OREBI_API_BASE_URL", "https://api.example.com"),
            ("OREBI_CACHE_TTL_SECS", "0"),
            ("OREBI_PHONE_PREFIX", "+44"),
            ("SENTRY_DSN", "https://key@sentry.example.com/1"),
        ]))
        .unwrap();
        assert_eq!(config.api_base_url.host_str(), Some("api.example.com"));
        assert!(config.cache_ttl.is_zero());
        assert_eq!(config.phone_prefix, "+44");
        assert!(config.sentry_dsn.is_some());
    }

    #[test]
    fn test_blank_values_fall_back_to_defaults() {
        let config = ClientConfig::from_lookup(lookup(&[("OREBI_DEFAULT_COUNTRY", "  ")])).unwrap();
        assert_eq!(config.default_country, "Sri Lanka");
    }

    #[test]
    fn test_invalid_base_url() {
        let err = ClientConfig::from_lookup(lookup(&[("OREBI_API_BASE_URL", "not a url")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnvVar(key, _) if key == "OREBI_API_BASE_URL"));

        let err = ClientConfig::from_lookup(lookup(&[("OREBI_API_BASE_URL", "ftp://x.example")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnvVar(_, _)));
    }

    #[test]
    fn test_invalid_numbers() {
        assert!(ClientConfig::from_lookup(lookup(&[("OREBI_CACHE_TTL_SECS", "five")])).is_err());
        assert!(ClientConfig::from_lookup(lookup(&[("OREBI_REQUEST_TIMEOUT_SECS", "0")])).is_err());
    }

    #[test]
    fn test_phone_prefix_validation() {
        assert!(validate_phone_prefix("+94").is_ok());
        assert!(validate_phone_prefix("+1").is_ok());
        assert!(validate_phone_prefix("94").is_err());
        assert!(validate_phone_prefix("+").is_err());
        assert!(validate_phone_prefix("+9412").is_err());
    }
}
