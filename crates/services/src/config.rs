use std::env;
use std::time::Duration;

use url::Url;

use crate::error::ConfigError;

pub const DEFAULT_API_BASE_URL: &str = "http://localhost:5000";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Where the question supplier lives and how long to wait for it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SupplierConfig {
    base_url: Url,
    timeout: Duration,
}

impl SupplierConfig {
    /// Parse and validate a base URL.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidBaseUrl` if the value is not an absolute
    /// http(s) URL that can carry path segments.
    pub fn new(base_url: &str) -> Result<Self, ConfigError> {
        let invalid = |reason: &str| ConfigError::InvalidBaseUrl {
            raw: base_url.to_owned(),
            reason: reason.to_owned(),
        };
        let url = Url::parse(base_url.trim()).map_err(|e| invalid(&e.to_string()))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(invalid("scheme must be http or https"));
        }
        if url.cannot_be_a_base() {
            return Err(invalid("url cannot carry a path"));
        }
        Ok(Self {
            base_url: url,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        })
    }

    /// Read `QUIZ_API_BASE_URL` and `QUIZ_HTTP_TIMEOUT_SECS`, falling back to defaults.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if either variable holds an invalid value.
    pub fn from_env() -> Result<Self, ConfigError> {
        let base =
            env::var("QUIZ_API_BASE_URL").unwrap_or_else(|_| DEFAULT_API_BASE_URL.into());
        let config = Self::new(&base)?;
        match env::var("QUIZ_HTTP_TIMEOUT_SECS") {
            Ok(raw) => Ok(config.with_timeout(parse_timeout(&raw)?)),
            Err(_) => Ok(config),
        }
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Base URL extended with the given path segments (percent-encoded).
    #[must_use]
    pub fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        // `new` rejects cannot-be-a-base urls, so the segments are always available.
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    /// Build the shared HTTP client for this configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Client` if the TLS backend cannot be initialised.
    pub fn http_client(&self) -> Result<reqwest::Client, ConfigError> {
        Ok(reqwest::Client::builder().timeout(self.timeout).build()?)
    }
}

/// Parse a positive number of seconds.
///
/// # Errors
///
/// Returns `ConfigError::InvalidTimeout` for non-numeric or zero values.
pub fn parse_timeout(raw: &str) -> Result<Duration, ConfigError> {
    match raw.trim().parse::<u64>() {
        Ok(secs) if secs > 0 => Ok(Duration::from_secs(secs)),
        _ => Err(ConfigError::InvalidTimeout(raw.to_owned())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_appends_encoded_segments() {
        let config = SupplierConfig::new("http://localhost:5000/").unwrap();
        let url = config.endpoint(&["api", "questoes", "frações"]);
        assert_eq!(
            url.as_str(),
            "http://localhost:5000/api/questoes/fra%C3%A7%C3%B5es"
        );
    }

    #[test]
    fn endpoint_keeps_base_path_prefix() {
        let config = SupplierConfig::new("https://quiz.example.com/v1").unwrap();
        let url = config.endpoint(&["api", "resposta", "tabelas"]);
        assert_eq!(url.path(), "/v1/api/resposta/tabelas");
    }

    #[test]
    fn rejects_non_http_urls() {
        assert!(matches!(
            SupplierConfig::new("mailto:ana@example.com"),
            Err(ConfigError::InvalidBaseUrl { .. })
        ));
        assert!(SupplierConfig::new("not a url").is_err());
    }

    #[test]
    fn timeout_must_be_positive() {
        assert_eq!(parse_timeout("15").unwrap(), Duration::from_secs(15));
        assert!(parse_timeout("0").is_err());
        assert!(parse_timeout("soon").is_err());
    }

    #[test]
    fn defaults_to_thirty_seconds() {
        let config = SupplierConfig::new(DEFAULT_API_BASE_URL).unwrap();
        assert_eq!(config.timeout(), Duration::from_secs(DEFAULT_TIMEOUT_SECS));
    }
}
