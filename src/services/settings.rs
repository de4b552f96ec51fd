use crate::constants::{env, network};
use crate::errors::ToolError;
use crate::services::logger::LogLevel;
use url::Url;

/// Process configuration. Read once at startup and shared read-only.
#[derive(Debug, Clone)]
pub struct Settings {
    pub service_url: String,
    pub use_mock_data: bool,
    pub log_level: LogLevel,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            service_url: network::DEFAULT_SERVICE_URL.to_string(),
            use_mock_data: false,
            log_level: LogLevel::Info,
        }
    }
}

impl Settings {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        Self {
            service_url: lookup(env::SERVICE_URL)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .unwrap_or(defaults.service_url),
            use_mock_data: lookup(env::USE_MOCK_DATA)
                .map(|v| v.trim().eq_ignore_ascii_case("true"))
                .unwrap_or(defaults.use_mock_data),
            log_level: lookup(env::LOG_LEVEL)
                .map(|v| LogLevel::parse(&v))
                .unwrap_or(defaults.log_level),
        }
    }

    pub fn with_service_url(mut self, url: impl Into<String>) -> Self {
        self.service_url = url.into();
        self
    }

    pub fn with_mock_data(mut self, enabled: bool) -> Self {
        self.use_mock_data = enabled;
        self
    }

    pub fn validate(&self) -> Result<Url, ToolError> {
        let url = Url::parse(&self.service_url).map_err(|err| {
            ToolError::config(format!(
                "{} is not a valid URL: {}",
                env::SERVICE_URL,
                err
            ))
            .with_details(serde_json::json!({ "value": self.service_url }))
        })?;
        if !matches!(url.scheme(), "http" | "https") || url.cannot_be_a_base() {
            return Err(ToolError::config(format!(
                "{} must be an absolute http(s) URL",
                env::SERVICE_URL
            ))
            .with_details(serde_json::json!({ "value": self.service_url })));
        }
        Ok(url)
    }
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
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn defaults_apply_when_environment_is_empty() {
        let settings = Settings::from_lookup(lookup(&[]));
        assert_eq!(settings.service_url, "http://localhost:9030");
        assert!(!settings.use_mock_data);
        assert_eq!(settings.log_level, LogLevel::Info);
    }

    #[test]
    fn mock_flag_only_accepts_true() {
        assert!(Settings::from_lookup(lookup(&[("USE_MOCK_DATA", "TRUE")])).use_mock_data);
        assert!(!Settings::from_lookup(lookup(&[("USE_MOCK_DATA", "1")])).use_mock_data);
    }

    #[test]
    fn validate_rejects_non_http_urls() {
        let settings = Settings::default().with_service_url("ftp://psa.local");
        assert!(settings.validate().is_err());
        let settings = Settings::default().with_service_url("https://psa.local/base");
        assert!(settings.validate().is_ok());
    }
}
