//! Server configuration loaded from environment variables.
//!
//! Everything is read once at startup and passed down explicitly; nothing
//! else in the crate touches the environment. Secrets and the origin
//! allow-list have no defaults.
//!
//! Required:
//! - `OPENROUTER_API_KEY`: upstream model API key
//! - `REDITTO_ALLOWED_ORIGINS`: comma-separated browser origins
//! - `REDITTO_IDENTITY_URL`: identity service base URL
//! - `REDITTO_IDENTITY_KEY`: identity service API key
//!
//! Optional:
//! - `REDITTO_PORT` (default: "3000")
//! - `REDITTO_UPSTREAM_URL` (default: "https://openrouter.ai/api/v1")
//! - `REDITTO_GRADING_MODEL`, `REDITTO_OCR_MODEL`
//! - `REDITTO_UPSTREAM_TIMEOUT_SECS` (default: 60)
//! - `REDITTO_IDENTITY_TIMEOUT_SECS` (default: 10)
//! - `REDITTO_APP_URL`, `REDITTO_APP_TITLE`: attribution headers sent upstream

use std::time::Duration;

use reditto_core::PayloadLimits;

pub const DEFAULT_UPSTREAM_URL: &str = "https://openrouter.ai/api/v1";
pub const DEFAULT_GRADING_MODEL: &str = "qwen/qwen-2.5-coder-32b-instruct:free";
pub const DEFAULT_OCR_MODEL: &str = "google/gemini-2.5-flash-image-preview:free";

/// Configuration errors reported at startup.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    Missing(&'static str),

    #[error("invalid value for {var}: {reason}")]
    Invalid { var: &'static str, reason: String },

    #[error("failed to build HTTP client: {0}")]
    HttpClient(String),
}

/// Generation parameters for one flow.
#[derive(Debug, Clone, PartialEq)]
pub struct FlowSettings {
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
}

/// Upstream model service settings.
#[derive(Debug, Clone, PartialEq)]
pub struct UpstreamConfig {
    pub base_url: String,
    pub api_key: String,
    pub timeout: Duration,
    pub app_url: Option<String>,
    pub app_title: Option<String>,
    pub grading: FlowSettings,
    pub extraction: FlowSettings,
}

/// Identity service settings.
#[derive(Debug, Clone, PartialEq)]
pub struct IdentityConfig {
    pub base_url: String,
    pub api_key: String,
    pub timeout: Duration,
}

/// Complete server configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    pub port: u16,
    pub allowed_origins: Vec<String>,
    pub upstream: UpstreamConfig,
    pub identity: IdentityConfig,
    pub limits: PayloadLimits,
}

impl ServerConfig {
    /// Loads configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads configuration through an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let optional = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let required = |key: &'static str| optional(key).ok_or(ConfigError::Missing(key));

        let port = match optional("REDITTO_PORT") {
            Some(raw) => raw.parse::<u16>().map_err(|e| ConfigError::Invalid {
                var: "REDITTO_PORT",
                reason: e.to_string(),
            })?,
            None => 3000,
        };

        let allowed_origins = parse_origins(&required("REDITTO_ALLOWED_ORIGINS")?)?;

        let upstream = UpstreamConfig {
            base_url: optional("REDITTO_UPSTREAM_URL")
                .unwrap_or_else(|| DEFAULT_UPSTREAM_URL.to_string()),
            api_key: required("OPENROUTER_API_KEY")?,
            timeout: seconds(
                "REDITTO_UPSTREAM_TIMEOUT_SECS",
                optional("REDITTO_UPSTREAM_TIMEOUT_SECS"),
                60,
            )?,
            app_url: optional("REDITTO_APP_URL"),
            app_title: optional("REDITTO_APP_TITLE"),
            grading: FlowSettings {
                model: optional("REDITTO_GRADING_MODEL")
                    .unwrap_or_else(|| DEFAULT_GRADING_MODEL.to_string()),
                max_tokens: 3000,
                temperature: 0.3,
            },
            extraction: FlowSettings {
                model: optional("REDITTO_OCR_MODEL")
                    .unwrap_or_else(|| DEFAULT_OCR_MODEL.to_string()),
                max_tokens: 2000,
                temperature: 0.1,
            },
        };

        let identity = IdentityConfig {
            base_url: required("REDITTO_IDENTITY_URL")?,
            api_key: required("REDITTO_IDENTITY_KEY")?,
            timeout: seconds(
                "REDITTO_IDENTITY_TIMEOUT_SECS",
                optional("REDITTO_IDENTITY_TIMEOUT_SECS"),
                10,
            )?,
        };

        Ok(ServerConfig {
            port,
            allowed_origins,
            upstream,
            identity,
            limits: PayloadLimits::default(),
        })
    }
}

/// Splits and normalizes the origin allow-list. Wildcards are refused.
fn parse_origins(raw: &str) -> Result<Vec<String>, ConfigError> {
    let origins: Vec<String> = raw
        .split(',')
        .map(|o| o.trim().trim_end_matches('/').to_string())
        .filter(|o| !o.is_empty())
        .collect();

    if origins.is_empty() {
        return Err(ConfigError::Missing("REDITTO_ALLOWED_ORIGINS"));
    }
    if let Some(bad) = origins
        .iter()
        .find(|o| *o == "*" || !(o.starts_with("http://") || o.starts_with("https://")))
    {
        return Err(ConfigError::Invalid {
            var: "REDITTO_ALLOWED_ORIGINS",
            reason: format!("'{bad}' is not an explicit http(s) origin"),
        });
    }
    Ok(origins)
}

fn seconds(var: &'static str, raw: Option<String>, default: u64) -> Result<Duration, ConfigError> {
    let secs = match raw {
        Some(raw) => raw.parse::<u64>().map_err(|e| ConfigError::Invalid {
            var,
            reason: e.to_string(),
        })?,
        None => default,
    };
    if secs == 0 {
        return Err(ConfigError::Invalid {
            var,
            reason: "must be greater than zero".to_string(),
        });
    }
    Ok(Duration::from_secs(secs))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    const REQUIRED: [(&str, &str); 4] = [
        ("OPENROUTER_API_KEY", "sk-test"),
        ("REDITTO_ALLOWED_ORIGINS", "https://reditto.app/, http://localhost:5173"),
        ("REDITTO_IDENTITY_URL", "https://id.example"),
        ("REDITTO_IDENTITY_KEY", "anon"),
    ];

    #[test]
    fn defaults_apply_when_optional_vars_absent() {
        let config = ServerConfig::from_lookup(env(&REQUIRED)).unwrap();
        assert_eq!(config.port, 3000);
        assert_eq!(
            config.allowed_origins,
            vec!["https://reditto.app", "http://localhost:5173"]
        );
        assert_eq!(config.upstream.base_url, DEFAULT_UPSTREAM_URL);
        assert_eq!(config.upstream.timeout, Duration::from_secs(60));
        assert_eq!(config.upstream.grading.max_tokens, 3000);
        assert_eq!(config.upstream.extraction.model, DEFAULT_OCR_MODEL);
        assert_eq!(config.identity.timeout, Duration::from_secs(10));
        assert_eq!(config.limits, PayloadLimits::default());
    }

    #[test]
    fn every_secret_is_required() {
        for (missing, _) in REQUIRED {
            let pairs: Vec<_> = REQUIRED.iter().copied().filter(|(k, _)| *k != missing).collect();
            match ServerConfig::from_lookup(env(&pairs)) {
                Err(ConfigError::Missing(var)) => assert_eq!(var, missing),
                other => panic!("expected Missing({missing}), got {other:?}"),
            }
        }
    }

    #[test]
    fn blank_values_count_as_missing() {
        let mut pairs = REQUIRED.to_vec();
        pairs[0] = ("OPENROUTER_API_KEY", "   ");
        assert!(matches!(
            ServerConfig::from_lookup(env(&pairs)),
            Err(ConfigError::Missing("OPENROUTER_API_KEY"))
        ));
    }

    #[test]
    fn wildcard_origin_is_refused() {
        let mut pairs = REQUIRED.to_vec();
        pairs[1] = ("REDITTO_ALLOWED_ORIGINS", "*");
        assert!(matches!(
            ServerConfig::from_lookup(env(&pairs)),
            Err(ConfigError::Invalid { var: "REDITTO_ALLOWED_ORIGINS", .. })
        ));
    }

    #[test]
    fn bad_numbers_are_reported() {
        let mut pairs = REQUIRED.to_vec();
        pairs.push(("REDITTO_PORT", "eighty"));
        assert!(matches!(
            ServerConfig::from_lookup(env(&pairs)),
            Err(ConfigError::Invalid { var: "REDITTO_PORT", .. })
        ));

        let mut pairs = REQUIRED.to_vec();
        pairs.push(("REDITTO_UPSTREAM_TIMEOUT_SECS", "0"));
        assert!(matches!(
            ServerConfig::from_lookup(env(&pairs)),
            Err(ConfigError::Invalid { var: "REDITTO_UPSTREAM_TIMEOUT_SECS", .. })
        ));
    }
}
