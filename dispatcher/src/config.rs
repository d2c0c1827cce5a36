//! Engine configuration loaded from the environment

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::core::retry::RetryPolicy;
use crate::error::{DispatchError, DispatchResult};

pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com";
pub const DEFAULT_DEEPINFRA_BASE_URL: &str = "https://api.deepinfra.com";
pub const DEFAULT_STABILITY_BASE_URL: &str = "https://api.stability.ai";

/// Credentials and endpoint for one vendor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VendorConfig {
    #[serde(default, skip_serializing)]
    pub api_key: Option<String>,
    pub base_url: String,
}

impl VendorConfig {
    pub fn new(api_key: Option<String>, base_url: impl Into<String>) -> Self {
        Self {
            api_key,
            base_url: base_url.into(),
        }
    }

    /// Base URL without a trailing slash
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }
}

/// Everything the engine reads at startup
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    pub openai: VendorConfig,
    pub deepinfra: VendorConfig,
    pub stability: VendorConfig,
    pub max_attempts: u32,
    pub base_backoff_ms: u64,
    pub max_backoff_ms: u64,
    /// Bound on one whole invocation, retries included
    pub dispatch_timeout_secs: u64,
    /// Bound on a single HTTP request
    pub request_timeout_secs: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            openai: VendorConfig::new(None, DEFAULT_OPENAI_BASE_URL),
            deepinfra: VendorConfig::new(None, DEFAULT_DEEPINFRA_BASE_URL),
            stability: VendorConfig::new(None, DEFAULT_STABILITY_BASE_URL),
            max_attempts: 3,
            base_backoff_ms: 500,
            max_backoff_ms: 8000,
            dispatch_timeout_secs: 120,
            request_timeout_secs: 60,
        }
    }
}

impl EngineConfig {
    /// Load configuration from process environment variables
    ///
    /// Environment variables:
    /// - OPENAI_API_KEY, DEEPINFRA_API_KEY, STABILITY_API_KEY
    /// - OPENAI_BASE_URL, DEEPINFRA_BASE_URL, STABILITY_BASE_URL
    /// - DISPATCH_MAX_ATTEMPTS (default 3)
    /// - DISPATCH_BASE_BACKOFF_MS (default 500), DISPATCH_MAX_BACKOFF_MS (default 8000)
    /// - DISPATCH_TIMEOUT_SECS (default 120), DISPATCH_REQUEST_TIMEOUT_SECS (default 60)
    pub fn from_env() -> DispatchResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> DispatchResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let key = |name: &str| lookup(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let vendor = |key_var: &str, url_var: &str, fallback: &VendorConfig| {
            VendorConfig::new(key(key_var), key(url_var).unwrap_or_else(|| fallback.base_url.clone()))
        };

        let config = Self {
            openai: vendor("OPENAI_API_KEY", "OPENAI_BASE_URL", &defaults.openai),
            deepinfra: vendor("DEEPINFRA_API_KEY", "DEEPINFRA_BASE_URL", &defaults.deepinfra),
            stability: vendor("STABILITY_API_KEY", "STABILITY_BASE_URL", &defaults.stability),
            max_attempts: parse_number(key("DISPATCH_MAX_ATTEMPTS"), "DISPATCH_MAX_ATTEMPTS", defaults.max_attempts)?,
            base_backoff_ms: parse_number(key("DISPATCH_BASE_BACKOFF_MS"), "DISPATCH_BASE_BACKOFF_MS", defaults.base_backoff_ms)?,
            max_backoff_ms: parse_number(key("DISPATCH_MAX_BACKOFF_MS"), "DISPATCH_MAX_BACKOFF_MS", defaults.max_backoff_ms)?,
            dispatch_timeout_secs: parse_number(key("DISPATCH_TIMEOUT_SECS"), "DISPATCH_TIMEOUT_SECS", defaults.dispatch_timeout_secs)?,
            request_timeout_secs: parse_number(
                key("DISPATCH_REQUEST_TIMEOUT_SECS"),
                "DISPATCH_REQUEST_TIMEOUT_SECS",
                defaults.request_timeout_secs,
            )?,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> DispatchResult<()> {
        if self.max_attempts == 0 {
            return Err(DispatchError::Config {
                message: "DISPATCH_MAX_ATTEMPTS must be at least 1".to_string(),
            });
        }
        if self.base_backoff_ms > self.max_backoff_ms {
            return Err(DispatchError::Config {
                message: format!(
                    "DISPATCH_BASE_BACKOFF_MS ({}) exceeds DISPATCH_MAX_BACKOFF_MS ({})",
                    self.base_backoff_ms, self.max_backoff_ms
                ),
            });
        }
        if self.dispatch_timeout_secs == 0 || self.request_timeout_secs == 0 {
            return Err(DispatchError::Config {
                message: "Timeouts must be greater than zero".to_string(),
            });
        }
        Ok(())
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.max_attempts,
            Duration::from_millis(self.base_backoff_ms),
            Duration::from_millis(self.max_backoff_ms),
        )
    }

    pub fn dispatch_timeout(&self) -> Duration {
        Duration::from_secs(self.dispatch_timeout_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

fn parse_number<T: std::str::FromStr>(raw: Option<String>, name: &str, default: T) -> DispatchResult<T> {
    match raw {
        None => Ok(default),
        Some(value) => value.parse().map_err(|_| DispatchError::Config {
            message: format!("{name} must be a non-negative integer, got '{value}'"),
        }),
    }
}
