//! HTTP-level tests for the vendor adapters
//!
//! Each adapter is pointed at a local wiremock server so status mapping,
//! retry behaviour and response parsing are exercised end to end.

pub mod openai;

use std::time::Duration;

use shared::{LlmConfig, ModelType, ProviderId};
use crate::config::VendorConfig;
use crate::core::retry::RetryPolicy;
use crate::types::{PromptPayload, VendorRequest};

/// Fast retries so tests do not sleep for real backoff
pub fn fast_retry() -> RetryPolicy {
    RetryPolicy::new(3, Duration::from_millis(1), Duration::from_millis(5)).without_jitter()
}

pub fn vendor_config(base_url: &str) -> VendorConfig {
    VendorConfig::new(Some("test-key".to_string()), base_url)
}

pub fn text_request(provider: ProviderId, model: &str, payload: PromptPayload) -> VendorRequest {
    VendorRequest {
        provider,
        model: model.to_string(),
        model_type: ModelType::Text2Text,
        payload,
        config: LlmConfig::default(),
    }
}

pub fn image_request(provider: ProviderId, model: &str, prompt: &str) -> VendorRequest {
    VendorRequest {
        provider,
        model: model.to_string(),
        model_type: ModelType::Text2Image,
        payload: PromptPayload::Flat(prompt.to_string()),
        config: LlmConfig::default(),
    }
}
