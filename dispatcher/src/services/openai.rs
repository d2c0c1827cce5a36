//! OpenAI adapter: chat completions and DALL-E image generation

use async_trait::async_trait;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::debug;

use shared::{LlmConfig, ModelType, RoleMessage, TokenUsage};
use crate::config::VendorConfig;
use crate::core::retry::{classify_vendor_error, RetryPolicy};
use crate::error::{DispatchResult, VendorError, VendorFailure};
use crate::services::http::{build_client, count, post_json, require_key};
use crate::traits::VendorClient;
use crate::types::{VendorRequest, VendorResult};

const CHAT_PATH: &str = "/v1/chat/completions";
const IMAGES_PATH: &str = "/v1/images/generations";

/// Real OpenAI client
pub struct OpenAiClient {
    client: reqwest::Client,
    config: VendorConfig,
    retry: RetryPolicy,
}

impl OpenAiClient {
    pub fn new(config: VendorConfig, retry: RetryPolicy, request_timeout: Duration) -> DispatchResult<Self> {
        Ok(Self {
            client: build_client(request_timeout)?,
            config,
            retry,
        })
    }

    /// Build the endpoint URL and JSON body for a request
    fn shape(&self, request: &VendorRequest) -> Result<(String, Value), VendorError> {
        match request.model_type {
            ModelType::Text2Image => {
                let size = image_size(&request.config)?;
                let body = json!({
                    "model": image_model(&request.model),
                    "prompt": request.payload.flatten(),
                    "n": 1,
                    "size": size,
                    "response_format": "b64_json"
                });
                Ok((self.config.endpoint(IMAGES_PATH), body))
            }
            ModelType::Text2Text | ModelType::Text2Code => {
                let body = chat_body(&request.model, &request.payload.messages(), &request.config);
                Ok((self.config.endpoint(CHAT_PATH), body))
            }
        }
    }

    async fn send_once(&self, url: &str, api_key: &str, body: &Value, model_type: ModelType) -> Result<VendorResult, VendorError> {
        let response = post_json(&self.client, url, api_key, body).await?;
        if model_type.is_image() {
            parse_image_response(&response)
        } else {
            parse_chat_response(&response)
        }
    }
}

#[async_trait]
impl VendorClient for OpenAiClient {
    fn name(&self) -> &'static str {
        "openai"
    }

    async fn invoke(&self, request: &VendorRequest, dry_run: bool) -> Result<VendorResult, VendorFailure> {
        request.config.validate().map_err(|e| VendorError::invalid(e.to_string()))?;
        let (url, body) = self.shape(request)?;

        if dry_run {
            debug!("Dry run: shaped OpenAI request for {} ({} bytes)", request.model, body.to_string().len());
            return Ok(VendorResult::dry_run(request.model_type));
        }

        let api_key = require_key(self.config.api_key.as_deref(), self.name())?;
        let attempted = self
            .retry
            .run(classify_vendor_error, || self.send_once(&url, api_key, &body, request.model_type))
            .await?;
        Ok(attempted.value.with_retries(attempted.retries))
    }
}

/// Chat completion body; also used by OpenAI-compatible vendors
pub(crate) fn chat_body(model: &str, messages: &[RoleMessage], config: &LlmConfig) -> Value {
    let messages: Vec<Value> = messages
        .iter()
        .map(|m| json!({ "role": m.role.as_str(), "content": m.content }))
        .collect();

    let mut body = json!({
        "model": model,
        "messages": messages,
        "max_tokens": config.max_tokens,
        "temperature": config.temperature
    });
    if let Some(top_p) = config.top_p {
        body["top_p"] = json!(top_p);
    }
    body
}

pub(crate) fn parse_chat_response(response: &Value) -> Result<VendorResult, VendorError> {
    let content = response
        .get("choices")
        .and_then(|choices| choices.get(0))
        .and_then(|choice| choice.get("message"))
        .and_then(|message| message.get("content"))
        .and_then(|content| content.as_str())
        .ok_or_else(|| VendorError::protocol("No content in response"))?;

    let usage = response.get("usage");
    let usage = TokenUsage::new(count(usage, "prompt_tokens"), count(usage, "completion_tokens"));
    Ok(VendorResult::new(content, usage))
}

fn parse_image_response(response: &Value) -> Result<VendorResult, VendorError> {
    let image = response
        .get("data")
        .and_then(|data| data.get(0))
        .and_then(|item| item.get("b64_json"))
        .and_then(|b64| b64.as_str())
        .ok_or_else(|| VendorError::protocol("No image in response"))?;
    Ok(VendorResult::new(image, TokenUsage::default()))
}

/// Catalogue names DALL-E generically; the API wants a concrete model
fn image_model(model: &str) -> &str {
    match model {
        "dall-e" => "dall-e-3",
        other => other,
    }
}

fn image_size(config: &LlmConfig) -> Result<String, VendorError> {
    let width = config.width.unwrap_or(1024);
    let height = config.height.unwrap_or(1024);
    match (width, height) {
        (1024, 1024) | (1792, 1024) | (1024, 1792) => Ok(format!("{width}x{height}")),
        _ => Err(VendorError::invalid(format!("Unsupported DALL-E size {width}x{height}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::Role;

    #[test]
    fn test_chat_body_shape() {
        let config = LlmConfig { top_p: Some(0.9), ..LlmConfig::default() };
        let body = chat_body(
            "gpt-4",
            &[RoleMessage::new(Role::System, "Be brief."), RoleMessage::new(Role::User, "Hi")],
            &config,
        );
        assert_eq!(body["model"], "gpt-4");
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][1]["content"], "Hi");
        assert_eq!(body["max_tokens"], 256);
        assert!(body.get("top_p").is_some());
    }

    #[test]
    fn test_image_model_and_size() {
        assert_eq!(image_model("dall-e"), "dall-e-3");
        assert_eq!(image_model("dall-e-2"), "dall-e-2");
        assert_eq!(image_size(&LlmConfig::default()).unwrap(), "1024x1024");

        let config = LlmConfig { width: Some(512), ..LlmConfig::default() };
        assert!(matches!(image_size(&config), Err(VendorError::InvalidRequest { .. })));
    }

    #[test]
    fn test_chat_response_without_content_is_protocol_error() {
        let result = parse_chat_response(&json!({"choices": []}));
        assert!(matches!(result, Err(VendorError::Protocol { .. })));
    }
}
