//! DeepInfra adapter for the hosted open models
//!
//! Flat and instruction-formatted prompts go through the native inference
//! endpoint; chat payloads use the OpenAI-compatible endpoint.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::debug;

use shared::{LlmConfig, ModelType, ProviderId, Role, RoleMessage, TokenUsage};
use crate::config::VendorConfig;
use crate::core::retry::{classify_vendor_error, RetryPolicy};
use crate::error::{DispatchResult, VendorError, VendorFailure};
use crate::services::http::{build_client, count, post_json, require_key};
use crate::services::openai::{chat_body, parse_chat_response};
use crate::traits::VendorClient;
use crate::types::{PromptPayload, VendorRequest, VendorResult};

const INFERENCE_PATH: &str = "/v1/inference/";
const CHAT_PATH: &str = "/v1/openai/chat/completions";

/// Response shape expected from the endpoint a request was shaped for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Endpoint {
    Inference,
    Chat,
    Image,
}

/// Real DeepInfra client
pub struct DeepInfraClient {
    client: reqwest::Client,
    config: VendorConfig,
    retry: RetryPolicy,
}

impl DeepInfraClient {
    pub fn new(config: VendorConfig, retry: RetryPolicy, request_timeout: Duration) -> DispatchResult<Self> {
        Ok(Self {
            client: build_client(request_timeout)?,
            config,
            retry,
        })
    }

    fn shape(&self, request: &VendorRequest) -> Result<(Endpoint, String, Value), VendorError> {
        let path = model_path(request.provider, &request.model)?;

        if request.model_type.is_image() {
            let mut body = json!({ "prompt": request.payload.flatten() });
            if let Some(width) = request.config.width {
                body["width"] = json!(width);
            }
            if let Some(height) = request.config.height {
                body["height"] = json!(height);
            }
            if let Some(steps) = request.config.steps {
                body["num_inference_steps"] = json!(steps);
            }
            if let Some(cfg_scale) = request.config.cfg_scale {
                body["guidance_scale"] = json!(cfg_scale);
            }
            let url = self.config.endpoint(&format!("{INFERENCE_PATH}{path}"));
            return Ok((Endpoint::Image, url, body));
        }

        match &request.payload {
            PromptPayload::Chat(messages) => {
                let body = chat_body(&path, messages, &request.config);
                Ok((Endpoint::Chat, self.config.endpoint(CHAT_PATH), body))
            }
            PromptPayload::Structured(messages) => {
                let body = inference_body(&render_instruction(messages), &request.config);
                let url = self.config.endpoint(&format!("{INFERENCE_PATH}{path}"));
                Ok((Endpoint::Inference, url, body))
            }
            PromptPayload::Flat(prompt) => {
                let body = inference_body(prompt, &request.config);
                let url = self.config.endpoint(&format!("{INFERENCE_PATH}{path}"));
                Ok((Endpoint::Inference, url, body))
            }
        }
    }

    async fn send_once(&self, endpoint: Endpoint, url: &str, api_key: &str, body: &Value) -> Result<VendorResult, VendorError> {
        let response = post_json(&self.client, url, api_key, body).await?;
        match endpoint {
            Endpoint::Inference => parse_inference_response(&response),
            Endpoint::Chat => parse_chat_response(&response),
            Endpoint::Image => parse_image_response(&response),
        }
    }
}

#[async_trait]
impl VendorClient for DeepInfraClient {
    fn name(&self) -> &'static str {
        "deepinfra"
    }

    async fn invoke(&self, request: &VendorRequest, dry_run: bool) -> Result<VendorResult, VendorFailure> {
        request.config.validate().map_err(|e| VendorError::invalid(e.to_string()))?;
        let (endpoint, url, body) = self.shape(request)?;

        if dry_run {
            debug!("Dry run: shaped DeepInfra {:?} request for {}", endpoint, url);
            return Ok(VendorResult::dry_run(request.model_type));
        }

        let api_key = require_key(self.config.api_key.as_deref(), self.name())?;
        let attempted = self
            .retry
            .run(classify_vendor_error, || self.send_once(endpoint, &url, api_key, &body))
            .await?;
        Ok(attempted.value.with_retries(attempted.retries))
    }
}

/// Hosted model path for a catalogue `(provider, model)` pair
///
/// Unmapped names containing a `/` are taken as literal DeepInfra paths.
pub fn model_path(provider: ProviderId, model: &str) -> Result<String, VendorError> {
    let mapped = match (provider, model) {
        (ProviderId::Llama2, "7b") => Some("meta-llama/Llama-2-7b-chat-hf"),
        (ProviderId::Llama2, "13b") => Some("meta-llama/Llama-2-13b-chat-hf"),
        (ProviderId::Llama2, "70b") => Some("meta-llama/Llama-2-70b-chat-hf"),
        (ProviderId::Mistral, "Mistral-7B") => Some("mistralai/Mistral-7B-Instruct-v0.1"),
        (ProviderId::Mistral, "Mistral-7B-Instruct-v0.1") => Some("mistralai/Mistral-7B-Instruct-v0.1"),
        (ProviderId::WizardCoder, "WizardCoder-34B") => Some("WizardLM/WizardCoder-Python-34B-V1.0"),
        (ProviderId::RunwayML, "stable-diffusion-v1-5") => Some("runwayml/stable-diffusion-v1-5"),
        (ProviderId::PromptHero, "openjourney") => Some("prompthero/openjourney"),
        _ => None,
    };

    match mapped {
        Some(path) => Ok(path.to_string()),
        None if model.contains('/') => Ok(model.to_string()),
        None => Err(VendorError::invalid(format!("No DeepInfra model for {provider}/{model}"))),
    }
}

/// Render a role sequence into the `[INST]` instruction format
///
/// System text is folded into the following user turn.
pub fn render_instruction(messages: &[RoleMessage]) -> String {
    let mut rendered = String::from("<s>");
    let mut system: Option<String> = None;

    for message in messages {
        match message.role {
            Role::System => {
                system = Some(match system.take() {
                    Some(existing) => format!("{existing}\n{}", message.content),
                    None => message.content.clone(),
                });
            }
            Role::User => {
                let text = match system.take() {
                    Some(system) => format!("{system}\n\n{}", message.content),
                    None => message.content.clone(),
                };
                rendered.push_str(&format!("[INST] {text} [/INST]"));
            }
            Role::Assistant => rendered.push_str(&format!("{}</s>", message.content)),
        }
    }
    if let Some(system) = system {
        rendered.push_str(&format!("[INST] {system} [/INST]"));
    }
    rendered
}

fn inference_body(prompt: &str, config: &LlmConfig) -> Value {
    let mut body = json!({
        "input": prompt,
        "max_new_tokens": config.max_tokens,
        "temperature": config.temperature
    });
    if let Some(top_p) = config.top_p {
        body["top_p"] = json!(top_p);
    }
    body
}

fn parse_inference_response(response: &Value) -> Result<VendorResult, VendorError> {
    let text = response
        .get("results")
        .and_then(|results| results.get(0))
        .and_then(|result| result.get("generated_text"))
        .and_then(|text| text.as_str())
        .ok_or_else(|| VendorError::protocol("No generated_text in response"))?;

    let status = response.get("inference_status");
    let usage = TokenUsage::new(count(status, "tokens_input"), count(status, "tokens_generated"));
    Ok(VendorResult::new(text.trim(), usage))
}

fn parse_image_response(response: &Value) -> Result<VendorResult, VendorError> {
    let image = response
        .get("images")
        .and_then(|images| images.get(0))
        .and_then(|image| image.as_str())
        .ok_or_else(|| VendorError::protocol("No image in response"))?;
    Ok(VendorResult::new(image, TokenUsage::default()))
}
