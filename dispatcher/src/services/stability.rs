//! Stability AI adapter for SDXL text-to-image

use async_trait::async_trait;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::debug;

use shared::{LlmConfig, TokenUsage};
use crate::config::VendorConfig;
use crate::core::retry::{classify_vendor_error, RetryPolicy};
use crate::error::{DispatchResult, VendorError, VendorFailure};
use crate::services::http::{build_client, post_json, require_key};
use crate::traits::VendorClient;
use crate::types::{VendorRequest, VendorResult};

/// Real Stability AI client
pub struct StabilityAiClient {
    client: reqwest::Client,
    config: VendorConfig,
    retry: RetryPolicy,
}

impl StabilityAiClient {
    pub fn new(config: VendorConfig, retry: RetryPolicy, request_timeout: Duration) -> DispatchResult<Self> {
        Ok(Self {
            client: build_client(request_timeout)?,
            config,
            retry,
        })
    }

    fn shape(&self, request: &VendorRequest) -> Result<(String, Value), VendorError> {
        if !request.model_type.is_image() {
            return Err(VendorError::invalid(format!(
                "Stability AI only serves images, not {}",
                request.model_type
            )));
        }
        let engine = engine_id(&request.model)?;
        let url = self.config.endpoint(&format!("/v1/generation/{engine}/text-to-image"));
        Ok((url, generation_body(&request.payload.flatten(), &request.config)?))
    }

    async fn send_once(&self, url: &str, api_key: &str, body: &Value) -> Result<VendorResult, VendorError> {
        let response = post_json(&self.client, url, api_key, body).await?;
        parse_artifacts(&response)
    }
}

#[async_trait]
impl VendorClient for StabilityAiClient {
    fn name(&self) -> &'static str {
        "stabilityai"
    }

    async fn invoke(&self, request: &VendorRequest, dry_run: bool) -> Result<VendorResult, VendorFailure> {
        request.config.validate().map_err(|e| VendorError::invalid(e.to_string()))?;
        let (url, body) = self.shape(request)?;

        if dry_run {
            debug!("Dry run: shaped Stability AI request for {}", url);
            return Ok(VendorResult::dry_run(request.model_type));
        }

        let api_key = require_key(self.config.api_key.as_deref(), self.name())?;
        let attempted = self
            .retry
            .run(classify_vendor_error, || self.send_once(&url, api_key, &body))
            .await?;
        Ok(attempted.value.with_retries(attempted.retries))
    }
}

fn engine_id(model: &str) -> Result<&'static str, VendorError> {
    match model {
        "sdxl" => Ok("stable-diffusion-xl-1024-v1-0"),
        other => Err(VendorError::invalid(format!("No Stability AI engine for model {other}"))),
    }
}

/// SDXL accepts dimensions in multiples of 64
fn generation_body(prompt: &str, config: &LlmConfig) -> Result<Value, VendorError> {
    let width = config.width.unwrap_or(1024);
    let height = config.height.unwrap_or(1024);
    if width % 64 != 0 || height % 64 != 0 {
        return Err(VendorError::invalid(format!(
            "Image dimensions must be multiples of 64, got {width}x{height}"
        )));
    }

    Ok(json!({
        "text_prompts": [{ "text": prompt, "weight": 1 }],
        "cfg_scale": config.cfg_scale.unwrap_or(7.0),
        "width": width,
        "height": height,
        "steps": config.steps.unwrap_or(30),
        "samples": 1
    }))
}

fn parse_artifacts(response: &Value) -> Result<VendorResult, VendorError> {
    let artifact = response
        .get("artifacts")
        .and_then(|artifacts| artifacts.get(0))
        .ok_or_else(|| VendorError::protocol("No artifacts in response"))?;

    match artifact.get("finishReason").and_then(|r| r.as_str()) {
        Some("CONTENT_FILTERED") => {
            return Err(VendorError::Rejected {
                status: 200,
                message: "Image was blocked by the content filter".to_string(),
            })
        }
        Some("ERROR") => return Err(VendorError::protocol("Generation finished with ERROR")),
        _ => {}
    }

    let image = artifact
        .get("base64")
        .and_then(|b64| b64.as_str())
        .ok_or_else(|| VendorError::protocol("Artifact has no base64 payload"))?;
    Ok(VendorResult::new(image, TokenUsage::default()))
}
