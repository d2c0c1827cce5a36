//! Generation dispatcher
//!
//! Runs one request through `resolve → substitute → invoke → normalize` and
//! returns the output together with its log record. Every request is
//! independent; the dispatcher holds no mutable state.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use shared::{dispatch_debug, dispatch_error, dispatch_info, dispatch_warn};
use shared::{
    Environment, GenerateOutput, GenerateRequest, Generation, GenerationLog, HasRole, ModelType, PromptData, TemplateRef,
    Variable, Version, VersionSelector,
};
use crate::core::extractor::{extract_variables, substitute, substitute_messages};
use crate::core::instrumentation::Stopwatch;
use crate::core::registry::ModelRegistry;
use crate::core::resolver::{ResolvedVersion, TemplateResolver};
use crate::core::stage::DispatchStage;
use crate::error::{DispatchError, DispatchResult, ErrorClass, VendorError};
use crate::services::VendorSet;
use crate::traits::TemplateStore;
use crate::types::{PromptPayload, VendorRequest, VendorResult};

/// Dispatcher with injected store and vendor adapters
pub struct Dispatcher<S>
where
    S: TemplateStore,
{
    resolver: TemplateResolver<S>,
    registry: Arc<ModelRegistry>,
    vendors: VendorSet,
    /// Bound on one invocation, retries included
    timeout: Duration,
}

impl<S> Dispatcher<S>
where
    S: TemplateStore,
{
    pub fn new(store: Arc<S>, registry: Arc<ModelRegistry>, vendors: VendorSet, timeout: Duration) -> Self {
        Self {
            resolver: TemplateResolver::new(store, registry.clone()),
            registry,
            vendors,
            timeout,
        }
    }

    /// Variables a caller must supply for the selected version
    pub async fn variables(&self, reference: &TemplateRef, selector: &VersionSelector) -> DispatchResult<Vec<Variable>> {
        let resolved = self.resolver.resolve(reference, selector).await?;
        Ok(extract_variables(&resolved.version.prompt_data(resolved.model.has_role)))
    }

    /// Run one generation request
    pub async fn dispatch(&self, request: &GenerateRequest) -> DispatchResult<Generation> {
        let request_id = Uuid::new_v4();
        let mut stage = DispatchStage::Idle;

        let result = self.run(request, request_id, &mut stage).await;
        if let Err(error) = &result {
            let failed_in = stage;
            stage.advance(DispatchStage::Failed);
            match error.class() {
                class @ (ErrorClass::Configuration | ErrorClass::VendorFault) => dispatch_error!(
                    request_id,
                    stage = %failed_in,
                    class = ?class,
                    "❌ Generation failed: {}",
                    error
                ),
                class => dispatch_warn!(
                    request_id,
                    stage = %failed_in,
                    class = ?class,
                    "❌ Generation failed: {}",
                    error
                ),
            }
        }
        result
    }

    async fn run(&self, request: &GenerateRequest, request_id: Uuid, stage: &mut DispatchStage) -> DispatchResult<Generation> {
        let reference = request.template_ref();
        let dry_run = request.is_dry_run();

        stage.advance(DispatchStage::Resolving);
        let selector = request.selector();
        let resolved = self.resolver.resolve(&reference, &selector).await?;
        self.check_enabled(&resolved, request.environment, request_id)?;
        let version = &resolved.version;
        dispatch_debug!(
            request_id,
            "Resolved {} @ {} to version {} ({}/{} {})",
            reference,
            selector,
            version.label,
            version.provider,
            version.model,
            version.model_type
        );

        stage.advance(DispatchStage::Substituting);
        let (payload, missing) = assemble_payload(version, resolved.model.has_role, &request.data);
        for key in &missing {
            dispatch_warn!(request_id, variable = %key, "Missing variable, substituting empty string");
        }
        if payload.is_empty() {
            dispatch_warn!(request_id, missing = missing.len(), "⚠️ Prompt is empty after substitution");
        }

        stage.advance(DispatchStage::Invoking);
        let stopwatch = Stopwatch::start();
        let (provider, client) = self.vendors.resolve(&version.provider)?;
        let vendor_request = VendorRequest {
            provider,
            model: version.model.clone(),
            model_type: version.model_type,
            payload,
            config: version.llm_config.clone(),
        };
        dispatch_debug!(request_id, vendor = client.name(), dry_run, "Invoking vendor");

        let result = match tokio::time::timeout(self.timeout, client.invoke(&vendor_request, dry_run)).await {
            Ok(Ok(result)) => result,
            Ok(Err(failure)) => return Err(DispatchError::from_vendor(version.provider.as_str(), failure)),
            Err(_) => {
                return Err(DispatchError::VendorTimeout {
                    provider: version.provider.clone(),
                })
            }
        };

        stage.advance(DispatchStage::Normalizing);
        let retries = result.retries;
        let output = normalize(version.model_type, result, &stopwatch)
            .map_err(|e| DispatchError::from_vendor(version.provider.as_str(), e.into()))?;
        stage.advance(DispatchStage::Done);

        let log = GenerationLog {
            output_id: output.id,
            template: reference,
            template_id: resolved.template.id,
            version: version.label.clone(),
            environment: request.environment,
            provider: version.provider.clone(),
            model: version.model.clone(),
            model_type: version.model_type,
            run_mode: version.run_mode,
            prompt: vendor_request.payload.to_log_string(),
            missing_variables: missing,
            retries,
            dry_run,
            latency_ms: output.latency_ms,
            total_tokens: output.total_tokens,
            created_at: Utc::now(),
        };

        dispatch_info!(
            request_id,
            provider = %log.provider,
            model = %log.model,
            latency_ms = log.latency_ms,
            total_tokens = log.total_tokens,
            retries,
            "✅ Generation complete for {} @ {}",
            log.template,
            log.version
        );

        Ok(Generation { output, log })
    }

    /// Disabled models only run for DEV callers
    fn check_enabled(&self, resolved: &ResolvedVersion, environment: Environment, request_id: Uuid) -> DispatchResult<()> {
        let version = &resolved.version;
        match self.registry.resolve_model(version.model_type, &version.provider, &version.model) {
            Ok(_) => Ok(()),
            Err(DispatchError::ModelDisabled { .. }) if environment == Environment::Dev => {
                dispatch_warn!(
                    request_id,
                    "⚠️ Running disabled model {}/{} for a DEV request",
                    version.provider,
                    version.model
                );
                Ok(())
            }
            Err(error) => Err(error),
        }
    }
}

/// Build the vendor payload for a model's role capability
///
/// Returns the payload and the composite keys that had no value.
pub fn assemble_payload(version: &Version, has_role: HasRole, data: &HashMap<String, String>) -> (PromptPayload, Vec<String>) {
    match version.prompt_data(has_role) {
        PromptData::FlatTemplate(body) => {
            let substitution = substitute(&body, data);
            (PromptPayload::Flat(substitution.text), substitution.missing)
        }
        PromptData::RoleSequence(messages) => {
            let (filled, missing) = substitute_messages(&messages, data);
            let payload = match has_role {
                HasRole::Structured => PromptPayload::Structured(filled),
                HasRole::Chat | HasRole::Flat => PromptPayload::Chat(filled),
            };
            (payload, missing)
        }
    }
}

/// Turn a vendor result into the canonical output
///
/// Image completions are reduced to bare base64 and must decode.
pub fn normalize(model_type: ModelType, result: VendorResult, stopwatch: &Stopwatch) -> Result<GenerateOutput, VendorError> {
    let completion = if model_type.is_image() {
        normalize_image(&result.completion)?
    } else {
        result.completion
    };
    Ok(GenerateOutput::new(completion, stopwatch.elapsed_ms(), result.usage))
}

fn normalize_image(raw: &str) -> Result<String, VendorError> {
    let trimmed = raw.trim();
    let payload = match trimmed.split_once(";base64,") {
        Some((prefix, data)) if prefix.starts_with("data:") => data,
        _ => trimmed,
    };
    if payload.is_empty() {
        return Err(VendorError::protocol("Image payload is empty"));
    }
    STANDARD
        .decode(payload)
        .map_err(|e| VendorError::protocol(format!("Image payload is not valid base64: {e}")))?;
    Ok(payload.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::DRY_RUN_IMAGE_MARKER;
    use shared::{LlmConfig, Role, RoleMessage, RunMode, TokenUsage};

    fn version(template: &str, messages: Vec<RoleMessage>) -> Version {
        Version {
            id: Uuid::new_v4(),
            template_id: Uuid::new_v4(),
            label: "1".to_string(),
            template: template.to_string(),
            messages,
            provider: "openai".to_string(),
            model: "gpt-4".to_string(),
            model_type: ModelType::Text2Text,
            llm_config: LlmConfig::default(),
            run_mode: RunMode::All,
            created_at: Utc::now(),
        }
    }

    fn data(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn test_has_role_selects_payload_shape() {
        let version = version(
            "Hello {{name}}",
            vec![
                RoleMessage::new(Role::System, "Greet people."),
                RoleMessage::new(Role::User, "Greet {{name}}"),
            ],
        );
        let values = data(&[("stringname", "Ada")]);

        let (flat, _) = assemble_payload(&version, HasRole::Flat, &values);
        assert_eq!(flat, PromptPayload::Flat("Hello Ada".to_string()));

        let (chat, _) = assemble_payload(&version, HasRole::Chat, &values);
        assert!(matches!(&chat, PromptPayload::Chat(m) if m[1].content == "Greet Ada"));

        let (structured, _) = assemble_payload(&version, HasRole::Structured, &values);
        assert!(matches!(&structured, PromptPayload::Structured(m) if m.len() == 2));
    }

    #[test]
    fn test_missing_role_variable_is_blank_and_recorded() {
        let version = version("", vec![RoleMessage::new(Role::User, "Write about {{topic}} for {{name}}")]);
        let (payload, missing) = assemble_payload(&version, HasRole::Chat, &data(&[("stringname", "Ada")]));

        assert_eq!(
            payload,
            PromptPayload::Chat(vec![RoleMessage::new(Role::User, "Write about  for Ada")])
        );
        assert_eq!(missing, vec!["stringtopic".to_string()]);
    }

    #[test]
    fn test_normalize_text_passes_through() {
        let result = VendorResult::new("Hello Ada", TokenUsage::new(3, 2));
        let output = normalize(ModelType::Text2Text, result, &Stopwatch::start()).unwrap();
        assert_eq!(output.completion, "Hello Ada");
        assert_eq!(output.total_tokens, 5);
    }

    #[test]
    fn test_normalize_image_strips_data_uri() {
        let uri = format!("data:image/png;base64,{DRY_RUN_IMAGE_MARKER}");
        let output = normalize(ModelType::Text2Image, VendorResult::new(uri, TokenUsage::default()), &Stopwatch::start()).unwrap();
        assert_eq!(output.completion, DRY_RUN_IMAGE_MARKER);
    }

    #[test]
    fn test_normalize_rejects_non_base64_images() {
        let result = VendorResult::new("https://cdn.example.com/image.png", TokenUsage::default());
        assert!(matches!(
            normalize(ModelType::Text2Image, result, &Stopwatch::start()),
            Err(VendorError::Protocol { .. })
        ));
        let empty = VendorResult::new("", TokenUsage::default());
        assert!(normalize(ModelType::Text2Image, empty, &Stopwatch::start()).is_err());
    }
}
