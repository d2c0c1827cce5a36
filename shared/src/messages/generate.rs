//! Calling service ↔ engine generation messages

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

use crate::types::{Environment, ModelType, RunMode, TemplateRef, TokenUsage, VersionSelector};

/// A request to run one template version
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateRequest {
    pub username: String,
    pub package: String,
    pub template: String,
    pub version_or_environment: String,
    /// Dry-run switch: shape the request but never contact a vendor
    #[serde(default)]
    pub is_development: bool,
    pub environment: Environment,
    /// Values keyed by `type + key`
    #[serde(default)]
    pub data: HashMap<String, String>,
}

impl GenerateRequest {
    pub fn template_ref(&self) -> TemplateRef {
        TemplateRef::new(&self.username, &self.package, &self.template)
    }

    pub fn selector(&self) -> VersionSelector {
        VersionSelector::parse(&self.version_or_environment)
    }

    pub fn is_dry_run(&self) -> bool {
        self.is_development
    }
}

/// Canonical result of a generation, whatever the vendor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerateOutput {
    pub id: Uuid,
    /// Plain text for text models, base64 payload for image models
    pub completion: String,
    pub latency_ms: u64,
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub total_tokens: u64,
}

impl GenerateOutput {
    pub fn new(completion: String, latency_ms: u64, usage: TokenUsage) -> Self {
        Self {
            id: Uuid::new_v4(),
            completion,
            latency_ms,
            prompt_tokens: usage.prompt_tokens,
            completion_tokens: usage.completion_tokens,
            total_tokens: usage.total(),
        }
    }
}

/// Instrumentation captured for the logging collaborator
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationLog {
    pub output_id: Uuid,
    pub template: TemplateRef,
    pub template_id: Uuid,
    pub version: String,
    pub environment: Environment,
    pub provider: String,
    pub model: String,
    pub model_type: ModelType,
    pub run_mode: RunMode,
    /// Flat prompt, or the role sequence as JSON
    pub prompt: String,
    pub missing_variables: Vec<String>,
    pub retries: u32,
    pub dry_run: bool,
    pub latency_ms: u64,
    pub total_tokens: u64,
    pub created_at: DateTime<Utc>,
}

/// Everything a dispatch hands back to its caller
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Generation {
    pub output: GenerateOutput,
    pub log: GenerationLog,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_wire_format() {
        let json = r#"{
            "username": "ada",
            "package": "greetings",
            "template": "hello",
            "versionOrEnvironment": "release",
            "isDevelopment": true,
            "environment": "DEV",
            "data": {"stringname": "Ada"}
        }"#;

        let request: GenerateRequest = serde_json::from_str(json).unwrap();
        assert!(request.is_dry_run());
        assert_eq!(request.environment, Environment::Dev);
        assert_eq!(request.selector(), VersionSelector::Environment(Environment::Release));
        assert_eq!(request.template_ref().to_string(), "ada/greetings/hello");
        assert_eq!(request.data.get("stringname").map(String::as_str), Some("Ada"));
    }

    #[test]
    fn test_output_totals_tokens() {
        let output = GenerateOutput::new("hi".to_string(), 12, TokenUsage::new(5, 7));
        assert_eq!(output.total_tokens, 12);
        assert_eq!(output.prompt_tokens, 5);
        assert_eq!(output.completion_tokens, 7);
    }
}
