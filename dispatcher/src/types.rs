//! Dispatcher-specific data types

use serde::{Deserialize, Serialize};
use shared::{LlmConfig, ModelType, ProviderId, Role, RoleMessage, TokenUsage};

/// Completion returned by text adapters in dry-run mode
pub const DRY_RUN_TEXT_MARKER: &str = "[dry run] request validated; no vendor was contacted";

/// Completion returned by image adapters in dry-run mode (1x1 transparent PNG)
pub const DRY_RUN_IMAGE_MARKER: &str =
    "iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAQAAAC1HAwCAAAAC0lEQVR42mNkYAAAAAYAAjCB0C8AAAAASUVORK5CYII=";

/// Prompt already shaped for the resolved model's role capability
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "data", rename_all = "snake_case")]
pub enum PromptPayload {
    /// `hasRole = 0`
    Flat(String),
    /// `hasRole = 1`
    Chat(Vec<RoleMessage>),
    /// `hasRole = 2`, rendered by the adapter into its own instruction format
    Structured(Vec<RoleMessage>),
}

impl PromptPayload {
    pub fn is_empty(&self) -> bool {
        match self {
            PromptPayload::Flat(text) => text.trim().is_empty(),
            PromptPayload::Chat(messages) | PromptPayload::Structured(messages) => {
                messages.iter().all(|m| m.content.trim().is_empty())
            }
        }
    }

    /// Text form stored in the generation log
    pub fn to_log_string(&self) -> String {
        match self {
            PromptPayload::Flat(text) => text.clone(),
            PromptPayload::Chat(messages) | PromptPayload::Structured(messages) => {
                serde_json::to_string(messages).unwrap_or_default()
            }
        }
    }

    /// Collapse to one string for vendors without role support
    pub fn flatten(&self) -> String {
        match self {
            PromptPayload::Flat(text) => text.clone(),
            PromptPayload::Chat(messages) | PromptPayload::Structured(messages) => messages
                .iter()
                .map(|m| m.content.as_str())
                .collect::<Vec<_>>()
                .join("\n\n"),
        }
    }

    /// Role sequence view; a flat prompt becomes a single user turn
    pub fn messages(&self) -> Vec<RoleMessage> {
        match self {
            PromptPayload::Flat(text) => vec![RoleMessage::new(Role::User, text.clone())],
            PromptPayload::Chat(messages) | PromptPayload::Structured(messages) => messages.clone(),
        }
    }
}

/// Everything an adapter needs to call its vendor
#[derive(Debug, Clone, PartialEq)]
pub struct VendorRequest {
    pub provider: ProviderId,
    pub model: String,
    pub model_type: ModelType,
    pub payload: PromptPayload,
    pub config: LlmConfig,
}

/// Adapter output before normalization
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VendorResult {
    /// Text completion, or an image payload (raw base64 or data URI)
    pub completion: String,
    pub usage: TokenUsage,
    pub retries: u32,
}

impl VendorResult {
    pub fn new(completion: impl Into<String>, usage: TokenUsage) -> Self {
        Self {
            completion: completion.into(),
            usage,
            retries: 0,
        }
    }

    /// Deterministic placeholder returned instead of calling a vendor
    pub fn dry_run(model_type: ModelType) -> Self {
        let marker = if model_type.is_image() {
            DRY_RUN_IMAGE_MARKER
        } else {
            DRY_RUN_TEXT_MARKER
        };
        Self::new(marker, TokenUsage::default())
    }

    pub fn with_retries(mut self, retries: u32) -> Self {
        self.retries = retries;
        self
    }
}
