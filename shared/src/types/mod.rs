//! Core types used throughout the dispatch engine

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::errors::{SharedError, SharedResult};

/// Model vendors known to the platform catalogue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProviderId {
    OpenAI,
    Llama2,
    Mistral,
    Falcon,
    Mpt,
    StabilityAI,
    RunwayML,
    PromptHero,
    WizardCoder,
}

impl ProviderId {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderId::OpenAI => "openai",
            ProviderId::Llama2 => "llama2",
            ProviderId::Mistral => "mistral",
            ProviderId::Falcon => "falcon",
            ProviderId::Mpt => "mpt",
            ProviderId::StabilityAI => "stabilityai",
            ProviderId::RunwayML => "runwayml",
            ProviderId::PromptHero => "prompthero",
            ProviderId::WizardCoder => "WizardCoder",
        }
    }
}

impl fmt::Display for ProviderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderId {
    type Err = SharedError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "openai" => Ok(ProviderId::OpenAI),
            "llama2" => Ok(ProviderId::Llama2),
            "mistral" => Ok(ProviderId::Mistral),
            "falcon" => Ok(ProviderId::Falcon),
            "mpt" => Ok(ProviderId::Mpt),
            "stabilityai" => Ok(ProviderId::StabilityAI),
            "runwayml" => Ok(ProviderId::RunwayML),
            "prompthero" => Ok(ProviderId::PromptHero),
            "wizardcoder" => Ok(ProviderId::WizardCoder),
            _ => Err(SharedError::UnknownProvider { name: s.to_string() }),
        }
    }
}

/// Modality of a model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ModelType {
    #[serde(rename = "TEXT2TEXT")]
    Text2Text,
    #[serde(rename = "TEXT2IMAGE")]
    Text2Image,
    #[serde(rename = "TEXT2CODE")]
    Text2Code,
}

impl ModelType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModelType::Text2Text => "TEXT2TEXT",
            ModelType::Text2Image => "TEXT2IMAGE",
            ModelType::Text2Code => "TEXT2CODE",
        }
    }

    /// Image models return an encoded payload rather than text
    pub fn is_image(&self) -> bool {
        matches!(self, ModelType::Text2Image)
    }
}

impl fmt::Display for ModelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ModelType {
    type Err = SharedError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "TEXT2TEXT" => Ok(ModelType::Text2Text),
            "TEXT2IMAGE" => Ok(ModelType::Text2Image),
            "TEXT2CODE" => Ok(ModelType::Text2Code),
            _ => Err(SharedError::UnknownModelType { name: s.to_string() }),
        }
    }
}

/// Named slot a template's version pointers can occupy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Environment {
    Dev,
    Preview,
    Release,
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Environment::Dev => write!(f, "DEV"),
            Environment::Preview => write!(f, "PREVIEW"),
            Environment::Release => write!(f, "RELEASE"),
        }
    }
}

impl FromStr for Environment {
    type Err = SharedError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "DEV" => Ok(Environment::Dev),
            "PREVIEW" => Ok(Environment::Preview),
            "RELEASE" => Ok(Environment::Release),
            _ => Err(SharedError::UnknownEnvironment { name: s.to_string() }),
        }
    }
}

/// What a caller asked to run: an environment slot or a literal version label
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VersionSelector {
    Environment(Environment),
    Label(String),
}

impl VersionSelector {
    /// Environment names win over labels; anything else is taken verbatim
    pub fn parse(raw: &str) -> Self {
        match raw.parse::<Environment>() {
            Ok(env) => VersionSelector::Environment(env),
            Err(_) => VersionSelector::Label(raw.trim().to_string()),
        }
    }
}

impl fmt::Display for VersionSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VersionSelector::Environment(env) => write!(f, "{env}"),
            VersionSelector::Label(label) => write!(f, "{label}"),
        }
    }
}

/// Role-structured input capability of a model
///
/// Serialized as the integers `0`, `1` and `2` used by the catalogue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum HasRole {
    /// Single flat prompt string
    Flat,
    /// Chat roles (system/user/assistant)
    Chat,
    /// Role sequence rendered into the vendor's own instruction format
    Structured,
}

impl HasRole {
    pub fn uses_roles(&self) -> bool {
        !matches!(self, HasRole::Flat)
    }
}

impl TryFrom<u8> for HasRole {
    type Error = SharedError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(HasRole::Flat),
            1 => Ok(HasRole::Chat),
            2 => Ok(HasRole::Structured),
            other => Err(SharedError::InvalidConfig {
                field: "hasRole".to_string(),
                value: other.to_string(),
            }),
        }
    }
}

impl From<HasRole> for u8 {
    fn from(value: HasRole) -> Self {
        match value {
            HasRole::Flat => 0,
            HasRole::Chat => 1,
            HasRole::Structured => 2,
        }
    }
}

/// Conversation role of a prompt segment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

/// One segment of a role sequence
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleMessage {
    pub role: Role,
    pub content: String,
}

impl RoleMessage {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

/// Prompt definition projected for a particular model capability
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "data")]
pub enum PromptData {
    RoleSequence(Vec<RoleMessage>),
    FlatTemplate(String),
}

/// A placeholder found in a template, with the value supplied for it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Variable {
    pub key: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub value: String,
}

impl Variable {
    pub fn new(key: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            kind: kind.into(),
            value: String::new(),
        }
    }

    /// Key under which callers supply this variable's value (`type + key`)
    pub fn composite_key(&self) -> String {
        format!("{}{}", self.kind, self.key)
    }
}

/// Vendor tuning parameters stored on a version
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LlmConfig {
    pub max_tokens: u32,
    pub temperature: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub steps: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cfg_scale: Option<f32>,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            max_tokens: 256,
            temperature: 0.7,
            top_p: None,
            width: None,
            height: None,
            steps: None,
            cfg_scale: None,
        }
    }
}

impl LlmConfig {
    /// Reject values no vendor accepts
    pub fn validate(&self) -> SharedResult<()> {
        if self.max_tokens == 0 {
            return Err(SharedError::InvalidConfig {
                field: "max_tokens".to_string(),
                value: self.max_tokens.to_string(),
            });
        }
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(SharedError::InvalidConfig {
                field: "temperature".to_string(),
                value: self.temperature.to_string(),
            });
        }
        if let Some(top_p) = self.top_p {
            if !(0.0..=1.0).contains(&top_p) {
                return Err(SharedError::InvalidConfig {
                    field: "top_p".to_string(),
                    value: top_p.to_string(),
                });
            }
        }
        Ok(())
    }
}

/// Who may execute a version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum RunMode {
    /// Signed-in sessions only
    #[default]
    Session,
    /// Anonymous callers allowed
    All,
}

/// Address of a template as callers name it
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TemplateRef {
    pub username: String,
    pub package: String,
    pub template: String,
}

impl TemplateRef {
    pub fn new(username: impl Into<String>, package: impl Into<String>, template: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            package: package.into(),
            template: template.into(),
        }
    }
}

impl fmt::Display for TemplateRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.username, self.package, self.template)
    }
}

/// A named prompt with movable preview/release pointers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Template {
    pub id: Uuid,
    pub owner: String,
    pub package: String,
    pub name: String,
    #[serde(default)]
    pub preview_version: Option<String>,
    #[serde(default)]
    pub release_version: Option<String>,
}

impl Template {
    pub fn reference(&self) -> TemplateRef {
        TemplateRef::new(&self.owner, &self.package, &self.name)
    }
}

/// An immutable snapshot of a template's prompt and model binding
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Version {
    pub id: Uuid,
    pub template_id: Uuid,
    pub label: String,
    /// Flat body used by models without role support
    #[serde(default)]
    pub template: String,
    /// Role segments used by role-capable models
    #[serde(default)]
    pub messages: Vec<RoleMessage>,
    pub provider: String,
    pub model: String,
    pub model_type: ModelType,
    #[serde(default)]
    pub llm_config: LlmConfig,
    #[serde(default)]
    pub run_mode: RunMode,
    pub created_at: DateTime<Utc>,
}

impl Version {
    /// Project the stored prompt for a model's role capability
    ///
    /// A role-capable model bound to a version without messages receives the
    /// flat body as a single user turn.
    pub fn prompt_data(&self, has_role: HasRole) -> PromptData {
        if has_role.uses_roles() {
            if self.messages.is_empty() && !self.template.is_empty() {
                return PromptData::RoleSequence(vec![RoleMessage::new(Role::User, self.template.clone())]);
            }
            PromptData::RoleSequence(self.messages.clone())
        } else {
            PromptData::FlatTemplate(self.template.clone())
        }
    }
}

/// Token usage information for a vendor call
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
}

impl TokenUsage {
    pub fn new(prompt_tokens: u64, completion_tokens: u64) -> Self {
        Self {
            prompt_tokens,
            completion_tokens,
        }
    }

    pub fn total(&self) -> u64 {
        self.prompt_tokens + self.completion_tokens
    }
}
