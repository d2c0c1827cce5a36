//! Provider/model catalogue
//!
//! The catalogue is an immutable value built once at startup (the built-in
//! platform catalogue or a JSON file) and shared through `Arc`.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use shared::{HasRole, ModelType};
use crate::error::{DispatchError, DispatchResult};

/// A model (or provider) entry in the catalogue
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelDescriptor {
    pub name: String,
    pub label: String,
    pub enabled: bool,
    pub has_role: HasRole,
}

/// Providers carry the same descriptor shape as models
pub type ProviderDescriptor = ModelDescriptor;

impl ModelDescriptor {
    pub fn new(name: &str, label: &str, enabled: bool, has_role: HasRole) -> Self {
        Self {
            name: name.to_string(),
            label: label.to_string(),
            enabled,
            has_role,
        }
    }
}

/// Catalogue section for one modality
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelTypeEntry {
    pub label: String,
    pub enabled: bool,
    pub default_provider: String,
    pub default_model: String,
    pub providers: Vec<ProviderDescriptor>,
    pub models: BTreeMap<String, Vec<ModelDescriptor>>,
}

impl ModelTypeEntry {
    /// Provider names match without regard to case, like `ProviderId`
    fn find_model(&self, provider: &str, model: &str) -> Option<&ModelDescriptor> {
        self.models
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(provider))?
            .1
            .iter()
            .find(|m| m.name == model)
    }

    fn find_provider(&self, provider: &str) -> Option<&ProviderDescriptor> {
        self.providers.iter().find(|p| p.name.eq_ignore_ascii_case(provider))
    }
}

/// Full catalogue; every modality is always present
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Catalogue {
    #[serde(rename = "TEXT2TEXT")]
    pub text2text: ModelTypeEntry,
    #[serde(rename = "TEXT2IMAGE")]
    pub text2image: ModelTypeEntry,
    #[serde(rename = "TEXT2CODE")]
    pub text2code: ModelTypeEntry,
}

impl Catalogue {
    pub fn entry(&self, model_type: ModelType) -> &ModelTypeEntry {
        match model_type {
            ModelType::Text2Text => &self.text2text,
            ModelType::Text2Image => &self.text2image,
            ModelType::Text2Code => &self.text2code,
        }
    }

    pub fn from_json_str(json: &str) -> DispatchResult<Self> {
        serde_json::from_str(json).map_err(|e| DispatchError::Config {
            message: format!("Invalid catalogue: {e}"),
        })
    }

    pub fn from_file(path: impl AsRef<Path>) -> DispatchResult<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| DispatchError::Config {
            message: format!("Cannot read catalogue {}: {e}", path.display()),
        })?;
        Self::from_json_str(&json)
    }

    /// Every modality's default provider/model pair must exist
    pub fn validate(&self) -> DispatchResult<()> {
        for model_type in [ModelType::Text2Text, ModelType::Text2Image, ModelType::Text2Code] {
            let entry = self.entry(model_type);
            if entry.find_model(&entry.default_provider, &entry.default_model).is_none() {
                return Err(DispatchError::Config {
                    message: format!(
                        "Default {}/{} for {} is not in the catalogue",
                        entry.default_provider, entry.default_model, model_type
                    ),
                });
            }
        }
        Ok(())
    }

    /// The platform's built-in catalogue
    pub fn builtin() -> Self {
        use HasRole::{Chat, Flat, Structured};
        let m = ModelDescriptor::new;

        let text2text = ModelTypeEntry {
            label: "Text-to-Text".to_string(),
            enabled: true,
            default_provider: "llama2".to_string(),
            default_model: "7b".to_string(),
            providers: vec![
                m("llama2", "Llama2", true, Flat),
                m("mistral", "Mistral", true, Flat),
                m("openai", "OpenAI", true, Flat),
                m("falcon", "Falcon", false, Flat),
                m("mpt", "MPT", false, Flat),
            ],
            models: BTreeMap::from([
                (
                    "openai".to_string(),
                    vec![
                        m("gpt-3.5-turbo", "Gpt 3.5 Turbo", true, Chat),
                        m("gpt-4", "Gpt 4", true, Chat),
                    ],
                ),
                (
                    "llama2".to_string(),
                    vec![
                        m("7b", "7B", true, Flat),
                        m("13b", "13B", true, Flat),
                        m("70b", "70B", true, Flat),
                    ],
                ),
                (
                    "falcon".to_string(),
                    vec![
                        m("7b", "7B", false, Flat),
                        m("40b", "40B", false, Flat),
                        m("180b", "180B", false, Flat),
                    ],
                ),
                (
                    "mpt".to_string(),
                    vec![m("7b", "7B", false, Flat), m("30b", "30B", false, Flat)],
                ),
                (
                    "mistral".to_string(),
                    vec![
                        m("Mistral-7B", "Mistral-7B", true, Structured),
                        m("Mistral-7B-Instruct-v0.1", "Mistral-7B-Instruct", true, Flat),
                    ],
                ),
            ]),
        };

        let text2image = ModelTypeEntry {
            label: "Text-to-Image".to_string(),
            enabled: true,
            default_provider: "stabilityai".to_string(),
            default_model: "sdxl".to_string(),
            providers: vec![
                m("openai", "Open AI", true, Flat),
                m("runwayml", "Runway ML", true, Flat),
                m("prompthero", "Prompt Hero", true, Flat),
                m("stabilityai", "Stability AI", true, Flat),
            ],
            models: BTreeMap::from([
                ("stabilityai".to_string(), vec![m("sdxl", "Stable Diffusion XL 1.0", true, Flat)]),
                ("openai".to_string(), vec![m("dall-e", "Dall-E-3", true, Flat)]),
                (
                    "runwayml".to_string(),
                    vec![m("stable-diffusion-v1-5", "Stable Diffusion V1-5", true, Flat)],
                ),
                ("prompthero".to_string(), vec![m("openjourney", "Open Journey", true, Flat)]),
            ]),
        };

        let text2code = ModelTypeEntry {
            label: "Text-to-Code".to_string(),
            enabled: true,
            default_provider: "WizardCoder".to_string(),
            default_model: "WizardCoder-34B".to_string(),
            providers: vec![m("WizardCoder", "Wizard Coder", true, Flat)],
            models: BTreeMap::from([(
                "WizardCoder".to_string(),
                vec![m("WizardCoder-34B", "WizardCoder-34B", true, Flat)],
            )]),
        };

        Self {
            text2text,
            text2image,
            text2code,
        }
    }
}

/// Read-only lookups over a validated catalogue
#[derive(Debug, Clone)]
pub struct ModelRegistry {
    catalogue: Catalogue,
}

impl ModelRegistry {
    pub fn new(catalogue: Catalogue) -> DispatchResult<Self> {
        catalogue.validate()?;
        Ok(Self { catalogue })
    }

    pub fn builtin() -> Self {
        Self {
            catalogue: Catalogue::builtin(),
        }
    }

    /// Find a model regardless of its `enabled` flag
    pub fn lookup_model(&self, model_type: ModelType, provider: &str, model: &str) -> DispatchResult<&ModelDescriptor> {
        self.catalogue
            .entry(model_type)
            .find_model(provider, model)
            .ok_or_else(|| DispatchError::ModelNotFound {
                model_type,
                provider: provider.to_string(),
                model: model.to_string(),
            })
    }

    /// Find a model that may be run
    ///
    /// Fails with `ModelDisabled` when the model, its provider or its
    /// modality is switched off.
    pub fn resolve_model(&self, model_type: ModelType, provider: &str, model: &str) -> DispatchResult<&ModelDescriptor> {
        let descriptor = self.lookup_model(model_type, provider, model)?;
        let entry = self.catalogue.entry(model_type);
        let provider_enabled = entry.find_provider(provider).map(|p| p.enabled).unwrap_or(true);

        if !descriptor.enabled || !provider_enabled || !entry.enabled {
            return Err(DispatchError::ModelDisabled {
                model_type,
                provider: provider.to_string(),
                model: model.to_string(),
            });
        }
        Ok(descriptor)
    }

    /// Default `(provider, model)` for a modality
    pub fn get_default(&self, model_type: ModelType) -> (&str, &str) {
        let entry = self.catalogue.entry(model_type);
        (entry.default_provider.as_str(), entry.default_model.as_str())
    }
}
