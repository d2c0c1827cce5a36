//! Template resolution: (template, version-or-environment) → concrete version

use std::sync::Arc;

use shared::{Environment, Template, TemplateRef, Version, VersionSelector};
use crate::core::registry::{ModelDescriptor, ModelRegistry};
use crate::error::{DispatchError, DispatchResult};
use crate::traits::TemplateStore;

/// A version together with its template and catalogue entry
#[derive(Debug, Clone)]
pub struct ResolvedVersion {
    pub template: Template,
    pub version: Version,
    pub model: ModelDescriptor,
}

/// Resolves selectors against an external template store
pub struct TemplateResolver<S>
where
    S: TemplateStore,
{
    store: Arc<S>,
    registry: Arc<ModelRegistry>,
}

impl<S> TemplateResolver<S>
where
    S: TemplateStore,
{
    pub fn new(store: Arc<S>, registry: Arc<ModelRegistry>) -> Self {
        Self { store, registry }
    }

    /// PREVIEW/RELEASE follow the template's pointers, DEV takes the newest
    /// version, anything else is a literal label. Never falls back.
    pub async fn resolve(&self, reference: &TemplateRef, selector: &VersionSelector) -> DispatchResult<ResolvedVersion> {
        let template = self
            .store
            .find_template(reference)
            .await?
            .ok_or_else(|| DispatchError::TemplateNotFound {
                template: reference.clone(),
            })?;

        let version = match selector {
            VersionSelector::Environment(Environment::Dev) => self.store.latest_version(template.id).await?,
            VersionSelector::Environment(Environment::Preview) => {
                self.find_pointer(&template, template.preview_version.as_deref()).await?
            }
            VersionSelector::Environment(Environment::Release) => {
                self.find_pointer(&template, template.release_version.as_deref()).await?
            }
            VersionSelector::Label(label) => self.store.find_version(template.id, label).await?,
        };

        let version = version.ok_or_else(|| DispatchError::VersionNotFound {
            template: reference.clone(),
            selector: selector.to_string(),
        })?;

        let model = self
            .registry
            .lookup_model(version.model_type, &version.provider, &version.model)?
            .clone();

        Ok(ResolvedVersion {
            template,
            version,
            model,
        })
    }

    async fn find_pointer(&self, template: &Template, label: Option<&str>) -> DispatchResult<Option<Version>> {
        match label {
            Some(label) => self.store.find_version(template.id, label).await,
            None => Ok(None),
        }
    }
}
