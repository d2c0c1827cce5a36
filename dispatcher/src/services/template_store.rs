//! In-memory template store backed by a JSON snapshot

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::Path;
use uuid::Uuid;

use shared::{Template, TemplateRef, Version};
use crate::error::{DispatchError, DispatchResult};
use crate::traits::TemplateStore;

/// On-disk layout: `{"templates": [...], "versions": [...]}`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoreSnapshot {
    #[serde(default)]
    pub templates: Vec<Template>,
    #[serde(default)]
    pub versions: Vec<Version>,
}

/// Read-only store over a fixed set of templates and versions
#[derive(Debug, Clone, Default)]
pub struct InMemoryTemplateStore {
    snapshot: StoreSnapshot,
}

impl InMemoryTemplateStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_snapshot(snapshot: StoreSnapshot) -> Self {
        Self { snapshot }
    }

    pub fn from_json_str(json: &str) -> DispatchResult<Self> {
        let snapshot: StoreSnapshot = serde_json::from_str(json).map_err(|e| DispatchError::Store {
            message: format!("Invalid store snapshot: {e}"),
        })?;
        Ok(Self::from_snapshot(snapshot))
    }

    pub fn from_file(path: impl AsRef<Path>) -> DispatchResult<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| DispatchError::Store {
            message: format!("Cannot read store {}: {e}", path.display()),
        })?;
        Self::from_json_str(&json)
    }

    pub fn with_template(mut self, template: Template) -> Self {
        self.snapshot.templates.push(template);
        self
    }

    pub fn with_version(mut self, version: Version) -> Self {
        self.snapshot.versions.push(version);
        self
    }

    fn versions_of(&self, template_id: Uuid) -> impl Iterator<Item = &Version> {
        self.snapshot.versions.iter().filter(move |v| v.template_id == template_id)
    }
}

#[async_trait]
impl TemplateStore for InMemoryTemplateStore {
    async fn find_template(&self, reference: &TemplateRef) -> DispatchResult<Option<Template>> {
        Ok(self
            .snapshot
            .templates
            .iter()
            .find(|t| t.owner == reference.username && t.package == reference.package && t.name == reference.template)
            .cloned())
    }

    async fn find_version(&self, template_id: Uuid, label: &str) -> DispatchResult<Option<Version>> {
        Ok(self.versions_of(template_id).find(|v| v.label == label).cloned())
    }

    async fn latest_version(&self, template_id: Uuid) -> DispatchResult<Option<Version>> {
        Ok(self.versions_of(template_id).max_by_key(|v| v.created_at).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SNAPSHOT: &str = r#"{
        "templates": [{
            "id": "6f1c1e36-52ad-4a8f-9d0c-1b1b3c1e5a01",
            "owner": "ada",
            "package": "letters",
            "name": "greeting",
            "release_version": "1"
        }],
        "versions": [
            {
                "id": "0b7c9a54-0d35-4d7e-8f43-51f0a6f3c001",
                "template_id": "6f1c1e36-52ad-4a8f-9d0c-1b1b3c1e5a01",
                "label": "1",
                "template": "Hello {{name}}",
                "provider": "llama2",
                "model": "7b",
                "model_type": "TEXT2TEXT",
                "created_at": "2023-10-01T10:00:00Z"
            },
            {
                "id": "0b7c9a54-0d35-4d7e-8f43-51f0a6f3c002",
                "template_id": "6f1c1e36-52ad-4a8f-9d0c-1b1b3c1e5a01",
                "label": "2",
                "template": "Hi {{name}}",
                "provider": "llama2",
                "model": "7b",
                "model_type": "TEXT2TEXT",
                "created_at": "2023-10-02T10:00:00Z"
            }
        ]
    }"#;

    #[tokio::test]
    async fn test_snapshot_lookups() {
        let store = InMemoryTemplateStore::from_json_str(SNAPSHOT).unwrap();
        let template = store
            .find_template(&TemplateRef::new("ada", "letters", "greeting"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(template.release_version.as_deref(), Some("1"));
        assert!(template.preview_version.is_none());

        let latest = store.latest_version(template.id).await.unwrap().unwrap();
        assert_eq!(latest.label, "2");

        let first = store.find_version(template.id, "1").await.unwrap().unwrap();
        assert_eq!(first.template, "Hello {{name}}");
        assert_eq!(first.llm_config.max_tokens, 256);

        assert!(store.find_version(template.id, "3").await.unwrap().is_none());
        assert!(store.latest_version(Uuid::new_v4()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_lookup_is_exact() {
        let store = InMemoryTemplateStore::from_json_str(SNAPSHOT).unwrap();
        let found = store
            .find_template(&TemplateRef::new("ada", "letters", "Greeting"))
            .await
            .unwrap();
        assert!(found.is_none());
    }

    #[test]
    fn test_malformed_snapshot() {
        assert!(matches!(
            InMemoryTemplateStore::from_json_str("{\"templates\": 3}"),
            Err(DispatchError::Store { .. })
        ));
        assert!(matches!(
            InMemoryTemplateStore::from_file("/nonexistent/store.json"),
            Err(DispatchError::Store { .. })
        ));
    }
}
