//! Test fixtures for dispatcher scenario tests

#![allow(dead_code)]

use chrono::{Duration, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

use dispatcher::{InMemoryTemplateStore, MockVendorClient, ModelRegistry, VendorSet};
use shared::{Environment, GenerateRequest, LlmConfig, ModelType, Role, RoleMessage, RunMode, Template, Version};

pub const OWNER: &str = "ada";
pub const PACKAGE: &str = "letters";

pub fn template(name: &str, release: Option<&str>, preview: Option<&str>) -> Template {
    Template {
        id: Uuid::new_v4(),
        owner: OWNER.to_string(),
        package: PACKAGE.to_string(),
        name: name.to_string(),
        preview_version: preview.map(str::to_string),
        release_version: release.map(str::to_string),
    }
}

pub struct VersionDef<'a> {
    pub label: &'a str,
    pub provider: &'a str,
    pub model: &'a str,
    pub model_type: ModelType,
    pub template: &'a str,
    pub messages: Vec<RoleMessage>,
}

pub fn version(template: &Template, def: VersionDef<'_>, age_minutes: i64) -> Version {
    Version {
        id: Uuid::new_v4(),
        template_id: template.id,
        label: def.label.to_string(),
        template: def.template.to_string(),
        messages: def.messages,
        provider: def.provider.to_string(),
        model: def.model.to_string(),
        model_type: def.model_type,
        llm_config: LlmConfig::default(),
        run_mode: RunMode::All,
        created_at: Utc::now() - Duration::minutes(age_minutes),
    }
}

fn flat<'a>(label: &'a str, template: &'a str) -> VersionDef<'a> {
    VersionDef {
        label,
        provider: "llama2",
        model: "7b",
        model_type: ModelType::Text2Text,
        template,
        messages: vec![],
    }
}

/// Store with one template per scenario
///
/// - `greeting`: llama2/7b flat, released as "1"
/// - `essay`: openai/gpt-4 chat, released as "1"
/// - `poster`: stabilityai/sdxl image, released as "1"
/// - `riddle`: mistral/Mistral-7B structured, released as "1"
/// - `draft`: llama2/7b with no release pointer
/// - `legacy`: falcon/40b (disabled), released as "1"
/// - `ask`: openai/gpt-4 chat whose only turn is a placeholder, released as "1"
pub fn store() -> InMemoryTemplateStore {
    let greeting = template("greeting", Some("1"), None);
    let essay = template("essay", Some("1"), None);
    let poster = template("poster", Some("1"), None);
    let riddle = template("riddle", Some("1"), None);
    let draft = template("draft", None, None);
    let legacy = template("legacy", Some("1"), None);
    let ask = template("ask", Some("1"), None);

    InMemoryTemplateStore::new()
        .with_version(version(&greeting, flat("1", "Hello {{name}}"), 60))
        .with_version(version(&greeting, flat("2", "Goodbye {{name}}"), 30))
        .with_template(greeting)
        .with_version(version(
            &essay,
            VersionDef {
                label: "1",
                provider: "openai",
                model: "gpt-4",
                model_type: ModelType::Text2Text,
                template: "",
                messages: vec![
                    RoleMessage::new(Role::System, "You write short essays."),
                    RoleMessage::new(Role::User, "Write about {{topic}} for {{name}}"),
                ],
            },
            10,
        ))
        .with_template(essay)
        .with_version(version(
            &poster,
            VersionDef {
                label: "1",
                provider: "stabilityai",
                model: "sdxl",
                model_type: ModelType::Text2Image,
                template: "A poster of {{subject:image}}",
                messages: vec![],
            },
            10,
        ))
        .with_template(poster)
        .with_version(version(
            &riddle,
            VersionDef {
                label: "1",
                provider: "mistral",
                model: "Mistral-7B",
                model_type: ModelType::Text2Text,
                template: "",
                messages: vec![
                    RoleMessage::new(Role::System, "Answer in riddles."),
                    RoleMessage::new(Role::User, "What is {{thing}}?"),
                ],
            },
            10,
        ))
        .with_template(riddle)
        .with_version(version(&draft, flat("1", "Draft for {{name}}"), 5))
        .with_template(draft)
        .with_version(version(
            &legacy,
            VersionDef {
                label: "1",
                provider: "falcon",
                model: "40b",
                model_type: ModelType::Text2Text,
                template: "Legacy {{name}}",
                messages: vec![],
            },
            5,
        ))
        .with_template(legacy)
        .with_version(version(
            &ask,
            VersionDef {
                label: "1",
                provider: "openai",
                model: "gpt-4",
                model_type: ModelType::Text2Text,
                template: "",
                messages: vec![RoleMessage::new(Role::User, "{{question}}")],
            },
            5,
        ))
        .with_template(ask)
}

pub fn request(template: &str, selector: &str, data: &[(&str, &str)]) -> GenerateRequest {
    GenerateRequest {
        username: OWNER.to_string(),
        package: PACKAGE.to_string(),
        template: template.to_string(),
        version_or_environment: selector.to_string(),
        is_development: false,
        environment: Environment::Release,
        data: data.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect::<HashMap<_, _>>(),
    }
}

pub fn registry() -> Arc<ModelRegistry> {
    Arc::new(ModelRegistry::builtin())
}

/// Mock adapter that answers to `name()` and nothing else yet
pub fn mock_vendor() -> MockVendorClient {
    let mut vendor = MockVendorClient::new();
    vendor.expect_name().return_const("mock");
    vendor
}

pub fn uniform(vendor: MockVendorClient) -> VendorSet {
    VendorSet::uniform(Arc::new(vendor))
}
