//! Dispatcher trait definitions for dependency injection

use async_trait::async_trait;
use uuid::Uuid;

use shared::{Template, TemplateRef, Version};
use crate::error::{DispatchResult, VendorFailure};
use crate::types::{VendorRequest, VendorResult};

/// Read-only access to stored templates and their versions
#[mockall::automock]
#[async_trait]
pub trait TemplateStore: Send + Sync {
    /// Find a template by owner/package/name
    async fn find_template(&self, reference: &TemplateRef) -> DispatchResult<Option<Template>>;

    /// Find a version of a template by its label
    async fn find_version(&self, template_id: Uuid, label: &str) -> DispatchResult<Option<Version>>;

    /// Newest (working) version of a template
    async fn latest_version(&self, template_id: Uuid) -> DispatchResult<Option<Version>>;
}

/// One adapter per external model vendor
#[mockall::automock]
#[async_trait]
pub trait VendorClient: Send + Sync {
    /// Vendor name used in logs
    fn name(&self) -> &'static str;

    /// Validate, shape and (unless `dry_run`) send a request, retrying transient failures
    async fn invoke(&self, request: &VendorRequest, dry_run: bool) -> Result<VendorResult, VendorFailure>;
}
