//! Dispatcher error types

use std::time::Duration;
use thiserror::Error;

use shared::{ModelType, SharedError, TemplateRef};

/// Result type for dispatcher operations
pub type DispatchResult<T> = Result<T, DispatchError>;

/// How a caller should react to a failed dispatch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// The user must change the request (variables, version, model choice)
    UserInput,
    /// Transient; the same request may succeed later
    RetryLater,
    /// Catalogue, credentials or deployment are wrong
    Configuration,
    /// The vendor broke its response contract
    VendorFault,
}

/// Dispatcher error types
#[derive(Error, Debug)]
pub enum DispatchError {
    #[error("Provider not found: {provider}")]
    ProviderNotFound { provider: String },

    #[error("Model not found: {model_type}/{provider}/{model}")]
    ModelNotFound { model_type: ModelType, provider: String, model: String },

    #[error("Model disabled: {model_type}/{provider}/{model}")]
    ModelDisabled { model_type: ModelType, provider: String, model: String },

    #[error("Template not found: {template}")]
    TemplateNotFound { template: TemplateRef },

    #[error("No version of {template} bound to {selector}")]
    VersionNotFound { template: TemplateRef, selector: String },

    #[error("Invalid request: {message}")]
    InvalidRequest { message: String },

    #[error("Vendor authentication failed for {provider}: {message}")]
    VendorAuth { provider: String, message: String },

    #[error("Vendor {provider} rate limited the request after {retries} retries")]
    VendorRateLimited { provider: String, retries: u32 },

    #[error("Vendor {provider} timed out")]
    VendorTimeout { provider: String },

    #[error("Vendor {provider} unavailable: {message}")]
    VendorUnavailable { provider: String, message: String },

    #[error("Vendor {provider} rejected the request ({status}): {message}")]
    VendorRejected { provider: String, status: u16, message: String },

    #[error("Malformed response from {provider}: {message}")]
    VendorProtocol { provider: String, message: String },

    #[error("Template store error: {message}")]
    Store { message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },
}

impl DispatchError {
    /// Attach the provider name to an adapter failure
    pub fn from_vendor(provider: impl Into<String>, error: VendorFailure) -> Self {
        let provider = provider.into();
        let VendorFailure { error, retries } = error;
        match error {
            VendorError::Auth { message, .. } => DispatchError::VendorAuth { provider, message },
            VendorError::RateLimited { .. } => DispatchError::VendorRateLimited { provider, retries },
            VendorError::Timeout => DispatchError::VendorTimeout { provider },
            VendorError::Unavailable { message, .. } => DispatchError::VendorUnavailable { provider, message },
            VendorError::Rejected { status, message } => DispatchError::VendorRejected { provider, status, message },
            VendorError::Protocol { message } => DispatchError::VendorProtocol { provider, message },
            VendorError::InvalidRequest { message } => DispatchError::InvalidRequest { message },
        }
    }

    pub fn class(&self) -> ErrorClass {
        match self {
            DispatchError::ModelDisabled { .. }
            | DispatchError::TemplateNotFound { .. }
            | DispatchError::VersionNotFound { .. }
            | DispatchError::InvalidRequest { .. }
            | DispatchError::VendorRejected { .. } => ErrorClass::UserInput,
            DispatchError::VendorRateLimited { .. }
            | DispatchError::VendorTimeout { .. }
            | DispatchError::VendorUnavailable { .. }
            | DispatchError::Store { .. } => ErrorClass::RetryLater,
            DispatchError::ProviderNotFound { .. }
            | DispatchError::ModelNotFound { .. }
            | DispatchError::VendorAuth { .. }
            | DispatchError::Config { .. } => ErrorClass::Configuration,
            DispatchError::VendorProtocol { .. } => ErrorClass::VendorFault,
        }
    }
}

impl From<SharedError> for DispatchError {
    fn from(error: SharedError) -> Self {
        match error {
            SharedError::UnknownProvider { name } => DispatchError::ProviderNotFound { provider: name },
            other => DispatchError::Config { message: other.to_string() },
        }
    }
}

/// Failure of a single vendor call, as classified by an adapter
#[derive(Error, Debug, Clone, PartialEq)]
pub enum VendorError {
    #[error("authentication failed ({status}): {message}")]
    Auth { status: u16, message: String },

    #[error("rate limited")]
    RateLimited { retry_after: Option<Duration> },

    #[error("request timed out")]
    Timeout,

    #[error("service unavailable: {message}")]
    Unavailable { status: Option<u16>, message: String },

    #[error("request rejected ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("malformed response: {message}")]
    Protocol { message: String },

    #[error("invalid request: {message}")]
    InvalidRequest { message: String },
}

impl VendorError {
    /// Map a non-success HTTP status to its failure class
    pub fn from_status(status: u16, retry_after: Option<Duration>, body: &str) -> Self {
        let message = summarize_body(body);
        match status {
            401 | 403 => VendorError::Auth { status, message },
            408 => VendorError::Timeout,
            429 => VendorError::RateLimited { retry_after },
            500..=599 => VendorError::Unavailable { status: Some(status), message },
            _ => VendorError::Rejected { status, message },
        }
    }

    /// Map a transport failure (no HTTP status available)
    pub fn from_transport(error: &reqwest::Error) -> Self {
        if error.is_timeout() {
            VendorError::Timeout
        } else if error.is_decode() {
            VendorError::Protocol { message: error.to_string() }
        } else if let Some(status) = error.status() {
            VendorError::from_status(status.as_u16(), None, "")
        } else {
            VendorError::Unavailable { status: None, message: error.to_string() }
        }
    }

    /// Timeouts, 5xx, connection failures and rate limits
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            VendorError::RateLimited { .. } | VendorError::Timeout | VendorError::Unavailable { .. }
        )
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        VendorError::InvalidRequest { message: message.into() }
    }

    pub fn protocol(message: impl Into<String>) -> Self {
        VendorError::Protocol { message: message.into() }
    }
}

/// A vendor error together with the retries spent before giving up
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{error} (after {retries} retries)")]
pub struct VendorFailure {
    pub error: VendorError,
    pub retries: u32,
}

impl From<VendorError> for VendorFailure {
    fn from(error: VendorError) -> Self {
        Self { error, retries: 0 }
    }
}

/// Vendors often return large HTML or JSON error bodies
fn summarize_body(body: &str) -> String {
    const LIMIT: usize = 200;
    let trimmed = body.trim();
    if trimmed.chars().count() <= LIMIT {
        trimmed.to_string()
    } else {
        let head: String = trimmed.chars().take(LIMIT).collect();
        format!("{head}...")
    }
}
