//! Dispatch engine core logic

pub mod dispatch;
pub mod extractor;
pub mod instrumentation;
pub mod registry;
pub mod resolver;
pub mod retry;
pub mod stage;

pub use dispatch::{assemble_payload, normalize, Dispatcher};
pub use extractor::{extract_variables, substitute, substitute_messages, Substitution};
pub use instrumentation::{Stopwatch, TokenUsage};
pub use registry::{Catalogue, ModelDescriptor, ModelRegistry, ModelTypeEntry, ProviderDescriptor};
pub use resolver::{ResolvedVersion, TemplateResolver};
pub use retry::{classify_vendor_error, Attempted, RetryDecision, RetryPolicy};
pub use stage::DispatchStage;
