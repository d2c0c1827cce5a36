//! Dispatcher services implementations

pub mod http;
pub mod openai;
pub mod deepinfra;
pub mod stability;
pub mod vendor_set;
pub mod template_store;

#[cfg(test)]
pub mod tests;

pub use openai::OpenAiClient;
pub use deepinfra::DeepInfraClient;
pub use stability::StabilityAiClient;
pub use vendor_set::VendorSet;
pub use template_store::{InMemoryTemplateStore, StoreSnapshot};
