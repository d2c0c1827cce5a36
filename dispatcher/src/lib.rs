//! Generation dispatch engine
//!
//! Resolves stored prompt templates, substitutes caller variables according to
//! the target model's role capability, invokes the matching model vendor with
//! retry and normalizes the result into one output shape.

pub mod config;
pub mod core;
pub mod error;
pub mod services;
pub mod traits;
pub mod types;

// Re-export main types
pub use config::{EngineConfig, VendorConfig};
pub use crate::core::{Catalogue, DispatchStage, Dispatcher, ModelRegistry, RetryPolicy};
pub use error::{DispatchError, DispatchResult, ErrorClass, VendorError, VendorFailure};
pub use services::{InMemoryTemplateStore, VendorSet};
pub use traits::*;
pub use types::*;
