//! Shared types for the generation dispatch engine
//!
//! Contains the domain records exchanged with the engine's collaborators
//! (template store, calling service, log persistence) and the common
//! logging bootstrap.

pub mod types;
pub mod errors;
pub mod logging;
pub mod messages;

pub use types::*;
pub use errors::*;

pub use messages::{GenerateOutput, GenerateRequest, Generation, GenerationLog};
