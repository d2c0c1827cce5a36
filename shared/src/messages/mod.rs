//! Message types exchanged with the engine's collaborators
//!
//! - `generate`: generation requests from the calling service, and the
//!   output/log records handed back for display and persistence

pub mod generate;

pub use generate::{GenerateOutput, GenerateRequest, Generation, GenerationLog};
