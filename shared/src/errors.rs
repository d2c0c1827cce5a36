//! Shared error types for the dispatch engine

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SharedError {
    #[error("Unknown provider: {name}")]
    UnknownProvider { name: String },

    #[error("Unknown model type: {name}")]
    UnknownModelType { name: String },

    #[error("Unknown environment: {name}")]
    UnknownEnvironment { name: String },

    #[error("Invalid configuration: {field} = {value}")]
    InvalidConfig { field: String, value: String },
}

pub type SharedResult<T> = Result<T, SharedError>;
