//! Error types for the command registry

use thiserror::Error;

use crate::command::CommandError;

/// Error raised while parsing templates or rendering registry commands
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// Number of parameter bytes differs from the template's wildcard count
    #[error("Parameter count mismatch: template has {expected} wildcards, got {actual} bytes")]
    ParameterCountMismatch {
        /// Wildcards in the template
        expected: usize,
        /// Parameter bytes supplied
        actual: usize,
    },

    /// Template requires a data field but none was supplied
    #[error("Command requires a data field")]
    MissingData,

    /// Template has no data field but data was supplied
    #[error("Command does not take a data field")]
    UnexpectedData,

    /// Template requires a data field of a fixed length
    #[error("Data length mismatch: expected {expected} bytes, got {actual}")]
    DataLengthMismatch {
        /// Length mandated by the template
        expected: usize,
        /// Length supplied
        actual: usize,
    },

    /// No command registered under this name
    #[error("Unknown command: {0}")]
    UnknownCommand(String),

    /// Template notation could not be parsed
    #[error("Invalid template {template:?}: {reason}")]
    InvalidTemplate {
        /// Template text
        template: String,
        /// What is wrong with it
        reason: &'static str,
    },

    /// Rendered command is not a valid APDU
    #[error(transparent)]
    Command(#[from] CommandError),
}
