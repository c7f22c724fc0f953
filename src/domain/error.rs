//! Domain-level errors (no external dependencies)

use std::path::PathBuf;
use thiserror::Error;

/// Domain errors represent violations of the compose/secret model.
/// These are independent of infrastructure concerns.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("invalid compose document {path}: {message}")]
    InvalidCompose { path: PathBuf, message: String },

    #[error("can't decrypt secret from service {service}: unrecognized reference '{reference}'")]
    UnrecognizedSecretService { service: String, reference: String },

    #[error("invalid secret name '{name}': must be non-empty without '=' or NUL")]
    InvalidSecretName { name: String },

    #[error(
        "secret {name} is declared with different references by services {first_service} ({first_reference}) and {second_service} ({second_reference})"
    )]
    ConflictingSecret {
        name: String,
        first_service: String,
        first_reference: String,
        second_service: String,
        second_reference: String,
    },
}
