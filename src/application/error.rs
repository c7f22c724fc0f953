//! Application-level errors (wraps domain errors)

use std::path::PathBuf;
use thiserror::Error;

use crate::domain::{DomainError, SecretBackend};
use crate::infrastructure::InfraError;

/// Application errors wrap domain errors and add application-level context.
#[derive(Error, Debug)]
pub enum ApplicationError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error("failed to read Compose file {path}")]
    ComposeFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("config error: {message}")]
    Config { message: String },

    #[error("secret {name} of service {service} cannot be resolved")]
    SecretReference {
        name: String,
        service: String,
        #[source]
        source: DomainError,
    },

    #[error("failed to create {backend} client to decrypt secrets")]
    SecretClient {
        backend: SecretBackend,
        #[source]
        source: Box<InfraError>,
    },

    #[error("failed to decrypt secret {name} of service {service}")]
    SecretDecrypt {
        name: String,
        service: String,
        #[source]
        source: Box<InfraError>,
    },

    #[error("{context}")]
    Command {
        context: String,
        #[source]
        source: Box<InfraError>,
    },

    #[error("operation failed: {context}")]
    OperationFailed {
        context: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

/// Result type for application layer operations.
pub type ApplicationResult<T> = Result<T, ApplicationError>;
