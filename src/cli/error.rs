//! CLI-level errors (wraps infrastructure errors)

use std::io::ErrorKind;

use thiserror::Error;

use crate::application::ApplicationError;
use crate::domain::DomainError;
use crate::exitcode;
use crate::infrastructure::InfraError;

/// CLI errors are the top-level error type.
/// These are what get displayed to the user.
#[derive(Error, Debug)]
pub enum CliError {
    #[error(transparent)]
    Infra(#[from] InfraError),

    #[error("{0}")]
    Usage(String),

    #[error("cannot determine current directory")]
    CurrentDir(#[source] std::io::Error),
}

impl From<ApplicationError> for CliError {
    fn from(e: ApplicationError) -> Self {
        CliError::Infra(InfraError::Application(e))
    }
}

/// Result type for CLI operations.
pub type CliResult<T> = Result<T, CliError>;

impl CliError {
    /// Get the appropriate exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Usage(_) => exitcode::USAGE,
            CliError::CurrentDir(_) => exitcode::OSERR,
            CliError::Infra(e) => infra_exit_code(e),
        }
    }
}

fn infra_exit_code(e: &InfraError) -> i32 {
    match e {
        InfraError::Application(app) => application_exit_code(app),
        InfraError::Spawn { .. } => exitcode::OSERR,
        InfraError::Command { .. } => exitcode::SOFTWARE,
        InfraError::ClientUnavailable { .. } => exitcode::UNAVAILABLE,
    }
}

fn application_exit_code(e: &ApplicationError) -> i32 {
    match e {
        ApplicationError::Domain(d) => match d {
            DomainError::InvalidCompose { .. }
            | DomainError::UnrecognizedSecretService { .. }
            | DomainError::InvalidSecretName { .. }
            | DomainError::ConflictingSecret { .. } => exitcode::DATAERR,
        },
        ApplicationError::ComposeFile { source, .. } => match source.kind() {
            ErrorKind::PermissionDenied => exitcode::NOPERM,
            _ => exitcode::NOINPUT,
        },
        ApplicationError::SecretReference { .. } => exitcode::DATAERR,
        ApplicationError::Config { .. } => exitcode::CONFIG,
        ApplicationError::SecretClient { .. } | ApplicationError::SecretDecrypt { .. } => {
            exitcode::UNAVAILABLE
        }
        ApplicationError::Command { source, .. } => infra_exit_code(source),
        ApplicationError::OperationFailed { .. } => exitcode::CANTCREAT,
    }
}
