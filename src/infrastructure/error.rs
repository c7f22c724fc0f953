//! Infrastructure-level errors (wraps application errors)

use thiserror::Error;

use crate::application::ApplicationError;

/// Infrastructure errors wrap application errors and add I/O-level concerns.
#[derive(Error, Debug)]
pub enum InfraError {
    #[error(transparent)]
    Application(#[from] ApplicationError),

    #[error("failed to run {program}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{program} failed: {message}")]
    Command {
        program: String,
        message: String,
        exit_code: Option<i32>,
    },

    #[error("client unavailable: {message}")]
    ClientUnavailable { message: String },
}

impl InfraError {
    /// Build a `Command` error from a finished process.
    pub fn command(program: impl Into<String>, output: &std::process::Output) -> Self {
        Self::Command {
            program: program.into(),
            message: super::traits::combined_output(output).trim().to_string(),
            exit_code: output.status.code(),
        }
    }
}

/// Result type for infrastructure layer operations.
pub type InfraResult<T> = Result<T, InfraError>;
