//! Domain layer: compose model, secret discovery and classification
//!
//! This layer is independent of external concerns (no I/O, no CLI, no config loading).

pub mod compose;
pub mod error;
pub mod resolved;
pub mod secret;

pub use compose::{ComposeProject, ServiceSpec};
pub use error::DomainError;
pub use resolved::{check_duplicates, Collision, DuplicatePolicy, ResolvedEnv};
pub use secret::{
    scan_secrets, ContainerSecret, SecretBackend, SecretRef, DEFAULT_SECRET_LABEL_PREFIX,
};
