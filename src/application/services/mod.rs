//! Application services
//!
//! Concrete service implementations that orchestrate domain logic.
//! Services depend on I/O boundary traits (FileSystem, CommandRunner, etc.)
//! but are themselves concrete structs, not traits.

mod compose;
mod network;
mod secrets;
mod up;

pub use compose::ComposeService;
pub use network::{EndpointsAction, NetworkService, NetworkSetup};
pub use secrets::{ClassifiedSecret, SecretService};
pub use up::{UpOptions, UpReport, UpService};
