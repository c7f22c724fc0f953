//! Run ECS task definitions locally.
//!
//! `ecs-local up` reads the Compose file derived from a task definition,
//! resolves the secrets its services declare in labels from Secrets Manager
//! or Parameter Store, and starts the project with those secrets as the
//! environment of `docker-compose`.

pub mod application;
pub mod cli;
pub mod config;
pub mod domain;
pub mod exitcode;
pub mod infrastructure;
pub mod util;
