//! Local task network
//!
//! Local tasks join a dedicated bridge network where the credentials
//! endpoints container answers on the link-local address tasks expect
//! (`169.254.170.2`). Both are created once and reused by later runs.

use std::sync::Arc;

use tracing::debug;

use crate::application::{ApplicationError, ApplicationResult};
use crate::config::Settings;
use crate::infrastructure::traits::CommandRunner;
use crate::infrastructure::InfraError;

/// What happened to the endpoints container.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndpointsAction {
    AlreadyRunning,
    Started,
    Created,
}

/// Outcome of [`NetworkService::setup`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkSetup {
    pub network: String,
    pub network_created: bool,
    pub endpoints: EndpointsAction,
}

/// Ensures the local network and endpoints container exist.
pub struct NetworkService {
    cmd: Arc<dyn CommandRunner>,
    settings: Arc<Settings>,
}

impl NetworkService {
    pub fn new(cmd: Arc<dyn CommandRunner>, settings: Arc<Settings>) -> Self {
        Self { cmd, settings }
    }

    /// Create the network and start the endpoints container if needed.
    pub fn setup(&self) -> ApplicationResult<NetworkSetup> {
        let network_created = self.ensure_network()?;
        let endpoints = self.ensure_endpoints()?;
        Ok(NetworkSetup {
            network: self.settings.network.name.clone(),
            network_created,
            endpoints,
        })
    }

    fn ensure_network(&self) -> ApplicationResult<bool> {
        let net = &self.settings.network;
        let inspect = self.docker(&["network", "inspect", &net.name], "inspect network")?;
        if inspect.status.success() {
            debug!("ensure_network: {} exists", net.name);
            return Ok(false);
        }

        debug!("ensure_network: creating {}", net.name);
        self.docker_ok(
            &[
                "network",
                "create",
                "--driver",
                "bridge",
                "--attachable",
                "--subnet",
                &net.subnet,
                "--gateway",
                &net.gateway,
                &net.name,
            ],
            &format!("create network {}", net.name),
        )?;
        Ok(true)
    }

    fn ensure_endpoints(&self) -> ApplicationResult<EndpointsAction> {
        let net = &self.settings.network;
        let filter = format!("name=^/{}$", net.endpoints_container);
        let ps = self.docker_ok(
            &["ps", "-a", "--filter", &filter, "--format", "{{.State}}"],
            "list containers",
        )?;
        let state = String::from_utf8_lossy(&ps.stdout).trim().to_string();
        debug!(
            "ensure_endpoints: {} state='{}'",
            net.endpoints_container, state
        );

        match state.as_str() {
            "running" => Ok(EndpointsAction::AlreadyRunning),
            "" => {
                let aws_mount = format!("{}:/home/.aws/", net.aws_dir.display());
                let profile = format!(
                    "AWS_PROFILE={}",
                    self.settings.aws.profile.as_deref().unwrap_or("default")
                );
                self.docker_ok(
                    &[
                        "run",
                        "-d",
                        "--name",
                        &net.endpoints_container,
                        "--network",
                        &net.name,
                        "--ip",
                        &net.endpoints_ip,
                        "-v",
                        "/var/run:/var/run",
                        "-v",
                        &aws_mount,
                        "-e",
                        "HOME=/home",
                        "-e",
                        &profile,
                        &net.endpoints_image,
                    ],
                    &format!("run container {}", net.endpoints_container),
                )?;
                Ok(EndpointsAction::Created)
            }
            _ => {
                self.docker_ok(
                    &["start", &net.endpoints_container],
                    &format!("start container {}", net.endpoints_container),
                )?;
                Ok(EndpointsAction::Started)
            }
        }
    }

    fn docker(&self, args: &[&str], action: &str) -> ApplicationResult<std::process::Output> {
        let program = &self.settings.network.docker_command;
        self.cmd
            .run(program, args)
            .map_err(|e| ApplicationError::Command {
                context: format!("failed to {action}"),
                source: Box::new(InfraError::Spawn {
                    program: program.clone(),
                    source: e,
                }),
            })
    }

    fn docker_ok(&self, args: &[&str], action: &str) -> ApplicationResult<std::process::Output> {
        let output = self.docker(args, action)?;
        if !output.status.success() {
            return Err(ApplicationError::Command {
                context: format!("failed to {action}"),
                source: Box::new(InfraError::command(
                    &self.settings.network.docker_command,
                    &output,
                )),
            });
        }
        Ok(output)
    }
}
