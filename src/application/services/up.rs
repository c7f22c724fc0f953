//! `up` use case: load, resolve secrets, set up the network, launch
//!
//! Nothing outside the process is touched until the Compose file is loaded
//! and every secret is resolved. A failure in either step leaves no network,
//! container or compose project behind.

use std::path::PathBuf;
use std::sync::Arc;

use tracing::{debug, info, instrument};

use crate::application::services::{ComposeService, NetworkService, NetworkSetup, SecretService};
use crate::application::ApplicationResult;
use crate::config::Settings;

/// Options of one `up` run.
#[derive(Debug, Clone, Default)]
pub struct UpOptions {
    /// Compose file overriding the configured one
    pub output: Option<PathBuf>,
    /// Skip network and endpoints container setup
    pub skip_network: bool,
}

/// What an `up` run did.
#[derive(Debug, Clone)]
pub struct UpReport {
    pub compose_file: PathBuf,
    /// Names of the variables injected into the compose process
    pub secrets: Vec<String>,
    pub network: Option<NetworkSetup>,
    /// Combined stdout and stderr of the compose process
    pub output: String,
}

/// Runs a local Compose project with its secrets injected.
pub struct UpService {
    compose: ComposeService,
    secrets: SecretService,
    network: NetworkService,
    settings: Arc<Settings>,
}

impl UpService {
    pub fn new(
        compose: ComposeService,
        secrets: SecretService,
        network: NetworkService,
        settings: Arc<Settings>,
    ) -> Self {
        Self {
            compose,
            secrets,
            network,
            settings,
        }
    }

    #[instrument(skip(self))]
    pub fn up(&mut self, options: &UpOptions) -> ApplicationResult<UpReport> {
        let path = self.compose.compose_path(options.output.as_deref());
        let project = self.compose.load(&path)?;

        let declared = self.secrets.scan(&project);
        let env = self.secrets.resolve_all(&declared)?;
        info!("resolved {} secrets for {}", env.len(), path.display());

        let network = if self.settings.network.enabled && !options.skip_network {
            Some(self.network.setup()?)
        } else {
            debug!("up: network setup skipped");
            None
        };

        let output = self.compose.up(&project, &env)?;

        Ok(UpReport {
            compose_file: path,
            secrets: env.names().map(str::to_string).collect(),
            network,
            output,
        })
    }

    /// Secret service of this run, e.g. to see which clients were created.
    pub fn secret_service(&self) -> &SecretService {
        &self.secrets
    }
}
