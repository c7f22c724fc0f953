//! Service container for dependency injection
//!
//! Wires up all services with their dependencies.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::application::services::{ComposeService, NetworkService, SecretService, UpService};
use crate::config::Settings;
use crate::infrastructure::aws::AwsCliDecrypterFactory;
use crate::infrastructure::traits::{
    CommandRunner, DecrypterFactory, FileSystem, RealCommandRunner, RealFileSystem,
};

/// Container holding the I/O boundaries shared by all services.
///
/// Services are cheap to build and created per call; secret clients are
/// created lazily inside [`SecretService`].
pub struct ServiceContainer {
    /// Application settings
    pub settings: Arc<Settings>,

    /// Directory relative compose paths are resolved against
    pub project_dir: PathBuf,

    /// Filesystem abstraction
    pub fs: Arc<dyn FileSystem>,

    /// Command runner abstraction
    pub cmd: Arc<dyn CommandRunner>,

    /// Secret client factory
    pub decrypters: Arc<dyn DecrypterFactory>,
}

impl ServiceContainer {
    /// Create a new service container with real implementations.
    pub fn new(settings: Settings, project_dir: &Path) -> Self {
        let cmd: Arc<dyn CommandRunner> = Arc::new(RealCommandRunner);
        let decrypters = Arc::new(AwsCliDecrypterFactory::new(
            cmd.clone(),
            settings.aws.clone(),
        ));
        Self::with_deps(
            settings,
            project_dir,
            Arc::new(RealFileSystem),
            cmd,
            decrypters,
        )
    }

    /// Create a service container with custom dependencies (for testing).
    pub fn with_deps(
        settings: Settings,
        project_dir: &Path,
        fs: Arc<dyn FileSystem>,
        cmd: Arc<dyn CommandRunner>,
        decrypters: Arc<dyn DecrypterFactory>,
    ) -> Self {
        Self {
            settings: Arc::new(settings),
            project_dir: project_dir.to_path_buf(),
            fs,
            cmd,
            decrypters,
        }
    }

    pub fn compose_service(&self) -> ComposeService {
        ComposeService::new(
            self.fs.clone(),
            self.cmd.clone(),
            self.settings.clone(),
            self.project_dir.clone(),
        )
    }

    pub fn secret_service(&self) -> SecretService {
        SecretService::new(self.decrypters.clone(), self.settings.clone())
    }

    pub fn network_service(&self) -> NetworkService {
        NetworkService::new(self.cmd.clone(), self.settings.clone())
    }

    pub fn up_service(&self) -> UpService {
        UpService::new(
            self.compose_service(),
            self.secret_service(),
            self.network_service(),
            self.settings.clone(),
        )
    }
}
