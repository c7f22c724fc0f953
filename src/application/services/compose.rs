//! Compose loader and launcher
//!
//! Reads the Compose file produced from the task definition and runs
//! `docker-compose -f <file> up -d` with the resolved secrets as its
//! whole environment.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::debug;

use crate::application::{ApplicationError, ApplicationResult, IoResultExt};
use crate::config::Settings;
use crate::domain::{ComposeProject, ResolvedEnv};
use crate::infrastructure::traits::{combined_output, CommandRunner, FileSystem};
use crate::infrastructure::InfraError;

/// Loads and launches Compose projects.
pub struct ComposeService {
    fs: Arc<dyn FileSystem>,
    cmd: Arc<dyn CommandRunner>,
    settings: Arc<Settings>,
    project_dir: PathBuf,
}

impl ComposeService {
    /// Create a new compose service.
    ///
    /// Relative compose paths are resolved against `project_dir`.
    pub fn new(
        fs: Arc<dyn FileSystem>,
        cmd: Arc<dyn CommandRunner>,
        settings: Arc<Settings>,
        project_dir: PathBuf,
    ) -> Self {
        Self {
            fs,
            cmd,
            settings,
            project_dir,
        }
    }

    /// Compose file to use: `output` if given, else the configured default.
    pub fn compose_path(&self, output: Option<&Path>) -> PathBuf {
        let file = output.unwrap_or(self.settings.compose_file.as_path());
        if file.is_absolute() {
            file.to_path_buf()
        } else {
            self.project_dir.join(file)
        }
    }

    /// Read and parse a Compose file.
    ///
    /// Fails if the file is missing, unreadable or not a Compose document.
    pub fn load(&self, path: &Path) -> ApplicationResult<ComposeProject> {
        debug!("load: path={}", path.display());
        if !self.fs.exists(path) {
            return Err(ApplicationError::ComposeFile {
                path: path.to_path_buf(),
                source: io::Error::new(io::ErrorKind::NotFound, "file does not exist"),
            });
        }
        if !self.fs.is_file(path) {
            return Err(ApplicationError::ComposeFile {
                path: path.to_path_buf(),
                source: io::Error::new(io::ErrorKind::InvalidInput, "not a regular file"),
            });
        }

        let content = self.fs.read_to_string(path).with_compose_path(path)?;
        let project = ComposeProject::parse(&content, path)?;

        debug!("load: found {} services", project.services.len());
        Ok(project)
    }

    /// Environment for the compose process.
    ///
    /// Configured passthrough variables first, then the secrets; a secret
    /// shadows a passthrough variable of the same name.
    pub fn launch_env(&self, env: &ResolvedEnv) -> Vec<(String, String)> {
        let mut vars: Vec<(String, String)> = self
            .settings
            .compose
            .passthrough_env
            .iter()
            .filter(|name| env.get(name).is_none())
            .filter_map(|name| std::env::var(name).ok().map(|v| (name.clone(), v)))
            .collect();
        vars.extend(env.pairs().map(|(k, v)| (k.to_string(), v.to_string())));
        vars
    }

    /// Run `<compose> -f <file> up -d` and return its combined output.
    pub fn up(&self, project: &ComposeProject, env: &ResolvedEnv) -> ApplicationResult<String> {
        let program = self.settings.compose.command.as_str();
        let file = project.filename().to_string_lossy();
        let args = ["-f", &*file, "up", "-d"];
        let vars = self.launch_env(env);
        debug!(
            "up: {} {} with {} variables",
            program,
            args.join(" "),
            vars.len()
        );

        let context = format!("failed to run {program} up");
        let output = self
            .cmd
            .run_isolated(program, &args, &vars)
            .map_err(|e| ApplicationError::Command {
                context: context.clone(),
                source: Box::new(InfraError::Spawn {
                    program: program.to_string(),
                    source: e,
                }),
            })?;

        if !output.status.success() {
            return Err(ApplicationError::Command {
                context,
                source: Box::new(InfraError::command(program, &output)),
            });
        }

        Ok(combined_output(&output))
    }
}
