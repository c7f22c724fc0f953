//! Command handlers

use std::io;
use std::path::{Path, PathBuf};

use clap::CommandFactory;
use clap_complete::generate;
use tracing::{debug, instrument};

use crate::application::services::{EndpointsAction, UpOptions};
use crate::application::IoResultExt;
use crate::cli::args::{Cli, Commands, ConfigCommands};
use crate::cli::error::{CliError, CliResult};
use crate::cli::output;
use crate::config::{global_config_path, project_config_path, Settings};
use crate::infrastructure::di::ServiceContainer;

pub fn execute_command(cli: &Cli) -> CliResult<()> {
    let project_dir = project_dir(cli)?;

    match &cli.command {
        Commands::Completion { shell } => {
            let mut cmd = Cli::command();
            let name = cmd.get_name().to_string();
            generate(*shell, &mut cmd, name, &mut io::stdout());
            Ok(())
        }
        Commands::Config { command } => _config(command, &project_dir),
        Commands::Up { output, no_network } => {
            let container = container(&project_dir)?;
            _up(&container, output.clone(), *no_network)
        }
        Commands::Secrets { output } => {
            let container = container(&project_dir)?;
            _secrets(&container, output.as_deref())
        }
    }
}

fn project_dir(cli: &Cli) -> CliResult<PathBuf> {
    match &cli.project_dir {
        Some(dir) if !dir.is_dir() => Err(CliError::Usage(format!(
            "project directory does not exist: {}",
            dir.display()
        ))),
        Some(dir) => Ok(dir.clone()),
        None => std::env::current_dir().map_err(CliError::CurrentDir),
    }
}

fn container(project_dir: &Path) -> CliResult<ServiceContainer> {
    let settings = Settings::load(project_dir)?;
    Ok(ServiceContainer::new(settings, project_dir))
}

#[instrument(skip(container))]
fn _up(
    container: &ServiceContainer,
    compose_file: Option<PathBuf>,
    no_network: bool,
) -> CliResult<()> {
    let mut up = container.up_service();
    let report = up.up(&UpOptions {
        output: compose_file,
        skip_network: no_network,
    })?;

    debug!(
        "clients created: {:?}",
        up.secret_service().created_clients()
    );

    if let Some(network) = &report.network {
        if network.network_created {
            output::success_detail(&format!("created network {}", network.network));
        }
        match network.endpoints {
            EndpointsAction::Created => output::success_detail("started credentials endpoints"),
            EndpointsAction::Started => output::success_detail("restarted credentials endpoints"),
            EndpointsAction::AlreadyRunning => {}
        }
    }
    if !report.secrets.is_empty() {
        output::success_detail(&format!(
            "injected {} secrets: {}",
            report.secrets.len(),
            report.secrets.join(", ")
        ));
    }

    output::info(&format!("Compose out: {}", report.output));
    Ok(())
}

#[instrument(skip(container))]
fn _secrets(container: &ServiceContainer, compose_file: Option<&Path>) -> CliResult<()> {
    let compose = container.compose_service();
    let path = compose.compose_path(compose_file);
    let project = compose.load(&path)?;
    let secrets = container.secret_service().scan(&project);

    if secrets.is_empty() {
        output::info(&format!("no secrets declared in {}", path.display()));
        return Ok(());
    }

    output::header(&path.display());
    for secret in &secrets {
        let backend = match secret.secret_ref() {
            Ok(reference) => reference.backend().to_string(),
            Err(e) => {
                output::warning(&e);
                "unrecognized".to_string()
            }
        };
        output::detail(&format!(
            "{}\t{}\t{}\t{}",
            secret.service_name(),
            secret.name(),
            backend,
            secret.reference()
        ));
    }
    Ok(())
}

#[instrument]
fn _config(command: &ConfigCommands, project_dir: &Path) -> CliResult<()> {
    match command {
        ConfigCommands::Show => {
            let settings = Settings::load(project_dir)?;
            output::info(&settings.to_toml()?);
        }
        ConfigCommands::Path => {
            match global_config_path() {
                Some(path) => output::action("global", &path.display()),
                None => output::warning("no home directory, global config disabled"),
            }
            output::action("project", &project_config_path(project_dir).display());
        }
        ConfigCommands::Init { global } => {
            let path = if *global {
                global_config_path().ok_or_else(|| {
                    CliError::Usage("no home directory for a global config".into())
                })?
            } else {
                project_config_path(project_dir)
            };
            if path.exists() {
                return Err(CliError::Usage(format!(
                    "config already exists: {}",
                    path.display()
                )));
            }
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent).with_path_context("create directory", parent)?;
            }
            std::fs::write(&path, Settings::template()).with_path_context("write", &path)?;
            output::success(&format!("created {}", path.display()));
        }
    }
    Ok(())
}
