//! Configuration management with layered loading
//!
//! Precedence (lowest to highest):
//! 1. Compiled defaults
//! 2. Global config: `$XDG_CONFIG_HOME/ecs-local/ecs-local.toml`
//! 3. Project config: `<project_dir>/.ecs-local.toml`
//! 4. Environment variables: `ECS_LOCAL_*` prefix (`__` separates sections)

use std::path::{Path, PathBuf};

use config::{Config, ConfigError, Environment, File, FileFormat};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::application::ApplicationError;
use crate::domain::compose::DEFAULT_COMPOSE_FILE;
use crate::domain::{DuplicatePolicy, DEFAULT_SECRET_LABEL_PREFIX};

/// Compose launcher settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ComposeConfig {
    /// Compose executable
    pub command: String,
    /// Ambient variables forwarded to the compose process next to the secrets
    pub passthrough_env: Vec<String>,
}

impl Default for ComposeConfig {
    fn default() -> Self {
        Self {
            command: "docker-compose".into(),
            passthrough_env: vec![],
        }
    }
}

/// Secret discovery settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct SecretsConfig {
    /// Label key prefix marking secret labels
    pub label_prefix: String,
    /// Same secret name with different references across services
    pub on_duplicate: DuplicatePolicy,
}

impl Default for SecretsConfig {
    fn default() -> Self {
        Self {
            label_prefix: DEFAULT_SECRET_LABEL_PREFIX.into(),
            on_duplicate: DuplicatePolicy::Error,
        }
    }
}

/// AWS CLI settings used by the secret clients.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct AwsConfig {
    /// AWS CLI executable
    pub command: String,
    /// Named profile (`--profile`)
    pub profile: Option<String>,
    /// Region for references that don't carry one
    pub region: Option<String>,
}

impl Default for AwsConfig {
    fn default() -> Self {
        Self {
            command: "aws".into(),
            profile: None,
            region: None,
        }
    }
}

/// Local task network and credentials endpoints container.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct NetworkConfig {
    /// Set up network and endpoints container before `up`
    pub enabled: bool,
    pub docker_command: String,
    pub name: String,
    pub subnet: String,
    pub gateway: String,
    pub endpoints_container: String,
    pub endpoints_image: String,
    pub endpoints_ip: String,
    /// Host directory with AWS credentials mounted into the endpoints container
    pub aws_dir: PathBuf,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            docker_command: "docker".into(),
            name: "ecs-local-network".into(),
            subnet: "169.254.170.0/24".into(),
            gateway: "169.254.170.1".into(),
            endpoints_container: "amazon-ecs-local-container-endpoints".into(),
            endpoints_image: "amazon/amazon-ecs-local-container-endpoints".into(),
            endpoints_ip: "169.254.170.2".into(),
            aws_dir: PathBuf::from("~/.aws"),
        }
    }
}

/// Unified configuration for ecs-local.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Settings {
    /// Compose file used when `--output` is not given
    pub compose_file: PathBuf,
    pub compose: ComposeConfig,
    pub secrets: SecretsConfig,
    pub aws: AwsConfig,
    pub network: NetworkConfig,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            compose_file: PathBuf::from(DEFAULT_COMPOSE_FILE),
            compose: ComposeConfig::default(),
            secrets: SecretsConfig::default(),
            aws: AwsConfig::default(),
            network: NetworkConfig::default(),
        }
    }
}

/// Get the XDG config directory for ecs-local.
pub fn global_config_dir() -> Option<PathBuf> {
    ProjectDirs::from("", "", "ecs-local").map(|dirs| dirs.config_dir().to_path_buf())
}

/// Get the path to the global config file.
pub fn global_config_path() -> Option<PathBuf> {
    global_config_dir().map(|dir| dir.join("ecs-local.toml"))
}

/// Get the path to the project config file.
pub fn project_config_path(project_dir: &Path) -> PathBuf {
    project_dir.join(".ecs-local.toml")
}

/// Expand shell variables and tilde in a path string.
pub fn expand_path(path: &Path) -> PathBuf {
    let raw = path.to_string_lossy();
    shellexpand::full(raw.as_ref())
        .map(|s| PathBuf::from(s.into_owned()))
        .unwrap_or_else(|_| path.to_path_buf())
}

impl Settings {
    /// Load settings with layered precedence.
    ///
    /// # Arguments
    /// * `project_dir` - Directory holding the optional `.ecs-local.toml`
    pub fn load(project_dir: &Path) -> Result<Self, ApplicationError> {
        Self::load_from(global_config_path().as_deref(), project_dir)
    }

    /// Load with an explicit global config location (None skips the layer).
    pub fn load_from(global: Option<&Path>, project_dir: &Path) -> Result<Self, ApplicationError> {
        let defaults = Self::default();
        let mut builder = Config::builder()
            .add_source(Config::try_from(&defaults).map_err(config_err)?);

        if let Some(global_path) = global {
            if global_path.exists() {
                builder = builder.add_source(
                    File::from(global_path.to_path_buf())
                        .format(FileFormat::Toml)
                        .required(true),
                );
            }
        }

        let local_path = project_config_path(project_dir);
        if local_path.exists() {
            builder = builder.add_source(
                File::from(local_path)
                    .format(FileFormat::Toml)
                    .required(true),
            );
        }

        builder = builder.add_source(
            Environment::with_prefix("ECS_LOCAL")
                .prefix_separator("_")
                .separator("__")
                .list_separator(",")
                .with_list_parse_key("compose.passthrough_env")
                .try_parsing(true),
        );

        let config = builder.build().map_err(config_err)?;
        let mut settings: Self = config.try_deserialize().map_err(config_err)?;

        settings.expand_paths();
        Ok(settings)
    }

    /// Expand `~`, `$VAR` and `${VAR}` in path-like fields.
    fn expand_paths(&mut self) {
        self.compose_file = expand_path(&self.compose_file);
        self.network.aws_dir = expand_path(&self.network.aws_dir);
    }

    /// Show the effective configuration as TOML.
    pub fn to_toml(&self) -> Result<String, ApplicationError> {
        toml::to_string_pretty(self).map_err(|e| ApplicationError::Config {
            message: format!("serialize config: {e}"),
        })
    }

    /// Generate a template config file.
    pub fn template() -> String {
        r#"# ecs-local configuration
#
# Locations (by precedence, lowest to highest):
#   Global:  ~/.config/ecs-local/ecs-local.toml
#   Project: ./.ecs-local.toml
#   Env:     ECS_LOCAL_* (e.g. ECS_LOCAL_AWS__PROFILE=dev)

# Compose file used when --output is not given
# compose_file = "docker-compose.local.yml"

[compose]
# command = "docker-compose"
# Ambient variables passed to docker-compose besides the secrets.
# Empty means the compose process sees the secrets only.
# passthrough_env = ["DOCKER_HOST"]

[secrets]
# label_prefix = "ecs-local.secret."
# Same secret name with different references in two services:
#   "error"    refuse to start
#   "override" last service (by name) wins
# on_duplicate = "error"

[aws]
# command = "aws"
# profile = "default"
# region = "us-east-1"

[network]
# enabled = true
# name = "ecs-local-network"
# subnet = "169.254.170.0/24"
# gateway = "169.254.170.1"
# endpoints_container = "amazon-ecs-local-container-endpoints"
# endpoints_image = "amazon/amazon-ecs-local-container-endpoints"
# endpoints_ip = "169.254.170.2"
# aws_dir = "~/.aws"
"#
        .to_string()
    }
}

fn config_err(e: ConfigError) -> ApplicationError {
    ApplicationError::Config {
        message: e.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn given_no_config_when_loading_then_uses_defaults() {
        let project = tempfile::TempDir::new().unwrap();

        let settings = Settings::load_from(None, project.path()).expect("load defaults");

        assert_eq!(settings.compose_file, PathBuf::from("docker-compose.local.yml"));
        assert_eq!(settings.compose.command, "docker-compose");
        assert_eq!(settings.secrets.label_prefix, "ecs-local.secret.");
        assert_eq!(settings.secrets.on_duplicate, DuplicatePolicy::Error);
        assert!(settings.network.enabled);
    }

    #[test]
    fn given_tilde_in_aws_dir_when_expand_paths_then_expands_to_home() {
        let mut settings = Settings::default();

        settings.expand_paths();

        let home = std::env::var("HOME").expect("HOME should be set");
        assert!(
            settings.network.aws_dir.starts_with(&home),
            "aws_dir should start with home dir: {}",
            settings.network.aws_dir.display()
        );
    }

    #[test]
    fn given_template_when_parsed_then_is_valid_toml() {
        let parsed: Result<Settings, _> = toml::from_str(&Settings::template());
        assert_eq!(parsed.unwrap(), Settings::default());
    }

    #[test]
    fn given_settings_when_to_toml_then_round_trips() {
        let settings = Settings::default();
        let text = settings.to_toml().unwrap();
        let back: Settings = toml::from_str(&text).unwrap();
        assert_eq!(back, settings);
    }
}
