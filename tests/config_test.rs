//! Integration tests for layered Settings loading.
//!
//! These tests pass no global config (`load_from(None, ..)`), so the project
//! file layers directly over the compiled defaults.

use std::fs;
use std::path::PathBuf;

use tempfile::TempDir;

use ecs_local::application::ApplicationError;
use ecs_local::config::{project_config_path, Settings};
use ecs_local::domain::DuplicatePolicy;

#[test]
fn given_project_config_when_load_then_overrides_defaults() {
    // Arrange
    let project = TempDir::new().unwrap();
    fs::write(
        project_config_path(project.path()),
        r#"
compose_file = "local/compose.yml"

[secrets]
on_duplicate = "override"

[aws]
profile = "dev"
region = "eu-central-1"

[network]
enabled = false
"#,
    )
    .unwrap();

    // Act
    let settings = Settings::load_from(None, project.path()).expect("load settings");

    // Assert
    assert_eq!(settings.compose_file, PathBuf::from("local/compose.yml"));
    assert_eq!(settings.secrets.on_duplicate, DuplicatePolicy::Override);
    assert_eq!(settings.aws.profile.as_deref(), Some("dev"));
    assert_eq!(settings.aws.region.as_deref(), Some("eu-central-1"));
    assert!(!settings.network.enabled);
    // untouched fields keep their defaults
    assert_eq!(settings.compose.command, "docker-compose");
    assert_eq!(settings.secrets.label_prefix, "ecs-local.secret.");
    assert_eq!(settings.network.name, "ecs-local-network");
}

#[test]
fn given_global_and_project_config_when_load_then_project_wins() {
    // Arrange
    let global_dir = TempDir::new().unwrap();
    let global = global_dir.path().join("ecs-local.toml");
    fs::write(
        &global,
        "[aws]\nprofile = \"global\"\nregion = \"us-east-1\"\n",
    )
    .unwrap();

    let project = TempDir::new().unwrap();
    fs::write(
        project_config_path(project.path()),
        "[aws]\nprofile = \"project\"\n",
    )
    .unwrap();

    // Act
    let settings = Settings::load_from(Some(&global), project.path()).expect("load settings");

    // Assert
    assert_eq!(settings.aws.profile.as_deref(), Some("project"));
    assert_eq!(settings.aws.region.as_deref(), Some("us-east-1"));
}

#[test]
fn given_malformed_project_config_when_load_then_config_error() {
    let project = TempDir::new().unwrap();
    fs::write(project_config_path(project.path()), "[aws\nprofile = ").unwrap();

    let err = Settings::load_from(None, project.path()).unwrap_err();

    assert!(matches!(err, ApplicationError::Config { .. }), "{err:?}");
}

#[test]
fn given_unknown_duplicate_policy_when_load_then_config_error() {
    let project = TempDir::new().unwrap();
    fs::write(
        project_config_path(project.path()),
        "[secrets]\non_duplicate = \"merge\"\n",
    )
    .unwrap();

    let err = Settings::load_from(None, project.path()).unwrap_err();

    assert!(matches!(err, ApplicationError::Config { .. }), "{err:?}");
}

#[test]
fn given_template_written_as_project_config_when_load_then_equals_defaults() {
    let project = TempDir::new().unwrap();
    fs::write(project_config_path(project.path()), Settings::template()).unwrap();

    let settings = Settings::load_from(None, project.path()).expect("load settings");

    let mut expected = Settings::default();
    expected.network.aws_dir = ecs_local::config::expand_path(&expected.network.aws_dir);
    assert_eq!(settings, expected);
}
