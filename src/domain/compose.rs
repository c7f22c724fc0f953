//! Compose document model
//!
//! Only the parts of a Compose file this tool reads are modelled: the service
//! map with each service's image and labels. Everything else in the document
//! is left to the compose tool itself.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::domain::DomainError;

/// Default file written by the task definition converter.
pub const DEFAULT_COMPOSE_FILE: &str = "docker-compose.local.yml";

/// Parsed Compose document.
///
/// Services are kept in a `BTreeMap` so iteration is ordered by service name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComposeProject {
    /// File the project was loaded from (passed to `-f` on launch)
    pub filename: PathBuf,
    /// Service name → service definition
    pub services: BTreeMap<String, ServiceSpec>,
}

/// A single service of a Compose document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServiceSpec {
    pub name: String,
    pub image: Option<String>,
    /// Label key → value, ordered by key
    pub labels: BTreeMap<String, String>,
}

#[derive(Debug, Deserialize)]
struct RawCompose {
    #[serde(default)]
    services: BTreeMap<String, Option<RawService>>,
}

#[derive(Debug, Default, Deserialize)]
struct RawService {
    image: Option<String>,
    #[serde(default)]
    labels: Option<RawLabels>,
}

/// Compose accepts labels either as a mapping or as a list of `key=value`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawLabels {
    Map(BTreeMap<String, Option<serde_yaml::Value>>),
    List(Vec<String>),
}

impl RawLabels {
    fn into_map(self) -> BTreeMap<String, String> {
        match self {
            RawLabels::Map(map) => map
                .into_iter()
                .map(|(k, v)| (k, v.map(scalar_to_string).unwrap_or_default()))
                .collect(),
            RawLabels::List(items) => items
                .into_iter()
                .map(|item| match item.split_once('=') {
                    Some((k, v)) => (k.to_string(), v.to_string()),
                    None => (item, String::new()),
                })
                .collect(),
        }
    }
}

fn scalar_to_string(value: serde_yaml::Value) -> String {
    match value {
        serde_yaml::Value::String(s) => s,
        serde_yaml::Value::Bool(b) => b.to_string(),
        serde_yaml::Value::Number(n) => n.to_string(),
        serde_yaml::Value::Null => String::new(),
        other => serde_yaml::to_string(&other)
            .map(|s| s.trim_end().to_string())
            .unwrap_or_default(),
    }
}

impl ComposeProject {
    /// Parse Compose YAML content.
    ///
    /// # Arguments
    /// * `content` - YAML document
    /// * `filename` - Path the content was read from
    pub fn parse(content: &str, filename: impl Into<PathBuf>) -> Result<Self, DomainError> {
        let filename = filename.into();
        let raw: RawCompose =
            serde_yaml::from_str(content).map_err(|e| DomainError::InvalidCompose {
                path: filename.clone(),
                message: e.to_string(),
            })?;

        let services = raw
            .services
            .into_iter()
            .map(|(name, service)| {
                let service = service.unwrap_or_default();
                let spec = ServiceSpec {
                    name: name.clone(),
                    image: service.image,
                    labels: service.labels.map(RawLabels::into_map).unwrap_or_default(),
                };
                (name, spec)
            })
            .collect();

        Ok(Self { filename, services })
    }

    pub fn filename(&self) -> &Path {
        &self.filename
    }

    /// Services in name order.
    pub fn services(&self) -> impl Iterator<Item = &ServiceSpec> {
        self.services.values()
    }
}
