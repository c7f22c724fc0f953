//! Resolved secret environment and duplicate-name handling

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::domain::{ContainerSecret, DomainError};

/// What to do when two services declare the same secret name with
/// different references.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DuplicatePolicy {
    /// Refuse to start.
    #[default]
    Error,
    /// Last declaration in (service, label) order wins.
    Override,
}

/// Secrets sharing a name across services.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Collision {
    pub name: String,
    pub winner: ContainerSecret,
    pub shadowed: ContainerSecret,
}

/// Detect secrets whose name is declared with different references.
///
/// Same name with the same reference is not a collision: all services get
/// the same value. Returns the collisions that `Override` lets through.
pub fn check_duplicates(
    secrets: &[ContainerSecret],
    policy: DuplicatePolicy,
) -> Result<Vec<Collision>, DomainError> {
    let mut seen: BTreeMap<&str, &ContainerSecret> = BTreeMap::new();
    let mut collisions = Vec::new();

    for secret in secrets {
        if let Some(previous) = seen.insert(secret.name(), secret) {
            if previous.reference() == secret.reference() {
                continue;
            }
            if policy == DuplicatePolicy::Error {
                return Err(DomainError::ConflictingSecret {
                    name: secret.name().to_string(),
                    first_service: previous.service_name().to_string(),
                    first_reference: previous.reference().to_string(),
                    second_service: secret.service_name().to_string(),
                    second_reference: secret.reference().to_string(),
                });
            }
            collisions.push(Collision {
                name: secret.name().to_string(),
                winner: secret.clone(),
                shadowed: previous.clone(),
            });
        }
    }
    Ok(collisions)
}

#[derive(Clone, PartialEq, Eq)]
struct Entry {
    services: Vec<String>,
    value: String,
}

/// Plaintext secrets keyed by environment variable name.
///
/// `Debug` never shows values.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct ResolvedEnv {
    entries: BTreeMap<String, Entry>,
}

impl ResolvedEnv {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the plaintext of a secret.
    ///
    /// A later insert under the same name replaces the value; the services
    /// sharing the value are tracked for reporting.
    pub fn insert(&mut self, secret: &ContainerSecret, value: impl Into<String>) {
        let value = value.into();
        let entry = self
            .entries
            .entry(secret.name().to_string())
            .or_insert_with(|| Entry {
                services: Vec::new(),
                value: String::new(),
            });
        if entry.value != value {
            entry.services.clear();
        }
        entry.value = value;
        if !entry.services.iter().any(|s| s == secret.service_name()) {
            entry.services.push(secret.service_name().to_string());
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries.get(name).map(|e| e.value.as_str())
    }

    /// Services whose declaration produced the current value of `name`.
    pub fn services_for(&self, name: &str) -> Option<&[String]> {
        self.entries.get(name).map(|e| e.services.as_slice())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// `(name, value)` pairs ordered by name.
    pub fn pairs(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .map(|(k, e)| (k.as_str(), e.value.as_str()))
    }
}

impl fmt::Debug for ResolvedEnv {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.entries.iter().map(|(k, e)| (k, &e.services)))
            .finish()
    }
}
