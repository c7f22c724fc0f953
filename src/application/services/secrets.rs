//! Secret discovery and resolution service
//!
//! Scans service labels for secret declarations, classifies each reference
//! and fetches the plaintext through the matching backend client. Clients
//! are created on first use, so a project using only one backend never
//! touches the other.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use tracing::{debug, warn};

use crate::application::{ApplicationError, ApplicationResult};
use crate::config::Settings;
use crate::domain::{
    check_duplicates, scan_secrets, ComposeProject, ContainerSecret, ResolvedEnv, SecretBackend, SecretRef,
};
use crate::infrastructure::traits::{DecrypterFactory, SecretDecrypter};

/// A secret together with its classified reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifiedSecret {
    pub secret: ContainerSecret,
    pub reference: SecretRef,
}

/// Resolves container secrets to plaintext.
pub struct SecretService {
    factory: Arc<dyn DecrypterFactory>,
    settings: Arc<Settings>,
    clients: BTreeMap<SecretBackend, Box<dyn SecretDecrypter>>,
    /// reference → plaintext, for references shared by several services
    cache: HashMap<String, String>,
}

impl SecretService {
    /// Create a new secret service. No client is created yet.
    pub fn new(factory: Arc<dyn DecrypterFactory>, settings: Arc<Settings>) -> Self {
        Self {
            factory,
            settings,
            clients: BTreeMap::new(),
            cache: HashMap::new(),
        }
    }

    /// Secrets declared by the project's labels, ordered by service then label.
    pub fn scan(&self, project: &ComposeProject) -> Vec<ContainerSecret> {
        let secrets = scan_secrets(project, &self.settings.secrets.label_prefix);
        debug!("scan: found {} secrets", secrets.len());
        secrets
    }

    /// Classify every secret, failing on the first unrecognized reference.
    pub fn classify(&self, secrets: &[ContainerSecret]) -> ApplicationResult<Vec<ClassifiedSecret>> {
        secrets
            .iter()
            .map(|secret| -> ApplicationResult<ClassifiedSecret> {
                let reference =
                    secret
                        .secret_ref()
                        .map_err(|e| ApplicationError::SecretReference {
                            name: secret.name().to_string(),
                            service: secret.service_name().to_string(),
                            source: e,
                        })?;
                Ok(ClassifiedSecret {
                    secret: secret.clone(),
                    reference,
                })
            })
            .collect()
    }

    /// Resolve all secrets into an environment.
    ///
    /// Duplicate names and unrecognized references are rejected before any
    /// client is created. Any fetch failure aborts the whole resolution.
    pub fn resolve_all(&mut self, secrets: &[ContainerSecret]) -> ApplicationResult<ResolvedEnv> {
        for collision in check_duplicates(secrets, self.settings.secrets.on_duplicate)? {
            warn!(
                "secret {} of service {} overrides the one of service {}",
                collision.name,
                collision.winner.service_name(),
                collision.shadowed.service_name()
            );
        }

        let classified = self.classify(secrets)?;

        let mut env = ResolvedEnv::new();
        for item in &classified {
            let value = self.resolve(item)?;
            env.insert(&item.secret, value);
        }

        debug!("resolve_all: resolved {} variables", env.len());
        Ok(env)
    }

    /// Fetch the plaintext of one classified secret.
    pub fn resolve(&mut self, item: &ClassifiedSecret) -> ApplicationResult<String> {
        let reference = item.secret.reference();
        if let Some(value) = self.cache.get(reference) {
            debug!("resolve: {} (cached)", item.secret.name());
            return Ok(value.clone());
        }

        let backend = item.reference.backend();
        debug!(
            "resolve: {} of service {} via {}",
            item.secret.name(),
            item.secret.service_name(),
            backend
        );
        let value = self
            .client(backend)?
            .decrypt(&item.reference)
            .map_err(|e| ApplicationError::SecretDecrypt {
                name: item.secret.name().to_string(),
                service: item.secret.service_name().to_string(),
                source: Box::new(e),
            })?;

        self.cache.insert(reference.to_string(), value.clone());
        Ok(value)
    }

    /// Backends whose client has been created so far.
    pub fn created_clients(&self) -> Vec<SecretBackend> {
        self.clients.keys().copied().collect()
    }

    fn client(&mut self, backend: SecretBackend) -> ApplicationResult<&dyn SecretDecrypter> {
        if !self.clients.contains_key(&backend) {
            debug!("client: creating {} client", backend);
            let client =
                self.factory
                    .create(backend)
                    .map_err(|e| ApplicationError::SecretClient {
                        backend,
                        source: Box::new(e),
                    })?;
            self.clients.insert(backend, client);
        }
        Ok(self.clients[&backend].as_ref())
    }
}
