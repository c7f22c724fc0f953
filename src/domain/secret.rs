//! Container secrets: discovery from labels and reference classification

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

use crate::domain::{ComposeProject, DomainError};

/// Label key prefix marking a label as a secret declaration.
///
/// The converter writes one label per task definition secret:
/// `ecs-local.secret.<NAME>: <valueFrom>`.
pub const DEFAULT_SECRET_LABEL_PREFIX: &str = "ecs-local.secret.";

/// Parameter Store name: path segments of letters, digits, `_`, `.` and `-`,
/// optionally starting with `/`.
static PARAMETER_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^/?[A-Za-z0-9_.\-]+(/[A-Za-z0-9_.\-]+)*$").expect("valid parameter name pattern")
});

/// A secret declared by a service, not yet resolved.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ContainerSecret {
    service_name: String,
    name: String,
    reference: String,
}

impl ContainerSecret {
    pub fn new(
        service_name: impl Into<String>,
        name: impl Into<String>,
        reference: impl Into<String>,
    ) -> Self {
        Self {
            service_name: service_name.into(),
            name: name.into(),
            reference: reference.into(),
        }
    }

    /// Service declaring the secret.
    pub fn service_name(&self) -> &str {
        &self.service_name
    }

    /// Environment variable name the plaintext is exported as.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Raw reference (ARN or parameter name).
    pub fn reference(&self) -> &str {
        &self.reference
    }

    /// Classify the reference into its owning backend.
    ///
    /// The name must be usable as an environment variable name: non-empty,
    /// without `=` or NUL.
    pub fn secret_ref(&self) -> Result<SecretRef, DomainError> {
        if self.name.is_empty() || self.name.contains(['=', '\0']) {
            return Err(DomainError::InvalidSecretName {
                name: self.name.clone(),
            });
        }
        SecretRef::parse(&self.reference)
    }
}

/// The two cloud services able to resolve a secret.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SecretBackend {
    SecretsManager,
    ParameterStore,
}

impl SecretBackend {
    /// Service identifier as it appears in an ARN.
    pub fn service_name(self) -> &'static str {
        match self {
            SecretBackend::SecretsManager => "secretsmanager",
            SecretBackend::ParameterStore => "ssm",
        }
    }
}

impl fmt::Display for SecretBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.service_name())
    }
}

/// A classified secret reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SecretRef {
    /// `arn:<partition>:secretsmanager:<region>:<account>:secret:<name>`
    SecretsManager { arn: String, region: String },
    /// Either a full `ssm` ARN (with its region) or a bare parameter name/path.
    ParameterStore {
        name: String,
        region: Option<String>,
    },
}

impl SecretRef {
    /// Classify a reference string.
    ///
    /// A non-ARN string must be a Parameter Store name, as a task definition
    /// may reference a parameter in its own region by name alone. ARNs are
    /// dispatched on their service field; any other service is rejected.
    pub fn parse(reference: &str) -> Result<Self, DomainError> {
        let reference = reference.trim();
        if reference.is_empty() {
            return Err(unrecognized("<empty>", reference));
        }

        if !reference.starts_with("arn:") {
            if !PARAMETER_NAME.is_match(reference) {
                return Err(unrecognized("<unknown>", reference));
            }
            return Ok(SecretRef::ParameterStore {
                name: reference.to_string(),
                region: None,
            });
        }

        // arn:partition:service:region:account-id:resource
        let fields: Vec<&str> = reference.splitn(6, ':').collect();
        if fields.len() < 6 || fields[5].is_empty() {
            return Err(unrecognized("<malformed arn>", reference));
        }
        let (service, region) = (fields[2], fields[3]);

        match service {
            "secretsmanager" if !region.is_empty() => Ok(SecretRef::SecretsManager {
                arn: reference.to_string(),
                region: region.to_string(),
            }),
            "ssm" => Ok(SecretRef::ParameterStore {
                name: reference.to_string(),
                region: (!region.is_empty()).then(|| region.to_string()),
            }),
            other => Err(unrecognized(other, reference)),
        }
    }

    pub fn backend(&self) -> SecretBackend {
        match self {
            SecretRef::SecretsManager { .. } => SecretBackend::SecretsManager,
            SecretRef::ParameterStore { .. } => SecretBackend::ParameterStore,
        }
    }

    /// Region encoded in the reference, if any.
    pub fn region(&self) -> Option<&str> {
        match self {
            SecretRef::SecretsManager { region, .. } => Some(region),
            SecretRef::ParameterStore { region, .. } => region.as_deref(),
        }
    }

    /// Identifier passed to the backend.
    pub fn id(&self) -> &str {
        match self {
            SecretRef::SecretsManager { arn, .. } => arn,
            SecretRef::ParameterStore { name, .. } => name,
        }
    }
}

fn unrecognized(service: &str, reference: &str) -> DomainError {
    DomainError::UnrecognizedSecretService {
        service: service.to_string(),
        reference: reference.to_string(),
    }
}

/// Collect every secret label of every service.
///
/// The secret name is the last `.`-separated segment of the label key.
/// Output is ordered by service name, then label key.
pub fn scan_secrets(project: &ComposeProject, prefix: &str) -> Vec<ContainerSecret> {
    project
        .services()
        .flat_map(|service| {
            service
                .labels
                .iter()
                .filter(|(label, _)| label.starts_with(prefix))
                .map(|(label, reference)| {
                    let name = label.rsplit('.').next().unwrap_or(label);
                    ContainerSecret::new(&service.name, name, reference)
                })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn given_constructor_inputs_when_reading_back_then_returns_them() {
        let secret = ContainerSecret::new("web", "DB_PASSWORD", "/app/db");
        assert_eq!(secret.service_name(), "web");
        assert_eq!(secret.name(), "DB_PASSWORD");
        assert_eq!(secret.reference(), "/app/db");
    }

    #[rstest]
    #[case("arn:aws:secretsmanager:us-west-2:111111111111:secret:dbpass-AbCdEf", "us-west-2")]
    #[case("arn:aws-cn:secretsmanager:cn-north-1:111111111111:secret:a:b", "cn-north-1")]
    fn given_secretsmanager_arn_when_parse_then_secrets_manager(
        #[case] reference: &str,
        #[case] region: &str,
    ) {
        let parsed = SecretRef::parse(reference).unwrap();
        assert_eq!(parsed.backend(), SecretBackend::SecretsManager);
        assert_eq!(parsed.region(), Some(region));
        assert_eq!(parsed.id(), reference);
    }

    #[rstest]
    #[case("arn:aws:ssm:eu-west-1:111111111111:parameter/app/db", Some("eu-west-1"))]
    #[case("/app/db/password", None)]
    #[case("db_password", None)]
    #[case("app.config-v2/db_pass", None)]
    fn given_parameter_reference_when_parse_then_parameter_store(
        #[case] reference: &str,
        #[case] region: Option<&str>,
    ) {
        let parsed = SecretRef::parse(reference).unwrap();
        assert_eq!(parsed.backend(), SecretBackend::ParameterStore);
        assert_eq!(parsed.region(), region);
        assert_eq!(parsed.id(), reference);
    }

    #[rstest]
    #[case("")]
    #[case("   ")]
    #[case("arn:aws:s3:::my-bucket/key")]
    #[case("arn:aws:kms:us-east-1:111111111111:key/abc")]
    #[case("arn:aws:secretsmanager")]
    #[case("arn:aws:secretsmanager::111111111111:secret:x")]
    #[case("op://vault/item/field")]
    #[case("vault:secret/data/db")]
    #[case("a:b")]
    #[case("has space")]
    #[case("https://example.com/x")]
    #[case("/app//db")]
    fn given_unrecognized_reference_when_parse_then_error(#[case] reference: &str) {
        let err = SecretRef::parse(reference).unwrap_err();
        assert!(matches!(err, DomainError::UnrecognizedSecretService { .. }));
    }

    #[test]
    fn given_labels_when_scan_then_only_prefixed_labels_with_last_segment() {
        let content = r#"
services:
  web:
    labels:
      ecs-local.secret.DB_PASSWORD: arn:aws:secretsmanager:us-west-2:111111111111:secret:dbpass
      ecs-local.task-definition-input.value: web-task
      com.example.owner: team
  worker:
    labels:
      ecs-local.secret.nested.API_KEY: /app/api
  idle:
    image: busybox
"#;
        let project = ComposeProject::parse(content, "c.yml").unwrap();

        let secrets = scan_secrets(&project, DEFAULT_SECRET_LABEL_PREFIX);

        assert_eq!(
            secrets,
            vec![
                ContainerSecret::new(
                    "web",
                    "DB_PASSWORD",
                    "arn:aws:secretsmanager:us-west-2:111111111111:secret:dbpass"
                ),
                ContainerSecret::new("worker", "API_KEY", "/app/api"),
            ]
        );
    }

    #[test]
    fn given_prefix_only_label_when_scan_then_degenerate_name() {
        let mut project = ComposeProject::parse("services:\n  web: {}\n", "c.yml").unwrap();
        project
            .services
            .get_mut("web")
            .unwrap()
            .labels
            .insert("ecs-local.secret.".into(), "/x".into());

        let secrets = scan_secrets(&project, DEFAULT_SECRET_LABEL_PREFIX);

        assert_eq!(secrets.len(), 1);
        assert_eq!(secrets[0].name(), "");
    }

    #[rstest]
    #[case("")]
    #[case("A=B")]
    #[case("NUL\0NAME")]
    fn given_unusable_name_when_secret_ref_then_invalid_name(#[case] name: &str) {
        let secret = ContainerSecret::new("web", name, "/app/db");

        let err = secret.secret_ref().unwrap_err();

        assert_eq!(
            err,
            DomainError::InvalidSecretName {
                name: name.to_string()
            }
        );
    }

    #[test]
    fn given_label_key_with_equals_when_scan_then_classification_rejects_it() {
        let content = "services:\n  web:\n    labels:\n      ecs-local.secret.A=B: /app/db\n";
        let project = ComposeProject::parse(content, "c.yml").unwrap();

        let secrets = scan_secrets(&project, DEFAULT_SECRET_LABEL_PREFIX);

        assert_eq!(secrets[0].name(), "A=B");
        assert!(matches!(
            secrets[0].secret_ref(),
            Err(DomainError::InvalidSecretName { .. })
        ));
    }

    #[test]
    fn given_custom_prefix_when_scan_then_uses_it() {
        let content = "services:\n  web:\n    labels:\n      my.secret.TOKEN: /t\n      ecs-local.secret.OTHER: /o\n";
        let project = ComposeProject::parse(content, "c.yml").unwrap();

        let secrets = scan_secrets(&project, "my.secret.");

        assert_eq!(secrets, vec![ContainerSecret::new("web", "TOKEN", "/t")]);
    }
}
