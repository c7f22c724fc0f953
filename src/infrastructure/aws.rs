//! Secret clients backed by the AWS CLI
//!
//! Both clients shell out through the `CommandRunner` boundary:
//! - Secrets Manager: `aws secretsmanager get-secret-value`
//! - Parameter Store: `aws ssm get-parameter --with-decryption`
//!
//! Output is requested as JSON so a missing value (`null`) is told apart
//! from a secret whose text happens to be `None`.

use std::sync::Arc;

use tracing::debug;

use crate::config::AwsConfig;
use crate::domain::{SecretBackend, SecretRef};
use crate::infrastructure::traits::{CommandRunner, DecrypterFactory, SecretDecrypter};
use crate::infrastructure::{InfraError, InfraResult};

/// Creates AWS CLI clients after checking the CLI can be run.
pub struct AwsCliDecrypterFactory {
    cmd: Arc<dyn CommandRunner>,
    aws: AwsConfig,
}

impl AwsCliDecrypterFactory {
    pub fn new(cmd: Arc<dyn CommandRunner>, aws: AwsConfig) -> Self {
        Self { cmd, aws }
    }

    fn check_available(&self) -> InfraResult<()> {
        let output = self
            .cmd
            .run(&self.aws.command, &["--version"])
            .map_err(|e| InfraError::ClientUnavailable {
                message: format!("cannot run {}: {}", self.aws.command, e),
            })?;
        if !output.status.success() {
            return Err(InfraError::ClientUnavailable {
                message: format!(
                    "{} --version exited with {}",
                    self.aws.command,
                    output
                        .status
                        .code()
                        .map(|c| c.to_string())
                        .unwrap_or_else(|| "signal".into())
                ),
            });
        }
        Ok(())
    }
}

impl DecrypterFactory for AwsCliDecrypterFactory {
    fn create(&self, backend: SecretBackend) -> InfraResult<Box<dyn SecretDecrypter>> {
        debug!("create: backend={}", backend);
        self.check_available()?;
        let client = AwsCliClient {
            cmd: self.cmd.clone(),
            aws: self.aws.clone(),
        };
        Ok(match backend {
            SecretBackend::SecretsManager => Box::new(SecretsManagerClient(client)),
            SecretBackend::ParameterStore => Box::new(ParameterStoreClient(client)),
        })
    }
}

struct AwsCliClient {
    cmd: Arc<dyn CommandRunner>,
    aws: AwsConfig,
}

impl AwsCliClient {
    /// Run `aws <args> --query <field> [--region r] [--profile p] --output json`
    /// and decode the queried field, which must be a string.
    fn query(&self, args: &[&str], field: &str, region: Option<&str>) -> InfraResult<String> {
        let mut args: Vec<&str> = args.to_vec();
        args.extend(["--query", field]);
        if let Some(region) = region.or(self.aws.region.as_deref()) {
            args.extend(["--region", region]);
        }
        if let Some(profile) = self.aws.profile.as_deref() {
            args.extend(["--profile", profile]);
        }
        args.extend(["--output", "json"]);

        let output = self
            .cmd
            .run(&self.aws.command, &args)
            .map_err(|e| InfraError::Spawn {
                program: self.aws.command.clone(),
                source: e,
            })?;

        if !output.status.success() {
            return Err(InfraError::command(&self.aws.command, &output));
        }

        let value: Option<String> =
            serde_json::from_slice(&output.stdout).map_err(|e| InfraError::Command {
                program: self.aws.command.clone(),
                message: format!("unexpected output for {field}: {e}"),
                exit_code: output.status.code(),
            })?;
        value.ok_or_else(|| InfraError::Command {
            program: self.aws.command.clone(),
            message: format!("secret has no {field}"),
            exit_code: output.status.code(),
        })
    }
}

struct SecretsManagerClient(AwsCliClient);

impl SecretDecrypter for SecretsManagerClient {
    fn decrypt(&self, secret: &SecretRef) -> InfraResult<String> {
        match secret {
            SecretRef::SecretsManager { arn, region } => self.0.query(
                &[
                    "secretsmanager",
                    "get-secret-value",
                    "--secret-id",
                    arn.as_str(),
                ],
                "SecretString",
                Some(region.as_str()),
            ),
            other => Err(wrong_backend(SecretBackend::SecretsManager, other)),
        }
    }
}

struct ParameterStoreClient(AwsCliClient);

impl SecretDecrypter for ParameterStoreClient {
    fn decrypt(&self, secret: &SecretRef) -> InfraResult<String> {
        match secret {
            SecretRef::ParameterStore { name, region } => self.0.query(
                &[
                    "ssm",
                    "get-parameter",
                    "--name",
                    name.as_str(),
                    "--with-decryption",
                ],
                "Parameter.Value",
                region.as_deref(),
            ),
            other => Err(wrong_backend(SecretBackend::ParameterStore, other)),
        }
    }
}

fn wrong_backend(expected: SecretBackend, secret: &SecretRef) -> InfraError {
    InfraError::ClientUnavailable {
        message: format!(
            "{} client cannot resolve {} reference {}",
            expected,
            secret.backend(),
            secret.id()
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::testing::FakeCommandRunner;

    fn aws_config(profile: Option<&str>) -> AwsConfig {
        AwsConfig {
            command: "aws".into(),
            profile: profile.map(String::from),
            region: Some("us-east-1".into()),
        }
    }

    #[test]
    fn given_secrets_manager_ref_when_decrypt_then_uses_arn_region_and_strips_newline() {
        let runner = Arc::new(FakeCommandRunner::new());
        runner.respond("aws secretsmanager", 0, "\"hunter2\"\n", "");
        let factory = AwsCliDecrypterFactory::new(runner.clone(), aws_config(Some("dev")));
        let client = factory.create(SecretBackend::SecretsManager).unwrap();
        let arn = "arn:aws:secretsmanager:us-west-2:111111111111:secret:dbpass";

        let value = client.decrypt(&SecretRef::parse(arn).unwrap()).unwrap();

        assert_eq!(value, "hunter2");
        assert_eq!(
            runner.command_lines(),
            vec![
                "aws --version".to_string(),
                format!(
                    "aws secretsmanager get-secret-value --secret-id {arn} --query SecretString \
                     --region us-west-2 --profile dev --output json"
                ),
            ]
        );
    }

    #[test]
    fn given_bare_parameter_name_when_decrypt_then_falls_back_to_configured_region() {
        let runner = Arc::new(FakeCommandRunner::new());
        runner.respond("aws ssm", 0, "\"s3cr3t\"\n", "");
        let factory = AwsCliDecrypterFactory::new(runner.clone(), aws_config(None));
        let client = factory.create(SecretBackend::ParameterStore).unwrap();

        let value = client
            .decrypt(&SecretRef::parse("/app/db/password").unwrap())
            .unwrap();

        assert_eq!(value, "s3cr3t");
        assert_eq!(
            runner.command_lines()[1],
            "aws ssm get-parameter --name /app/db/password --with-decryption \
             --query Parameter.Value --region us-east-1 --output json"
        );
    }

    #[test]
    fn given_wrong_kind_of_reference_when_decrypt_then_error_without_call() {
        let runner = Arc::new(FakeCommandRunner::new());
        let factory = AwsCliDecrypterFactory::new(runner.clone(), aws_config(None));
        let client = factory.create(SecretBackend::ParameterStore).unwrap();
        let arn = "arn:aws:secretsmanager:us-west-2:111111111111:secret:dbpass";

        let result = client.decrypt(&SecretRef::parse(arn).unwrap());

        assert!(result.is_err());
        assert_eq!(runner.calls().len(), 1);
    }

    #[test]
    fn given_failing_fetch_when_decrypt_then_command_error_carries_stderr() {
        let runner = Arc::new(FakeCommandRunner::new());
        runner.respond("aws ssm", 255, "", "ParameterNotFound");
        let factory = AwsCliDecrypterFactory::new(runner, aws_config(None));
        let client = factory.create(SecretBackend::ParameterStore).unwrap();

        let err = client.decrypt(&SecretRef::parse("/missing").unwrap()).unwrap_err();

        match err {
            InfraError::Command {
                message, exit_code, ..
            } => {
                assert_eq!(message, "ParameterNotFound");
                assert_eq!(exit_code, Some(255));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn given_missing_cli_when_create_then_client_unavailable() {
        let runner = Arc::new(FakeCommandRunner::new());
        runner.fail_spawn("aws");
        let factory = AwsCliDecrypterFactory::new(runner, aws_config(None));

        let err = factory.create(SecretBackend::SecretsManager).err().unwrap();

        assert!(matches!(err, InfraError::ClientUnavailable { .. }));
    }

    #[test]
    fn given_multiline_secret_when_decrypt_then_inner_newlines_kept() {
        let runner = Arc::new(FakeCommandRunner::new());
        runner.respond("aws ssm", 0, "\"line1\\nline2\\n\"\n", "");
        let factory = AwsCliDecrypterFactory::new(runner, aws_config(None));
        let client = factory.create(SecretBackend::ParameterStore).unwrap();

        let value = client.decrypt(&SecretRef::parse("/app/cert").unwrap()).unwrap();

        assert_eq!(value, "line1\nline2\n");
    }

    #[test]
    fn given_literal_none_text_when_decrypt_then_kept_as_value() {
        let runner = Arc::new(FakeCommandRunner::new());
        runner.respond("aws ssm", 0, "\"None\"\n", "");
        let factory = AwsCliDecrypterFactory::new(runner, aws_config(None));
        let client = factory.create(SecretBackend::ParameterStore).unwrap();

        let value = client.decrypt(&SecretRef::parse("/app/flag").unwrap()).unwrap();

        assert_eq!(value, "None");
    }

    #[test]
    fn given_binary_secret_when_decrypt_then_missing_secret_string_error() {
        let runner = Arc::new(FakeCommandRunner::new());
        runner.respond("aws secretsmanager", 0, "null\n", "");
        let factory = AwsCliDecrypterFactory::new(runner, aws_config(None));
        let client = factory.create(SecretBackend::SecretsManager).unwrap();
        let arn = "arn:aws:secretsmanager:us-west-2:111111111111:secret:blob";

        let err = client.decrypt(&SecretRef::parse(arn).unwrap()).unwrap_err();

        match err {
            InfraError::Command { message, .. } => {
                assert_eq!(message, "secret has no SecretString");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn given_non_json_output_when_decrypt_then_command_error() {
        let runner = Arc::new(FakeCommandRunner::new());
        runner.respond("aws secretsmanager", 0, "None\n", "");
        let factory = AwsCliDecrypterFactory::new(runner, aws_config(None));
        let client = factory.create(SecretBackend::SecretsManager).unwrap();
        let arn = "arn:aws:secretsmanager:us-west-2:111111111111:secret:blob";

        let err = client.decrypt(&SecretRef::parse(arn).unwrap()).unwrap_err();

        assert!(matches!(err, InfraError::Command { .. }));
    }
}
