//! I/O boundary traits for testability
//!
//! These traits abstract external I/O operations, allowing services
//! to be tested with mock implementations.

use std::io;
use std::path::Path;
use std::process::Output;

use crate::domain::{SecretBackend, SecretRef};
use crate::infrastructure::InfraResult;

/// Filesystem abstraction for testability.
pub trait FileSystem: Send + Sync {
    /// Read file contents to string.
    fn read_to_string(&self, path: &Path) -> io::Result<String>;

    /// Check if path exists.
    fn exists(&self, path: &Path) -> bool;

    /// Check if path is a file.
    fn is_file(&self, path: &Path) -> bool;
}

/// External command runner abstraction.
pub trait CommandRunner: Send + Sync {
    /// Run a command with arguments, inheriting the caller's environment.
    fn run(&self, cmd: &str, args: &[&str]) -> io::Result<Output>;

    /// Run a command whose environment consists of `env` only.
    ///
    /// The program is looked up on the caller's `PATH` before the
    /// environment is replaced.
    fn run_isolated(&self, cmd: &str, args: &[&str], env: &[(String, String)])
        -> io::Result<Output>;
}

/// Resolves one kind of secret reference to plaintext.
pub trait SecretDecrypter: Send + Sync {
    fn decrypt(&self, secret: &SecretRef) -> InfraResult<String>;
}

/// Builds secret clients on demand.
pub trait DecrypterFactory: Send + Sync {
    /// Construct the client for `backend`.
    ///
    /// Called at most once per backend per run.
    fn create(&self, backend: SecretBackend) -> InfraResult<Box<dyn SecretDecrypter>>;
}

/// stdout followed by stderr, lossily decoded.
pub fn combined_output(output: &Output) -> String {
    let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
    combined.push_str(&String::from_utf8_lossy(&output.stderr));
    combined
}

// ============================================================
// REAL IMPLEMENTATIONS
// ============================================================

/// Real filesystem implementation.
#[derive(Debug, Default)]
pub struct RealFileSystem;

impl FileSystem for RealFileSystem {
    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        std::fs::read_to_string(path)
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn is_file(&self, path: &Path) -> bool {
        path.is_file()
    }
}

/// Real command runner implementation.
#[derive(Debug, Default)]
pub struct RealCommandRunner;

impl CommandRunner for RealCommandRunner {
    fn run(&self, cmd: &str, args: &[&str]) -> io::Result<Output> {
        std::process::Command::new(cmd).args(args).output()
    }

    fn run_isolated(
        &self,
        cmd: &str,
        args: &[&str],
        env: &[(String, String)],
    ) -> io::Result<Output> {
        let program = which::which(cmd).map_err(|e| {
            io::Error::new(io::ErrorKind::NotFound, format!("{cmd}: {e}"))
        })?;

        std::process::Command::new(program)
            .args(args)
            .env_clear()
            .envs(env.iter().map(|(k, v)| (k, v)))
            .output()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(unix)]
    #[test]
    fn given_isolated_run_when_printing_env_then_only_given_vars_visible() {
        let runner = RealCommandRunner;
        let env = vec![("DB_PASSWORD".to_string(), "hunter2".to_string())];

        let output = runner.run_isolated("env", &[], &env).unwrap();

        let stdout = String::from_utf8_lossy(&output.stdout);
        assert!(output.status.success());
        assert_eq!(stdout.trim(), "DB_PASSWORD=hunter2");
    }

    #[test]
    fn given_missing_program_when_run_isolated_then_not_found() {
        let runner = RealCommandRunner;

        let err = runner
            .run_isolated("definitely-not-a-real-binary-3f9a", &[], &[])
            .unwrap_err();

        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }

    #[cfg(unix)]
    #[test]
    fn given_output_on_both_streams_when_combined_then_stdout_first() {
        let output = RealCommandRunner
            .run("sh", &["-c", "echo out; echo err >&2"])
            .unwrap();

        assert_eq!(combined_output(&output), "out\nerr\n");
    }
}
