//! Test support: logging setup and a scripted command runner

use std::io;
use std::process::{ExitStatus, Output};
use std::sync::{Mutex, Once};

use tracing::{debug, info};
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    prelude::*,
    EnvFilter,
};

use crate::infrastructure::traits::CommandRunner;

static TEST_SETUP: Once = Once::new();

pub fn init_test_setup() {
    TEST_SETUP.call_once(|| {
        // global logging subscriber, used by all tracing log macros
        setup_test_logging();
        info!("Test Setup complete");
    });
}

fn setup_test_logging() {
    debug!("INIT: Attempting logger init from testing.rs");

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"));

    let subscriber = tracing_subscriber::registry().with(
        fmt::layer()
            .with_test_writer()
            .with_target(true)
            .with_thread_names(false)
            .with_span_events(FmtSpan::CLOSE)
            .with_filter(env_filter),
    );

    // Only set if we haven't already set a global subscriber
    if tracing::dispatcher::has_been_set() {
        debug!("Tracing subscriber already set");
    } else {
        subscriber.try_init().unwrap_or_else(|e| {
            eprintln!("Error: Failed to set up logging: {}", e);
        });
    }
}

/// One invocation seen by [`FakeCommandRunner`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedCall {
    pub program: String,
    pub args: Vec<String>,
    /// `Some` for isolated runs: the complete environment handed to the child.
    pub env: Option<Vec<(String, String)>>,
}

impl RecordedCall {
    /// `program arg1 arg2 ...`
    pub fn command_line(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

#[derive(Debug, Clone)]
enum Reply {
    Exit {
        code: i32,
        stdout: String,
        stderr: String,
    },
    SpawnError,
}

/// Command runner that records calls and answers from a script.
///
/// Replies are matched by command-line prefix; the most recently added rule
/// wins. Unmatched commands succeed with empty output.
#[derive(Debug, Default)]
pub struct FakeCommandRunner {
    calls: Mutex<Vec<RecordedCall>>,
    rules: Mutex<Vec<(String, Reply)>>,
}

impl FakeCommandRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reply to commands starting with `prefix`.
    pub fn respond(&self, prefix: &str, code: i32, stdout: &str, stderr: &str) -> &Self {
        self.push_rule(
            prefix,
            Reply::Exit {
                code,
                stdout: stdout.to_string(),
                stderr: stderr.to_string(),
            },
        )
    }

    /// Fail to spawn commands starting with `prefix` (program not found).
    pub fn fail_spawn(&self, prefix: &str) -> &Self {
        self.push_rule(prefix, Reply::SpawnError)
    }

    fn push_rule(&self, prefix: &str, reply: Reply) -> &Self {
        self.rules
            .lock()
            .expect("rules lock")
            .push((prefix.to_string(), reply));
        self
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().expect("calls lock").clone()
    }

    /// Command lines of all calls, in order.
    pub fn command_lines(&self) -> Vec<String> {
        self.calls().iter().map(RecordedCall::command_line).collect()
    }

    fn answer(&self, call: RecordedCall) -> io::Result<Output> {
        let line = call.command_line();
        self.calls.lock().expect("calls lock").push(call);

        let reply = self
            .rules
            .lock()
            .expect("rules lock")
            .iter()
            .rev()
            .find(|(prefix, _)| line.starts_with(prefix.as_str()))
            .map(|(_, reply)| reply.clone());

        match reply {
            Some(Reply::SpawnError) => Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("{line}: not found"),
            )),
            Some(Reply::Exit {
                code,
                stdout,
                stderr,
            }) => Ok(Output {
                status: exit_status(code),
                stdout: stdout.into_bytes(),
                stderr: stderr.into_bytes(),
            }),
            None => Ok(Output {
                status: exit_status(0),
                stdout: Vec::new(),
                stderr: Vec::new(),
            }),
        }
    }
}

impl CommandRunner for FakeCommandRunner {
    fn run(&self, cmd: &str, args: &[&str]) -> io::Result<Output> {
        self.answer(RecordedCall {
            program: cmd.to_string(),
            args: args.iter().map(|a| a.to_string()).collect(),
            env: None,
        })
    }

    fn run_isolated(
        &self,
        cmd: &str,
        args: &[&str],
        env: &[(String, String)],
    ) -> io::Result<Output> {
        self.answer(RecordedCall {
            program: cmd.to_string(),
            args: args.iter().map(|a| a.to_string()).collect(),
            env: Some(env.to_vec()),
        })
    }
}

#[cfg(unix)]
fn exit_status(code: i32) -> ExitStatus {
    use std::os::unix::process::ExitStatusExt;
    ExitStatus::from_raw(code << 8)
}

#[cfg(windows)]
fn exit_status(code: i32) -> ExitStatus {
    use std::os::windows::process::ExitStatusExt;
    ExitStatus::from_raw(code as u32)
}

// test
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_test_setup() {
        init_test_setup();
    }

    #[test]
    fn given_rules_when_running_then_latest_matching_rule_wins() {
        let runner = FakeCommandRunner::new();
        runner
            .respond("docker", 1, "", "generic")
            .respond("docker network inspect", 0, "[]", "");

        let inspect = runner.run("docker", &["network", "inspect", "x"]).unwrap();
        let other = runner.run("docker", &["ps"]).unwrap();
        let unmatched = runner.run("aws", &["--version"]).unwrap();

        assert!(inspect.status.success());
        assert_eq!(other.status.code(), Some(1));
        assert!(unmatched.status.success());
        assert_eq!(
            runner.command_lines(),
            vec!["docker network inspect x", "docker ps", "aws --version"]
        );
    }

    #[test]
    fn given_spawn_failure_rule_when_running_then_not_found() {
        let runner = FakeCommandRunner::new();
        runner.fail_spawn("docker-compose");

        let err = runner.run_isolated("docker-compose", &["up"], &[]).unwrap_err();

        assert_eq!(err.kind(), io::ErrorKind::NotFound);
        assert_eq!(runner.calls()[0].env, Some(vec![]));
    }
}
