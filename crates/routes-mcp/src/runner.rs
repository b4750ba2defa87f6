//! Process Runner
//!
//! Runs route pipelines through bash in the application root and classifies
//! how they ended. stdout is the payload; stderr only ever goes to the log.

use async_trait::async_trait;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;
use tokio::process::Command;
use tokio::sync::Semaphore;
use tracing::{debug, error, info, warn};

use routes_core::Config;

use crate::command::RouteCommand;

/// Variables set on top of the inherited environment. The version manager
/// switches keep rbenv/rvm/asdf chatter out of the report.
const QUIET_ENV: &[(&str, &str)] = &[
    ("ASDF_SKIP_RESHIM", "1"),
    ("RBENV_SILENT", "1"),
    ("RVM_SILENCE", "1"),
];

/// grep exits 1 when it selected no lines
const NO_MATCH_EXIT_CODE: i32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// The filter stage selected nothing
    NoMatches,
    /// Anything else: spawn failure, crash, timeout, non-zero from rails
    ExecutionError,
}

/// How a single pipeline run ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionOutcome {
    Success(String),
    Failure { kind: FailureKind, message: String },
}

impl ExecutionOutcome {
    pub fn no_matches() -> Self {
        Self::Failure {
            kind: FailureKind::NoMatches,
            message: String::new(),
        }
    }

    pub fn execution_error(message: impl Into<String>) -> Self {
        Self::Failure {
            kind: FailureKind::ExecutionError,
            message: message.into(),
        }
    }
}

/// Executes route commands
#[async_trait]
pub trait CommandRunner: Send + Sync {
    async fn run(&self, command: &RouteCommand) -> ExecutionOutcome;
}

/// Runs commands with `bash -c` inside the Rails application
pub struct ShellRunner {
    app_path: PathBuf,
    rails_env: String,
    timeout: Option<Duration>,
    permits: Arc<Semaphore>,
}

impl ShellRunner {
    pub fn new(config: &Config) -> Self {
        Self {
            app_path: config.app_path.clone(),
            rails_env: config.rails_env.clone(),
            timeout: config.timeout(),
            permits: Arc::new(Semaphore::new(config.max_concurrent.max(1))),
        }
    }

    /// Wrap the pipeline so a failing stage is not masked by the filter
    /// behind it. Every stage before the last is checked: the report must
    /// exit 0, and a filter may only exit 1 (nothing selected, which leaves
    /// the rest of the pipeline empty). In a filtered pipeline the report's
    /// exit code 1 is reported as 2, leaving 1 to mean "no matches".
    fn script(command: &RouteCommand) -> String {
        let report_exit_one = if command.filtered { 2 } else { 1 };
        format!(
            r#"{line}
status=("${{PIPESTATUS[@]}}")
last=$(( ${{#status[@]}} - 1 ))
for (( i = 0; i < last; i++ )); do
  code=${{status[i]}}
  [ "$code" -eq 0 ] && continue
  if [ "$i" -eq 0 ]; then
    [ "$code" -eq 1 ] && exit {report_exit_one}
    exit "$code"
  fi
  [ "$code" -ne 1 ] && exit "$code"
done
exit "${{status[last]}}""#,
            line = command.line,
            report_exit_one = report_exit_one,
        )
    }

    fn command(&self, command: &RouteCommand) -> Command {
        let mut cmd = Command::new("bash");
        cmd.arg("-c")
            .arg(Self::script(command))
            .current_dir(&self.app_path)
            .env("RAILS_ENV", &self.rails_env)
            .envs(QUIET_ENV.iter().copied())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        // Own process group, so the whole pipeline can be killed at once
        #[cfg(unix)]
        cmd.process_group(0);
        cmd
    }

    /// Map an exit code to an outcome.
    ///
    /// Exit 1 only means "no matches" for pipelines ending in a filter; from
    /// an unfiltered report it is a rails failure like any other.
    pub fn classify(
        command: &RouteCommand,
        code: Option<i32>,
        stdout: String,
        stderr: &str,
    ) -> ExecutionOutcome {
        match code {
            Some(0) => ExecutionOutcome::Success(stdout),
            Some(NO_MATCH_EXIT_CODE) if command.filtered => ExecutionOutcome::no_matches(),
            Some(code) => {
                let detail = stderr.trim();
                if detail.is_empty() {
                    ExecutionOutcome::execution_error(format!("Command exited with code {}", code))
                } else {
                    ExecutionOutcome::execution_error(format!(
                        "Command exited with code {}: {}",
                        code, detail
                    ))
                }
            }
            None => ExecutionOutcome::execution_error("Command terminated by signal"),
        }
    }
}

/// Process group of a running pipeline. Dropping it kills every process in
/// the group; `release` forgets it once the pipeline has exited on its own.
struct PipelineGroup(Option<u32>);

impl PipelineGroup {
    fn new(pid: Option<u32>) -> Self {
        Self(pid)
    }

    fn release(mut self) {
        self.0 = None;
    }
}

impl Drop for PipelineGroup {
    fn drop(&mut self) {
        #[cfg(unix)]
        {
            if let Some(pid) = self.0.take() {
                debug!("Killing process group {}", pid);
                // bash was spawned with process_group(0), so its pid is the group id
                unsafe {
                    libc::kill(-(pid as libc::pid_t), libc::SIGKILL);
                }
            }
        }
    }
}

#[async_trait]
impl CommandRunner for ShellRunner {
    async fn run(&self, command: &RouteCommand) -> ExecutionOutcome {
        let _permit = match self.permits.acquire().await {
            Ok(permit) => permit,
            Err(_) => return ExecutionOutcome::execution_error("Runner is shutting down"),
        };

        info!("Executing command: {}", command.line);
        let child = match self.command(command).spawn() {
            Ok(child) => child,
            Err(e) => {
                error!("Failed to execute command in {}: {}", self.app_path.display(), e);
                return ExecutionOutcome::execution_error(format!(
                    "Failed to execute command: {}",
                    e
                ));
            }
        };
        let group = PipelineGroup::new(child.id());
        let output = child.wait_with_output();

        let result = match self.timeout {
            Some(limit) => match tokio::time::timeout(limit, output).await {
                Ok(result) => result,
                Err(_) => {
                    error!("Command timed out after {:?}: {}", limit, command.line);
                    drop(group);
                    return ExecutionOutcome::execution_error(format!(
                        "Command timed out after {} seconds",
                        limit.as_secs()
                    ));
                }
            },
            None => output.await,
        };
        group.release();

        let output = match result {
            Ok(output) => output,
            Err(e) => {
                error!("Failed waiting for command: {}", e);
                return ExecutionOutcome::execution_error(format!(
                    "Failed to execute command: {}",
                    e
                ));
            }
        };

        let stdout = String::from_utf8_lossy(&output.stdout).to_string();
        let stderr = String::from_utf8_lossy(&output.stderr);
        if !stderr.trim().is_empty() {
            warn!("Command stderr: {}", stderr.trim_end());
        }

        let outcome = Self::classify(command, output.status.code(), stdout, &stderr);
        debug!("Command finished with {:?}", output.status.code());
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    fn filtered(line: &str) -> RouteCommand {
        RouteCommand {
            line: line.to_string(),
            filtered: true,
        }
    }

    fn unfiltered(line: &str) -> RouteCommand {
        RouteCommand {
            line: line.to_string(),
            filtered: false,
        }
    }

    fn runner_in(dir: &std::path::Path, timeout_secs: u64, max_concurrent: usize) -> ShellRunner {
        ShellRunner::new(&Config {
            app_path: dir.to_path_buf(),
            timeout_secs,
            max_concurrent,
            ..Config::default()
        })
    }

    #[test]
    fn test_classify_success() {
        let outcome = ShellRunner::classify(&filtered("x"), Some(0), "rows\n".into(), "noise");
        assert_eq!(outcome, ExecutionOutcome::Success("rows\n".into()));
    }

    #[test]
    fn test_classify_filter_no_match() {
        let outcome = ShellRunner::classify(&filtered("x"), Some(1), String::new(), "");
        assert_eq!(outcome, ExecutionOutcome::no_matches());
    }

    #[test]
    fn test_classify_exit_one_without_filter_is_error() {
        let outcome = ShellRunner::classify(&unfiltered("x"), Some(1), String::new(), "boom");
        assert_eq!(
            outcome,
            ExecutionOutcome::execution_error("Command exited with code 1: boom")
        );
    }

    #[test]
    fn test_classify_command_not_found() {
        let outcome = ShellRunner::classify(
            &filtered("x"),
            Some(127),
            String::new(),
            "bash: bin/rails: No such file or directory\n",
        );
        assert_eq!(
            outcome,
            ExecutionOutcome::execution_error(
                "Command exited with code 127: bash: bin/rails: No such file or directory"
            )
        );
    }

    #[test]
    fn test_classify_signal() {
        let outcome = ShellRunner::classify(&unfiltered("x"), None, String::new(), "");
        assert!(matches!(
            outcome,
            ExecutionOutcome::Failure { kind: FailureKind::ExecutionError, .. }
        ));
    }

    #[tokio::test]
    async fn test_stdout_is_payload_and_stderr_is_not() {
        let dir = tempfile::tempdir().unwrap();
        let runner = runner_in(dir.path(), 10, 2);

        let outcome = runner
            .run(&unfiltered("echo 'users GET /users users#index'; echo chatter >&2"))
            .await;
        assert_eq!(
            outcome,
            ExecutionOutcome::Success("users GET /users users#index\n".into())
        );
    }

    #[tokio::test]
    async fn test_grep_without_match_is_no_matches() {
        let dir = tempfile::tempdir().unwrap();
        let runner = runner_in(dir.path(), 10, 2);

        let outcome = runner
            .run(&filtered("printf 'users GET /users users#index\\n' | grep -i -e zzz-no-match"))
            .await;
        assert_eq!(outcome, ExecutionOutcome::no_matches());
    }

    #[tokio::test]
    async fn test_missing_executable_is_execution_error() {
        let dir = tempfile::tempdir().unwrap();
        let runner = runner_in(dir.path(), 10, 2);

        let outcome = runner.run(&filtered("./bin/rails routes | grep -e users#")).await;
        match outcome {
            ExecutionOutcome::Failure { kind, message } => {
                assert_eq!(kind, FailureKind::ExecutionError);
                assert!(message.starts_with("Command exited with code 127"));
            }
            other => panic!("expected failure, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_report_exit_one_is_not_no_matches() {
        let dir = tempfile::tempdir().unwrap();
        let runner = runner_in(dir.path(), 10, 2);

        let outcome = runner
            .run(&filtered("(echo 'rails boot failed' >&2; exit 1) | grep -e users#"))
            .await;
        assert_eq!(
            outcome,
            ExecutionOutcome::execution_error("Command exited with code 2: rails boot failed")
        );
    }

    #[test]
    fn test_script_checks_every_stage() {
        let script = ShellRunner::script(&filtered("bin/rails routes | grep -e x"));
        assert!(script.starts_with("bin/rails routes | grep -e x\n"));
        assert!(script.contains("PIPESTATUS"));
        assert!(script.contains("exit 2"));

        let script = ShellRunner::script(&unfiltered("bin/rails routes"));
        assert!(script.contains("exit 1"));
    }

    #[tokio::test]
    async fn test_broken_middle_filter_is_not_no_matches() {
        let dir = tempfile::tempdir().unwrap();
        let runner = runner_in(dir.path(), 10, 2);

        // Same invalid regex, alone and followed by a second filter
        let single = runner
            .run(&filtered("printf 'users GET /users users#index\\n' | grep -i -e '['"))
            .await;
        let chained = runner
            .run(&filtered(
                "printf 'users GET /users users#index\\n' | grep -i -e '[' | grep -i -e 'users#'",
            ))
            .await;

        for outcome in [single, chained] {
            match outcome {
                ExecutionOutcome::Failure { kind, message } => {
                    assert_eq!(kind, FailureKind::ExecutionError);
                    assert!(message.starts_with("Command exited with code 2"), "{}", message);
                }
                other => panic!("expected failure, got {:?}", other),
            }
        }
    }

    #[tokio::test]
    async fn test_middle_filter_without_match_is_no_matches() {
        let dir = tempfile::tempdir().unwrap();
        let runner = runner_in(dir.path(), 10, 2);

        let outcome = runner
            .run(&filtered(
                "printf 'users GET /users users#index\\n' | grep -i -e zzz | grep -i -e 'users#'",
            ))
            .await;
        assert_eq!(outcome, ExecutionOutcome::no_matches());

        let outcome = runner
            .run(&filtered(
                "printf 'users GET /users users#index\\n' | grep -i -e users | grep -i -e 'users#'",
            ))
            .await;
        assert_eq!(outcome, ExecutionOutcome::Success("users GET /users users#index\n".into()));
    }

    #[tokio::test]
    async fn test_runs_in_app_root_with_profile_env() {
        let dir = tempfile::tempdir().unwrap();
        let runner = runner_in(dir.path(), 10, 2);

        let outcome = runner
            .run(&unfiltered(
                "pwd -P; echo \"$RAILS_ENV $ASDF_SKIP_RESHIM $RBENV_SILENT $RVM_SILENCE\"",
            ))
            .await;
        let expected_dir = std::fs::canonicalize(dir.path()).unwrap();
        assert_eq!(
            outcome,
            ExecutionOutcome::Success(format!("{}\ndevelopment 1 1 1\n", expected_dir.display()))
        );
    }

    #[tokio::test]
    async fn test_missing_app_root_is_execution_error() {
        let dir = tempfile::tempdir().unwrap();
        let runner = runner_in(&dir.path().join("gone"), 10, 2);

        let outcome = runner.run(&unfiltered("true")).await;
        assert!(matches!(
            outcome,
            ExecutionOutcome::Failure { kind: FailureKind::ExecutionError, .. }
        ));
    }

    #[tokio::test]
    async fn test_timeout_is_execution_error() {
        let dir = tempfile::tempdir().unwrap();
        let runner = runner_in(dir.path(), 1, 2);

        let outcome = runner.run(&unfiltered("sleep 5")).await;
        assert_eq!(
            outcome,
            ExecutionOutcome::execution_error("Command timed out after 1 seconds")
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_timeout_kills_whole_pipeline() {
        let dir = tempfile::tempdir().unwrap();
        let runner = runner_in(dir.path(), 1, 2);

        let outcome = runner
            .run(&unfiltered("(sleep 2; touch survived) | cat"))
            .await;
        assert_eq!(
            outcome,
            ExecutionOutcome::execution_error("Command timed out after 1 seconds")
        );

        tokio::time::sleep(Duration::from_millis(2500)).await;
        assert!(!dir.path().join("survived").exists());
    }

    #[tokio::test]
    async fn test_concurrency_is_bounded() {
        let dir = tempfile::tempdir().unwrap();
        let runner = runner_in(dir.path(), 10, 1);
        let cmd = unfiltered("sleep 0.3; echo done");

        let started = Instant::now();
        let (a, b) = tokio::join!(runner.run(&cmd), runner.run(&cmd));

        assert_eq!(a, ExecutionOutcome::Success("done\n".into()));
        assert_eq!(b, ExecutionOutcome::Success("done\n".into()));
        assert!(started.elapsed() >= Duration::from_millis(600));
    }
}
