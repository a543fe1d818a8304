//! Environment-isolated runner: request validation, one child per call, buffered result.

use std::path::PathBuf;

use crate::config::Config;
use crate::process::{conda::CondaLauncher, CommandLine, ProcessHandle};

pub mod marker;

#[derive(Debug, thiserror::Error)]
pub enum RunnerError {
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error("failed to spawn {program}: {source}")]
    Spawn {
        program: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("child process exited with status {code}{}", stderr_suffix(.stderr))]
    ChildFailure { code: i32, stderr: String },
    #[error("io error while waiting for child: {0}")]
    Io(#[from] std::io::Error),
}

fn stderr_suffix(stderr: &str) -> String {
    match stderr.trim() {
        "" => String::new(),
        s => format!(": {}", s),
    }
}

/// A validated invocation. Only constructible through [`ExecutionRequest::new`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionRequest {
    environment: String,
    script_path: String,
    extra_args: Vec<String>,
}

impl ExecutionRequest {
    pub fn new(
        environment: impl Into<String>,
        script_path: impl Into<String>,
        extra_args: Vec<String>,
    ) -> Result<Self, RunnerError> {
        let environment = environment.into();
        let script_path = script_path.into();
        if environment.trim().is_empty() {
            return Err(RunnerError::Configuration(
                "environment name is required".into(),
            ));
        }
        if script_path.trim().is_empty() {
            return Err(RunnerError::Configuration("script path is required".into()));
        }
        Ok(Self {
            environment,
            script_path,
            extra_args,
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecutionResult {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
}

impl ExecutionResult {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    /// Turn a non-zero exit into [`RunnerError::ChildFailure`].
    pub fn into_success(self) -> Result<Self, RunnerError> {
        if self.success() {
            Ok(self)
        } else {
            Err(RunnerError::ChildFailure {
                code: self.exit_code,
                stderr: self.stderr,
            })
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Runner {
    launcher: CondaLauncher,
}

impl Runner {
    pub fn new(launcher: CondaLauncher) -> Self {
        Self { launcher }
    }

    pub fn from_config(cfg: &Config) -> Self {
        Self::new(CondaLauncher::new(cfg.conda_exe(), cfg.python_name()))
    }

    pub fn command_line(&self, req: &ExecutionRequest) -> CommandLine {
        self.launcher
            .command_line(&req.environment, &req.script_path, &req.extra_args)
    }

    /// Spawn one child and wait for it. The exit code is returned untouched.
    pub async fn run(&self, req: &ExecutionRequest) -> Result<ExecutionResult, RunnerError> {
        let line = self.command_line(req);
        tracing::debug!(command = %line.display(), "spawning child");

        let handle = ProcessHandle::start(&line).map_err(|source| RunnerError::Spawn {
            program: line.program.clone(),
            source,
        })?;
        let pid = handle.id();
        let out = handle.wait_with_output().await?;

        tracing::info!(
            pid = ?pid,
            exit_code = out.exit_code,
            stdout_len = out.stdout.len(),
            stderr_len = out.stderr.len(),
            "child finished"
        );

        Ok(ExecutionResult {
            stdout: out.stdout,
            stderr: out.stderr,
            exit_code: out.exit_code,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_environment_is_configuration_error() {
        let err = ExecutionRequest::new("", "gen.py", vec![]).unwrap_err();
        assert!(matches!(err, RunnerError::Configuration(_)));
        let err = ExecutionRequest::new("  ", "gen.py", vec![]).unwrap_err();
        assert!(matches!(err, RunnerError::Configuration(_)));
    }

    #[test]
    fn test_missing_script_is_configuration_error() {
        let err = ExecutionRequest::new("shape", "", vec![]).unwrap_err();
        assert!(matches!(err, RunnerError::Configuration(ref m) if m.contains("script")));
    }

    #[test]
    fn test_command_line_ends_with_script_then_args() {
        let req = ExecutionRequest::new(
            "shape",
            "gen.py",
            vec!["a chair".into(), "out".into()],
        )
        .unwrap();
        let line = Runner::default().command_line(&req);
        assert_eq!(
            line.args,
            vec!["run", "-n", "shape", "python", "-u", "gen.py", "a chair", "out"]
        );
    }

    #[test]
    fn test_into_success_carries_stderr() {
        let res = ExecutionResult {
            stdout: String::new(),
            stderr: "Traceback".into(),
            exit_code: 4,
        };
        match res.into_success() {
            Err(RunnerError::ChildFailure { code, stderr }) => {
                assert_eq!(code, 4);
                assert_eq!(stderr, "Traceback");
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_child_failure_message_includes_stderr() {
        let err = RunnerError::ChildFailure {
            code: 1,
            stderr: "Traceback: model not found\n".into(),
        };
        assert_eq!(
            err.to_string(),
            "child process exited with status 1: Traceback: model not found"
        );
        let quiet = RunnerError::ChildFailure {
            code: 2,
            stderr: String::new(),
        };
        assert_eq!(quiet.to_string(), "child process exited with status 2");
    }

    #[tokio::test]
    async fn test_spawn_failure_is_distinct_from_child_failure() {
        let runner = Runner::new(CondaLauncher::new("/nonexistent/conda", "python"));
        let req = ExecutionRequest::new("shape", "gen.py", vec![]).unwrap();
        let err = runner.run(&req).await.unwrap_err();
        assert!(matches!(err, RunnerError::Spawn { .. }));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_exit_code_passes_through() {
        let dir = tempfile::tempdir().unwrap();
        let fake = dir.path().join("conda");
        // argv: run -n <env> python -u <script> <code>
        std::fs::write(&fake, "#!/bin/sh\necho \"env=$3 script=$6\"\nexit \"$7\"\n").unwrap();
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&fake, std::fs::Permissions::from_mode(0o755)).unwrap();
        }
        let runner = Runner::new(CondaLauncher::new(&fake, "python"));
        for code in [0, 1, 42, 255] {
            let req = ExecutionRequest::new("shape", "gen.py", vec![code.to_string()]).unwrap();
            let res = runner.run(&req).await.unwrap();
            assert_eq!(res.exit_code, code);
            assert_eq!(res.stdout, "env=shape script=gen.py\n");
        }
    }
}
