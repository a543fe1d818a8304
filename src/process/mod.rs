//! Child process management: command lines, spawn, and a single buffered wait.

use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};

use tokio::process::{Child, Command};

pub mod conda;

/// A fully resolved program plus argument vector. Nothing is shell-interpreted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandLine {
    pub program: PathBuf,
    pub args: Vec<String>,
}

impl CommandLine {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Program followed by every argument, in spawn order.
    #[cfg(test)]
    pub fn tokens(&self) -> Vec<std::ffi::OsString> {
        std::iter::once(self.program.clone().into_os_string())
            .chain(self.args.iter().map(Into::into))
            .collect()
    }

    /// Human-readable rendering for logs only.
    pub fn display(&self) -> String {
        let mut s = self.program.display().to_string();
        for a in &self.args {
            s.push(' ');
            s.push_str(a);
        }
        s
    }
}

/// Everything a finished child left behind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedOutput {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
}

/// Owns exactly one spawned child. Consumed by [`ProcessHandle::wait_with_output`].
pub struct ProcessHandle {
    child: Child,
}

impl ProcessHandle {
    /// Spawn with stdin inherited and both output streams piped.
    pub fn start(line: &CommandLine) -> std::io::Result<Self> {
        let mut cmd = Command::new(&line.program);
        cmd.args(&line.args)
            .stdin(Stdio::inherit())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        let child = cmd.spawn()?;
        Ok(Self { child })
    }

    pub fn id(&self) -> Option<u32> {
        self.child.id()
    }

    /// Block until the child exits, then return all of stdout and stderr at once.
    pub async fn wait_with_output(self) -> std::io::Result<CapturedOutput> {
        let out = self.child.wait_with_output().await?;
        Ok(CapturedOutput {
            stdout: String::from_utf8_lossy(&out.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&out.stderr).into_owned(),
            exit_code: exit_code(out.status),
        })
    }
}

/// Exit code as the child reported it; a signal-killed child maps to `-signal`.
pub fn exit_code(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(sig) = status.signal() {
            return -sig;
        }
    }
    -1
}
