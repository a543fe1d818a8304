//! Command construction for running a script inside a named conda environment.

use std::path::PathBuf;

use super::CommandLine;

/// Launches `<python> -u <script>` inside `conda run -n <env>`.
#[derive(Debug, Clone)]
pub struct CondaLauncher {
    pub conda: PathBuf,
    pub python: String,
}

impl Default for CondaLauncher {
    fn default() -> Self {
        Self {
            conda: PathBuf::from("conda"),
            python: "python".to_string(),
        }
    }
}

impl CondaLauncher {
    pub fn new(conda: impl Into<PathBuf>, python: impl Into<String>) -> Self {
        Self {
            conda: conda.into(),
            python: python.into(),
        }
    }

    pub fn command_line(&self, env: &str, script: &str, extra_args: &[String]) -> CommandLine {
        CommandLine::new(&self.conda)
            .args(["run", "-n", env])
            .arg(self.python.as_str())
            .arg("-u") // unbuffered
            .arg(script)
            .args(extra_args.iter().cloned())
    }
}
