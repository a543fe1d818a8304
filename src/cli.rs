use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug, Clone)]
#[command(
    name = "mesh-bridge",
    about = "Run text-to-3D generation scripts inside conda environments",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Run a script with the environment's interpreter and exit with its status.
    Run {
        /// Conda environment name (defaults to CONDA_ENV from the config).
        #[arg(long)]
        env: Option<String>,

        /// Path to the script to execute.
        #[arg(long)]
        script: Option<String>,

        /// Arguments for the script, given after `--` and forwarded untouched.
        #[arg(last = true, allow_hyphen_values = true, value_name = "ARGS")]
        args: Vec<String>,
    },

    /// Generate a 3D asset from a prompt and print `OUTPUT:<metadata path>`.
    Generate {
        /// Text description of the asset.
        #[arg(value_name = "PROMPT")]
        prompt: String,

        /// Directory receiving the .obj/.ply/.gif files and the metadata document.
        #[arg(value_name = "OUTPUT_DIR")]
        output_dir: PathBuf,

        /// Pretrained model identifier (defaults to DEFAULT_MODEL_ID).
        #[arg(value_name = "MODEL_ID")]
        model_id: Option<String>,
    },

    /// Run the generator script through `run` and print the resulting metadata.
    Request {
        /// Text description of the asset.
        #[arg(value_name = "PROMPT")]
        prompt: String,

        /// Output directory (defaults to OUTPUT_DIR).
        #[arg(long = "output-dir")]
        output_dir: Option<PathBuf>,

        /// Pretrained model identifier (defaults to DEFAULT_MODEL_ID).
        #[arg(long)]
        model: Option<String>,

        /// Conda environment name (defaults to CONDA_ENV).
        #[arg(long)]
        env: Option<String>,

        /// Generator script (defaults to GENERATOR_SCRIPT).
        #[arg(long)]
        script: Option<String>,

        /// Write into a fresh random subdirectory of the output directory (also JOB_DIRS=true).
        #[arg(long = "job-dir")]
        job_dir: bool,
    },
}

impl Cli {
    pub fn parse() -> Self {
        <Self as Parser>::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_tail_after_separator_is_raw() {
        let cli = Cli::try_parse_from([
            "mesh-bridge", "run", "--env", "shape", "--script", "gen.py", "--", "--text", "a chair", "-v",
        ])
        .unwrap();
        match cli.command {
            Command::Run { env, script, args } => {
                assert_eq!(env.as_deref(), Some("shape"));
                assert_eq!(script.as_deref(), Some("gen.py"));
                assert_eq!(args, vec!["--text", "a chair", "-v"]);
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_generate_positionals() {
        let cli = Cli::try_parse_from(["mesh-bridge", "generate", "a chair", "out"]).unwrap();
        match cli.command {
            Command::Generate { prompt, output_dir, model_id } => {
                assert_eq!(prompt, "a chair");
                assert_eq!(output_dir, PathBuf::from("out"));
                assert_eq!(model_id, None);
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_request_job_dir_flag() {
        let cli = Cli::try_parse_from(["mesh-bridge", "request", "a chair", "--job-dir"]).unwrap();
        match cli.command {
            Command::Request { prompt, job_dir, output_dir, .. } => {
                assert_eq!(prompt, "a chair");
                assert!(job_dir);
                assert_eq!(output_dir, None);
            }
            other => panic!("unexpected: {:?}", other),
        }
    }
}
