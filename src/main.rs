mod bridge;
mod cli;
mod config;
mod execution;
mod generation;
mod handlers;
mod observability;
mod printer;
mod process;

use bridge::BridgeError;
use cli::Command;
use config::Config;
use execution::RunnerError;

/// Usage problems detected before any child process exists.
const EXIT_CONFIGURATION: i32 = 2;
/// The interpreter launcher itself could not be started.
const EXIT_SPAWN: i32 = 127;

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let args = cli::Cli::parse();
    let cfg = Config::load();
    observability::init_tracing(&cfg);
    tracing::debug!(path = %cfg.config_path.display(), "config loaded");

    let outcome = match args.command {
        Command::Run { env, script, args } => handlers::run::run(&cfg, env, script, args).await,
        Command::Generate {
            prompt,
            output_dir,
            model_id,
        } => handlers::generate::run(&cfg, prompt, output_dir, model_id),
        Command::Request {
            prompt,
            output_dir,
            model,
            env,
            script,
            job_dir,
        } => handlers::request::run(&cfg, prompt, output_dir, model, env, script, job_dir).await,
    };

    let code = match outcome {
        Ok(code) => code,
        Err(e) => {
            eprintln!("mesh-bridge: {:#}", e);
            failure_code(&e)
        }
    };
    std::process::exit(code);
}

fn failure_code(err: &anyhow::Error) -> i32 {
    let runner_err = err.downcast_ref::<RunnerError>().or_else(|| {
        match err.downcast_ref::<BridgeError>() {
            Some(BridgeError::Runner(e)) => Some(e),
            _ => None,
        }
    });
    match runner_err {
        Some(RunnerError::Configuration(_)) => EXIT_CONFIGURATION,
        Some(RunnerError::Spawn { .. }) => EXIT_SPAWN,
        Some(RunnerError::ChildFailure { code, .. }) if *code != 0 => *code,
        _ => 1,
    }
}
