//! `run`: launch a script inside a conda environment and mirror its outcome.

use std::io::Write;

use anyhow::Result;

use crate::{
    config::Config,
    execution::{ExecutionRequest, ExecutionResult, Runner},
    printer::OutputEcho,
};

/// Returns the child's exit code unchanged.
pub async fn run(
    cfg: &Config,
    env: Option<String>,
    script: Option<String>,
    args: Vec<String>,
) -> Result<i32> {
    let env = env.or_else(|| cfg.get("CONDA_ENV")).unwrap_or_default();
    let req = ExecutionRequest::new(env, script.unwrap_or_default(), args)?;

    let result = Runner::from_config(cfg).run(&req).await?;
    let echo = OutputEcho::default();
    Ok(report(
        &echo,
        &mut std::io::stdout().lock(),
        &mut std::io::stderr().lock(),
        &result,
    ))
}

/// Echo the child's output; a broken stdout never replaces its exit code.
fn report<O: Write, E: Write>(
    echo: &OutputEcho,
    out: &mut O,
    err: &mut E,
    result: &ExecutionResult,
) -> i32 {
    if let Err(e) = echo.write_to(out, err, &result.stdout, &result.stderr) {
        tracing::warn!(error = %e, "failed to echo child output");
    }
    result.exit_code
}
