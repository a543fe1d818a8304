//! `request`: run the generator through the runner and print its metadata.

use std::path::PathBuf;

use anyhow::Result;
use serde_json::json;

use crate::{bridge::Bridge, config::Config, execution::Runner, printer::OutputEcho};

pub async fn run(
    cfg: &Config,
    prompt: String,
    output_dir: Option<PathBuf>,
    model: Option<String>,
    env: Option<String>,
    script: Option<String>,
    job_dir: bool,
) -> Result<i32> {
    let env = env.or_else(|| cfg.get("CONDA_ENV")).unwrap_or_default();
    let script = script.or_else(|| cfg.get("GENERATOR_SCRIPT")).unwrap_or_default();
    let output_dir = output_dir.unwrap_or_else(|| cfg.output_dir());
    let model = model.unwrap_or_else(|| cfg.default_model_id());

    let bridge = Bridge::new(Runner::from_config(cfg), env, script)
        .with_job_dirs(job_dir || cfg.get_bool("JOB_DIRS"));
    let generated = bridge.generate_model(&prompt, &output_dir, &model).await?;

    let doc = json!({ "metadata_path": generated.metadata_path, "metadata": generated.metadata });
    OutputEcho::default().echo(
        &format!("{}\n", serde_json::to_string_pretty(&doc)?),
        &generated.stderr,
    )?;
    Ok(0)
}
