//! `generate`: produce one asset and print the `OUTPUT:` marker.

use std::{io, path::PathBuf};

use anyhow::Result;

use crate::{
    config::Config,
    generation::{external::ExternalBackend, GenerationRequest, Generator},
};

pub fn run(cfg: &Config, prompt: String, output_dir: PathBuf, model_id: Option<String>) -> Result<i32> {
    let model_id = model_id.or_else(|| Some(cfg.default_model_id()));
    let req = GenerationRequest::new(prompt, output_dir, model_id)?;
    let generator = Generator::new(ExternalBackend::new(cfg.backend_command()), cfg.on_existing());

    let stdout = io::stdout();
    let mut out = stdout.lock();
    let outcome = generator.generate(&req, &mut out)?;
    tracing::info!(
        path = %outcome.metadata_path.display(),
        vertices = outcome.metadata.stats.vertices,
        faces = outcome.metadata.stats.faces,
        "generation finished"
    );
    Ok(0)
}
