//! Backend that delegates inference to an external exporter program.
//!
//! The program is invoked once per generation:
//!
//! ```text
//! <cmd> --model <id> --device <cuda|cpu> --prompt <text>
//!       --guidance-scale <f> --steps <n> --size <n> --out-dir <staging>
//! ```
//!
//! and must leave `mesh.obj`, `mesh.ply` and `preview.gif` in the staging
//! directory. Exports copy from there to their final location.

use std::{
    fs,
    path::{Path, PathBuf},
    process::{Command, Stdio},
};

use tempfile::TempDir;

use super::{AdapterError, Device, GeneratedAsset, GenerationBackend, GenerationParams, Pipeline};

const STAGED_OBJ: &str = "mesh.obj";
const STAGED_PLY: &str = "mesh.ply";
const STAGED_GIF: &str = "preview.gif";

#[derive(Debug, Clone)]
pub struct ExternalBackend {
    command: String,
}

impl ExternalBackend {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
        }
    }
}

impl GenerationBackend for ExternalBackend {
    type Pipeline = ExternalPipeline;

    fn accelerator_available(&self) -> bool {
        which::which("nvidia-smi").is_ok()
    }

    fn load(&self, model_id: &str, device: Device) -> Result<ExternalPipeline, AdapterError> {
        let program = which::which(&self.command).map_err(|e| AdapterError::BackendLoad {
            model_id: model_id.to_string(),
            reason: format!("backend command '{}' not found: {}", self.command, e),
        })?;
        tracing::debug!(program = %program.display(), "resolved backend command");
        Ok(ExternalPipeline {
            program,
            model_id: model_id.to_string(),
            device,
        })
    }
}

#[derive(Debug, Clone)]
pub struct ExternalPipeline {
    program: PathBuf,
    model_id: String,
    device: Device,
}

impl ExternalPipeline {
    fn args(&self, prompt: &str, params: &GenerationParams, out_dir: &Path) -> Vec<String> {
        vec![
            "--model".into(),
            self.model_id.clone(),
            "--device".into(),
            self.device.to_string(),
            "--prompt".into(),
            prompt.to_string(),
            "--guidance-scale".into(),
            params.guidance_scale.to_string(),
            "--steps".into(),
            params.num_inference_steps.to_string(),
            "--size".into(),
            params.size.to_string(),
            "--out-dir".into(),
            out_dir.to_string_lossy().into_owned(),
        ]
    }
}

impl Pipeline for ExternalPipeline {
    type Asset = StagedAsset;

    fn generate(&self, prompt: &str, params: &GenerationParams) -> Result<StagedAsset, AdapterError> {
        let staging = tempfile::Builder::new().prefix("mesh-bridge-").tempdir()?;
        let out = Command::new(&self.program)
            .args(self.args(prompt, params, staging.path()))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .map_err(|e| AdapterError::Inference(format!("failed to start backend: {}", e)))?;

        // Backend chatter stays out of stdout so it can never look like a marker line.
        for line in String::from_utf8_lossy(&out.stdout).lines() {
            tracing::debug!(target: "mesh_bridge::backend", "{}", line);
        }
        if !out.status.success() {
            let stderr = String::from_utf8_lossy(&out.stderr);
            return Err(AdapterError::Inference(format!(
                "backend exited with {}: {}",
                out.status,
                stderr.trim()
            )));
        }

        Ok(StagedAsset { staging })
    }
}

/// Generated files waiting in a temporary directory; removed on drop.
#[derive(Debug)]
pub struct StagedAsset {
    staging: TempDir,
}

impl StagedAsset {
    fn copy_out(&self, name: &str, format: &'static str, dest: &Path) -> Result<(), AdapterError> {
        let src = self.staging.path().join(name);
        if !src.is_file() {
            return Err(AdapterError::Export {
                format,
                reason: format!("backend did not produce {}", name),
            });
        }
        fs::copy(&src, dest).map_err(|e| AdapterError::Export {
            format,
            reason: format!("copying to {}: {}", dest.display(), e),
        })?;
        Ok(())
    }
}

impl GeneratedAsset for StagedAsset {
    fn export_obj(&self, path: &Path) -> Result<(), AdapterError> {
        self.copy_out(STAGED_OBJ, "obj", path)
    }

    fn export_ply(&self, path: &Path) -> Result<(), AdapterError> {
        self.copy_out(STAGED_PLY, "ply", path)
    }

    fn export_gif(&self, path: &Path) -> Result<PathBuf, AdapterError> {
        self.copy_out(STAGED_GIF, "gif", path)?;
        Ok(path.to_path_buf())
    }
}
