//! Text-to-3D generation driver.
//!
//! [`Generator::generate`] walks a fixed sequence: prepare the output directory,
//! pick a device, load the backend pipeline, run it, export obj/ply/gif, count mesh
//! elements, write the metadata document, and finally print the `OUTPUT:` marker.
//! Only the mesh statistics step is allowed to fail without failing the run.

use std::{
    fmt, fs,
    io::Write,
    path::{Path, PathBuf},
};

use crate::config::OnExisting;
use crate::execution::marker::marker_line;

pub mod external;
pub mod metadata;

use metadata::{count_obj_elements, ArtifactPaths, MeshStats, Metadata};

pub const DEFAULT_MODEL_ID: &str = "openai/shap-e";

#[derive(Debug, thiserror::Error)]
pub enum AdapterError {
    #[error("invalid generation request: {0}")]
    InvalidRequest(String),
    #[error("refusing to overwrite existing output: {}", .0.display())]
    OutputExists(PathBuf),
    #[error("failed to load model {model_id}: {reason}")]
    BackendLoad { model_id: String, reason: String },
    #[error("inference failed: {0}")]
    Inference(String),
    #[error("{format} export failed: {reason}")]
    Export { format: &'static str, reason: String },
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    pub prompt: String,
    pub output_dir: PathBuf,
    pub model_id: String,
}

impl GenerationRequest {
    pub fn new(
        prompt: impl Into<String>,
        output_dir: impl Into<PathBuf>,
        model_id: Option<String>,
    ) -> Result<Self, AdapterError> {
        let prompt = prompt.into();
        if prompt.trim().is_empty() {
            return Err(AdapterError::InvalidRequest("prompt must not be empty".into()));
        }
        // The prompt becomes a file name; separators would escape the output directory.
        if prompt.contains('/') || prompt.contains('\\') {
            return Err(AdapterError::InvalidRequest(
                "prompt must not contain path separators".into(),
            ));
        }
        // A line break would put extra `OUTPUT:` lines on stdout.
        if prompt.chars().any(char::is_control) {
            return Err(AdapterError::InvalidRequest(
                "prompt must not contain control characters".into(),
            ));
        }
        Ok(Self {
            prompt,
            output_dir: output_dir.into(),
            model_id: model_id
                .filter(|m| !m.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_MODEL_ID.to_string()),
        })
    }

    pub fn paths(&self) -> ArtifactPaths {
        ArtifactPaths::new(&self.output_dir, &self.prompt)
    }
}

/// Quality knobs handed to the pipeline. Not exposed to callers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenerationParams {
    pub guidance_scale: f32,
    pub num_inference_steps: u32,
    pub size: u32,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            guidance_scale: 15.0,
            num_inference_steps: 64,
            size: 256,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Device {
    Cuda,
    Cpu,
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Device::Cuda => f.write_str("cuda"),
            Device::Cpu => f.write_str("cpu"),
        }
    }
}

pub trait GenerationBackend {
    type Pipeline: Pipeline;

    fn accelerator_available(&self) -> bool;

    fn load(&self, model_id: &str, device: Device) -> Result<Self::Pipeline, AdapterError>;
}

pub trait Pipeline {
    type Asset: GeneratedAsset;

    fn generate(&self, prompt: &str, params: &GenerationParams) -> Result<Self::Asset, AdapterError>;
}

pub trait GeneratedAsset {
    fn export_obj(&self, path: &Path) -> Result<(), AdapterError>;

    fn export_ply(&self, path: &Path) -> Result<(), AdapterError>;

    /// Returns the path actually written, which the metadata records.
    fn export_gif(&self, path: &Path) -> Result<PathBuf, AdapterError>;
}

#[derive(Debug, Clone)]
pub struct GenerationOutcome {
    pub metadata_path: PathBuf,
    pub metadata: Metadata,
}

pub struct Generator<B> {
    backend: B,
    on_existing: OnExisting,
}

impl<B: GenerationBackend> Generator<B> {
    pub fn new(backend: B, on_existing: OnExisting) -> Self {
        Self {
            backend,
            on_existing,
        }
    }

    /// Run one generation. Progress and the final marker line go to `out`.
    pub fn generate<W: Write>(
        &self,
        req: &GenerationRequest,
        out: &mut W,
    ) -> Result<GenerationOutcome, AdapterError> {
        fs::create_dir_all(&req.output_dir)?;
        let paths = req.paths();
        if paths.metadata.exists() {
            match self.on_existing {
                OnExisting::Error => return Err(AdapterError::OutputExists(paths.metadata)),
                OnExisting::Overwrite => tracing::warn!(
                    path = %paths.metadata.display(),
                    "overwriting output from a previous run"
                ),
            }
        }

        let device = if self.backend.accelerator_available() {
            Device::Cuda
        } else {
            Device::Cpu
        };
        writeln!(out, "Using device: {}", device)?;

        let pipeline = self.backend.load(&req.model_id, device)?;
        tracing::info!(model_id = %req.model_id, %device, "pipeline loaded");

        writeln!(out, "Generating 3D model for prompt: '{}'", req.prompt)?;
        let asset = pipeline.generate(&req.prompt, &GenerationParams::default())?;

        writeln!(out, "Exporting results...")?;
        asset.export_obj(&paths.obj)?;
        asset.export_ply(&paths.ply)?;
        let gif_path = asset.export_gif(&paths.gif)?;

        let stats = match count_obj_elements(&paths.obj) {
            Ok(stats) => stats,
            Err(e) => {
                tracing::warn!(path = %paths.obj.display(), error = %e, "mesh statistics unavailable");
                writeln!(out, "Error counting vertices and faces: {}", e)?;
                MeshStats::default()
            }
        };

        let metadata = Metadata::completed(&req.prompt, &paths.obj, &paths.ply, &gif_path, stats);
        metadata.write_to(&paths.metadata)?;

        writeln!(out, "Metadata written to: {}", paths.metadata.display())?;
        writeln!(out, "Generation completed successfully!")?;
        writeln!(out, "{}", marker_line(&paths.metadata))?;
        out.flush()?;

        Ok(GenerationOutcome {
            metadata_path: paths.metadata,
            metadata,
        })
    }
}
