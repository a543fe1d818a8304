//! Artifact naming, mesh statistics, and the metadata document.

use std::{
    fs,
    io::{self, BufRead, BufReader, BufWriter, Write},
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};

/// Prompt as it appears in file names: spaces become underscores, nothing else changes.
pub fn sanitize_prompt(prompt: &str) -> String {
    prompt.replace(' ', "_")
}

/// Every path a run writes, derived only from the output directory and the prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactPaths {
    pub obj: PathBuf,
    pub ply: PathBuf,
    pub gif: PathBuf,
    pub metadata: PathBuf,
}

impl ArtifactPaths {
    pub fn new(output_dir: &Path, prompt: &str) -> Self {
        let stem = sanitize_prompt(prompt);
        Self {
            obj: output_dir.join(format!("{stem}.obj")),
            ply: output_dir.join(format!("{stem}.ply")),
            gif: output_dir.join(format!("{stem}.gif")),
            metadata: output_dir.join(format!("{stem}_metadata.json")),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeshStats {
    pub vertices: u64,
    pub faces: u64,
}

/// Count `v ` and `f ` records in a Wavefront OBJ file.
pub fn count_obj_elements(path: &Path) -> io::Result<MeshStats> {
    let reader = BufReader::new(fs::File::open(path)?);
    let mut stats = MeshStats::default();
    for line in reader.lines() {
        let line = line?;
        if line.starts_with("v ") {
            stats.vertices += 1;
        } else if line.starts_with("f ") {
            stats.faces += 1;
        }
    }
    Ok(stats)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GenerationStatus {
    Completed,
}

/// The durable record of one generation run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metadata {
    pub status: GenerationStatus,
    pub prompt: String,
    pub obj_path: PathBuf,
    pub ply_path: PathBuf,
    pub gif_path: PathBuf,
    pub stats: MeshStats,
}

impl Metadata {
    pub fn completed(prompt: &str, obj: &Path, ply: &Path, gif: &Path, stats: MeshStats) -> Self {
        Self {
            status: GenerationStatus::Completed,
            prompt: prompt.to_string(),
            obj_path: obj.to_path_buf(),
            ply_path: ply.to_path_buf(),
            gif_path: gif.to_path_buf(),
            stats,
        }
    }

    /// Write as JSON with four-space indentation, replacing any existing file.
    pub fn write_to(&self, path: &Path) -> io::Result<()> {
        let mut w = BufWriter::new(fs::File::create(path)?);
        let fmt = serde_json::ser::PrettyFormatter::with_indent(b"    ");
        let mut ser = serde_json::Serializer::with_formatter(&mut w, fmt);
        self.serialize(&mut ser)?;
        w.write_all(b"\n")?;
        w.flush()
    }

    pub fn read_from(path: &Path) -> Result<Self, serde_json::Error> {
        let text = fs::read_to_string(path).map_err(serde_json::Error::io)?;
        serde_json::from_str(&text)
    }
}
