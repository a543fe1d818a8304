//! Caller side: drive the generator script through the runner and load its result.

use std::fs;
use std::path::{Path, PathBuf};

use uuid::Uuid;

use crate::execution::{marker::find_marker, ExecutionRequest, Runner, RunnerError};
use crate::generation::metadata::{ArtifactPaths, Metadata};

#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    #[error(transparent)]
    Runner(#[from] RunnerError),
    #[error("metadata file was not produced: {}", .0.display())]
    MissingMetadata(PathBuf),
    #[error("invalid metadata in {}: {source}", .path.display())]
    InvalidMetadata {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to create job directory {}: {source}", .path.display())]
    JobDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// A finished generation as seen from the caller.
#[derive(Debug)]
pub struct GeneratedModel {
    pub metadata_path: PathBuf,
    pub metadata: Metadata,
    /// Whatever the generator wrote to stderr, even on success.
    pub stderr: String,
}

pub struct Bridge {
    runner: Runner,
    environment: String,
    script: String,
    job_dirs: bool,
}

impl Bridge {
    pub fn new(runner: Runner, environment: impl Into<String>, script: impl Into<String>) -> Self {
        Self {
            runner,
            environment: environment.into(),
            script: script.into(),
            job_dirs: false,
        }
    }

    /// Give every call its own random subdirectory of the output directory.
    pub fn with_job_dirs(mut self, enabled: bool) -> Self {
        self.job_dirs = enabled;
        self
    }

    fn target_dir(&self, output_dir: &Path) -> PathBuf {
        if self.job_dirs {
            output_dir.join(Uuid::new_v4().to_string())
        } else {
            output_dir.to_path_buf()
        }
    }

    /// Run the generator for `prompt` and return the metadata it wrote.
    pub async fn generate_model(
        &self,
        prompt: &str,
        output_dir: &Path,
        model_id: &str,
    ) -> Result<GeneratedModel, BridgeError> {
        let dir = self.target_dir(output_dir);
        let req = ExecutionRequest::new(
            self.environment.as_str(),
            self.script.as_str(),
            vec![
                prompt.to_string(),
                dir.to_string_lossy().into_owned(),
                model_id.to_string(),
            ],
        )?;
        if self.job_dirs {
            fs::create_dir_all(&dir).map_err(|source| BridgeError::JobDir {
                path: dir.clone(),
                source,
            })?;
            tracing::debug!(dir = %dir.display(), "created job directory");
        }
        let result = self.runner.run(&req).await?;
        for line in result.stdout.lines() {
            tracing::debug!(target: "mesh_bridge::generator", "{}", line);
        }
        if !result.stderr.trim().is_empty() {
            if result.success() {
                tracing::warn!(stderr = %result.stderr.trim_end(), "generator wrote to stderr");
            } else {
                tracing::error!(
                    code = result.exit_code,
                    stderr = %result.stderr.trim_end(),
                    "generator failed"
                );
            }
        }
        let result = result.into_success()?;

        let path = match find_marker(&result.stdout) {
            Some(p) => p,
            None => {
                let fallback = ArtifactPaths::new(&dir, prompt).metadata;
                tracing::warn!(
                    path = %fallback.display(),
                    "no marker line in generator output, using derived metadata path"
                );
                fallback
            }
        };
        if !path.is_file() {
            return Err(BridgeError::MissingMetadata(path));
        }

        tracing::info!(path = %path.display(), "reading metadata");
        let metadata = Metadata::read_from(&path).map_err(|source| BridgeError::InvalidMetadata {
            path: path.clone(),
            source,
        })?;
        Ok(GeneratedModel {
            metadata_path: path,
            metadata,
            stderr: result.stderr,
        })
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::process::conda::CondaLauncher;
    use std::fs;
    use std::os::unix::fs::PermissionsExt;

    // Fake conda: argv is `run -n <env> python -u <script> <prompt> <dir> <model>`.
    fn fake_conda(dir: &Path, body: &str) -> Runner {
        let conda = dir.join("conda");
        fs::write(&conda, format!("#!/bin/sh\n{}\n", body)).unwrap();
        fs::set_permissions(&conda, fs::Permissions::from_mode(0o755)).unwrap();
        Runner::new(CondaLauncher::new(conda, "python"))
    }

    const WRITE_METADATA: &str = r#"meta="$8/$(echo "$7" | tr ' ' '_')_metadata.json"
mkdir -p "$8"
cat > "$meta" <<JSON
{"status":"completed","prompt":"$7","obj_path":"a.obj","ply_path":"a.ply","gif_path":"a.gif","stats":{"vertices":3,"faces":1}}
JSON"#;

    #[tokio::test]
    async fn test_marker_path_is_loaded() {
        let tmp = tempfile::tempdir().unwrap();
        let runner = fake_conda(
            tmp.path(),
            &format!("{}\necho progress\necho \"OUTPUT:$meta\"", WRITE_METADATA),
        );
        let out = tmp.path().join("out");
        let bridge = Bridge::new(runner, "shape", "gen.py");
        let model = bridge
            .generate_model("a red chair", &out, "openai/shap-e")
            .await
            .unwrap();
        assert_eq!(model.metadata_path, out.join("a_red_chair_metadata.json"));
        assert_eq!(model.metadata.prompt, "a red chair");
        assert_eq!(model.metadata.stats.vertices, 3);
        assert_eq!(model.stderr, "");
    }

    #[tokio::test]
    async fn test_missing_marker_falls_back_to_derived_path() {
        let tmp = tempfile::tempdir().unwrap();
        let runner = fake_conda(tmp.path(), WRITE_METADATA);
        let out = tmp.path().join("out");
        let model = Bridge::new(runner, "shape", "gen.py")
            .generate_model("cube", &out, "m")
            .await
            .unwrap();
        assert_eq!(model.metadata_path, out.join("cube_metadata.json"));
    }

    #[tokio::test]
    async fn test_child_failure_surfaces_code_and_stderr() {
        let tmp = tempfile::tempdir().unwrap();
        let runner = fake_conda(tmp.path(), "echo boom >&2\nexit 7");
        let err = Bridge::new(runner, "shape", "gen.py")
            .generate_model("cube", tmp.path(), "m")
            .await
            .unwrap_err();
        match err {
            BridgeError::Runner(RunnerError::ChildFailure { code, stderr }) => {
                assert_eq!(code, 7);
                assert_eq!(stderr, "boom\n");
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_success_without_metadata_is_error() {
        let tmp = tempfile::tempdir().unwrap();
        let runner = fake_conda(tmp.path(), "echo OUTPUT:/nonexistent/x_metadata.json");
        let err = Bridge::new(runner, "shape", "gen.py")
            .generate_model("x", tmp.path(), "m")
            .await
            .unwrap_err();
        assert!(matches!(err, BridgeError::MissingMetadata(_)));
    }

    #[tokio::test]
    async fn test_failed_generator_error_shows_traceback() {
        let tmp = tempfile::tempdir().unwrap();
        let runner = fake_conda(tmp.path(), "echo 'Traceback: model not found' >&2\nexit 1");
        let err = Bridge::new(runner, "shape", "gen.py")
            .generate_model("cube", tmp.path(), "m")
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Traceback: model not found"));
    }

    #[tokio::test]
    async fn test_stderr_of_successful_run_is_returned() {
        let tmp = tempfile::tempdir().unwrap();
        let runner = fake_conda(
            tmp.path(),
            &format!("{}\necho 'slow fallback to cpu' >&2\necho \"OUTPUT:$meta\"", WRITE_METADATA),
        );
        let model = Bridge::new(runner, "shape", "gen.py")
            .generate_model("cube", &tmp.path().join("out"), "m")
            .await
            .unwrap();
        assert_eq!(model.stderr, "slow fallback to cpu\n");
    }

    #[tokio::test]
    async fn test_job_dirs_keep_same_prompt_runs_apart() {
        let tmp = tempfile::tempdir().unwrap();
        let runner = fake_conda(tmp.path(), WRITE_METADATA);
        let out = tmp.path().join("out");
        let bridge = Bridge::new(runner, "shape", "gen.py").with_job_dirs(true);

        let first = bridge.generate_model("cube", &out, "m").await.unwrap();
        let second = bridge.generate_model("cube", &out, "m").await.unwrap();

        assert_ne!(first.metadata_path, second.metadata_path);
        for model in [&first, &second] {
            assert!(model.metadata_path.is_file());
            assert_eq!(model.metadata_path.file_name().unwrap(), "cube_metadata.json");
            let job = model.metadata_path.parent().unwrap();
            assert_eq!(job.parent().unwrap(), out);
        }
    }
}
