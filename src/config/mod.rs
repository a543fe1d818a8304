use std::{
    collections::HashMap,
    env,
    fs,
    io::{BufRead, BufReader},
    path::{Path, PathBuf},
};

use directories::BaseDirs;

/// Prefix for environment overrides, e.g. `MESH_BRIDGE_CONDA_ENV`.
const ENV_PREFIX: &str = "MESH_BRIDGE_";

#[derive(Debug, Clone)]
pub struct Config {
    inner: HashMap<String, String>,
    pub config_path: PathBuf,
}

/// What to do when a generation would replace artifacts from an earlier run
/// with the same prompt and output directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OnExisting {
    Overwrite,
    Error,
}

impl Config {
    pub fn load() -> Self {
        Self::load_from(&default_config_path())
    }

    pub fn load_from(config_path: &Path) -> Self {
        let mut map = default_map();

        // Read .meshbridgerc if exists
        if config_path.exists() {
            if let Ok(file) = fs::File::open(config_path) {
                let reader = BufReader::new(file);
                for line in reader.lines().map_while(Result::ok) {
                    let line = line.trim();
                    if line.is_empty() || line.starts_with('#') {
                        continue;
                    }
                    if let Some((k, v)) = line.split_once('=') {
                        let key = k.trim();
                        if is_config_key(key) {
                            map.insert(key.to_string(), v.trim().to_string());
                        }
                    }
                }
            }
        }

        // Overlay environment variables (take precedence)
        for (k, v) in env::vars() {
            if let Some(key) = k.strip_prefix(ENV_PREFIX) {
                if is_config_key(key) {
                    map.insert(key.to_string(), v);
                }
            }
        }

        Self {
            inner: map,
            config_path: config_path.to_path_buf(),
        }
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.inner.get(key).filter(|v| !v.is_empty()).cloned()
    }

    pub fn get_bool(&self, key: &str) -> bool {
        self.get(key)
            .map(|v| v.eq_ignore_ascii_case("true") || v == "1")
            .unwrap_or(false)
    }

    pub fn get_path(&self, key: &str) -> Option<PathBuf> {
        self.get(key).map(PathBuf::from)
    }

    pub fn conda_exe(&self) -> PathBuf {
        self.get_path("CONDA_EXE").unwrap_or_else(|| PathBuf::from("conda"))
    }

    pub fn python_name(&self) -> String {
        self.get("PYTHON_NAME").unwrap_or_else(|| "python".into())
    }

    pub fn default_model_id(&self) -> String {
        self.get("DEFAULT_MODEL_ID")
            .unwrap_or_else(|| crate::generation::DEFAULT_MODEL_ID.into())
    }

    pub fn output_dir(&self) -> PathBuf {
        self.get_path("OUTPUT_DIR").unwrap_or_else(|| PathBuf::from("models"))
    }

    pub fn backend_command(&self) -> String {
        self.get("BACKEND_COMMAND")
            .unwrap_or_else(|| "shap-e-export".into())
    }

    /// Unknown values fall back to overwriting, matching the historical behavior.
    pub fn on_existing(&self) -> OnExisting {
        match self.get("ON_EXISTING").as_deref() {
            Some(v) if v.eq_ignore_ascii_case("error") => OnExisting::Error,
            _ => OnExisting::Overwrite,
        }
    }

    #[cfg(test)]
    pub fn from_pairs(pairs: &[(&str, &str)]) -> Self {
        let mut map = default_map();
        for (k, v) in pairs {
            map.insert((*k).to_string(), (*v).to_string());
        }
        Self {
            inner: map,
            config_path: PathBuf::new(),
        }
    }
}

fn is_config_key(k: &str) -> bool {
    const KEYS: &[&str] = &[
        "CONDA_EXE",
        "PYTHON_NAME",
        "CONDA_ENV",
        "GENERATOR_SCRIPT",
        "DEFAULT_MODEL_ID",
        "OUTPUT_DIR",
        "BACKEND_COMMAND",
        "ON_EXISTING",
        "JOB_DIRS",
        "LOG_LEVEL",
        "LOG_JSON",
    ];

    KEYS.contains(&k)
}

fn default_config_path() -> PathBuf {
    let base = BaseDirs::new()
        .map(|b| b.config_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from("~/.config"));
    base.join("mesh_bridge").join(".meshbridgerc")
}

fn default_map() -> HashMap<String, String> {
    let mut m = HashMap::new();

    // Interpreter launch
    m.insert("CONDA_EXE".into(), "conda".into());
    m.insert("PYTHON_NAME".into(), "python".into());

    // Generation
    m.insert(
        "DEFAULT_MODEL_ID".into(),
        crate::generation::DEFAULT_MODEL_ID.into(),
    );
    m.insert("OUTPUT_DIR".into(), "models".into());
    m.insert("BACKEND_COMMAND".into(), "shap-e-export".into());
    m.insert("ON_EXISTING".into(), "overwrite".into());
    m.insert("JOB_DIRS".into(), "false".into());

    // Logging
    m.insert("LOG_LEVEL".into(), "warn".into());
    m.insert("LOG_JSON".into(), "false".into());

    m
}
