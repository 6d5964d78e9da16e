use std::net::SocketAddr;
use std::path::PathBuf;

use thiserror::Error;

/// Application-level constants
pub const APP_NAME: &str = "ToleranceAI";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Log filter used when `RUST_LOG` is unset.
pub fn default_log_filter() -> &'static str {
    "toleranceai=info,toleranceai_lib=info,tower_http=info,warn"
}

/// Application data directory: `~/ToleranceAI/`, or the working directory
/// when no home directory can be determined.
pub fn app_data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_NAME)
}

/// Default location of the brain database.
pub fn default_db_path() -> PathBuf {
    app_data_dir().join("brain.db")
}

/// Directory holding `model.onnx` and `tokenizer.json` for all-MiniLM-L6-v2.
pub fn default_embedding_model_dir() -> PathBuf {
    app_data_dir().join("models").join("all-MiniLM-L6-v2")
}

#[derive(Error, Debug, PartialEq)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: &'static str, value: String },
}

/// Runtime configuration, read from the environment with local defaults.
#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    pub cors_origin: String,
    pub ollama_url: String,
    pub ollama_timeout_secs: u64,
    pub ollama_connect_timeout_secs: u64,
    pub student_model: String,
    pub classifier_model: String,
    pub baseline_model: String,
    pub worker_model: String,
    pub db_path: PathBuf,
    pub freecad_url: String,
    pub freecad_mock: bool,
    pub freecad_timeout_secs: u64,
    pub standards_top_k: usize,
    /// Only read when built with the `onnx-embeddings` feature.
    pub embedding_model_dir: PathBuf,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 8000)),
            cors_origin: "http://localhost:5173".to_string(),
            ollama_url: "http://localhost:11434".to_string(),
            ollama_timeout_secs: 120,
            ollama_connect_timeout_secs: 5,
            student_model: "gemma3n:e2b".to_string(),
            classifier_model: "gemma3:1b".to_string(),
            baseline_model: "gemma3:1b".to_string(),
            worker_model: "gemma3n:e2b".to_string(),
            db_path: default_db_path(),
            freecad_url: "http://127.0.0.1:9875".to_string(),
            freecad_mock: false,
            freecad_timeout_secs: 10,
            standards_top_k: 5,
            embedding_model_dir: default_embedding_model_dir(),
        }
    }
}

fn parse<T: std::str::FromStr>(key: &'static str, raw: &str) -> Result<T, ConfigError> {
    raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
        key,
        value: raw.to_string(),
    })
}

fn parse_bool(key: &'static str, raw: &str) -> Result<bool, ConfigError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            key,
            value: raw.to_string(),
        }),
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup. Missing keys keep their default.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = Self::default();
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = get("TOLERANCEAI_BIND") {
            cfg.bind_addr = parse("TOLERANCEAI_BIND", &v)?;
        }
        if let Some(v) = get("TOLERANCEAI_CORS_ORIGIN") {
            cfg.cors_origin = v;
        }
        if let Some(v) = get("OLLAMA_URL") {
            cfg.ollama_url = v;
        }
        if let Some(v) = get("OLLAMA_TIMEOUT_SECS") {
            cfg.ollama_timeout_secs = parse("OLLAMA_TIMEOUT_SECS", &v)?;
        }
        if let Some(v) = get("TOLERANCEAI_STUDENT_MODEL") {
            cfg.student_model = v;
        }
        if let Some(v) = get("TOLERANCEAI_CLASSIFIER_MODEL") {
            cfg.classifier_model = v;
        }
        if let Some(v) = get("TOLERANCEAI_BASELINE_MODEL") {
            cfg.baseline_model = v;
        }
        if let Some(v) = get("TOLERANCEAI_WORKER_MODEL") {
            cfg.worker_model = v;
        }
        if let Some(v) = get("TOLERANCEAI_DB") {
            cfg.db_path = PathBuf::from(v);
        }
        if let Some(v) = get("FREECAD_URL") {
            cfg.freecad_url = v;
        }
        if let Some(v) = get("FREECAD_MOCK") {
            cfg.freecad_mock = parse_bool("FREECAD_MOCK", &v)?;
        }
        if let Some(v) = get("FREECAD_TIMEOUT_SECS") {
            cfg.freecad_timeout_secs = parse("FREECAD_TIMEOUT_SECS", &v)?;
        }
        if let Some(v) = get("TOLERANCEAI_STANDARDS_TOP_K") {
            cfg.standards_top_k = parse("TOLERANCEAI_STANDARDS_TOP_K", &v)?;
        }
        if let Some(v) = get("TOLERANCEAI_EMBEDDING_MODEL_DIR") {
            cfg.embedding_model_dir = PathBuf::from(v);
        }
        Ok(cfg)
    }
}
