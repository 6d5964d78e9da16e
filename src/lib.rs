pub mod api;
pub mod brain;
pub mod cad;
pub mod config;
pub mod inference;
pub mod matcher;
pub mod models;
pub mod pipeline;

use std::path::Path;
use std::sync::Arc;

use thiserror::Error;
use tracing_subscriber::EnvFilter;

use crate::api::AppState;
use crate::brain::{BrainError, BrainLookup, CharacteristicRecord, ManufacturingLookup, SharedConnection};
use crate::cad::FreecadClient;
use crate::config::{AppConfig, ConfigError};
use crate::inference::{OllamaClient, OllamaModels, PromptConfig};
use crate::matcher::{EmbeddingModel, HashingEmbedder, StandardsIndex};
use crate::pipeline::{
    AnalysisPipeline, CadExtractor, Classifier, Collaborators, OutputGenerator, PipelineSettings,
    StandardsMatcher, ToleranceLookup, VisionExtractor,
};

#[derive(Error, Debug)]
pub enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Failed to start API server: {0}")]
    Io(#[from] std::io::Error),
}

/// Open (creating if needed) and seed the brain database, returning the
/// shared connection and the characteristics to index.
fn open_brain(path: &Path) -> Result<(SharedConnection, Vec<CharacteristicRecord>), BrainError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let conn = brain::open_database(path)?;
    brain::seed_defaults(&conn)?;
    let records = brain::list_characteristics(&conn)?;
    Ok((brain::shared(conn), records))
}

/// Sentence embeddings for standards matching: all-MiniLM-L6-v2 when built
/// with `onnx-embeddings` and the model is installed, hashing otherwise.
fn load_embedder(cfg: &AppConfig) -> Arc<dyn EmbeddingModel> {
    #[cfg(feature = "onnx-embeddings")]
    {
        match matcher::OnnxEmbedder::load(&cfg.embedding_model_dir) {
            Ok(embedder) => return Arc::new(embedder),
            Err(e) => tracing::warn!(error = %e, "ONNX embedder unavailable, using hashing embedder"),
        }
    }
    #[cfg(not(feature = "onnx-embeddings"))]
    tracing::info!(
        dir = %cfg.embedding_model_dir.display(),
        "Built without onnx-embeddings, using hashing embedder"
    );
    Arc::new(HashingEmbedder::new())
}

/// Build every collaborator from configuration. A collaborator that fails
/// to initialise is logged and left out; the pipeline degrades around it.
pub fn build_state(cfg: &AppConfig) -> AppState {
    let ollama = match OllamaClient::new(
        &cfg.ollama_url,
        cfg.ollama_timeout_secs,
        cfg.ollama_connect_timeout_secs,
        OllamaModels {
            student: cfg.student_model.clone(),
            worker: cfg.worker_model.clone(),
        },
        PromptConfig::default(),
    ) {
        Ok(client) => Some(Arc::new(client)),
        Err(e) => {
            tracing::warn!(error = %e, "Ollama client unavailable");
            None
        }
    };

    let freecad = match FreecadClient::new(&cfg.freecad_url, cfg.freecad_timeout_secs, cfg.freecad_mock) {
        Ok(client) => Some(Arc::new(client)),
        Err(e) => {
            tracing::warn!(error = %e, "FreeCAD client unavailable");
            None
        }
    };

    let (brain, manufacturing, matcher) = match open_brain(&cfg.db_path) {
        Ok((conn, records)) => {
            let matcher: Option<Arc<dyn StandardsMatcher>> =
                match StandardsIndex::from_characteristics(load_embedder(cfg), &records) {
                    Ok(index) => Some(Arc::new(index)),
                    Err(e) => {
                        tracing::warn!(error = %e, "Standards index unavailable");
                        None
                    }
                };
            (
                Some(BrainLookup::new(conn.clone())),
                Some(ManufacturingLookup::new(conn)),
                matcher,
            )
        }
        Err(e) => {
            tracing::warn!(path = %cfg.db_path.display(), error = %e, "Brain database unavailable");
            (None, None, None)
        }
    };

    let collaborators = Collaborators {
        vision: ollama.clone().map(|c| c as Arc<dyn VisionExtractor>),
        cad: freecad.clone().map(|c| c as Arc<dyn CadExtractor>),
        classifier: ollama.clone().map(|c| c as Arc<dyn Classifier>),
        matcher: matcher.clone(),
        tolerances: manufacturing
            .clone()
            .map(|m| Arc::new(m) as Arc<dyn ToleranceLookup>),
        generator: ollama.clone().map(|c| c as Arc<dyn OutputGenerator>),
    };
    let settings = PipelineSettings {
        classifier_model: cfg.classifier_model.clone(),
        baseline_model: cfg.baseline_model.clone(),
        standards_top_k: cfg.standards_top_k,
        ..PipelineSettings::default()
    };

    AppState {
        pipeline: AnalysisPipeline::new(collaborators, settings),
        ollama,
        freecad,
        brain,
        manufacturing,
        matcher,
    }
}

pub async fn run() -> Result<(), StartupError> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .init();

    tracing::info!("{} starting v{}", config::APP_NAME, config::APP_VERSION);

    let cfg = AppConfig::from_env()?;
    let state = build_state(&cfg);

    if let Some(ollama) = &state.ollama {
        match ollama.health_check().await {
            Ok(models) => tracing::info!(?models, "Ollama connected"),
            Err(e) => tracing::warn!(error = %e, "Ollama not available"),
        }
    }

    let app = api::api_router(state, &cfg.cors_origin);
    let mut server = api::start_server(app, cfg.bind_addr).await?;
    tracing::info!(addr = %server.addr, "Listening");

    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {e}");
    }
    server.shutdown();
    server.stopped().await;
    Ok(())
}
