//! Application state: prompts, the paced generation client, and the shutdown token.
//!
//! This module owns:
//!   - the generation client (model transport + shared rate limiter)
//!   - the prompts struct and limits (from TOML or defaults)
//!   - the root cancellation token; every request works on a child of it
//!
//! A missing API key does not stop startup: the transport reports it per call
//! and generation serves fallback content.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{info, instrument};

use crate::client::GenerationClient;
use crate::config::{load_exam_config_from_env, ExamConfig, Limits, Prompts};
use crate::error::ModelError;
use crate::model::{model_from_env, TextModel};

pub struct AppState {
    pub client: GenerationClient,
    pub prompts: Prompts,
    pub limits: Limits,
    pub shutdown: CancellationToken,
}

impl AppState {
    /// Build state from env: load config, select the model, set up pacing.
    #[instrument(level = "info", skip_all)]
    pub fn from_env(shutdown: CancellationToken) -> Result<Self, ModelError> {
        let cfg = load_exam_config_from_env().unwrap_or_default();
        let model = model_from_env()?;
        Ok(Self::with_model(model, cfg, shutdown))
    }

    pub fn with_model(model: Arc<dyn TextModel>, cfg: ExamConfig, shutdown: CancellationToken) -> Self {
        info!(
            target: "examgen_backend",
            model = %model.name(),
            min_interval_ms = cfg.limits.min_request_interval_ms,
            max_retries = cfg.limits.max_retries,
            max_questions = cfg.limits.max_questions,
            "Generation client ready"
        );
        let client = GenerationClient::new(model, cfg.limits.clone(), cfg.prompts.json_only.clone());
        Self { client, prompts: cfg.prompts, limits: cfg.limits, shutdown }
    }

    /// Cancellation scope for one request or WebSocket session.
    pub fn request_token(&self) -> CancellationToken {
        self.shutdown.child_token()
    }

    pub fn model(&self) -> &dyn TextModel {
        self.client.model().as_ref()
    }
}
