//! The text-model boundary: one prompt in, one text response out.
//!
//! The generation core only depends on `TextModel`; concrete transports
//! (Gemini, OpenAI-compatible) are picked from the environment at startup.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use tracing::info;

use crate::error::ModelError;
use crate::gemini::Gemini;
use crate::openai::OpenAI;

#[async_trait]
pub trait TextModel: Send + Sync {
  /// Model identifier used in logs and diagnostics.
  fn name(&self) -> &str;

  async fn generate_text(&self, prompt: &str) -> Result<String, ModelError>;
}

/// Build the model selected by MODEL_PROVIDER ("gemini" by default, or "openai").
///
/// A missing API key is not an error here: the transport reports it on every
/// call so the service still starts and serves fallback content.
pub fn model_from_env() -> Result<Arc<dyn TextModel>, ModelError> {
  let timeout = std::env::var("MODEL_TIMEOUT_SECS")
    .ok()
    .and_then(|v| v.parse::<u64>().ok())
    .map(Duration::from_secs)
    .unwrap_or(Duration::from_secs(60));

  let provider = std::env::var("MODEL_PROVIDER").unwrap_or_else(|_| "gemini".into());
  let model: Arc<dyn TextModel> = match provider.to_ascii_lowercase().as_str() {
    "openai" => {
      let oa = OpenAI::from_env(timeout)?;
      info!(target: "examgen_backend", base_url = %oa.base_url, model = %oa.model, has_key = oa.api_key.is_some(), "OpenAI-compatible model selected.");
      Arc::new(oa)
    }
    _ => {
      let g = Gemini::from_env(timeout)?;
      info!(target: "examgen_backend", base_url = %g.base_url, model = %g.model, has_key = g.api_key.is_some(), "Gemini model selected.");
      Arc::new(g)
    }
  };
  Ok(model)
}

/// Result of a direct availability probe against the configured model.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelProbe {
  pub model_name: String,
  pub available: bool,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub response: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub error: Option<String>,
}

/// Send a one-word prompt straight to the model, bypassing pacing and fallback.
pub async fn probe(model: &dyn TextModel) -> ModelProbe {
  match model.generate_text("Test").await {
    Ok(text) => ModelProbe {
      model_name: model.name().to_string(),
      available: true,
      response: Some(format!("{}...", text.chars().take(20).collect::<String>())),
      error: None,
    },
    Err(e) => ModelProbe {
      model_name: model.name().to_string(),
      available: false,
      response: None,
      error: Some(e.to_string()),
    },
  }
}

#[cfg(test)]
pub(crate) mod testing {
  //! Scripted models for exercising the generation layers.

  use std::collections::VecDeque;
  use std::sync::Mutex;

  use tokio::time::Instant;

  use super::*;

  /// What a scripted call should do.
  pub enum Step {
    Reply(String),
    Status(u16),
    Panic,
  }

  /// Plays back `steps` in order; once exhausted, repeats `then`.
  pub struct ScriptedModel {
    steps: Mutex<VecDeque<Step>>,
    then: Box<dyn Fn() -> Step + Send + Sync>,
    pub calls: Mutex<Vec<(Instant, String)>>,
  }

  impl ScriptedModel {
    pub fn new(steps: Vec<Step>, then: impl Fn() -> Step + Send + Sync + 'static) -> Self {
      Self { steps: Mutex::new(steps.into()), then: Box::new(then), calls: Mutex::new(Vec::new()) }
    }

    pub fn always_status(status: u16) -> Self {
      Self::new(Vec::new(), move || Step::Status(status))
    }

    pub fn always_panic() -> Self {
      Self::new(Vec::new(), || Step::Panic)
    }

    pub fn call_times(&self) -> Vec<Instant> {
      self.calls.lock().unwrap().iter().map(|(t, _)| *t).collect()
    }

    pub fn prompts(&self) -> Vec<String> {
      self.calls.lock().unwrap().iter().map(|(_, p)| p.clone()).collect()
    }
  }

  #[async_trait]
  impl TextModel for ScriptedModel {
    fn name(&self) -> &str { "scripted" }

    async fn generate_text(&self, prompt: &str) -> Result<String, ModelError> {
      self.calls.lock().unwrap().push((Instant::now(), prompt.to_string()));
      let step = self.steps.lock().unwrap().pop_front().unwrap_or_else(|| (self.then)());
      match step {
        Step::Reply(text) => Ok(text),
        Step::Status(status) => Err(ModelError::Http { status, message: format!("scripted {status}") }),
        Step::Panic => panic!("scripted model panic"),
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::testing::{ScriptedModel, Step};
  use super::*;

  #[tokio::test]
  async fn probe_reports_truncated_response() {
    let m = ScriptedModel::new(vec![Step::Reply("Hello there, this is a long answer".into())], || Step::Status(500));
    let p = probe(&m).await;
    assert!(p.available);
    assert_eq!(p.response.as_deref(), Some("Hello there, this is..."));
    assert_eq!(m.prompts(), vec!["Test".to_string()]);
  }

  #[tokio::test]
  async fn probe_reports_errors() {
    let m = ScriptedModel::always_status(401);
    let p = probe(&m).await;
    assert!(!p.available);
    assert!(p.error.unwrap().contains("401"));
  }
}
