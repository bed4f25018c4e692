//! Loading generation configuration (prompts + rate/retry limits) from TOML.
//!
//! Every field has a default, so a config file only needs the keys it
//! overrides:
//!
//! ```toml
//! [limits]
//! min_request_interval_ms = 15000
//! max_retries = 3
//! max_questions = 50
//!
//! [prompts]
//! essay = "Generate {count} essay questions about {subject} ..."
//! ```

use std::time::Duration;

use serde::Deserialize;
use tracing::{error, info};

use crate::domain::QuestionType;
use crate::error::ConfigError;

#[derive(Clone, Debug, Deserialize, Default)]
pub struct ExamConfig {
  #[serde(default)]
  pub prompts: Prompts,
  #[serde(default)]
  pub limits: Limits,
}

/// Prompt templates. `{count}`, `{subject}`, `{topics}` and `{difficulty}`
/// are substituted. The question-type templates must keep their
/// "<type> questions" phrase: the client-level fallback keys on it.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Prompts {
  pub multiple_choice: String,
  pub true_false: String,
  pub short_answer: String,
  pub essay: String,
  /// Appended to every batch prompt and again by the client before sending.
  pub json_only: String,
}

impl Default for Prompts {
  fn default() -> Self {
    Self {
      multiple_choice: "Generate {count} multiple-choice questions about {subject} focusing on {topics} at a {difficulty} difficulty level.".into(),
      true_false: "Generate {count} true/false questions about {subject} focusing on {topics} at a {difficulty} difficulty level.".into(),
      short_answer: "Generate {count} short answer questions about {subject} focusing on {topics} at a {difficulty} difficulty level. Each question should be answerable in 1-3 sentences.".into(),
      essay: "Generate {count} essay questions about {subject} focusing on {topics} at a {difficulty} difficulty level. Each question should require a detailed response and include guidelines for answering.".into(),
      json_only: "IMPORTANT: Return ONLY the JSON array with no additional text, markdown formatting, or code blocks. Do not include backticks, the word 'json', or any other text.".into(),
    }
  }
}

impl Prompts {
  pub fn for_type(&self, kind: QuestionType) -> &str {
    match kind {
      QuestionType::MultipleChoice => &self.multiple_choice,
      QuestionType::TrueFalse => &self.true_false,
      QuestionType::ShortAnswer => &self.short_answer,
      QuestionType::Essay => &self.essay,
    }
  }
}

/// Pacing of outbound model calls, and the largest exam a request may ask for.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Limits {
  pub min_request_interval_ms: u64,
  pub rate_limit_buffer_ms: u64,
  pub max_retries: u32,
  pub backoff_base_ms: u64,
  pub max_questions: u32,
}

impl Default for Limits {
  fn default() -> Self {
    Self {
      min_request_interval_ms: 15_000,
      rate_limit_buffer_ms: 1_000,
      max_retries: 3,
      backoff_base_ms: 5_000,
      max_questions: 50,
    }
  }
}

impl Limits {
  pub fn min_interval(&self) -> Duration {
    Duration::from_millis(self.min_request_interval_ms)
  }

  pub fn rate_limit_buffer(&self) -> Duration {
    Duration::from_millis(self.rate_limit_buffer_ms)
  }

  /// Delay before retry number `attempt + 1` after a transient failure:
  /// base, 2×base, 4×base, ...
  pub fn backoff(&self, attempt: u32) -> Duration {
    let factor = 2u64.saturating_pow(attempt);
    Duration::from_millis(self.backoff_base_ms.saturating_mul(factor))
  }
}

pub fn parse_exam_config(s: &str, path: &str) -> Result<ExamConfig, ConfigError> {
  toml::from_str::<ExamConfig>(s).map_err(|source| ConfigError::Parse { path: path.to_string(), source })
}

pub fn read_exam_config(path: &str) -> Result<ExamConfig, ConfigError> {
  let s = std::fs::read_to_string(path).map_err(|source| ConfigError::Read { path: path.to_string(), source })?;
  parse_exam_config(&s, path)
}

/// Attempt to load `ExamConfig` from EXAM_CONFIG_PATH. On any parsing/IO error, returns None.
pub fn load_exam_config_from_env() -> Option<ExamConfig> {
  let path = std::env::var("EXAM_CONFIG_PATH").ok()?;
  match read_exam_config(&path) {
    Ok(cfg) => {
      info!(target: "examgen_backend", %path, limits = ?cfg.limits, "Loaded exam config (TOML)");
      Some(cfg)
    }
    Err(e) => {
      error!(target: "examgen_backend", %path, error = %e, "Failed to load exam config; using defaults");
      None
    }
  }
}
