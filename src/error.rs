//! Error types for the generation core, model transports and exporters.
//!
//! None of the generation errors reach the caller of the assembler; they are
//! logged and turned into fallback content at the layer that observes them.

use thiserror::Error;

/// Failure of a single call to a text model.
#[derive(Debug, Error)]
pub enum ModelError {
  #[error("model API key is not configured")]
  MissingCredential,
  #[error("model HTTP {status}: {message}")]
  Http { status: u16, message: String },
  #[error("model transport error: {0}")]
  Transport(#[from] reqwest::Error),
  #[error("model returned no text")]
  EmptyResponse,
  #[error("model response could not be decoded: {0}")]
  Decode(String),
}

impl ModelError {
  /// 429 and 5xx are worth retrying; everything else is permanent.
  pub fn is_transient(&self) -> bool {
    match self {
      ModelError::Http { status, .. } => *status == 429 || (500..600).contains(status),
      ModelError::Transport(e) => e
        .status()
        .map(|s| s.as_u16() == 429 || s.is_server_error())
        .unwrap_or(false),
      _ => false,
    }
  }
}

/// No extraction strategy found a JSON array in the model output.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("could not extract a JSON array from the model response")]
pub struct ParseError;

/// Why a generation layer gave up and served fallback content.
#[derive(Debug, Error)]
pub enum GenerationFailure {
  #[error("Rate limit - too many requests")]
  RateLimited,
  #[error("{0}")]
  TransientService(ModelError),
  #[error("{0}")]
  PermanentService(ModelError),
  #[error(transparent)]
  Parse(#[from] ParseError),
  #[error("Cancelled")]
  Cancelled,
}

impl From<ModelError> for GenerationFailure {
  fn from(e: ModelError) -> Self {
    if e.is_transient() {
      GenerationFailure::TransientService(e)
    } else {
      GenerationFailure::PermanentService(e)
    }
  }
}

#[derive(Debug, Error)]
pub enum ExportError {
  #[error("PDF rendering failed: {0}")]
  Pdf(String),
  #[error("DOCX rendering failed: {0}")]
  Docx(String),
}

#[derive(Debug, Error)]
pub enum ConfigError {
  #[error("failed to read {path}: {source}")]
  Read { path: String, source: std::io::Error },
  #[error("failed to parse {path}: {source}")]
  Parse { path: String, source: toml::de::Error },
}
