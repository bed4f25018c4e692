//! Rate-limited, retrying access to the text model.
//!
//! `GenerationClient::generate` never fails: when pacing, retries or the
//! model give out, it answers with fallback text instead. Waits come in two
//! kinds that share one retry budget:
//! - the call is inside the minimum interval: wait out the rest of it plus a
//!   buffer;
//! - the model answered 429/5xx: back off `base * 2^attempt`.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, warn};

use crate::config::Limits;
use crate::error::GenerationFailure;
use crate::limiter::RateLimiter;
use crate::model::TextModel;
use crate::seeds;
use crate::util::trunc_for_log;

/// Text returned by the client, plus why fallback was served if it was.
#[derive(Debug)]
pub struct Generation {
  pub text: String,
  pub failure: Option<GenerationFailure>,
}

impl Generation {
  #[cfg(test)]
  pub fn is_fallback(&self) -> bool {
    self.failure.is_some()
  }
}

pub struct GenerationClient {
  model: Arc<dyn TextModel>,
  limiter: Arc<RateLimiter>,
  limits: Limits,
  json_only: String,
}

impl GenerationClient {
  pub fn new(model: Arc<dyn TextModel>, limits: Limits, json_only: impl Into<String>) -> Self {
    let limiter = Arc::new(RateLimiter::new(limits.min_interval()));
    Self::with_limiter(model, limiter, limits, json_only)
  }

  pub fn with_limiter(
    model: Arc<dyn TextModel>,
    limiter: Arc<RateLimiter>,
    limits: Limits,
    json_only: impl Into<String>,
  ) -> Self {
    Self { model, limiter, limits, json_only: json_only.into() }
  }

  pub fn model(&self) -> &Arc<dyn TextModel> {
    &self.model
  }

  #[cfg(test)]
  pub async fn generate(&self, prompt: &str, cancel: &CancellationToken) -> String {
    self.generate_traced(prompt, cancel).await.text
  }

  #[instrument(level = "info", target = "generation", skip_all, fields(model = %self.model.name(), prompt_len = prompt.len()))]
  pub async fn generate_traced(&self, prompt: &str, cancel: &CancellationToken) -> Generation {
    let mut attempt: u32 = 0;
    loop {
      if cancel.is_cancelled() {
        return self.fallback(prompt, GenerationFailure::Cancelled);
      }

      if let Err(remaining) = self.limiter.try_acquire().await {
        if attempt >= self.limits.max_retries {
          return self.fallback(prompt, GenerationFailure::RateLimited);
        }
        let wait = remaining + self.limits.rate_limit_buffer();
        info!(target: "generation", attempt, wait_ms = wait.as_millis() as u64, "Rate limiting: waiting before next model call");
        attempt += 1;
        if !sleep_or_cancel(wait, cancel).await {
          return self.fallback(prompt, GenerationFailure::Cancelled);
        }
        continue;
      }

      let full_prompt = format!("{}\n\n{}", prompt, self.json_only);
      info!(target: "generation", attempt, prompt = %trunc_for_log(&full_prompt, 160), "Sending prompt to model");

      let result = tokio::select! {
        _ = cancel.cancelled() => return self.fallback(prompt, GenerationFailure::Cancelled),
        r = self.model.generate_text(&full_prompt) => r,
      };

      match result {
        Ok(text) => {
          info!(target: "generation", response = %trunc_for_log(&text, 200), "Model response received");
          return Generation { text, failure: None };
        }
        Err(e) if e.is_transient() && attempt < self.limits.max_retries => {
          let wait = self.limits.backoff(attempt);
          warn!(target: "generation", attempt, wait_ms = wait.as_millis() as u64, error = %e, "Transient model error; backing off");
          attempt += 1;
          if !sleep_or_cancel(wait, cancel).await {
            return self.fallback(prompt, GenerationFailure::Cancelled);
          }
        }
        Err(e) => return self.fallback(prompt, e.into()),
      }
    }
  }

  fn fallback(&self, prompt: &str, failure: GenerationFailure) -> Generation {
    let text = seeds::fallback_text(prompt, &failure.to_string());
    Generation { text, failure: Some(failure) }
  }
}

/// Sleep for `wait`; false if cancelled first.
async fn sleep_or_cancel(wait: std::time::Duration, cancel: &CancellationToken) -> bool {
  tokio::select! {
    _ = cancel.cancelled() => false,
    _ = tokio::time::sleep(wait) => true,
  }
}
