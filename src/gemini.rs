//! Google Gemini `generateContent` client.
//!
//! Mirrors the OpenAI client: a single user turn in, the concatenated text
//! parts of the first candidate out. Safety filters block medium-and-above
//! harassment, hate speech, sexual and dangerous content.
//!
//! NOTE: The API key travels in the `x-goog-api-key` header and is never logged.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::header::{CONTENT_TYPE, USER_AGENT};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use crate::error::ModelError;
use crate::model::TextModel;

const SAFETY_CATEGORIES: [&str; 4] = [
  "HARM_CATEGORY_HARASSMENT",
  "HARM_CATEGORY_HATE_SPEECH",
  "HARM_CATEGORY_SEXUALLY_EXPLICIT",
  "HARM_CATEGORY_DANGEROUS_CONTENT",
];

#[derive(Clone)]
pub struct Gemini {
  pub client: reqwest::Client,
  pub api_key: Option<String>,
  pub base_url: String,
  pub model: String,
}

impl Gemini {
  /// Read GOOGLE_AI_API_KEY / GEMINI_BASE_URL / GEMINI_MODEL. The key may be absent.
  pub fn from_env(timeout: Duration) -> Result<Self, ModelError> {
    let api_key = std::env::var("GOOGLE_AI_API_KEY").ok().filter(|k| !k.trim().is_empty());
    let base_url = std::env::var("GEMINI_BASE_URL")
      .unwrap_or_else(|_| "https://generativelanguage.googleapis.com/v1beta".into());
    let model = std::env::var("GEMINI_MODEL").unwrap_or_else(|_| "gemini-1.5-flash".into());

    let client = reqwest::Client::builder().timeout(timeout).build()?;

    Ok(Self { client, api_key, base_url, model })
  }
}

fn request_body(prompt: &str) -> GenerateContentRequest {
  GenerateContentRequest {
    contents: vec![Content { role: Some("user".into()), parts: vec![Part { text: Some(prompt.to_string()) }] }],
    safety_settings: SAFETY_CATEGORIES
      .iter()
      .map(|c| SafetySetting { category: c.to_string(), threshold: "BLOCK_MEDIUM_AND_ABOVE".into() })
      .collect(),
  }
}

fn response_text(body: &GenerateContentResponse) -> Option<String> {
  let content = body.candidates.first()?.content.as_ref()?;
  let text: String = content.parts.iter().filter_map(|p| p.text.as_deref()).collect();
  if text.trim().is_empty() { None } else { Some(text) }
}

#[async_trait]
impl TextModel for Gemini {
  fn name(&self) -> &str { &self.model }

  #[instrument(level = "info", skip(self, prompt), fields(model = %self.model, prompt_len = prompt.len()))]
  async fn generate_text(&self, prompt: &str) -> Result<String, ModelError> {
    let api_key = self.api_key.as_deref().ok_or(ModelError::MissingCredential)?;

    let url = format!("{}/models/{}:generateContent", self.base_url, self.model);
    let start = Instant::now();
    let res = self.client.post(&url)
      .header(USER_AGENT, "examgen-backend/0.1")
      .header(CONTENT_TYPE, "application/json")
      .header("x-goog-api-key", api_key)
      .json(&request_body(prompt)).send().await?;

    if !res.status().is_success() {
      let status = res.status().as_u16();
      let body = res.text().await.unwrap_or_default();
      let message = extract_gemini_error(&body).unwrap_or(body);
      return Err(ModelError::Http { status, message });
    }

    let body: GenerateContentResponse = res.json().await.map_err(|e| ModelError::Decode(e.to_string()))?;
    if let Some(usage) = &body.usage_metadata {
      info!(prompt_tokens = ?usage.prompt_token_count, completion_tokens = ?usage.candidates_token_count, total_tokens = ?usage.total_token_count, elapsed = ?start.elapsed(), "Gemini usage");
    }
    response_text(&body).ok_or(ModelError::EmptyResponse)
  }
}

// --- generateContent DTOs ---

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
  contents: Vec<Content>,
  safety_settings: Vec<SafetySetting>,
}

#[derive(Serialize, Deserialize)]
struct Content {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  role: Option<String>,
  #[serde(default)]
  parts: Vec<Part>,
}

#[derive(Serialize, Deserialize)]
struct Part {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  text: Option<String>,
}

#[derive(Serialize)]
struct SafetySetting { category: String, threshold: String }

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
  #[serde(default)] candidates: Vec<Candidate>,
  #[serde(default)] usage_metadata: Option<UsageMetadata>,
}
#[derive(Deserialize)]
struct Candidate {
  #[serde(default)] content: Option<Content>,
}
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
  #[serde(default)] prompt_token_count: Option<u32>,
  #[serde(default)] candidates_token_count: Option<u32>,
  #[serde(default)] total_token_count: Option<u32>,
}

fn extract_gemini_error(body: &str) -> Option<String> {
  #[derive(Deserialize)]
  struct EWrap { error: EObj }
  #[derive(Deserialize)]
  struct EObj { message: String }
  serde_json::from_str::<EWrap>(body).ok().map(|w| w.error.message)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn request_carries_prompt_and_safety_settings() {
    let v = serde_json::to_value(request_body("Generate 2 essay questions")).expect("json");
    assert_eq!(v["contents"][0]["parts"][0]["text"], "Generate 2 essay questions");
    assert_eq!(v["safetySettings"].as_array().map(|a| a.len()), Some(4));
    assert_eq!(v["safetySettings"][0]["threshold"], "BLOCK_MEDIUM_AND_ABOVE");
  }

  #[test]
  fn text_parts_are_joined() {
    let body: GenerateContentResponse = serde_json::from_str(
      r#"{"candidates":[{"content":{"role":"model","parts":[{"text":"[{\"q\":"},{"text":"1}]"}]}}],
          "usageMetadata":{"promptTokenCount":10,"candidatesTokenCount":5,"totalTokenCount":15}}"#,
    )
    .expect("response");
    assert_eq!(response_text(&body).as_deref(), Some(r#"[{"q":1}]"#));
  }

  #[test]
  fn blocked_candidate_has_no_text() {
    let body: GenerateContentResponse =
      serde_json::from_str(r#"{"candidates":[{"finishReason":"SAFETY"}]}"#).expect("response");
    assert_eq!(response_text(&body), None);
  }

  #[test]
  fn error_body_message_is_extracted() {
    let body = r#"{"error":{"code":429,"message":"Resource has been exhausted","status":"RESOURCE_EXHAUSTED"}}"#;
    assert_eq!(extract_gemini_error(body).as_deref(), Some("Resource has been exhausted"));
  }

  #[tokio::test]
  async fn missing_key_fails_per_call() {
    let g = Gemini {
      client: reqwest::Client::new(),
      api_key: None,
      base_url: "http://127.0.0.1:9".into(),
      model: "gemini-1.5-flash".into(),
    };
    assert!(matches!(g.generate_text("hello").await, Err(ModelError::MissingCredential)));
  }
}
