//! One model call per question type: build the prompt, parse the array, fall
//! back to the question bank when anything goes wrong.

use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, warn};

use crate::client::GenerationClient;
use crate::config::Prompts;
use crate::domain::{ContentSource, Difficulty, QuestionType};
use crate::error::{GenerationFailure, ParseError};
use crate::extract::extract_json;
use crate::seeds::{fallback_question_bank, Banked};
use crate::util::fill_template;

/// Items of one type and where they came from.
#[derive(Debug)]
pub struct Batch<T> {
  pub items: Vec<T>,
  pub source: ContentSource,
}

/// Example array shown to the model for each type.
pub fn output_schema(kind: QuestionType) -> &'static str {
  match kind {
    QuestionType::MultipleChoice => r#"
    [
      {
        "question": "Question text here?",
        "options": ["Option A", "Option B", "Option C", "Option D"],
        "answer": "The correct option text"
      }
    ]"#,
    QuestionType::TrueFalse => r#"
    [
      {
        "question": "Statement that is either true or false.",
        "answer": true or false
      }
    ]"#,
    QuestionType::ShortAnswer => r#"
    [
      {
        "question": "Question text here?",
        "answer": "Sample correct answer here."
      }
    ]"#,
    QuestionType::Essay => r#"
    [
      {
        "question": "Essay question text here?",
        "guidelines": "Guidelines for answering the question."
      }
    ]"#,
  }
}

pub fn build_prompt(
  prompts: &Prompts,
  kind: QuestionType,
  count: usize,
  subject: &str,
  topics: &[String],
  difficulty: Difficulty,
) -> String {
  let count = count.to_string();
  let topics = topics.join(", ");
  let head = fill_template(
    prompts.for_type(kind),
    &[("count", count.as_str()), ("subject", subject), ("topics", topics.as_str()), ("difficulty", difficulty.as_str())],
  );
  format!(
    "{}\n\nFormat the response as a JSON array with this structure: {}\n\n{}",
    head,
    output_schema(kind),
    prompts.json_only
  )
}

/// Deserialize and shape-check raw items, keeping at most `count`.
fn typed_items<T: Banked>(raw: Vec<Value>, count: usize) -> Vec<T> {
  let total = raw.len();
  let items: Vec<T> = raw
    .into_iter()
    .filter_map(|v| serde_json::from_value::<T>(v).ok())
    .filter(|q| q.is_well_formed())
    .take(count)
    .collect();
  if items.len() < total.min(count) {
    warn!(target: "generation", kind = %T::KIND, received = total, kept = items.len(), "Dropped malformed questions");
  }
  items
}

#[instrument(level = "info", target = "generation", skip(client, prompts, topics, cancel), fields(kind = %T::KIND))]
pub async fn batch_generate<T: Banked>(
  client: &GenerationClient,
  prompts: &Prompts,
  count: usize,
  subject: &str,
  topics: &[String],
  difficulty: Difficulty,
  cancel: &CancellationToken,
) -> Batch<T> {
  let prompt = build_prompt(prompts, T::KIND, count, subject, topics, difficulty);
  let generation = client.generate_traced(&prompt, cancel).await;

  let outcome: Result<Vec<Value>, GenerationFailure> = match generation.failure {
    Some(failure) => Err(failure),
    None => extract_json(&generation.text).map_err(|e: ParseError| e.into()),
  };

  match outcome {
    Ok(raw) => {
      let items = typed_items::<T>(raw, count);
      info!(target: "generation", kind = %T::KIND, requested = count, received = items.len(), "Batch generated");
      Batch { items, source: ContentSource::Model }
    }
    Err(failure) => {
      warn!(target: "generation", kind = %T::KIND, reason = %failure, "Batch generation failed; using question bank");
      Batch {
        items: fallback_question_bank::<T>(count, subject, topics, difficulty),
        source: ContentSource::QuestionBank,
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use std::sync::Arc;

  use super::*;
  use crate::config::Limits;
  use crate::domain::{Essay, MultipleChoice, QuestionItem, TrueFalse};
  use crate::model::testing::{ScriptedModel, Step};

  fn client(model: Arc<ScriptedModel>) -> GenerationClient {
    let limits = Limits { min_request_interval_ms: 0, ..Limits::default() };
    GenerationClient::new(model, limits, Prompts::default().json_only)
  }

  fn topics(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
  }

  #[test]
  fn prompt_has_sentence_schema_and_instruction() {
    let p = build_prompt(
      &Prompts::default(),
      QuestionType::MultipleChoice,
      3,
      "Physics",
      &topics(&["Optics", "Waves"]),
      Difficulty::Hard,
    );
    assert!(p.starts_with("Generate 3 multiple-choice questions about Physics focusing on Optics, Waves at a hard difficulty level."));
    assert!(p.contains("Format the response as a JSON array with this structure:"));
    assert!(p.contains(r#""options": ["Option A", "Option B", "Option C", "Option D"]"#));
    assert!(p.ends_with(&Prompts::default().json_only));
  }

  #[tokio::test(start_paused = true)]
  async fn failing_model_yields_subject_bank() {
    let model = Arc::new(ScriptedModel::always_status(500));
    let b: Batch<MultipleChoice> = batch_generate(
      &client(model),
      &Prompts::default(),
      2,
      "Mathematics",
      &topics(&["Algebra"]),
      Difficulty::Medium,
      &CancellationToken::new(),
    )
    .await;

    assert_eq!(b.source, ContentSource::QuestionBank);
    assert_eq!(b.items.len(), 2);
    assert_eq!(b.items[0].question, "What is the derivative of f(x) = x²?");
    assert_eq!(b.items[1].question, "Which of the following is a prime number?");
    assert!(b.items.iter().all(|q| q.options.len() == 4 && q.options.contains(&q.answer)));
  }

  #[tokio::test(start_paused = true)]
  async fn unparseable_reply_yields_bank() {
    let model = Arc::new(ScriptedModel::new(vec![Step::Reply("I cannot help with that.".into())], || Step::Status(500)));
    let b: Batch<TrueFalse> = batch_generate(
      &client(model.clone()),
      &Prompts::default(),
      3,
      "Physics",
      &[],
      Difficulty::Easy,
      &CancellationToken::new(),
    )
    .await;

    assert_eq!(model.call_times().len(), 1);
    assert_eq!(b.source, ContentSource::QuestionBank);
    assert_eq!(b.items.len(), 3);
    assert_eq!(b.items[2], b.items[0]);
  }

  #[tokio::test(start_paused = true)]
  async fn fenced_reply_is_parsed_and_capped() {
    let reply = r#"```json
[
  {"question": "Q1?", "guidelines": "G1"},
  {"question": "Q2?"},
  {"question": "Q3?", "guidelines": "G3"}
]
```"#;
    let model = Arc::new(ScriptedModel::new(vec![Step::Reply(reply.into())], || Step::Status(500)));
    let b: Batch<Essay> = batch_generate(
      &client(model),
      &Prompts::default(),
      2,
      "Art",
      &topics(&["Baroque"]),
      Difficulty::Medium,
      &CancellationToken::new(),
    )
    .await;

    assert_eq!(b.source, ContentSource::Model);
    assert_eq!(b.items.len(), 2);
    assert_eq!(b.items[1], Essay { question: "Q2?".into(), guidelines: None });
  }

  #[tokio::test(start_paused = true)]
  async fn malformed_items_are_dropped() {
    let reply = r#"[
      {"question": "Good?", "options": ["a","b","c","d"], "answer": "c"},
      {"question": "Three options?", "options": ["a","b","c"], "answer": "a"},
      {"question": "Answer missing?", "options": ["a","b","c","d"], "answer": "e"},
      {"prompt": "wrong keys"}
    ]"#;
    let model = Arc::new(ScriptedModel::new(vec![Step::Reply(reply.into())], || Step::Status(500)));
    let b: Batch<MultipleChoice> = batch_generate(
      &client(model),
      &Prompts::default(),
      4,
      "Chemistry",
      &[],
      Difficulty::Medium,
      &CancellationToken::new(),
    )
    .await;

    assert_eq!(b.source, ContentSource::Model);
    assert_eq!(b.items.len(), 1);
    assert!(b.items[0].is_well_formed());
  }
}
