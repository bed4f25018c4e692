//! Core behaviors shared by both HTTP and WebSocket handlers.
//!
//! This includes:
//!   - Assembling a full question set (one batch per type, run concurrently)
//!   - Wrapping it into a titled exam
//!   - Scoring the objective part of a taken exam
//!   - Probing the configured model

use std::collections::BTreeMap;
use std::panic::AssertUnwindSafe;

use futures::FutureExt;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, instrument};

use crate::batch::batch_generate;
use crate::client::GenerationClient;
use crate::config::Prompts;
use crate::domain::{
  ContentSource, Essay, Filler, GeneratedExam, GeneratedQuestions, GenerationRequest, MultipleChoice, QuestionItem,
  QuestionType, ShortAnswer, TrueFalse,
};
use crate::model::{probe, ModelProbe, TextModel};
use crate::seeds::Banked;

/// Provenance of one question type in an assembled set.
#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TypeReport {
  #[serde(rename = "type")]
  pub kind: QuestionType,
  pub requested: usize,
  pub source: ContentSource,
  /// Templated items appended because the batch came back short.
  pub padded: usize,
}

#[derive(Debug)]
pub struct Assembled {
  pub questions: GeneratedQuestions,
  pub reports: Vec<TypeReport>,
}

impl Assembled {
  /// True when any requested type was not served entirely by the model.
  pub fn used_fallback(&self) -> bool {
    self
      .reports
      .iter()
      .any(|r| r.requested > 0 && (r.source != ContentSource::Model || r.padded > 0))
  }
}

async fn generate_branch<T: Banked>(
  client: &GenerationClient,
  prompts: &Prompts,
  req: &GenerationRequest,
  cancel: &CancellationToken,
) -> (Vec<T>, ContentSource) {
  let count = req.counts.get(T::KIND) as usize;
  if count == 0 {
    return (Vec::new(), ContentSource::Model);
  }

  let work = batch_generate::<T>(client, prompts, count, &req.subject, &req.topics, req.difficulty, cancel);
  match AssertUnwindSafe(work).catch_unwind().await {
    Ok(batch) => (batch.items, batch.source),
    Err(_) => {
      error!(target: "generation", kind = %T::KIND, count, "Question generation branch panicked; using templated questions");
      let items = (1..=count).map(|n| T::filler(Filler::Fallback, n, &req.subject)).collect();
      (items, ContentSource::Template)
    }
  }
}

/// Append "Additional" fillers until `items` holds `count`. Never truncates.
fn pad_to<T: QuestionItem>(items: &mut Vec<T>, count: usize, subject: &str) -> usize {
  let missing = count.saturating_sub(items.len());
  items.extend((1..=missing).map(|n| T::filler(Filler::Additional, n, subject)));
  missing
}

/// Generate every requested question type concurrently and pad short types.
///
/// Each type ends up with at least the requested number of questions whatever
/// the model does; failures only change where the questions come from.
#[instrument(level = "info", skip_all, fields(subject = %req.subject, total = req.counts.total()))]
pub async fn generate_questions(
  client: &GenerationClient,
  prompts: &Prompts,
  req: &GenerationRequest,
  cancel: &CancellationToken,
) -> Assembled {
  let (mc, tf, sa, essay) = tokio::join!(
    generate_branch::<MultipleChoice>(client, prompts, req, cancel),
    generate_branch::<TrueFalse>(client, prompts, req, cancel),
    generate_branch::<ShortAnswer>(client, prompts, req, cancel),
    generate_branch::<Essay>(client, prompts, req, cancel),
  );

  let mut questions = GeneratedQuestions {
    multiple_choice: mc.0,
    true_false: tf.0,
    short_answer: sa.0,
    essay: essay.0,
  };
  let sources = [mc.1, tf.1, sa.1, essay.1];

  let subject = req.subject.as_str();
  let c = &req.counts;
  let padded = [
    pad_to(&mut questions.multiple_choice, c.multiple_choice as usize, subject),
    pad_to(&mut questions.true_false, c.true_false as usize, subject),
    pad_to(&mut questions.short_answer, c.short_answer as usize, subject),
    pad_to(&mut questions.essay, c.essay as usize, subject),
  ];

  let reports: Vec<TypeReport> = QuestionType::ALL
    .iter()
    .enumerate()
    .map(|(i, kind)| TypeReport {
      kind: *kind,
      requested: c.get(*kind) as usize,
      source: sources[i],
      padded: padded[i],
    })
    .collect();

  info!(target: "generation", total = questions.total(), ?sources, ?padded, "Question set assembled");
  Assembled { questions, reports }
}

/// A generated exam plus how it was produced.
#[derive(Debug)]
pub struct BuiltExam {
  pub exam: GeneratedExam,
  pub used_fallback: bool,
  pub sources: Vec<TypeReport>,
}

pub fn exam_title(subject: &str, used_fallback: bool) -> String {
  if used_fallback {
    format!("{} Exam (Fallback)", subject)
  } else {
    format!("{} Exam", subject)
  }
}

pub async fn build_exam(
  client: &GenerationClient,
  prompts: &Prompts,
  req: &GenerationRequest,
  include_answer_key: bool,
  cancel: &CancellationToken,
) -> BuiltExam {
  let assembled = generate_questions(client, prompts, req, cancel).await;
  let used_fallback = assembled.used_fallback();
  BuiltExam {
    exam: GeneratedExam {
      title: exam_title(&req.subject, used_fallback),
      subject: req.subject.clone(),
      topics: req.topics.clone(),
      difficulty: req.difficulty,
      questions: assembled.questions,
      include_answer_key,
    },
    used_fallback,
    sources: assembled.reports,
  }
}

/// Answers to the objective questions, keyed by question index within each type.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserAnswers {
  #[serde(default)]
  pub multiple_choice: BTreeMap<usize, String>,
  #[serde(default)]
  pub true_false: BTreeMap<usize, bool>,
}

#[derive(Clone, Copy, Debug, Serialize, PartialEq, Eq)]
pub struct Score {
  pub correct: usize,
  pub total: usize,
  pub percentage: u32,
}

/// Score answered multiple-choice and true/false questions. Every answer
/// counts toward the total, including answers to indices the exam lacks.
pub fn grade_objective(exam: &GeneratedExam, answers: &UserAnswers) -> Score {
  let q = &exam.questions;
  let mc_correct = answers
    .multiple_choice
    .iter()
    .filter(|(i, a)| q.multiple_choice.get(**i).is_some_and(|m| &m.answer == *a))
    .count();
  let tf_correct = answers
    .true_false
    .iter()
    .filter(|(i, a)| q.true_false.get(**i).is_some_and(|t| t.answer == **a))
    .count();

  let correct = mc_correct + tf_correct;
  let total = answers.multiple_choice.len() + answers.true_false.len();
  let percentage = if total == 0 {
    0
  } else {
    (correct as f64 / total as f64 * 100.0).round() as u32
  };
  Score { correct, total, percentage }
}

/// Probe the configured model directly.
pub async fn check_models(model: &dyn TextModel) -> Vec<ModelProbe> {
  let p = probe(model).await;
  info!(target: "examgen_backend", model = %p.model_name, available = p.available, "Model availability checked");
  vec![p]
}

#[cfg(test)]
mod tests {
  use std::sync::Arc;

  use super::*;
  use crate::config::Limits;
  use crate::domain::{Difficulty, QuestionCounts};
  use crate::model::testing::{ScriptedModel, Step};

  fn client(model: Arc<ScriptedModel>, limits: Limits) -> GenerationClient {
    GenerationClient::new(model, limits, Prompts::default().json_only)
  }

  fn no_interval() -> Limits {
    Limits { min_request_interval_ms: 0, ..Limits::default() }
  }

  fn request(subject: &str, mc: u32, tf: u32, sa: u32, essay: u32) -> GenerationRequest {
    GenerationRequest {
      subject: subject.into(),
      topics: vec!["Algebra".into(), "Geometry".into()],
      difficulty: Difficulty::Medium,
      counts: QuestionCounts { multiple_choice: mc, true_false: tf, short_answer: sa, essay },
    }
  }

  fn assert_exact_counts(q: &GeneratedQuestions, req: &GenerationRequest) {
    for kind in QuestionType::ALL {
      assert_eq!(q.len_of(kind), req.counts.get(kind) as usize, "{kind}");
    }
  }

  #[tokio::test(start_paused = true)]
  async fn failing_model_still_fills_every_type_from_the_bank() {
    let model = Arc::new(ScriptedModel::always_status(503));
    let req = request("Mathematics", 2, 0, 0, 0);
    let built = build_exam(&client(model, no_interval()), &Prompts::default(), &req, true, &CancellationToken::new()).await;

    let mc = &built.exam.questions.multiple_choice;
    assert_eq!(mc.len(), 2);
    assert_eq!(mc[0].question, "What is the derivative of f(x) = x²?");
    assert!(mc.iter().all(|q| q.options.len() == 4 && q.options.contains(&q.answer)));
    assert!(built.used_fallback);
    assert_eq!(built.exam.title, "Mathematics Exam (Fallback)");
    assert_eq!(built.sources[0].source, ContentSource::QuestionBank);
  }

  #[tokio::test(start_paused = true)]
  async fn short_batches_are_padded_to_the_requested_count() {
    let reply = r#"[{"question": "Q?", "answer": "A"}]"#;
    let model = Arc::new(ScriptedModel::new(Vec::new(), move || Step::Reply(reply.into())));
    let req = request("History", 2, 1, 3, 2);
    let assembled = generate_questions(&client(model, no_interval()), &Prompts::default(), &req, &CancellationToken::new()).await;

    assert_exact_counts(&assembled.questions, &req);
    let q = &assembled.questions;
    assert_eq!(q.multiple_choice[0].question, "Additional multiple choice question 1 about History");
    assert_eq!(q.true_false[0], TrueFalse { question: "Additional true/false statement 1 about History".into(), answer: true });
    assert_eq!(q.short_answer[0].question, "Q?");
    assert_eq!(q.short_answer[2].question, "Additional short answer question 2 about History");
    assert_eq!(q.essay[0].question, "Q?");

    let padded: Vec<usize> = assembled.reports.iter().map(|r| r.padded).collect();
    assert_eq!(padded, vec![2, 1, 2, 1]);
    assert!(assembled.reports.iter().all(|r| r.source == ContentSource::Model));
    assert!(assembled.used_fallback());
  }

  #[tokio::test(start_paused = true)]
  async fn panicking_branches_get_templated_questions() {
    let model = Arc::new(ScriptedModel::always_panic());
    let req = request("Biology", 2, 1, 0, 0);
    let built = build_exam(&client(model, no_interval()), &Prompts::default(), &req, false, &CancellationToken::new()).await;

    let q = &built.exam.questions;
    assert_exact_counts(q, &req);
    assert_eq!(q.multiple_choice[1].question, "Fallback multiple choice question 2 about Biology");
    assert_eq!(q.true_false[0].question, "Fallback true/false statement 1 about Biology");
    assert!(q.has_fallback_marker());
    assert_eq!(built.sources[0].source, ContentSource::Template);
    assert_eq!(built.sources[2].requested, 0);
    assert!(built.used_fallback);
  }

  #[tokio::test(start_paused = true)]
  async fn concurrent_branches_respect_pacing_and_keep_counts() {
    let model = Arc::new(ScriptedModel::new(Vec::new(), || Step::Reply("not json at all".into())));
    let req = request("Physics", 3, 2, 1, 1);
    let assembled = generate_questions(&client(model.clone(), Limits::default()), &Prompts::default(), &req, &CancellationToken::new()).await;

    assert_exact_counts(&assembled.questions, &req);
    let times = model.call_times();
    assert!(times.windows(2).all(|w| w[1] - w[0] >= Limits::default().min_interval()));
  }

  #[tokio::test(start_paused = true)]
  async fn model_content_keeps_plain_title() {
    let model = Arc::new(ScriptedModel::new(
      vec![Step::Reply(r#"[{"question":"2+2?","options":["1","2","3","4"],"answer":"4"}]"#.into())],
      || Step::Status(500),
    ));
    let req = request("Arithmetic", 1, 0, 0, 0);
    let built = build_exam(&client(model, no_interval()), &Prompts::default(), &req, false, &CancellationToken::new()).await;
    assert!(!built.used_fallback);
    assert_eq!(built.exam.title, "Arithmetic Exam");
  }

  fn graded_exam() -> GeneratedExam {
    GeneratedExam {
      title: "Geography Exam".into(),
      subject: "Geography".into(),
      topics: vec!["Capitals".into()],
      difficulty: Difficulty::Easy,
      questions: GeneratedQuestions {
        multiple_choice: vec![
          MultipleChoice { question: "Capital of France?".into(), options: vec!["Paris".into(), "Rome".into(), "Oslo".into(), "Bern".into()], answer: "Paris".into() },
          MultipleChoice { question: "Capital of Italy?".into(), options: vec!["Paris".into(), "Rome".into(), "Oslo".into(), "Bern".into()], answer: "Rome".into() },
        ],
        true_false: vec![TrueFalse { question: "Oslo is in Norway.".into(), answer: true }],
        ..GeneratedQuestions::default()
      },
      include_answer_key: false,
    }
  }

  #[test]
  fn grading_counts_answered_objective_questions() {
    let answers: UserAnswers =
      serde_json::from_str(r#"{"multipleChoice":{"0":"Paris","1":"Oslo"},"trueFalse":{"0":true}}"#).expect("answers");
    let s = grade_objective(&graded_exam(), &answers);
    assert_eq!(s, Score { correct: 2, total: 3, percentage: 67 });
  }

  #[test]
  fn grading_nothing_answered_is_zero_percent() {
    let s = grade_objective(&graded_exam(), &UserAnswers::default());
    assert_eq!(s, Score { correct: 0, total: 0, percentage: 0 });
  }

  #[test]
  fn answers_to_missing_questions_count_as_wrong() {
    let mut answers = UserAnswers::default();
    answers.true_false.insert(5, true);
    let s = grade_objective(&graded_exam(), &answers);
    assert_eq!(s, Score { correct: 0, total: 1, percentage: 0 });
  }

  #[tokio::test]
  async fn check_models_reports_one_probe() {
    let model = ScriptedModel::new(vec![Step::Reply("Working".into())], || Step::Status(500));
    let probes = check_models(&model).await;
    assert_eq!(probes.len(), 1);
    assert!(probes[0].available);
  }
}
