//! Domain models used by the backend: question variants, generation requests,
//! and the assembled exam.

use std::fmt;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// The four question families an exam is built from.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub enum QuestionType {
  MultipleChoice,
  TrueFalse,
  ShortAnswer,
  Essay,
}

impl QuestionType {
  pub const ALL: [QuestionType; 4] = [
    QuestionType::MultipleChoice,
    QuestionType::TrueFalse,
    QuestionType::ShortAnswer,
    QuestionType::Essay,
  ];

  /// Wire tag, e.g. `multipleChoice`.
  pub fn tag(self) -> &'static str {
    match self {
      QuestionType::MultipleChoice => "multipleChoice",
      QuestionType::TrueFalse => "trueFalse",
      QuestionType::ShortAnswer => "shortAnswer",
      QuestionType::Essay => "essay",
    }
  }

  /// Phrase that identifies this type inside a generation prompt.
  pub fn prompt_keyword(self) -> &'static str {
    match self {
      QuestionType::MultipleChoice => "multiple-choice questions",
      QuestionType::TrueFalse => "true/false questions",
      QuestionType::ShortAnswer => "short answer questions",
      QuestionType::Essay => "essay questions",
    }
  }

  /// Heading used by exported documents.
  pub fn section_title(self) -> &'static str {
    match self {
      QuestionType::MultipleChoice => "Multiple Choice Questions",
      QuestionType::TrueFalse => "True/False Questions",
      QuestionType::ShortAnswer => "Short Answer Questions",
      QuestionType::Essay => "Essay Questions",
    }
  }
}

impl fmt::Display for QuestionType {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.tag())
  }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
  Easy,
  #[default]
  Medium,
  Hard,
}

impl Difficulty {
  /// The configuration form exposes difficulty as a 0/50/100 slider.
  pub fn from_slider(value: u8) -> Self {
    match value {
      0 => Difficulty::Easy,
      50 => Difficulty::Medium,
      _ => Difficulty::Hard,
    }
  }

  pub fn as_str(self) -> &'static str {
    match self {
      Difficulty::Easy => "easy",
      Difficulty::Medium => "medium",
      Difficulty::Hard => "hard",
    }
  }
}

impl fmt::Display for Difficulty {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// Requested number of questions per type.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct QuestionCounts {
  #[serde(rename = "mcCount", default)]
  pub multiple_choice: u32,
  #[serde(rename = "tfCount", default)]
  pub true_false: u32,
  #[serde(rename = "saCount", default)]
  pub short_answer: u32,
  #[serde(rename = "essayCount", default)]
  pub essay: u32,
}

impl QuestionCounts {
  pub fn get(&self, kind: QuestionType) -> u32 {
    match kind {
      QuestionType::MultipleChoice => self.multiple_choice,
      QuestionType::TrueFalse => self.true_false,
      QuestionType::ShortAnswer => self.short_answer,
      QuestionType::Essay => self.essay,
    }
  }

  fn slot(&mut self, kind: QuestionType) -> &mut u32 {
    match kind {
      QuestionType::MultipleChoice => &mut self.multiple_choice,
      QuestionType::TrueFalse => &mut self.true_false,
      QuestionType::ShortAnswer => &mut self.short_answer,
      QuestionType::Essay => &mut self.essay,
    }
  }

  pub fn total(&self) -> u32 {
    QuestionType::ALL.iter().map(|k| self.get(*k)).sum()
  }
}

/// Percentage share of each question type (sliders in the configuration form).
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct QuestionMix {
  pub multiple_choice: f64,
  pub true_false: f64,
  pub short_answer: f64,
  pub essay: f64,
}

impl Default for QuestionMix {
  fn default() -> Self {
    Self { multiple_choice: 40.0, true_false: 20.0, short_answer: 30.0, essay: 10.0 }
  }
}

impl QuestionMix {
  pub fn get(&self, kind: QuestionType) -> f64 {
    match kind {
      QuestionType::MultipleChoice => self.multiple_choice,
      QuestionType::TrueFalse => self.true_false,
      QuestionType::ShortAnswer => self.short_answer,
      QuestionType::Essay => self.essay,
    }
  }

  fn weight_sum(&self) -> f64 {
    QuestionType::ALL.iter().map(|k| self.get(*k).max(0.0)).sum()
  }

  /// Every share finite and non-negative, with at least one above zero.
  pub fn is_valid(&self) -> bool {
    QuestionType::ALL.iter().all(|k| {
      let v = self.get(*k);
      v.is_finite() && v >= 0.0
    }) && self.weight_sum() > 0.0
  }

  /// Split `total` questions across the mix so the counts sum to `total`.
  ///
  /// Shares are taken relative to the sum of the mix, so sliders that do not
  /// add up to 100 are rescaled first. Each share is rounded half-up; any
  /// rounding difference goes to the largest share (first in type order on
  /// ties, essay when every share is 0).
  pub fn counts_for(&self, total: u32) -> QuestionCounts {
    let mut counts = QuestionCounts::default();
    let sum = self.weight_sum();
    if sum > 0.0 && sum.is_finite() {
      for kind in QuestionType::ALL {
        let share = (self.get(kind).max(0.0) / sum) * f64::from(total);
        *counts.slot(kind) = (share + 0.5).floor() as u32;
      }
    }

    let diff = i64::from(total) - i64::from(counts.total());
    if diff != 0 {
      let mut largest = QuestionType::Essay;
      let mut largest_val = 0.0;
      for kind in QuestionType::ALL {
        if self.get(kind) > largest_val {
          largest = kind;
          largest_val = self.get(kind);
        }
      }
      let slot = counts.slot(largest);
      *slot = (i64::from(*slot) + diff).max(0) as u32;
    }
    counts
  }
}

/// Caller-owned generation request; immutable once handed to the assembler.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct GenerationRequest {
  pub subject: String,
  pub topics: Vec<String>,
  pub difficulty: Difficulty,
  pub counts: QuestionCounts,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct MultipleChoice {
  pub question: String,
  pub options: Vec<String>,
  pub answer: String,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct TrueFalse {
  pub question: String,
  pub answer: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ShortAnswer {
  pub question: String,
  pub answer: String,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Essay {
  pub question: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub guidelines: Option<String>,
}

/// Which templated filler a synthesized question belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Filler {
  /// Branch-level substitute when a whole batch failed.
  Fallback,
  /// Padding appended when a batch came back short.
  Additional,
}

impl Filler {
  fn label(self) -> &'static str {
    match self {
      Filler::Fallback => "Fallback",
      Filler::Additional => "Additional",
    }
  }
}

/// Behaviour shared by the four question variants so batch generation,
/// fallback and padding can be written once.
pub trait QuestionItem: DeserializeOwned + Serialize + Clone + Send + Sync + 'static {
  const KIND: QuestionType;

  fn question(&self) -> &str;

  /// Shape checks beyond what serde enforces.
  fn is_well_formed(&self) -> bool {
    !self.question().trim().is_empty()
  }

  /// Templated item number `n` (1-based) of the given filler family.
  fn filler(filler: Filler, n: usize, subject: &str) -> Self;
}

impl QuestionItem for MultipleChoice {
  const KIND: QuestionType = QuestionType::MultipleChoice;

  fn question(&self) -> &str { &self.question }

  fn is_well_formed(&self) -> bool {
    !self.question.trim().is_empty()
      && self.options.len() == 4
      && self.options.iter().any(|o| o == &self.answer)
  }

  fn filler(filler: Filler, n: usize, subject: &str) -> Self {
    MultipleChoice {
      question: format!("{} multiple choice question {} about {}", filler.label(), n, subject),
      options: ["Option A", "Option B", "Option C", "Option D"].iter().map(|s| s.to_string()).collect(),
      answer: "Option A".into(),
    }
  }
}

impl QuestionItem for TrueFalse {
  const KIND: QuestionType = QuestionType::TrueFalse;

  fn question(&self) -> &str { &self.question }

  fn filler(filler: Filler, n: usize, subject: &str) -> Self {
    TrueFalse {
      question: format!("{} true/false statement {} about {}", filler.label(), n, subject),
      answer: (n - 1) % 2 == 0,
    }
  }
}

impl QuestionItem for ShortAnswer {
  const KIND: QuestionType = QuestionType::ShortAnswer;

  fn question(&self) -> &str { &self.question }

  fn filler(filler: Filler, n: usize, subject: &str) -> Self {
    ShortAnswer {
      question: format!("{} short answer question {} about {}", filler.label(), n, subject),
      answer: "Sample answer to the question.".into(),
    }
  }
}

impl QuestionItem for Essay {
  const KIND: QuestionType = QuestionType::Essay;

  fn question(&self) -> &str { &self.question }

  fn filler(filler: Filler, n: usize, subject: &str) -> Self {
    Essay {
      question: format!("{} essay question {} about {}", filler.label(), n, subject),
      guidelines: Some("Write a comprehensive essay addressing the key points.".into()),
    }
  }
}

/// Questions keyed by type, in presentation order.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedQuestions {
  #[serde(default)] pub multiple_choice: Vec<MultipleChoice>,
  #[serde(default)] pub true_false: Vec<TrueFalse>,
  #[serde(default)] pub short_answer: Vec<ShortAnswer>,
  #[serde(default)] pub essay: Vec<Essay>,
}

impl GeneratedQuestions {
  pub fn len_of(&self, kind: QuestionType) -> usize {
    match kind {
      QuestionType::MultipleChoice => self.multiple_choice.len(),
      QuestionType::TrueFalse => self.true_false.len(),
      QuestionType::ShortAnswer => self.short_answer.len(),
      QuestionType::Essay => self.essay.len(),
    }
  }

  pub fn total(&self) -> usize {
    QuestionType::ALL.iter().map(|k| self.len_of(*k)).sum()
  }

  /// Heuristic used by the browser client: the leading objective question
  /// carries the word "Fallback" when templated content was substituted.
  pub fn has_fallback_marker(&self) -> bool {
    self.multiple_choice.first().is_some_and(|q| q.question.contains("Fallback"))
      || self.true_false.first().is_some_and(|q| q.question.contains("Fallback"))
  }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedExam {
  pub title: String,
  pub subject: String,
  pub topics: Vec<String>,
  pub difficulty: Difficulty,
  pub questions: GeneratedQuestions,
  #[serde(default)]
  pub include_answer_key: bool,
}

/// Where the items of one question type came from.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ContentSource {
  Model,
  QuestionBank,
  Template,
}
