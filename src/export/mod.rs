//! Printable exam documents.
//!
//! `layout` turns an exam into an ordered list of blocks; the PDF and DOCX
//! renderers only decide how each block looks.

mod docx;
mod pdf;

use serde::Deserialize;
use tracing::{error, info, instrument};

use crate::domain::{GeneratedExam, QuestionType};
use crate::error::ExportError;
use crate::util::underscore_whitespace;

/// Separator between answers on the multiple-choice and true/false key lines.
pub const KEY_SEPARATOR: &str = "   |   ";

#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
  Pdf,
  Docx,
}

impl ExportFormat {
  pub fn parse(s: &str) -> Option<Self> {
    match s.trim().to_ascii_lowercase().as_str() {
      "pdf" => Some(ExportFormat::Pdf),
      "docx" => Some(ExportFormat::Docx),
      _ => None,
    }
  }

  pub fn extension(self) -> &'static str {
    match self {
      ExportFormat::Pdf => "pdf",
      ExportFormat::Docx => "docx",
    }
  }

  pub fn content_type(self) -> &'static str {
    match self {
      ExportFormat::Pdf => "application/pdf",
      ExportFormat::Docx => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
    }
  }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Block {
  Title(String),
  Meta(String),
  /// Question-type heading, or a group heading inside the answer key.
  Section(String),
  /// Numbered question text, e.g. `3. Define a prime number.`
  Question(String),
  /// Indented line under a question: an option, the true/false choice, guidelines.
  Detail(String),
  /// Ruled space for a written answer.
  AnswerLines,
  /// Extra room after an essay question.
  AnswerSpace,
  PageBreak,
  KeyTitle(String),
  KeyEntry(String),
}

fn option_label(index: usize) -> char {
  (b'A' + (index % 26) as u8) as char
}

/// Block list for an exam. Numbering runs on across sections.
pub fn layout(exam: &GeneratedExam) -> Vec<Block> {
  let q = &exam.questions;
  let mut blocks = vec![
    Block::Title(exam.title.clone()),
    Block::Meta(format!("Subject: {} | Difficulty: {}", exam.subject, exam.difficulty)),
    Block::Meta(format!("Topics: {}", exam.topics.join(", "))),
  ];

  let mc_start = 1;
  let tf_start = mc_start + q.multiple_choice.len();
  let sa_start = tf_start + q.true_false.len();
  let essay_start = sa_start + q.short_answer.len();

  if !q.multiple_choice.is_empty() {
    blocks.push(Block::Section(QuestionType::MultipleChoice.section_title().into()));
    for (i, mc) in q.multiple_choice.iter().enumerate() {
      blocks.push(Block::Question(format!("{}. {}", mc_start + i, mc.question)));
      for (j, opt) in mc.options.iter().enumerate() {
        blocks.push(Block::Detail(format!("{}. {}", option_label(j), opt)));
      }
    }
  }

  if !q.true_false.is_empty() {
    blocks.push(Block::Section(QuestionType::TrueFalse.section_title().into()));
    for (i, tf) in q.true_false.iter().enumerate() {
      blocks.push(Block::Question(format!("{}. {}", tf_start + i, tf.question)));
      blocks.push(Block::Detail("True (   )    False (   )".into()));
    }
  }

  if !q.short_answer.is_empty() {
    blocks.push(Block::Section(QuestionType::ShortAnswer.section_title().into()));
    for (i, sa) in q.short_answer.iter().enumerate() {
      blocks.push(Block::Question(format!("{}. {}", sa_start + i, sa.question)));
      blocks.push(Block::AnswerLines);
    }
  }

  if !q.essay.is_empty() {
    blocks.push(Block::Section(QuestionType::Essay.section_title().into()));
    for (i, essay) in q.essay.iter().enumerate() {
      blocks.push(Block::Question(format!("{}. {}", essay_start + i, essay.question)));
      if let Some(g) = essay.guidelines.as_deref().filter(|g| !g.trim().is_empty()) {
        blocks.push(Block::Detail(format!("Guidelines: {}", g)));
      }
      blocks.push(Block::AnswerSpace);
    }
  }

  if exam.include_answer_key {
    blocks.push(Block::PageBreak);
    blocks.push(Block::KeyTitle("Answer Key".into()));

    if !q.multiple_choice.is_empty() {
      blocks.push(Block::Section("Multiple Choice:".into()));
      let line: Vec<String> = q
        .multiple_choice
        .iter()
        .enumerate()
        .map(|(i, mc)| format!("{}. {}", mc_start + i, mc.answer))
        .collect();
      blocks.push(Block::KeyEntry(line.join(KEY_SEPARATOR)));
    }

    if !q.true_false.is_empty() {
      blocks.push(Block::Section("True/False:".into()));
      let line: Vec<String> = q
        .true_false
        .iter()
        .enumerate()
        .map(|(i, tf)| format!("{}. {}", tf_start + i, if tf.answer { "True" } else { "False" }))
        .collect();
      blocks.push(Block::KeyEntry(line.join(KEY_SEPARATOR)));
    }

    if !q.short_answer.is_empty() {
      blocks.push(Block::Section("Short Answer:".into()));
      for (i, sa) in q.short_answer.iter().enumerate() {
        blocks.push(Block::KeyEntry(format!("{}. {}", sa_start + i, sa.answer)));
      }
    }
  }

  blocks
}

/// A rendered document ready to be sent as an attachment.
#[derive(Debug)]
pub struct ExportedDocument {
  pub bytes: Vec<u8>,
  pub content_type: &'static str,
  pub filename: String,
}

pub fn export_filename(subject: &str, format: ExportFormat) -> String {
  format!("{}_Exam.{}", underscore_whitespace(subject), format.extension())
}

#[instrument(level = "info", target = "export", skip(exam), fields(subject = %exam.subject, ?format))]
pub fn export_exam(exam: &GeneratedExam, format: ExportFormat) -> Result<ExportedDocument, ExportError> {
  let blocks = layout(exam);
  let rendered = match format {
    ExportFormat::Pdf => pdf::render(&exam.title, &blocks),
    ExportFormat::Docx => docx::render(&blocks),
  };
  let bytes = rendered.map_err(|e| {
    error!(target: "export", error = %e, "Document rendering failed");
    e
  })?;

  info!(target: "export", bytes = bytes.len(), blocks = blocks.len(), "Exam exported");
  Ok(ExportedDocument {
    bytes,
    content_type: format.content_type(),
    filename: export_filename(&exam.subject, format),
  })
}
