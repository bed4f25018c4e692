//! Word document rendering.

use std::io::Cursor;

use docx_rs::{AlignmentType, BreakType, Docx, Paragraph, Run};

use super::Block;
use crate::error::ExportError;

/// Half an inch, in twentieths of a point.
const INDENT_TWIPS: i32 = 720;

/// Run sizes are in half-points.
fn run(text: &str, half_points: usize, bold: bool) -> Run {
  let r = Run::new().add_text(text).size(half_points);
  if bold { r.bold() } else { r }
}

fn indented(text: &str) -> Paragraph {
  Paragraph::new().add_run(run(text, 24, false)).indent(Some(INDENT_TWIPS), None, None, None)
}

pub(super) fn render(blocks: &[Block]) -> Result<Vec<u8>, ExportError> {
  let mut docx = Docx::new();

  for block in blocks {
    docx = match block {
      Block::Title(t) => docx.add_paragraph(Paragraph::new().add_run(run(t, 36, true)).align(AlignmentType::Center)),
      Block::Meta(t) => docx.add_paragraph(Paragraph::new().add_run(run(t, 24, false)).align(AlignmentType::Center)),
      Block::Section(t) => docx.add_paragraph(Paragraph::new().add_run(run(t, 28, true))),
      Block::Question(t) => docx.add_paragraph(Paragraph::new().add_run(run(t, 24, true))),
      Block::Detail(t) => docx.add_paragraph(indented(t)),
      Block::AnswerLines => docx
        .add_paragraph(indented("Answer: _______________________________________________"))
        .add_paragraph(indented("________________________________________________________")),
      Block::AnswerSpace => docx.add_paragraph(Paragraph::new()),
      Block::PageBreak => docx.add_paragraph(Paragraph::new().add_run(Run::new().add_break(BreakType::Page))),
      Block::KeyTitle(t) => docx.add_paragraph(Paragraph::new().add_run(run(t, 32, true))),
      Block::KeyEntry(t) => docx.add_paragraph(Paragraph::new().add_run(run(t, 24, false))),
    };
  }

  let mut buf = Cursor::new(Vec::new());
  docx.build().pack(&mut buf).map_err(|e| ExportError::Docx(e.to_string()))?;
  Ok(buf.into_inner())
}
