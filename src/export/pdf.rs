//! A4 PDF rendering with the built-in Helvetica faces.
//!
//! The built-in faces only cover plain Latin text, so math and science
//! symbols are spelled out in ASCII before drawing.

use std::borrow::Cow;

use tracing::debug;
use printpdf::{BuiltinFont, IndirectFontRef, Mm, PdfDocument, PdfDocumentReference, PdfLayerReference};

use super::Block;
use crate::error::ExportError;
use crate::util::wrap_text;

const PAGE_W: f32 = 210.0;
const PAGE_H: f32 = 297.0;
const MARGIN: f32 = 20.0;
const TEXT_W: f32 = PAGE_W - 2.0 * MARGIN;
const INDENT: &str = "   ";
const RULE: &str = "________________________________________________________________________";

/// Rough Helvetica advance per character in mm at `size` pt.
fn char_width(size: f32) -> f32 {
  size * 0.5 * 0.3528
}

fn chars_per_line(size: f32) -> usize {
  (TEXT_W / char_width(size)).max(10.0) as usize
}

struct Cursor {
  doc: PdfDocumentReference,
  layer: PdfLayerReference,
  regular: IndirectFontRef,
  bold: IndirectFontRef,
  /// Distance from the top edge, in mm.
  y: f32,
  pages: usize,
}

impl Cursor {
  fn new_page(&mut self) {
    let (page, layer) = self.doc.add_page(Mm(PAGE_W), Mm(PAGE_H), "Layer 1");
    self.layer = self.doc.get_page(page).get_layer(layer);
    self.y = MARGIN;
    self.pages += 1;
  }

  /// Start a new page unless `height` mm still fit above the bottom margin.
  fn ensure_room(&mut self, height: f32) {
    if self.y + height > PAGE_H - MARGIN {
      self.new_page();
    }
  }

  /// Wrapped left-aligned text; advances by half the font size per line plus a gap.
  fn text(&mut self, text: &str, size: f32, bold: bool) {
    let font = if bold { self.bold.clone() } else { self.regular.clone() };
    let line_h = size * 0.5;
    for line in wrap_text(&pdf_safe(text), chars_per_line(size)) {
      self.ensure_room(line_h);
      self.layer.use_text(line.as_str(), size, Mm(MARGIN), Mm(PAGE_H - self.y), &font);
      self.y += line_h;
    }
    self.y += 5.0;
  }

  fn centered(&mut self, text: &str, size: f32, bold: bool) {
    self.ensure_room(size * 0.5);
    let font = if bold { self.bold.clone() } else { self.regular.clone() };
    let text = pdf_safe(text);
    let width = text.chars().count() as f32 * char_width(size);
    let x = ((PAGE_W - width) / 2.0).max(MARGIN);
    self.layer.use_text(text.as_ref(), size, Mm(x), Mm(PAGE_H - self.y), &font);
  }
}

/// Spell out characters the built-in Helvetica cannot show.
fn pdf_safe(text: &str) -> Cow<'_, str> {
  if text.is_ascii() {
    return Cow::Borrowed(text);
  }
  let mut out = String::with_capacity(text.len() + 8);
  for ch in text.chars() {
    match ch {
      c if c.is_ascii() => out.push(c),
      '⁰' => out.push_str("^0"),
      '¹' => out.push_str("^1"),
      '²' => out.push_str("^2"),
      '³' => out.push_str("^3"),
      '⁴' => out.push_str("^4"),
      '⁵' => out.push_str("^5"),
      '⁶' => out.push_str("^6"),
      '⁷' => out.push_str("^7"),
      '⁸' => out.push_str("^8"),
      '⁹' => out.push_str("^9"),
      '⁻' => out.push_str("^-"),
      'π' => out.push_str("pi"),
      '×' => out.push('x'),
      '÷' => out.push('/'),
      '·' => out.push('*'),
      '−' | '–' | '—' => out.push('-'),
      '≤' => out.push_str("<="),
      '≥' => out.push_str(">="),
      '≠' => out.push_str("!="),
      '≈' => out.push('~'),
      '√' => out.push_str("sqrt"),
      '°' => out.push_str(" deg"),
      '‘' | '’' => out.push('\''),
      '“' | '”' => out.push('"'),
      '…' => out.push_str("..."),
      '\u{a0}' => out.push(' '),
      _ => out.push('?'),
    }
  }
  Cow::Owned(out)
}

pub(super) fn render(title: &str, blocks: &[Block]) -> Result<Vec<u8>, ExportError> {
  let c = draw(title, blocks)?;
  debug!(target: "export", pages = c.pages, "PDF laid out");
  c.doc.save_to_bytes().map_err(|e| ExportError::Pdf(e.to_string()))
}

fn draw(title: &str, blocks: &[Block]) -> Result<Cursor, ExportError> {
  let (doc, page, layer) = PdfDocument::new(title, Mm(PAGE_W), Mm(PAGE_H), "Layer 1");
  let regular = doc.add_builtin_font(BuiltinFont::Helvetica).map_err(|e| ExportError::Pdf(e.to_string()))?;
  let bold = doc.add_builtin_font(BuiltinFont::HelveticaBold).map_err(|e| ExportError::Pdf(e.to_string()))?;
  let layer = doc.get_page(page).get_layer(layer);

  let mut c = Cursor { doc, layer, regular, bold, y: MARGIN, pages: 1 };
  let mut seen_meta = false;

  for block in blocks {
    match block {
      Block::Title(t) => {
        c.centered(t, 18.0, true);
        c.y += 10.0;
      }
      Block::Meta(t) => {
        c.centered(t, 12.0, false);
        c.y += if seen_meta { 15.0 } else { 8.0 };
        seen_meta = true;
      }
      Block::Section(t) => c.text(t, 14.0, true),
      Block::Question(t) => c.text(t, 12.0, false),
      Block::Detail(t) => c.text(&format!("{}{}", INDENT, t), 12.0, false),
      Block::AnswerLines => {
        c.ensure_room(20.0);
        c.text(RULE, 10.0, false);
        c.text(RULE, 10.0, false);
        c.y += 5.0;
      }
      Block::AnswerSpace => {
        c.ensure_room(20.0);
        c.y += 20.0;
      }
      Block::PageBreak => c.new_page(),
      Block::KeyTitle(t) => {
        c.text(t, 16.0, true);
        c.y += 5.0;
      }
      Block::KeyEntry(t) => c.text(t, 12.0, false),
    }
  }

  Ok(c)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn symbols_are_spelled_out() {
    assert_eq!(pdf_safe("3 × 10⁸ m/s"), "3 x 10^8 m/s");
    assert_eq!(pdf_safe("A = πr²"), "A = pir^2");
    assert_eq!(pdf_safe("9.8 m/s²"), "9.8 m/s^2");
    assert!(matches!(pdf_safe("plain text"), Cow::Borrowed(_)));
    assert_eq!(pdf_safe("漢"), "?");
  }

  #[test]
  fn long_question_flows_onto_following_pages() {
    let long = "word ".repeat(2_000);
    let c = draw("Long", &[Block::Title("Long".into()), Block::Question(long)]).expect("draw");
    // About 125 wrapped lines at 6 mm each do not fit on one A4 page.
    assert!(c.pages >= 3, "pages = {}", c.pages);
    assert!(c.y <= PAGE_H - MARGIN + 5.0);
  }

  #[test]
  fn blocks_near_the_bottom_start_a_new_page() {
    let blocks: Vec<Block> = (0..40).flat_map(|i| [Block::Question(format!("{}. Question", i)), Block::AnswerLines]).collect();
    let c = draw("Many", &blocks).expect("draw");
    assert!(c.pages >= 2);
    assert!(c.y <= PAGE_H - MARGIN + 5.0);
  }
}
