//! Small utility helpers used across modules.

/// Very small and safe string templating.
/// Replaces occurrences of `{key}` in the template with provided values.
/// This is intentionally simple (no nested/conditional logic).
pub fn fill_template(tpl: &str, pairs: &[(&str, &str)]) -> String {
  let mut out = tpl.to_string();
  for (k, v) in pairs {
    let needle = format!("{{{}}}", k);
    out = out.replace(&needle, v);
  }
  out
}

/// Log-safe truncation for large strings.
/// Avoids spamming logs with huge prompts and model responses.
pub fn trunc_for_log(s: &str, max: usize) -> String {
  let total = s.chars().count();
  if total <= max {
    s.to_string()
  } else {
    let head: String = s.chars().take(max).collect();
    format!("{}… ({} chars total)", head, total)
  }
}

/// Greedy word wrap on character counts. Words longer than `width` get a line
/// of their own rather than being split.
pub fn wrap_text(text: &str, width: usize) -> Vec<String> {
  let mut lines = Vec::new();
  for paragraph in text.split('\n') {
    let mut line = String::new();
    for word in paragraph.split_whitespace() {
      let needed = if line.is_empty() { word.chars().count() } else { line.chars().count() + 1 + word.chars().count() };
      if needed > width && !line.is_empty() {
        lines.push(std::mem::take(&mut line));
      }
      if !line.is_empty() {
        line.push(' ');
      }
      line.push_str(word);
    }
    lines.push(line);
  }
  lines
}

/// `Computer Science` -> `Computer_Science`; runs of whitespace collapse to one `_`.
pub fn underscore_whitespace(s: &str) -> String {
  s.split_whitespace().collect::<Vec<_>>().join("_")
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn template_replaces_every_key() {
    let out = fill_template("{count} about {subject} ({count})", &[("count", "3"), ("subject", "Physics")]);
    assert_eq!(out, "3 about Physics (3)");
  }

  #[test]
  fn truncation_is_char_safe() {
    assert_eq!(trunc_for_log("short", 10), "short");
    let out = trunc_for_log("ππππππ", 2);
    assert!(out.starts_with("ππ…"));
    assert!(out.contains("6 chars total"));
  }

  #[test]
  fn wrap_respects_width() {
    let lines = wrap_text("the quick brown fox jumps over the lazy dog", 10);
    assert_eq!(lines, vec!["the quick", "brown fox", "jumps over", "the lazy", "dog"]);
    assert!(lines.iter().all(|l| l.chars().count() <= 10));
  }

  #[test]
  fn wrap_keeps_long_words_whole() {
    let lines = wrap_text("a supercalifragilistic b", 5);
    assert_eq!(lines, vec!["a", "supercalifragilistic", "b"]);
  }

  #[test]
  fn whitespace_becomes_underscores() {
    assert_eq!(underscore_whitespace("Computer  Science"), "Computer_Science");
    assert_eq!(underscore_whitespace("Physics"), "Physics");
  }
}
