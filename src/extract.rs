//! Pull a JSON array out of free-form model output.
//!
//! Models are told to answer with a bare JSON array but regularly wrap it in
//! code fences or prose. Strategies run in order on the untouched input and
//! the first one that yields an array wins.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::ParseError;
use crate::util::trunc_for_log;

static FENCED: Lazy<Regex> =
  Lazy::new(|| Regex::new(r"```(?:json)?\s*([\s\S]*?)\s*```").expect("fence regex"));
static OUTER_ARRAY: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\[[\s\S]*\])").expect("array regex"));
static ARRAY_BODY: Lazy<Regex> = Lazy::new(|| Regex::new(r"\[([\s\S]*)\]").expect("body regex"));

fn parse_array(candidate: &str) -> Option<Vec<Value>> {
  match serde_json::from_str::<Value>(candidate) {
    Ok(Value::Array(items)) => Some(items),
    _ => None,
  }
}

fn direct(raw: &str) -> Option<Vec<Value>> {
  parse_array(raw.trim())
}

fn fenced(raw: &str) -> Option<Vec<Value>> {
  let caps = FENCED.captures(raw)?;
  parse_array(caps.get(1)?.as_str())
}

fn outer_array(raw: &str) -> Option<Vec<Value>> {
  let caps = OUTER_ARRAY.captures(raw)?;
  parse_array(caps.get(1)?.as_str())
}

fn rewrapped_body(raw: &str) -> Option<Vec<Value>> {
  let caps = ARRAY_BODY.captures(raw)?;
  parse_array(&format!("[{}]", caps.get(1)?.as_str()))
}

/// Extract the first JSON array found by any strategy.
pub fn extract_json(raw: &str) -> Result<Vec<Value>, ParseError> {
  let strategies: [(&str, fn(&str) -> Option<Vec<Value>>); 4] = [
    ("direct", direct),
    ("fenced", fenced),
    ("outer_array", outer_array),
    ("rewrapped_body", rewrapped_body),
  ];

  for (name, strategy) in strategies {
    if let Some(items) = strategy(raw) {
      debug!(target: "generation", strategy = name, items = items.len(), "Extracted JSON array");
      return Ok(items);
    }
  }

  warn!(target: "generation", response = %trunc_for_log(raw, 200), "No JSON array found in model response");
  Err(ParseError)
}
