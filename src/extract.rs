//! Pull a JSON object out of free-form model text.
//!
//! Models wrap JSON in prose or code fences often enough that we never require
//! the whole reply to parse. The span from the first `{` to the last `}` is
//! tried as one object. Field presence and types are checked by each consumer.

use serde_json::{Map, Value};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExtractionError {
  #[error("no braced span in model output")]
  NoPayload,
  #[error("braced span is not a JSON object: {0}")]
  Malformed(#[from] serde_json::Error),
}

pub fn extract(raw: &str) -> Result<Map<String, Value>, ExtractionError> {
  let start = raw.find('{').ok_or(ExtractionError::NoPayload)?;
  let end = raw.rfind('}').ok_or(ExtractionError::NoPayload)?;
  if end < start {
    return Err(ExtractionError::NoPayload);
  }
  // A valid span opens with `{`, so it can only parse as an object.
  Ok(serde_json::from_str::<Map<String, Value>>(&raw[start..=end])?)
}
