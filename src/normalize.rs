//! Turn raw generated code into a document an iframe can render as-is.
//!
//! Steps, each skipped when it does not apply:
//! 1. take the body of the first ```html fence;
//! 2. otherwise take the body of the first fence, minus a language tag;
//! 3. prepend `<!DOCTYPE html>` when the text has an `<html` tag but no doctype.
//!
//! Never fails. Output contains no fence markers, so a second pass is a no-op.

const FENCE: &str = "```";
const HTML_FENCE: &str = "```html";
const DOCTYPE: &str = "<!DOCTYPE html>";

pub fn normalize(raw: &str) -> String {
  let body = unfence(raw);
  ensure_doctype(body)
}

fn unfence(raw: &str) -> &str {
  // ASCII lowercasing keeps byte offsets aligned with `raw`.
  let lower = raw.to_ascii_lowercase();

  if let Some(pos) = lower.find(HTML_FENCE) {
    let rest = &raw[pos + HTML_FENCE.len()..];
    let inner = match rest.find(FENCE) {
      Some(end) => &rest[..end],
      None => rest,
    };
    return inner.trim();
  }

  if let Some(pos) = raw.find(FENCE) {
    let rest = &raw[pos + FENCE.len()..];
    let inner = match rest.find(FENCE) {
      Some(end) => &rest[..end],
      None => rest,
    };
    return strip_language_tag(inner).trim();
  }

  raw
}

/// Drop a lone word on the fence line (```js, ```xml ...).
fn strip_language_tag(inner: &str) -> &str {
  let (first, rest) = match inner.find('\n') {
    Some(nl) => (&inner[..nl], &inner[nl + 1..]),
    None => return inner,
  };
  let tag = first.trim();
  let is_tag = !tag.is_empty()
    && tag.chars().all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '+' | '#' | '.' | '_'));
  if is_tag { rest } else { inner }
}

fn ensure_doctype(body: &str) -> String {
  let lower = body.to_ascii_lowercase();
  if !lower.trim_start().starts_with("<!doctype") && lower.contains("<html") {
    format!("{}\n{}", DOCTYPE, body)
  } else {
    body.to_string()
  }
}
