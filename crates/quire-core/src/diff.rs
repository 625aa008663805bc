//! Unified line diffs between two versions.

use std::borrow::Cow;

use similar::TextDiff;

/// Header label used for the empty baseline before the oldest version.
pub const BASELINE_LABEL: &str = "none";

const CONTEXT_RADIUS: usize = 3;

/// One side of a diff: the header label and the document text.
#[derive(Debug, Clone, Copy)]
pub struct Side<'a> {
  pub label: &'a str,
  pub text:  &'a str,
}

impl<'a> Side<'a> {
  pub fn new(label: &'a str, text: &'a str) -> Self { Self { label, text } }
}

/// Produce a unified diff from `prev` to `next`.
///
/// `prev == None` diffs against an empty document labelled
/// [`BASELINE_LABEL`], so every line of `next` shows as an addition. The
/// output is empty when both sides hold the same lines. A missing final
/// newline does not count as a change.
pub fn unified(prev: Option<Side<'_>>, next: Side<'_>) -> String {
  let (prev_label, prev_text) = match prev {
    Some(side) => (side.label, terminated(side.text)),
    None => (BASELINE_LABEL, Cow::Borrowed("")),
  };
  let next_text = terminated(next.text);

  let diff = TextDiff::from_lines(prev_text.as_ref(), next_text.as_ref());
  diff
    .unified_diff()
    .context_radius(CONTEXT_RADIUS)
    .header(prev_label, next.label)
    .to_string()
}

fn terminated(text: &str) -> Cow<'_, str> {
  if text.is_empty() || text.ends_with('\n') {
    Cow::Borrowed(text)
  } else {
    Cow::Owned(format!("{text}\n"))
  }
}
