//! The roster's text form.
//!
//! The roster entity stores the set of known subject names as plain text,
//! sorted, one name per line, so it can be versioned and diffed exactly like
//! subject content.

use std::collections::BTreeSet;

/// Serialise `names` into roster text.
pub fn render<I, N>(names: I) -> String
where
  I: IntoIterator<Item = N>,
  N: AsRef<str>,
{
  let sorted: BTreeSet<String> = names
    .into_iter()
    .map(|n| n.as_ref().trim().to_owned())
    .filter(|n| !n.is_empty())
    .collect();

  let mut out = String::new();
  for name in sorted {
    out.push_str(&name);
    out.push('\n');
  }
  out
}

/// The names listed in a roster version, in stored order.
pub fn parse(text: &str) -> Vec<String> {
  text
    .lines()
    .map(str::trim)
    .filter(|l| !l.is_empty())
    .map(str::to_owned)
    .collect()
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn render_sorts_and_terminates_lines() {
    assert_eq!(render(["Physics", "Biology", "Chemistry"]), "Biology\nChemistry\nPhysics\n");
  }

  #[test]
  fn render_drops_blanks_and_duplicates() {
    assert_eq!(render(["Biology", "  ", "Biology "]), "Biology\n");
    assert_eq!(render(Vec::<String>::new()), "");
  }

  #[test]
  fn parse_reads_back_rendered_names() {
    let text = render(["Modern History", "Ancient History"]);
    assert_eq!(parse(&text), vec!["Ancient History", "Modern History"]);
  }
}
