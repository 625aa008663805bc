//! Entity identifiers.
//!
//! Two kinds of entity carry a version history: the single global roster (the
//! list of known subject names) and one stream per subject. Subjects are
//! addressed by a [`Slug`] derived from their display name so the identifier
//! is safe in both file paths and URLs.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Storage key of the roster entity. Contains `@`, which no slug can.
pub const ROSTER_KEY: &str = "@roster";

// ─── Names ───────────────────────────────────────────────────────────────────

/// Normalise a subject name as scraped from the catalog.
///
/// Slashes are removed, whitespace runs collapse to a single space, and each
/// alphabetic run is title-cased ("ENGLISH EAL/D" becomes "English Eald").
pub fn normalize_name(raw: &str) -> String {
  let cleaned = raw
    .replace('/', "")
    .split_whitespace()
    .collect::<Vec<_>>()
    .join(" ");

  let mut out = String::with_capacity(cleaned.len());
  let mut prev_alpha = false;
  for c in cleaned.chars() {
    if c.is_alphabetic() {
      if prev_alpha {
        out.extend(c.to_lowercase());
      } else {
        out.extend(c.to_uppercase());
      }
      prev_alpha = true;
    } else {
      out.push(c);
      prev_alpha = false;
    }
  }
  out
}

// ─── Slug ────────────────────────────────────────────────────────────────────

/// A lower-case, dash-separated identifier for a subject.
#[derive(
  Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(try_from = "String", into = "String")]
pub struct Slug(String);

impl Slug {
  /// Derive the slug for a (normalised or raw) subject name.
  ///
  /// Only ASCII letters and digits survive; anything else is dropped.
  pub fn from_name(name: &str) -> Result<Self> {
    let mut slug = String::with_capacity(name.len());
    for c in name.chars() {
      if c.is_whitespace() || c == '-' {
        if !slug.is_empty() && !slug.ends_with('-') {
          slug.push('-');
        }
      } else if c.is_ascii_alphanumeric() {
        slug.push(c.to_ascii_lowercase());
      }
    }
    while slug.ends_with('-') {
      slug.pop();
    }

    if slug.is_empty() {
      return Err(Error::InvalidName(name.to_owned()));
    }
    Ok(Self(slug))
  }

  /// Accept an already-formed slug, e.g. from a URL path segment.
  pub fn parse(raw: &str) -> Result<Self> {
    let well_formed = !raw.is_empty()
      && !raw.starts_with('-')
      && !raw.ends_with('-')
      && !raw.contains("--")
      && raw
        .bytes()
        .all(|b| b == b'-' || b.is_ascii_lowercase() || b.is_ascii_digit());

    if well_formed {
      Ok(Self(raw.to_owned()))
    } else {
      Err(Error::InvalidSlug(raw.to_owned()))
    }
  }

  pub fn as_str(&self) -> &str { &self.0 }
}

impl fmt::Display for Slug {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.0)
  }
}

impl TryFrom<String> for Slug {
  type Error = Error;

  fn try_from(value: String) -> Result<Self> { Self::parse(&value) }
}

impl From<Slug> for String {
  fn from(slug: Slug) -> Self { slug.0 }
}

// ─── Entity ──────────────────────────────────────────────────────────────────

/// Anything with an independent version history.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "slug", rename_all = "snake_case")]
pub enum Entity {
  Roster,
  Subject(Slug),
}

impl Entity {
  /// The subject entity for a display name.
  pub fn subject(name: &str) -> Result<Self> {
    Ok(Self::Subject(Slug::from_name(name)?))
  }

  /// The key under which this entity's versions are stored.
  pub fn storage_key(&self) -> &str {
    match self {
      Self::Roster => ROSTER_KEY,
      Self::Subject(slug) => slug.as_str(),
    }
  }

  pub fn from_storage_key(key: &str) -> Result<Self> {
    if key == ROSTER_KEY {
      Ok(Self::Roster)
    } else {
      Ok(Self::Subject(Slug::parse(key)?))
    }
  }
}

impl fmt::Display for Entity {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::Roster => f.write_str("roster"),
      Self::Subject(slug) => write!(f, "subject {slug}"),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn normalize_title_cases_and_strips_slashes() {
    assert_eq!(normalize_name("ENGLISH EAL/D"), "English Eald");
    assert_eq!(normalize_name("  mathematics   extension 1 "), "Mathematics Extension 1");
    assert_eq!(normalize_name("Aboriginal studies"), "Aboriginal Studies");
  }

  #[test]
  fn slug_from_name() {
    assert_eq!(Slug::from_name("Biology").unwrap().as_str(), "biology");
    assert_eq!(
      Slug::from_name("Mathematics Extension 1").unwrap().as_str(),
      "mathematics-extension-1"
    );
    assert_eq!(
      Slug::from_name("English (Standard) - Paper 1").unwrap().as_str(),
      "english-standard-paper-1"
    );
  }

  #[test]
  fn slug_from_unusable_name_is_rejected() {
    assert!(matches!(Slug::from_name(" / "), Err(Error::InvalidName(_))));
  }

  #[test]
  fn slug_parse_rejects_malformed_input() {
    assert!(Slug::parse("biology").is_ok());
    assert!(Slug::parse("modern-history").is_ok());
    for bad in ["", "Biology", "-x", "x-", "a--b", "a b", "@roster", "../etc", "français"] {
      assert!(Slug::parse(bad).is_err(), "accepted {bad:?}");
    }
  }

  #[test]
  fn slug_from_non_ascii_name_keeps_ascii_only() {
    assert_eq!(Slug::from_name("Français").unwrap().as_str(), "franais");
    assert_eq!(Slug::from_name("İzmir Studies").unwrap().as_str(), "zmir-studies");
    assert_eq!(Slug::from_name("Ökonomie – Teil 2").unwrap().as_str(), "konomie-teil-2");
    assert!(matches!(Slug::from_name("日本語"), Err(Error::InvalidName(_))));
  }

  #[test]
  fn derived_slugs_always_parse() {
    let names = [
      "Biology",
      "English Eald",
      "Français",
      "İzmir Studies",
      "ẞtraße",
      "Mathematics  Extension 1",
      "Ancient History - Part 2",
      "Ελληνικά 2",
    ];
    for name in names {
      let slug = Slug::from_name(name).unwrap();
      assert_eq!(Slug::parse(slug.as_str()).unwrap(), slug, "{name:?}");

      let subject = Entity::subject(name).unwrap();
      assert_eq!(Entity::from_storage_key(subject.storage_key()).unwrap(), subject);
    }
  }

  #[test]
  fn storage_keys_round_trip() {
    let roster = Entity::Roster;
    assert_eq!(Entity::from_storage_key(roster.storage_key()).unwrap(), roster);

    let subject = Entity::subject("Modern History").unwrap();
    assert_eq!(subject.storage_key(), "modern-history");
    assert_eq!(Entity::from_storage_key("modern-history").unwrap(), subject);
  }
}
