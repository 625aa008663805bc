//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Capture dates are stored as `YYYY-MM-DD` so lexical order is chronological
//! order. Timestamps are stored as RFC 3339 strings.

use chrono::{DateTime, NaiveDate, Utc};
use quire_core::{
  entity::{Entity, Slug},
  store::Locator,
  version::Version,
};

use crate::{Error, Result};

const DATE_FORMAT: &str = "%Y-%m-%d";

// ─── NaiveDate ────────────────────────────────────────────────────────────────

pub fn encode_date(d: NaiveDate) -> String { d.format(DATE_FORMAT).to_string() }

pub fn decode_date(s: &str) -> Result<NaiveDate> {
  NaiveDate::parse_from_str(s, DATE_FORMAT)
    .map_err(|e| Error::DateParse(format!("{s:?}: {e}")))
}

// ─── DateTime<Utc> ────────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(format!("{s:?}: {e}")))
}

// ─── Raw row types ────────────────────────────────────────────────────────────

/// A `versions` row as read from SQLite, before decoding.
pub struct RawVersion {
  pub entity_key:  String,
  pub captured_on: String,
  pub content:     String,
}

impl RawVersion {
  pub fn into_version(self) -> Result<Version> {
    Ok(Version {
      entity:      Entity::from_storage_key(&self.entity_key)?,
      captured_on: decode_date(&self.captured_on)?,
      content:     self.content,
    })
  }
}

/// A `locators` row as read from SQLite, before decoding.
pub struct RawLocator {
  pub slug:    String,
  pub name:    String,
  pub locator: String,
}

impl RawLocator {
  pub fn into_locator(self) -> Result<Locator> {
    Ok(Locator {
      slug:    Slug::parse(&self.slug)?,
      name:    self.name,
      locator: self.locator,
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn dates_round_trip_and_sort_lexically() {
    let earlier = NaiveDate::from_ymd_opt(2021, 9, 30).unwrap();
    let later = NaiveDate::from_ymd_opt(2021, 10, 1).unwrap();
    assert_eq!(decode_date(&encode_date(earlier)).unwrap(), earlier);
    assert!(encode_date(earlier) < encode_date(later));
  }

  #[test]
  fn malformed_date_is_an_error() {
    assert!(matches!(decode_date("30/09/2021"), Err(Error::DateParse(_))));
  }
}
