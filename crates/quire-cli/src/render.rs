//! Plain-text rendering of API responses.

use std::fmt::Write as _;

use chrono::{DateTime, Utc};
use quire_core::{
  cycle::CycleStatus,
  entity::Entity,
  history::HistoryEntry,
  navigate::{IndexedDiff, RosterSummary},
};

pub fn roster(summary: &RosterSummary) -> String {
  if summary.is_empty() {
    return "no subjects captured yet\n".into();
  }
  let width = summary.keys().map(|n| n.chars().count()).max().unwrap_or(0).max(7);

  let mut out = format!("{:<width$}  {:<10}  {:<10}\n", "SUBJECT", "ADDED", "UPDATED");
  for (name, s) in summary {
    let _ = writeln!(out, "{name:<width$}  {}  {}", s.added, s.latest);
  }
  out
}

pub fn history(entries: &[HistoryEntry]) -> String {
  if entries.is_empty() {
    return "no versions\n".into();
  }
  let mut out = String::from("INDEX  DATE\n");
  for e in entries {
    let marker = if e.is_oldest { "  (oldest)" } else { "" };
    let _ = writeln!(out, "{:>5}  {}{marker}", e.index, e.date);
  }
  out
}

/// "Biology: 2021-11-02 vs Oldest (2021-11-01)", then the diff as-is.
pub fn diff(d: &IndexedDiff) -> String {
  let subject = match &d.entity {
    Entity::Roster => "Roster".to_owned(),
    Entity::Subject(slug) => slug.to_string(),
  };
  let baseline = match d.previous {
    None => "nothing".to_owned(),
    Some(prev) if d.previous_is_oldest => format!("Oldest ({prev})"),
    Some(prev) => prev.to_string(),
  };

  let mut out = format!("{subject}: {} vs {baseline}\n", d.date);
  if d.diff.is_empty() {
    out.push_str("(no changes)\n");
  } else {
    out.push_str(&d.diff);
  }
  out
}

pub fn status(s: &CycleStatus) -> String {
  let last = match (s.last_success, s.seconds_elapsed) {
    (Some(at), Some(secs)) => format!("{} ({} ago)", fmt_time(at), fmt_secs(secs)),
    (Some(at), None) => fmt_time(at),
    _ => "never".into(),
  };
  format!(
    "last successful cycle: {last}\ncycle running:         {}\nrerun allowed:         {}\n",
    yes_no(s.running),
    yes_no(s.rerun_allowed),
  )
}

fn fmt_time(at: DateTime<Utc>) -> String { at.format("%Y-%m-%d %H:%M:%S UTC").to_string() }

fn fmt_secs(secs: u64) -> String {
  match secs {
    s if s < 60 => format!("{s}s"),
    s if s < 3600 => format!("{}m {}s", s / 60, s % 60),
    s => format!("{}h {}m", s / 3600, (s % 3600) / 60),
  }
}

fn yes_no(b: bool) -> &'static str { if b { "yes" } else { "no" } }
