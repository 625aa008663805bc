//! The rerun gate: a manual re-trigger is only accepted once enough time has
//! passed since the last completed poll cycle.

use std::time::Duration;

use chrono::{DateTime, Utc};

/// Default minimum spacing between a completed cycle and a manual rerun.
pub const DEFAULT_THRESHOLD: Duration = Duration::from_secs(15 * 60);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RerunGate {
  threshold: Duration,
}

impl Default for RerunGate {
  fn default() -> Self { Self::new(DEFAULT_THRESHOLD) }
}

impl RerunGate {
  pub fn new(threshold: Duration) -> Self { Self { threshold } }

  pub fn threshold(&self) -> Duration { self.threshold }

  /// Time since `last_success`, or `None` when no cycle has completed or the
  /// marker lies in the future.
  pub fn elapsed(
    last_success: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
  ) -> Option<Duration> {
    last_success.and_then(|last| (now - last).to_std().ok())
  }

  /// `true` iff strictly more than the threshold has elapsed. A store that
  /// has never completed a cycle is always open.
  pub fn is_open(
    &self,
    last_success: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
  ) -> bool {
    match last_success {
      None => true,
      Some(_) => Self::elapsed(last_success, now)
        .is_some_and(|elapsed| elapsed > self.threshold),
    }
  }

  /// How long until the gate opens; zero when it already is.
  pub fn remaining(
    &self,
    last_success: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
  ) -> Duration {
    if self.is_open(last_success, now) {
      return Duration::ZERO;
    }
    let elapsed = Self::elapsed(last_success, now).unwrap_or(Duration::ZERO);
    self.threshold.saturating_sub(elapsed)
  }
}

#[cfg(test)]
mod tests {
  use chrono::TimeZone;

  use super::*;

  fn at(h: u32, m: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2021, 11, 2, h, m, 0).unwrap()
  }

  #[test]
  fn closed_one_minute_after_a_cycle() {
    let gate = RerunGate::default();
    assert!(!gate.is_open(Some(at(9, 0)), at(9, 1)));
    assert_eq!(gate.remaining(Some(at(9, 0)), at(9, 1)), Duration::from_secs(14 * 60));
  }

  #[test]
  fn open_sixteen_minutes_after_a_cycle() {
    let gate = RerunGate::default();
    assert!(gate.is_open(Some(at(9, 0)), at(9, 16)));
    assert_eq!(gate.remaining(Some(at(9, 0)), at(9, 16)), Duration::ZERO);
  }

  #[test]
  fn threshold_itself_is_not_enough() {
    let gate = RerunGate::default();
    assert!(!gate.is_open(Some(at(9, 0)), at(9, 15)));
  }

  #[test]
  fn open_when_no_cycle_has_completed() {
    assert!(RerunGate::default().is_open(None, at(9, 0)));
  }

  #[test]
  fn marker_in_the_future_keeps_the_gate_closed() {
    assert!(!RerunGate::default().is_open(Some(at(10, 0)), at(9, 0)));
  }
}
