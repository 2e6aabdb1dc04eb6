//! The clock every date computation reads from.

use std::sync::{Mutex, PoisonError};

use chrono::{DateTime, Days, NaiveDate, NaiveTime, Utc};

/// Source of "today". Loan deadlines and fines depend on it, so tests swap in a
/// [`FixedClock`].
pub trait Clock: Send + Sync + 'static {
  fn now(&self) -> DateTime<Utc>;

  fn today(&self) -> NaiveDate { self.now().date_naive() }
}

/// Wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
  fn now(&self) -> DateTime<Utc> { Utc::now() }
}

/// A clock pinned to a calendar date that only moves when told to.
#[derive(Debug)]
pub struct FixedClock {
  today: Mutex<NaiveDate>,
}

impl FixedClock {
  pub fn new(today: NaiveDate) -> Self { Self { today: Mutex::new(today) } }

  pub fn set(&self, today: NaiveDate) {
    *self.today.lock().unwrap_or_else(PoisonError::into_inner) = today;
  }

  pub fn advance(&self, days: u64) {
    let mut today = self.today.lock().unwrap_or_else(PoisonError::into_inner);
    if let Some(next) = today.checked_add_days(Days::new(days)) {
      *today = next;
    }
  }
}

impl Clock for FixedClock {
  fn now(&self) -> DateTime<Utc> {
    self.today().and_time(NaiveTime::MIN).and_utc()
  }

  fn today(&self) -> NaiveDate {
    *self.today.lock().unwrap_or_else(PoisonError::into_inner)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn fixed_clock_advances_by_days() {
    let start = NaiveDate::from_ymd_opt(2024, 2, 27).unwrap();
    let clock = FixedClock::new(start);
    clock.advance(3);
    assert_eq!(clock.today(), NaiveDate::from_ymd_opt(2024, 3, 1).unwrap());
    assert_eq!(clock.now().date_naive(), clock.today());
  }
}
