//! Loan period and overdue-fine arithmetic.

use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};

/// Default loan period in days.
pub const DEFAULT_LOAN_DAYS: u32 = 15;
/// Default fine charged per overdue day, in the library's currency unit.
pub const DEFAULT_FINE_PER_DAY: u32 = 5;

/// How long a copy may be kept and what lateness costs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LendingPolicy {
  pub loan_days:    u32,
  pub fine_per_day: u32,
}

impl Default for LendingPolicy {
  fn default() -> Self {
    Self { loan_days: DEFAULT_LOAN_DAYS, fine_per_day: DEFAULT_FINE_PER_DAY }
  }
}

impl LendingPolicy {
  /// The deadline for a loan starting on `borrowed_on`. Fixed at borrow time.
  pub fn due_date(&self, borrowed_on: NaiveDate) -> NaiveDate {
    borrowed_on
      .checked_add_days(Days::new(u64::from(self.loan_days)))
      .unwrap_or(NaiveDate::MAX)
  }

  /// The fine owed on `today` for a loan due on `due_on`; zero until the
  /// deadline has passed.
  pub fn fine_on(&self, due_on: NaiveDate, today: NaiveDate) -> u32 {
    overdue_days(due_on, today).saturating_mul(self.fine_per_day)
  }
}

/// Whole days elapsed since `due_on`, or zero if it has not passed.
pub fn overdue_days(due_on: NaiveDate, today: NaiveDate) -> u32 {
  let days = (today - due_on).num_days();
  u32::try_from(days.max(0)).unwrap_or(u32::MAX)
}

/// What a fine sweep did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SweepReport {
  /// Open loans examined.
  pub examined: usize,
  /// Loans whose stored fine went up (one notification each).
  pub fined:    usize,
}

#[cfg(test)]
mod tests {
  use super::*;

  fn d(y: i32, m: u32, day: u32) -> NaiveDate { NaiveDate::from_ymd_opt(y, m, day).unwrap() }

  #[test]
  fn due_date_is_fifteen_days_out_by_default() {
    assert_eq!(LendingPolicy::default().due_date(d(2024, 1, 20)), d(2024, 2, 4));
  }

  #[test]
  fn no_fine_on_or_before_the_due_date() {
    let p = LendingPolicy::default();
    assert_eq!(p.fine_on(d(2024, 3, 10), d(2024, 3, 1)), 0);
    assert_eq!(p.fine_on(d(2024, 3, 10), d(2024, 3, 10)), 0);
  }

  #[test]
  fn borrowed_twenty_days_ago_owes_five_days() {
    let p = LendingPolicy::default();
    let today = d(2024, 5, 21);
    let borrowed = d(2024, 5, 1);
    assert_eq!(p.fine_on(p.due_date(borrowed), today), 25);
  }

  #[test]
  fn fine_saturates_instead_of_overflowing() {
    let p = LendingPolicy { loan_days: 0, fine_per_day: u32::MAX };
    assert_eq!(p.fine_on(d(2000, 1, 1), d(2000, 1, 3)), u32::MAX);
  }
}
