//! Borrow requests, loans, and the lifecycle that ties them together.
//!
//! A loan attempt is persisted as two records: a [`BookRequest`] that moves
//! one-way out of `Pending`, and, once approved, a [`BorrowRecord`] that
//! moves one-way from open to returned. [`LoanStage`] is the single view of
//! where a loan currently stands.

use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use uuid::Uuid;

use crate::{Error, book::Book, fine::overdue_days};

// ─── Requests ────────────────────────────────────────────────────────────────

#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum RequestStatus {
  Pending,
  Approved,
  Rejected,
}

impl RequestStatus {
  pub fn is_terminal(self) -> bool { !matches!(self, Self::Pending) }
}

/// An admin's verdict on a pending request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum Decision {
  Approved,
  Rejected,
}

impl FromStr for Decision {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "APPROVED" => Ok(Self::Approved),
      "REJECTED" => Ok(Self::Rejected),
      other => Err(Error::Validation(format!(
        "status must be APPROVED or REJECTED, got {other:?}"
      ))),
    }
  }
}

impl From<Decision> for RequestStatus {
  fn from(d: Decision) -> Self {
    match d {
      Decision::Approved => Self::Approved,
      Decision::Rejected => Self::Rejected,
    }
  }
}

/// A member's request to borrow one specific copy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookRequest {
  pub request_id:    Uuid,
  pub member_id:     Uuid,
  pub copy_id:       Uuid,
  pub requested_on:  NaiveDate,
  pub status:        RequestStatus,
  pub admin_comment: Option<String>,
}

/// Parameters for [`crate::store::LibraryStore::list_requests`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RequestQuery {
  pub member_id: Option<Uuid>,
  pub status:    Option<RequestStatus>,
}

/// Outcome of [`crate::store::LibraryStore::decide_request`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Decided {
  pub request: BookRequest,
  /// Present when the request was approved.
  pub borrow:  Option<BorrowRecord>,
}

// ─── Loans ───────────────────────────────────────────────────────────────────

/// A loan of one copy to one member.
///
/// `due_on` is fixed when the loan is created and is never rewritten;
/// `returned_on` is set exactly once, together with `returned`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BorrowRecord {
  pub borrow_id:   Uuid,
  pub member_id:   Uuid,
  pub copy_id:     Uuid,
  pub borrowed_on: NaiveDate,
  pub due_on:      NaiveDate,
  pub returned:    bool,
  pub returned_on: Option<NaiveDate>,
  /// Accrued fine. Non-decreasing while open, frozen once returned.
  pub fine:        u32,
}

impl BorrowRecord {
  pub fn stage(&self, today: NaiveDate) -> LoanStage {
    match self.returned_on {
      Some(on) => LoanStage::Returned { on, late_days: overdue_days(self.due_on, on) },
      None => match overdue_days(self.due_on, today) {
        0 => LoanStage::OnLoan { due_on: self.due_on },
        days => LoanStage::Overdue { days, fine: self.fine },
      },
    }
  }
}

/// Where a loan stands on a given day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "stage", rename_all = "snake_case")]
pub enum LoanStage {
  OnLoan { due_on: NaiveDate },
  Overdue { days: u32, fine: u32 },
  Returned { on: NaiveDate, late_days: u32 },
}

/// Parameters for [`crate::store::LibraryStore::list_borrows`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BorrowQuery {
  pub member_id: Option<Uuid>,
  /// Only loans that have not been returned.
  #[serde(default)]
  pub open_only: bool,
}

/// Outcome of [`crate::store::LibraryStore::direct_issue`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeskIssue {
  pub request: BookRequest,
  pub borrow:  BorrowRecord,
  pub book:    Book,
}

/// Outcome of a return, by id or at the desk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Returned {
  pub borrow:        BorrowRecord,
  pub book:          Book,
  /// Availability notifications produced by this return.
  pub notifications: usize,
}

/// A loan joined with what the member needs to see about it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoanView {
  pub borrow:       BorrowRecord,
  pub stage:        LoanStage,
  pub title:        String,
  pub accession_no: String,
}

#[cfg(test)]
mod tests {
  use super::*;

  fn d(m: u32, day: u32) -> NaiveDate { NaiveDate::from_ymd_opt(2024, m, day).unwrap() }

  fn record() -> BorrowRecord {
    BorrowRecord {
      borrow_id:   Uuid::new_v4(),
      member_id:   Uuid::new_v4(),
      copy_id:     Uuid::new_v4(),
      borrowed_on: d(4, 1),
      due_on:      d(4, 16),
      returned:    false,
      returned_on: None,
      fine:        0,
    }
  }

  #[test]
  fn decision_rejects_anything_but_the_two_verdicts() {
    assert_eq!("APPROVED".parse::<Decision>().unwrap(), Decision::Approved);
    assert_eq!("REJECTED".parse::<Decision>().unwrap(), Decision::Rejected);
    assert!(matches!("PENDING".parse::<Decision>(), Err(Error::Validation(_))));
    assert!(matches!("approved".parse::<Decision>(), Err(Error::Validation(_))));
  }

  #[test]
  fn stage_follows_the_due_date() {
    let mut r = record();
    assert_eq!(r.stage(d(4, 16)), LoanStage::OnLoan { due_on: d(4, 16) });

    r.fine = 15;
    assert_eq!(r.stage(d(4, 19)), LoanStage::Overdue { days: 3, fine: 15 });

    r.returned = true;
    r.returned_on = Some(d(4, 18));
    assert_eq!(r.stage(d(5, 30)), LoanStage::Returned { on: d(4, 18), late_days: 2 });
  }

  #[test]
  fn only_pending_is_open() {
    assert!(!RequestStatus::Pending.is_terminal());
    assert!(RequestStatus::Approved.is_terminal());
    assert!(RequestStatus::Rejected.is_terminal());
  }
}
