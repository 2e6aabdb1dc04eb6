//! Physical copies of a catalogued title.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::accession::AccessionNumber;

/// One physical copy, owned exclusively by its [`Book`](crate::book::Book).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookCopy {
  pub copy_id:      Uuid,
  pub book_id:      Uuid,
  pub accession_no: AccessionNumber,
  pub created_at:   DateTime<Utc>,
  /// Whether an unreturned borrow record exists for this copy. Computed on
  /// read.
  pub on_loan:      bool,
}

/// Outcome of [`crate::store::LibraryStore::remove_copy`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CopyRemoved {
  pub book_id:          Uuid,
  /// The copy had an open loan, so `available_copies` was left alone.
  pub was_on_loan:      bool,
  pub total_copies:     u32,
  pub available_copies: u32,
}
