//! Accession-number allocation.
//!
//! Must run inside a write transaction: the database write lock is the
//! serialization point that keeps two allocators from reading the same
//! maximum. The persisted high-water mark keeps numbers of deleted copies from
//! being reissued.

use rusqlite::{Connection, OptionalExtension as _};
use shelfmark_core::accession::{AccessionNumber, next_sequence};

use crate::{Error, Result};

/// Reserve `count` consecutive, never-before-issued accession numbers.
pub fn allocate(conn: &Connection, count: u32) -> Result<Vec<AccessionNumber>> {
  if count == 0 {
    return Ok(Vec::new());
  }

  let high_water: u64 = conn.query_row(
    "SELECT high_water FROM accession_sequence WHERE id = 1",
    [],
    |row| row.get(0),
  )?;

  let existing: Vec<String> = conn
    .prepare("SELECT accession_no FROM book_copies")?
    .query_map([], |row| row.get(0))?
    .collect::<rusqlite::Result<_>>()?;
  let copy_count = u64::try_from(existing.len()).unwrap_or(u64::MAX);

  let mut next = next_sequence(existing.iter().map(String::as_str), high_water, copy_count);
  let mut issued = Vec::with_capacity(count as usize);

  while issued.len() < count as usize {
    let candidate = AccessionNumber::from_sequence(next);
    next = next.saturating_add(1);
    if is_taken(conn, &candidate)? {
      continue;
    }
    issued.push(candidate);
  }

  let top = next.saturating_sub(1);
  conn.execute(
    "UPDATE accession_sequence SET high_water = ?1 WHERE id = 1 AND high_water < ?1",
    [top],
  )?;

  tracing::debug!(count, last = %AccessionNumber::from_sequence(top), "allocated accession numbers");
  Ok(issued)
}

fn is_taken(conn: &Connection, candidate: &AccessionNumber) -> Result<bool> {
  Ok(
    conn
      .query_row(
        "SELECT 1 FROM book_copies WHERE accession_no = ?1",
        [candidate.as_str()],
        |_| Ok(()),
      )
      .optional()?
      .is_some(),
  )
}

/// Map a UNIQUE violation on `book_copies.accession_no` to
/// [`Error::AccessionCollision`] so the caller can retry the unit of work.
pub fn classify_insert_error(e: rusqlite::Error, accession_no: &AccessionNumber) -> Error {
  match &e {
    rusqlite::Error::SqliteFailure(f, msg)
      if f.code == rusqlite::ErrorCode::ConstraintViolation
        && msg.as_deref().is_some_and(|m| m.contains("accession_no")) =>
    {
      Error::AccessionCollision(accession_no.to_string())
    }
    _ => Error::Sqlite(e),
  }
}
