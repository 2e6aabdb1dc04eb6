//! The overdue-fine sweep.

use rusqlite::Connection;
use shelfmark_core::{fine::SweepReport, notification::overdue_message};

use crate::{
  Result, broker,
  encode::{RawBorrow, encode_uuid},
  lending::Ctx,
};

/// Raise the stored fine of every open loan to what the policy says it owes
/// today, notifying the borrower each time it goes up. A second run on the
/// same day finds nothing to raise.
pub fn sweep(conn: &Connection, ctx: Ctx) -> Result<SweepReport> {
  let open: Vec<(RawBorrow, String)> = conn
    .prepare(&format!(
      "SELECT {}, bk.title
         FROM borrow_records b
         JOIN book_copies c ON c.copy_id = b.copy_id
         JOIN books bk      ON bk.book_id = c.book_id
        WHERE b.returned = 0",
      RawBorrow::COLUMNS_B
    ))?
    .query_map([], |row| Ok((RawBorrow::from_row(row)?, row.get(8)?)))?
    .collect::<rusqlite::Result<_>>()?;

  let mut report = SweepReport { examined: open.len(), fined: 0 };
  for (raw, title) in open {
    let borrow = raw.into_borrow()?;
    let owed = ctx.policy.fine_on(borrow.due_on, ctx.today);
    if owed <= borrow.fine {
      continue;
    }

    // Guarded so a fine that was raised meanwhile is never lowered.
    let n = conn.execute(
      "UPDATE borrow_records SET fine = ?2
        WHERE borrow_id = ?1 AND returned = 0 AND fine < ?2",
      rusqlite::params![encode_uuid(borrow.borrow_id), owed],
    )?;
    if n == 1 {
      broker::insert_notification(conn, borrow.member_id, &overdue_message(&title, owed), ctx.now)?;
      report.fined += 1;
    }
  }

  Ok(report)
}
