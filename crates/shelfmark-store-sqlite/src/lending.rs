//! The request → approve → borrow → return state machine.
//!
//! Each public function is one unit of work and must be called inside a write
//! transaction; the checks it performs (open loans, counters, request status)
//! are only meaningful while the write lock is held.

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{Connection, OptionalExtension as _};
use shelfmark_core::{
  Error as CoreError,
  accession::AccessionNumber,
  fine::LendingPolicy,
  lending::{
    BookRequest, BorrowQuery, BorrowRecord, Decided, Decision, DeskIssue, LoanView,
    RequestQuery, RequestStatus, Returned,
  },
};
use uuid::Uuid;

use crate::{
  Result, broker, catalog,
  encode::{RawBorrow, RawRequest, encode_date, encode_dt, encode_uuid},
  members,
};

/// Comment recorded on requests created by [`direct_issue`].
pub const DESK_COMMENT: &str = "Issued at the desk.";

/// Dates and policy captured before the transaction starts.
#[derive(Debug, Clone, Copy)]
pub struct Ctx {
  pub today:  NaiveDate,
  pub now:    DateTime<Utc>,
  pub policy: LendingPolicy,
}

// ─── Reads ───────────────────────────────────────────────────────────────────

pub fn load_request(conn: &Connection, request_id: Uuid) -> Result<Option<BookRequest>> {
  let raw = conn
    .query_row(
      &format!("SELECT {} FROM book_requests WHERE request_id = ?1", RawRequest::COLUMNS),
      [encode_uuid(request_id)],
      RawRequest::from_row,
    )
    .optional()?;
  raw.map(RawRequest::into_request).transpose()
}

pub fn list_requests(conn: &Connection, query: &RequestQuery) -> Result<Vec<BookRequest>> {
  let mut stmt = conn.prepare(&format!(
    "SELECT {} FROM book_requests
     WHERE (?1 IS NULL OR member_id = ?1)
       AND (?2 IS NULL OR status = ?2)
     ORDER BY created_at DESC, rowid DESC",
    RawRequest::COLUMNS
  ))?;
  let raws = stmt
    .query_map(
      rusqlite::params![
        query.member_id.map(encode_uuid),
        query.status.map(|s| s.to_string()),
      ],
      RawRequest::from_row,
    )?
    .collect::<rusqlite::Result<Vec<_>>>()?;
  raws.into_iter().map(RawRequest::into_request).collect()
}

pub fn load_borrow(conn: &Connection, borrow_id: Uuid) -> Result<Option<BorrowRecord>> {
  let raw = conn
    .query_row(
      &format!("SELECT {} FROM borrow_records WHERE borrow_id = ?1", RawBorrow::COLUMNS),
      [encode_uuid(borrow_id)],
      RawBorrow::from_row,
    )
    .optional()?;
  raw.map(RawBorrow::into_borrow).transpose()
}

/// The unreturned record for a copy, if any. At most one exists.
pub fn open_loan_for_copy(conn: &Connection, copy_id: Uuid) -> Result<Option<BorrowRecord>> {
  let raw = conn
    .query_row(
      &format!(
        "SELECT {} FROM borrow_records WHERE copy_id = ?1 AND returned = 0",
        RawBorrow::COLUMNS
      ),
      [encode_uuid(copy_id)],
      RawBorrow::from_row,
    )
    .optional()?;
  raw.map(RawBorrow::into_borrow).transpose()
}

pub fn list_borrows(conn: &Connection, query: &BorrowQuery, today: NaiveDate) -> Result<Vec<LoanView>> {
  let mut stmt = conn.prepare(&format!(
    "SELECT {}, bk.title, c.accession_no
       FROM borrow_records b
       JOIN book_copies c ON c.copy_id = b.copy_id
       JOIN books bk      ON bk.book_id = c.book_id
      WHERE (?1 IS NULL OR b.member_id = ?1)
        AND (?2 = 0 OR b.returned = 0)
      ORDER BY b.created_at DESC, b.rowid DESC",
    RawBorrow::COLUMNS_B
  ))?;
  let rows = stmt
    .query_map(
      rusqlite::params![query.member_id.map(encode_uuid), query.open_only],
      |row| Ok((RawBorrow::from_row(row)?, row.get::<_, String>(8)?, row.get::<_, String>(9)?)),
    )?
    .collect::<rusqlite::Result<Vec<_>>>()?;

  rows
    .into_iter()
    .map(|(raw, title, accession_no)| {
      let borrow = raw.into_borrow()?;
      Ok(LoanView { stage: borrow.stage(today), borrow, title, accession_no })
    })
    .collect()
}

// ─── Writes ──────────────────────────────────────────────────────────────────

pub fn create_request(
  conn: &Connection,
  member_id: Uuid,
  copy_id: Uuid,
  ctx: Ctx,
) -> Result<BookRequest> {
  members::require_borrower(conn, member_id)?;
  let copy = catalog::require_copy(conn, copy_id)?;
  if copy.on_loan {
    return Err(
      CoreError::Conflict(format!("copy {} is already borrowed", copy.accession_no)).into(),
    );
  }

  let request = BookRequest {
    request_id: Uuid::new_v4(),
    member_id,
    copy_id,
    requested_on: ctx.today,
    status: RequestStatus::Pending,
    admin_comment: None,
  };
  insert_request(conn, &request, ctx.now)?;
  tracing::debug!(request_id = %request.request_id, %member_id, accession_no = %copy.accession_no, "request filed");
  Ok(request)
}

pub fn decide_request(
  conn: &Connection,
  request_id: Uuid,
  decision: Decision,
  comment: Option<String>,
  ctx: Ctx,
) -> Result<Decided> {
  let mut request = load_request(conn, request_id)?
    .ok_or_else(|| CoreError::not_found("request", request_id))?;
  if request.status.is_terminal() {
    return Err(
      CoreError::Conflict(format!("request {request_id} was already {}", request.status)).into(),
    );
  }

  let borrow = match decision {
    Decision::Rejected => None,
    Decision::Approved => {
      let copy = catalog::require_copy(conn, request.copy_id)?;
      let book = catalog::require_book(conn, copy.book_id)?;
      if book.available_copies < 1 {
        return Err(
          CoreError::Conflict(format!("no available copies of '{}'", book.title)).into(),
        );
      }
      if copy.on_loan {
        return Err(
          CoreError::Conflict(format!("copy {} is already borrowed", copy.accession_no)).into(),
        );
      }
      let borrow = open_loan(conn, request.member_id, copy.copy_id, ctx)?;
      catalog::take_off_shelf(conn, book.book_id)?;
      Some(borrow)
    }
  };

  let n = conn.execute(
    "UPDATE book_requests SET status = ?2, admin_comment = ?3
      WHERE request_id = ?1 AND status = 'PENDING'",
    rusqlite::params![encode_uuid(request_id), RequestStatus::from(decision).to_string(), comment],
  )?;
  if n != 1 {
    return Err(CoreError::Integrity(format!("request {request_id} changed underneath us")).into());
  }

  request.status = decision.into();
  request.admin_comment = comment;
  tracing::debug!(%request_id, %decision, "request decided");
  Ok(Decided { request, borrow })
}

pub fn return_copy(conn: &Connection, borrow_id: Uuid, ctx: Ctx) -> Result<Returned> {
  let borrow = load_borrow(conn, borrow_id)?
    .ok_or_else(|| CoreError::not_found("borrow record", borrow_id))?;
  close_loan(conn, borrow, ctx)
}

pub fn direct_issue(
  conn: &Connection,
  member_id: Uuid,
  accession_no: &AccessionNumber,
  ctx: Ctx,
) -> Result<DeskIssue> {
  members::require_borrower(conn, member_id)?;
  let copy = catalog::require_copy_by_accession(conn, accession_no)?;
  if copy.on_loan {
    return Err(CoreError::Conflict(format!("copy {accession_no} is already borrowed")).into());
  }

  let book = catalog::require_book(conn, copy.book_id)?;
  if book.available_copies == 0 {
    // No open loan on this copy, yet the counter says nothing is on the
    // shelf: the counters drifted. Refuse rather than go negative.
    tracing::warn!(book_id = %book.book_id, %accession_no, "available_copies is 0 for a copy with no open loan");
    return Err(
      CoreError::Conflict(format!("no available copies of '{}' are recorded", book.title)).into(),
    );
  }

  let request = BookRequest {
    request_id: Uuid::new_v4(),
    member_id,
    copy_id: copy.copy_id,
    requested_on: ctx.today,
    status: RequestStatus::Approved,
    admin_comment: Some(DESK_COMMENT.to_owned()),
  };
  insert_request(conn, &request, ctx.now)?;
  let borrow = open_loan(conn, member_id, copy.copy_id, ctx)?;
  catalog::take_off_shelf(conn, book.book_id)?;

  tracing::debug!(%member_id, %accession_no, borrow_id = %borrow.borrow_id, "issued at the desk");
  Ok(DeskIssue { request, borrow, book: catalog::require_book(conn, book.book_id)? })
}

pub fn direct_return(
  conn: &Connection,
  member_id: Uuid,
  accession_no: &AccessionNumber,
  ctx: Ctx,
) -> Result<Returned> {
  members::load(conn, member_id)?.ok_or_else(|| CoreError::member_not_found(member_id))?;
  let copy = catalog::require_copy_by_accession(conn, accession_no)?;

  let raw = conn
    .query_row(
      &format!(
        "SELECT {} FROM borrow_records
          WHERE member_id = ?1 AND copy_id = ?2 AND returned = 0",
        RawBorrow::COLUMNS
      ),
      [encode_uuid(member_id), encode_uuid(copy.copy_id)],
      RawBorrow::from_row,
    )
    .optional()?;
  let borrow = raw.map(RawBorrow::into_borrow).transpose()?.ok_or_else(|| {
    CoreError::not_found("open loan", format!("{accession_no} for member {member_id}"))
  })?;

  close_loan(conn, borrow, ctx)
}

// ─── Helpers ─────────────────────────────────────────────────────────────────

fn insert_request(conn: &Connection, request: &BookRequest, now: DateTime<Utc>) -> Result<()> {
  conn.execute(
    "INSERT INTO book_requests (
       request_id, member_id, copy_id, requested_on, status, admin_comment, created_at
     ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
    rusqlite::params![
      encode_uuid(request.request_id),
      encode_uuid(request.member_id),
      encode_uuid(request.copy_id),
      encode_date(request.requested_on),
      request.status.to_string(),
      request.admin_comment,
      encode_dt(now),
    ],
  )?;
  Ok(())
}

fn open_loan(conn: &Connection, member_id: Uuid, copy_id: Uuid, ctx: Ctx) -> Result<BorrowRecord> {
  let borrow = BorrowRecord {
    borrow_id: Uuid::new_v4(),
    member_id,
    copy_id,
    borrowed_on: ctx.today,
    due_on: ctx.policy.due_date(ctx.today),
    returned: false,
    returned_on: None,
    fine: 0,
  };
  conn.execute(
    "INSERT INTO borrow_records (
       borrow_id, member_id, copy_id, borrowed_on, due_on, returned, fine, created_at
     ) VALUES (?1, ?2, ?3, ?4, ?5, 0, 0, ?6)",
    rusqlite::params![
      encode_uuid(borrow.borrow_id),
      encode_uuid(member_id),
      encode_uuid(copy_id),
      encode_date(borrow.borrowed_on),
      encode_date(borrow.due_on),
      encode_dt(ctx.now),
    ],
  )?;
  Ok(borrow)
}

/// Mark a loan returned, put the copy back on the shelf and tell anyone
/// waiting for the title. The fine stays whatever the last sweep left; a
/// returned record is never fined again.
fn close_loan(conn: &Connection, mut borrow: BorrowRecord, ctx: Ctx) -> Result<Returned> {
  if borrow.returned {
    return Err(
      CoreError::Conflict(format!("borrow record {} is already returned", borrow.borrow_id)).into(),
    );
  }

  let n = conn.execute(
    "UPDATE borrow_records SET returned = 1, returned_on = ?2
      WHERE borrow_id = ?1 AND returned = 0",
    rusqlite::params![encode_uuid(borrow.borrow_id), encode_date(ctx.today)],
  )?;
  if n != 1 {
    return Err(
      CoreError::Integrity(format!("borrow record {} changed underneath us", borrow.borrow_id))
        .into(),
    );
  }
  borrow.returned = true;
  borrow.returned_on = Some(ctx.today);

  let copy = catalog::require_copy(conn, borrow.copy_id)?;
  catalog::put_on_shelf(conn, copy.book_id)?;
  let book = catalog::require_book(conn, copy.book_id)?;
  let notifications = broker::on_availability_increase(conn, &book, ctx.now)?;

  tracing::debug!(borrow_id = %borrow.borrow_id, accession_no = %copy.accession_no, fine = borrow.fine, notifications, "copy returned");
  Ok(Returned { borrow, book, notifications })
}
