//! Encoding and decoding helpers between Shelfmark domain types and the
//! plain-text representations stored in SQLite columns.
//!
//! Timestamps are RFC 3339 strings, calendar dates `YYYY-MM-DD`, UUIDs
//! hyphenated lowercase strings, enums their upper-case names.

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::Row;
use shelfmark_core::{
  accession::AccessionNumber,
  book::Book,
  copy::BookCopy,
  identity::{Member, Role},
  lending::{BookRequest, BorrowRecord, RequestStatus},
  notification::{BookNotificationRequest, Notification},
};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Scalars ─────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

pub fn encode_date(d: NaiveDate) -> String { d.format("%Y-%m-%d").to_string() }

pub fn decode_date(s: &str) -> Result<NaiveDate> {
  NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|e| Error::DateParse(format!("{s:?}: {e}")))
}

pub fn decode_role(s: &str) -> Result<Role> {
  s.parse().map_err(|_| Error::Decode(format!("unknown role: {s:?}")))
}

pub fn decode_status(s: &str) -> Result<RequestStatus> {
  s.parse().map_err(|_| Error::Decode(format!("unknown request status: {s:?}")))
}

// ─── Row types ───────────────────────────────────────────────────────────────
//
// Each `COLUMNS` constant lists the columns its `from_row` expects, in order,
// so queries can splice them in with an optional table alias prefix.

/// Raw strings read directly from a `members` row.
pub struct RawMember {
  pub member_id:     String,
  pub username:      String,
  pub role:          String,
  pub registered_at: String,
}

impl RawMember {
  pub const COLUMNS: &'static str = "member_id, username, role, registered_at";

  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      member_id:     row.get(0)?,
      username:      row.get(1)?,
      role:          row.get(2)?,
      registered_at: row.get(3)?,
    })
  }

  pub fn into_member(self) -> Result<Member> {
    Ok(Member {
      member_id:     decode_uuid(&self.member_id)?,
      username:      self.username,
      role:          decode_role(&self.role)?,
      registered_at: decode_dt(&self.registered_at)?,
    })
  }
}

/// Raw values read directly from a `books` row.
pub struct RawBook {
  pub book_id:          String,
  pub title:            String,
  pub author:           String,
  pub isbn:             String,
  pub category:         String,
  pub publisher:        Option<String>,
  pub description:      Option<String>,
  pub image_ref:        Option<String>,
  pub total_copies:     u32,
  pub available_copies: u32,
  pub created_at:       String,
}

impl RawBook {
  pub const COLUMNS: &'static str = "book_id, title, author, isbn, category, publisher, \
     description, image_ref, total_copies, available_copies, created_at";

  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      book_id:          row.get(0)?,
      title:            row.get(1)?,
      author:           row.get(2)?,
      isbn:             row.get(3)?,
      category:         row.get(4)?,
      publisher:        row.get(5)?,
      description:      row.get(6)?,
      image_ref:        row.get(7)?,
      total_copies:     row.get(8)?,
      available_copies: row.get(9)?,
      created_at:       row.get(10)?,
    })
  }

  pub fn into_book(self) -> Result<Book> {
    Ok(Book {
      book_id:          decode_uuid(&self.book_id)?,
      title:            self.title,
      author:           self.author,
      isbn:             self.isbn,
      category:         self.category,
      publisher:        self.publisher,
      description:      self.description,
      image_ref:        self.image_ref,
      total_copies:     self.total_copies,
      available_copies: self.available_copies,
      created_at:       decode_dt(&self.created_at)?,
    })
  }
}

/// A `book_copies` row plus its computed loan flag.
pub struct RawCopy {
  pub copy_id:      String,
  pub book_id:      String,
  pub accession_no: String,
  pub created_at:   String,
  pub on_loan:      bool,
}

impl RawCopy {
  /// Selects from `book_copies c`.
  pub const SELECT: &'static str = "SELECT c.copy_id, c.book_id, c.accession_no, c.created_at,
            EXISTS (SELECT 1 FROM borrow_records r
                    WHERE r.copy_id = c.copy_id AND r.returned = 0)
       FROM book_copies c";

  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      copy_id:      row.get(0)?,
      book_id:      row.get(1)?,
      accession_no: row.get(2)?,
      created_at:   row.get(3)?,
      on_loan:      row.get(4)?,
    })
  }

  pub fn into_copy(self) -> Result<BookCopy> {
    Ok(BookCopy {
      copy_id:      decode_uuid(&self.copy_id)?,
      book_id:      decode_uuid(&self.book_id)?,
      accession_no: AccessionNumber::from_stored(self.accession_no),
      created_at:   decode_dt(&self.created_at)?,
      on_loan:      self.on_loan,
    })
  }
}

/// Raw values read directly from a `book_requests` row.
pub struct RawRequest {
  pub request_id:    String,
  pub member_id:     String,
  pub copy_id:       String,
  pub requested_on:  String,
  pub status:        String,
  pub admin_comment: Option<String>,
}

impl RawRequest {
  pub const COLUMNS: &'static str =
    "request_id, member_id, copy_id, requested_on, status, admin_comment";

  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      request_id:    row.get(0)?,
      member_id:     row.get(1)?,
      copy_id:       row.get(2)?,
      requested_on:  row.get(3)?,
      status:        row.get(4)?,
      admin_comment: row.get(5)?,
    })
  }

  pub fn into_request(self) -> Result<BookRequest> {
    Ok(BookRequest {
      request_id:    decode_uuid(&self.request_id)?,
      member_id:     decode_uuid(&self.member_id)?,
      copy_id:       decode_uuid(&self.copy_id)?,
      requested_on:  decode_date(&self.requested_on)?,
      status:        decode_status(&self.status)?,
      admin_comment: self.admin_comment,
    })
  }
}

/// Raw values read directly from a `borrow_records` row.
pub struct RawBorrow {
  pub borrow_id:   String,
  pub member_id:   String,
  pub copy_id:     String,
  pub borrowed_on: String,
  pub due_on:      String,
  pub returned:    bool,
  pub returned_on: Option<String>,
  pub fine:        u32,
}

impl RawBorrow {
  pub const COLUMNS: &'static str =
    "borrow_id, member_id, copy_id, borrowed_on, due_on, returned, returned_on, fine";

  /// [`Self::COLUMNS`] qualified with the `b.` alias.
  pub const COLUMNS_B: &'static str = "b.borrow_id, b.member_id, b.copy_id, b.borrowed_on, \
     b.due_on, b.returned, b.returned_on, b.fine";

  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      borrow_id:   row.get(0)?,
      member_id:   row.get(1)?,
      copy_id:     row.get(2)?,
      borrowed_on: row.get(3)?,
      due_on:      row.get(4)?,
      returned:    row.get(5)?,
      returned_on: row.get(6)?,
      fine:        row.get(7)?,
    })
  }

  pub fn into_borrow(self) -> Result<BorrowRecord> {
    Ok(BorrowRecord {
      borrow_id:   decode_uuid(&self.borrow_id)?,
      member_id:   decode_uuid(&self.member_id)?,
      copy_id:     decode_uuid(&self.copy_id)?,
      borrowed_on: decode_date(&self.borrowed_on)?,
      due_on:      decode_date(&self.due_on)?,
      returned:    self.returned,
      returned_on: self.returned_on.as_deref().map(decode_date).transpose()?,
      fine:        self.fine,
    })
  }
}

/// Raw values read directly from a `book_notification_requests` row.
pub struct RawWatch {
  pub watch_id:   String,
  pub member_id:  String,
  pub book_id:    String,
  pub notified:   bool,
  pub created_at: String,
}

impl RawWatch {
  pub const COLUMNS: &'static str = "watch_id, member_id, book_id, notified, created_at";

  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      watch_id:   row.get(0)?,
      member_id:  row.get(1)?,
      book_id:    row.get(2)?,
      notified:   row.get(3)?,
      created_at: row.get(4)?,
    })
  }

  pub fn into_watch(self) -> Result<BookNotificationRequest> {
    Ok(BookNotificationRequest {
      watch_id:   decode_uuid(&self.watch_id)?,
      member_id:  decode_uuid(&self.member_id)?,
      book_id:    decode_uuid(&self.book_id)?,
      notified:   self.notified,
      created_at: decode_dt(&self.created_at)?,
    })
  }
}

/// Raw values read directly from a `notifications` row.
pub struct RawNotification {
  pub notification_id: String,
  pub member_id:       String,
  pub message:         String,
  pub is_read:         bool,
  pub created_at:      String,
}

impl RawNotification {
  pub const COLUMNS: &'static str = "notification_id, member_id, message, is_read, created_at";

  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      notification_id: row.get(0)?,
      member_id:       row.get(1)?,
      message:         row.get(2)?,
      is_read:         row.get(3)?,
      created_at:      row.get(4)?,
    })
  }

  pub fn into_notification(self) -> Result<Notification> {
    Ok(Notification {
      notification_id: decode_uuid(&self.notification_id)?,
      member_id:       decode_uuid(&self.member_id)?,
      message:         self.message,
      read:            self.is_read,
      created_at:      decode_dt(&self.created_at)?,
    })
  }
}
