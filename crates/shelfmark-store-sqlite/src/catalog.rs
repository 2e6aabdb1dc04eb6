//! Books and the copy registry.
//!
//! Every function taking a `&Connection` expects to run inside the write
//! transaction opened by [`crate::SqliteStore`], except the plain reads.

use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension as _};
use shelfmark_core::{
  Error as CoreError,
  accession::AccessionNumber,
  book::{Book, BookCreated, BookQuery, BookUpdate, BookUpdated, NewBook, check_copy_batch},
  copy::{BookCopy, CopyRemoved},
};
use uuid::Uuid;

use crate::{
  Error, Result, allocator,
  encode::{RawBook, RawCopy, encode_dt, encode_uuid},
  lending,
};

// ─── Books ───────────────────────────────────────────────────────────────────

pub fn load_book(conn: &Connection, book_id: Uuid) -> Result<Option<Book>> {
  let raw = conn
    .query_row(
      &format!("SELECT {} FROM books WHERE book_id = ?1", RawBook::COLUMNS),
      [encode_uuid(book_id)],
      RawBook::from_row,
    )
    .optional()?;
  raw.map(RawBook::into_book).transpose()
}

pub fn require_book(conn: &Connection, book_id: Uuid) -> Result<Book> {
  Ok(load_book(conn, book_id)?.ok_or_else(|| CoreError::book_not_found(book_id))?)
}

fn find_by_isbn(conn: &Connection, isbn: &str) -> Result<Option<Book>> {
  let raw = conn
    .query_row(
      &format!(
        "SELECT {} FROM books WHERE isbn = ?1 ORDER BY created_at LIMIT 1",
        RawBook::COLUMNS
      ),
      [isbn],
      RawBook::from_row,
    )
    .optional()?;
  raw.map(RawBook::into_book).transpose()
}

pub fn create_book(conn: &Connection, mut input: NewBook, now: DateTime<Utc>) -> Result<BookCreated> {
  input.validate()?;

  if let Some(book) = find_by_isbn(conn, &input.isbn)? {
    let accession_numbers = add_copies(conn, book.book_id, 1, now)?;
    tracing::debug!(book_id = %book.book_id, isbn = %input.isbn, "isbn already catalogued; added one copy");
    return Ok(BookCreated {
      book: require_book(conn, book.book_id)?,
      existing: true,
      accession_numbers,
    });
  }

  let book_id = Uuid::new_v4();
  conn.execute(
    "INSERT INTO books (
       book_id, title, author, isbn, category, publisher, description, image_ref,
       total_copies, available_copies, created_at
     ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, 0, 0, ?9)",
    rusqlite::params![
      encode_uuid(book_id),
      input.title,
      input.author,
      input.isbn,
      input.category,
      input.publisher,
      input.description,
      input.image_ref,
      encode_dt(now),
    ],
  )?;

  let accession_numbers = add_copies(conn, book_id, input.total_copies, now)?;
  tracing::debug!(%book_id, copies = input.total_copies, "catalogued new title");

  Ok(BookCreated { book: require_book(conn, book_id)?, existing: false, accession_numbers })
}

pub fn update_book(
  conn: &Connection,
  book_id: Uuid,
  update: BookUpdate,
  now: DateTime<Utc>,
) -> Result<BookUpdated> {
  update.validate()?;
  let book = require_book(conn, book_id)?;
  let to_add = update.copies_to_add(book.total_copies)?;

  conn.execute(
    "UPDATE books SET
       title       = COALESCE(?2, title),
       author      = COALESCE(?3, author),
       isbn        = COALESCE(?4, isbn),
       category    = COALESCE(?5, category),
       publisher   = CASE WHEN ?6 IS NULL THEN publisher ELSE NULLIF(?6, '') END,
       description = CASE WHEN ?7 IS NULL THEN description ELSE NULLIF(?7, '') END,
       image_ref   = CASE WHEN ?8 IS NULL THEN image_ref ELSE NULLIF(?8, '') END
     WHERE book_id = ?1",
    rusqlite::params![
      encode_uuid(book_id),
      update.title.as_deref().map(str::trim),
      update.author.as_deref().map(str::trim),
      update.isbn.as_deref().map(str::trim),
      update.category.as_deref().map(str::trim),
      update.publisher.as_deref().map(str::trim),
      update.description.as_deref().map(str::trim),
      update.image_ref.as_deref().map(str::trim),
    ],
  )?;

  let accession_numbers = add_copies(conn, book_id, to_add, now)?;
  Ok(BookUpdated { book: require_book(conn, book_id)?, accession_numbers })
}

pub fn delete_book(conn: &Connection, book_id: Uuid) -> Result<()> {
  let n = conn.execute("DELETE FROM books WHERE book_id = ?1", [encode_uuid(book_id)])?;
  if n == 0 {
    return Err(CoreError::book_not_found(book_id).into());
  }
  tracing::debug!(%book_id, "deleted title");
  Ok(())
}

pub fn delete_books(conn: &Connection, book_ids: &[Uuid]) -> Result<usize> {
  let mut stmt = conn.prepare("DELETE FROM books WHERE book_id = ?1")?;
  let mut deleted = 0;
  for id in book_ids {
    deleted += stmt.execute([encode_uuid(*id)])?;
  }
  Ok(deleted)
}

pub fn list_books(conn: &Connection, query: &BookQuery) -> Result<Vec<Book>> {
  let pattern = query
    .text
    .as_deref()
    .map(str::trim)
    .filter(|t| !t.is_empty())
    .map(|t| format!("%{t}%"));
  let limit = query.limit.map_or(-1, |l| i64::try_from(l).unwrap_or(i64::MAX));
  let offset = query.offset.map_or(0, |o| i64::try_from(o).unwrap_or(i64::MAX));

  let mut stmt = conn.prepare(&format!(
    "SELECT {} FROM books
     WHERE (?1 IS NULL
            OR title LIKE ?1 OR author LIKE ?1 OR category LIKE ?1
            OR isbn LIKE ?1 OR publisher LIKE ?1)
       AND (?2 = 0 OR available_copies > 0)
     ORDER BY title COLLATE NOCASE, created_at
     LIMIT ?3 OFFSET ?4",
    RawBook::COLUMNS
  ))?;
  let raws = stmt
    .query_map(
      rusqlite::params![pattern, query.available_only, limit, offset],
      RawBook::from_row,
    )?
    .collect::<rusqlite::Result<Vec<_>>>()?;
  raws.into_iter().map(RawBook::into_book).collect()
}

// ─── Copy registry ───────────────────────────────────────────────────────────

/// Register `count` copies and grow both counters by the same amount.
pub fn add_copies(
  conn: &Connection,
  book_id: Uuid,
  count: u32,
  now: DateTime<Utc>,
) -> Result<Vec<AccessionNumber>> {
  check_copy_batch(count)?;
  require_book(conn, book_id)?;
  let numbers = allocator::allocate(conn, count)?;
  if numbers.is_empty() {
    return Ok(numbers);
  }

  let book_id_str = encode_uuid(book_id);
  let created_at = encode_dt(now);
  let mut insert = conn.prepare(
    "INSERT INTO book_copies (copy_id, book_id, accession_no, created_at)
     VALUES (?1, ?2, ?3, ?4)",
  )?;
  for number in &numbers {
    insert
      .execute(rusqlite::params![
        encode_uuid(Uuid::new_v4()),
        book_id_str,
        number.as_str(),
        created_at,
      ])
      .map_err(|e| allocator::classify_insert_error(e, number))?;
  }

  conn.execute(
    "UPDATE books
        SET total_copies = total_copies + ?2,
            available_copies = available_copies + ?2
      WHERE book_id = ?1",
    rusqlite::params![book_id_str, count],
  )?;

  Ok(numbers)
}

pub fn load_copy(conn: &Connection, copy_id: Uuid) -> Result<Option<BookCopy>> {
  let raw = conn
    .query_row(
      &format!("{} WHERE c.copy_id = ?1", RawCopy::SELECT),
      [encode_uuid(copy_id)],
      RawCopy::from_row,
    )
    .optional()?;
  raw.map(RawCopy::into_copy).transpose()
}

pub fn require_copy(conn: &Connection, copy_id: Uuid) -> Result<BookCopy> {
  Ok(load_copy(conn, copy_id)?.ok_or_else(|| CoreError::copy_not_found(copy_id))?)
}

pub fn copy_by_accession(conn: &Connection, accession_no: &AccessionNumber) -> Result<Option<BookCopy>> {
  let raw = conn
    .query_row(
      &format!("{} WHERE c.accession_no = ?1", RawCopy::SELECT),
      [accession_no.as_str()],
      RawCopy::from_row,
    )
    .optional()?;
  raw.map(RawCopy::into_copy).transpose()
}

pub fn require_copy_by_accession(conn: &Connection, accession_no: &AccessionNumber) -> Result<BookCopy> {
  Ok(
    copy_by_accession(conn, accession_no)?
      .ok_or_else(|| CoreError::not_found("copy", accession_no))?,
  )
}

pub fn list_copies(conn: &Connection, book_id: Uuid) -> Result<Vec<BookCopy>> {
  let mut stmt =
    conn.prepare(&format!("{} WHERE c.book_id = ?1 ORDER BY c.accession_no", RawCopy::SELECT))?;
  let raws = stmt
    .query_map([encode_uuid(book_id)], RawCopy::from_row)?
    .collect::<rusqlite::Result<Vec<_>>>()?;
  raws.into_iter().map(RawCopy::into_copy).collect()
}

/// Delete a copy whatever its loan state. The loan check happens before the
/// delete, since the cascade removes the very record it looks for.
pub fn remove_copy(conn: &Connection, copy_id: Uuid) -> Result<CopyRemoved> {
  let copy = require_copy(conn, copy_id)?;
  let was_on_loan = lending::open_loan_for_copy(conn, copy_id)?.is_some();

  conn.execute("DELETE FROM book_copies WHERE copy_id = ?1", [encode_uuid(copy_id)])?;
  conn
    .execute(
      "UPDATE books
          SET total_copies = total_copies - 1,
              available_copies = available_copies - ?2
        WHERE book_id = ?1",
      rusqlite::params![encode_uuid(copy.book_id), if was_on_loan { 0 } else { 1 }],
    )
    .map_err(|e| counter_drift(e, copy.book_id))?;

  let book = require_book(conn, copy.book_id)?;
  tracing::debug!(%copy_id, accession_no = %copy.accession_no, was_on_loan, "removed copy");

  Ok(CopyRemoved {
    book_id: book.book_id,
    was_on_loan,
    total_copies: book.total_copies,
    available_copies: book.available_copies,
  })
}

// ─── Counters ────────────────────────────────────────────────────────────────

/// Take one copy off the shelf. Fails if the counter is already zero.
pub fn take_off_shelf(conn: &Connection, book_id: Uuid) -> Result<()> {
  let n = conn.execute(
    "UPDATE books SET available_copies = available_copies - 1
      WHERE book_id = ?1 AND available_copies > 0",
    [encode_uuid(book_id)],
  )?;
  if n != 1 {
    return Err(
      CoreError::Integrity(format!("available_copies of book {book_id} would go negative")).into(),
    );
  }
  Ok(())
}

/// Put one copy back on the shelf.
pub fn put_on_shelf(conn: &Connection, book_id: Uuid) -> Result<()> {
  conn
    .execute(
      "UPDATE books SET available_copies = available_copies + 1 WHERE book_id = ?1",
      [encode_uuid(book_id)],
    )
    .map_err(|e| counter_drift(e, book_id))?;
  Ok(())
}

/// CHECK-constraint failures on the counters mean the bookkeeping drifted.
fn counter_drift(e: rusqlite::Error, book_id: Uuid) -> Error {
  match &e {
    rusqlite::Error::SqliteFailure(f, _) if f.code == rusqlite::ErrorCode::ConstraintViolation => {
      CoreError::Integrity(format!("copy counters of book {book_id} out of range")).into()
    }
    _ => Error::Sqlite(e),
  }
}
