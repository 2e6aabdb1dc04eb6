//! Availability watches and the member inbox.

use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension as _};
use shelfmark_core::{
  Error as CoreError,
  book::Book,
  notification::{BookNotificationRequest, Notification, available_message},
};
use uuid::Uuid;

use crate::{
  Result, catalog,
  encode::{RawNotification, RawWatch, decode_uuid, encode_dt, encode_uuid},
  members,
};

// ─── Watches ─────────────────────────────────────────────────────────────────

pub fn request_notification(
  conn: &Connection,
  member_id: Uuid,
  book_id: Uuid,
  now: DateTime<Utc>,
) -> Result<BookNotificationRequest> {
  members::require_borrower(conn, member_id)?;
  catalog::require_book(conn, book_id)?;

  let duplicate = conn
    .query_row(
      "SELECT 1 FROM book_notification_requests WHERE member_id = ?1 AND book_id = ?2",
      [encode_uuid(member_id), encode_uuid(book_id)],
      |_| Ok(()),
    )
    .optional()?
    .is_some();
  if duplicate {
    return Err(
      CoreError::Conflict(format!("member {member_id} is already watching book {book_id}"))
        .into(),
    );
  }

  let watch = BookNotificationRequest {
    watch_id: Uuid::new_v4(),
    member_id,
    book_id,
    notified: false,
    created_at: now,
  };
  conn.execute(
    "INSERT INTO book_notification_requests (watch_id, member_id, book_id, notified, created_at)
     VALUES (?1, ?2, ?3, 0, ?4)",
    rusqlite::params![
      encode_uuid(watch.watch_id),
      encode_uuid(member_id),
      encode_uuid(book_id),
      encode_dt(now),
    ],
  )?;
  Ok(watch)
}

/// Notify every outstanding watcher of `book`. Returns how many notifications
/// were written.
///
/// Each watch is claimed with a guarded update; only the caller that flips
/// `notified` writes the message, so a watch never produces two.
pub fn on_availability_increase(conn: &Connection, book: &Book, now: DateTime<Utc>) -> Result<usize> {
  if book.available_copies == 0 {
    return Ok(0);
  }

  let pending: Vec<RawWatch> = conn
    .prepare(&format!(
      "SELECT {} FROM book_notification_requests
        WHERE book_id = ?1 AND notified = 0
        ORDER BY created_at",
      RawWatch::COLUMNS
    ))?
    .query_map([encode_uuid(book.book_id)], RawWatch::from_row)?
    .collect::<rusqlite::Result<_>>()?;

  let message = available_message(&book.title);
  let mut written = 0;
  for raw in pending {
    let watch = raw.into_watch()?;
    let claimed = conn.execute(
      "UPDATE book_notification_requests SET notified = 1
        WHERE watch_id = ?1 AND notified = 0",
      [encode_uuid(watch.watch_id)],
    )?;
    if claimed == 1 {
      insert_notification(conn, watch.member_id, &message, now)?;
      written += 1;
    }
  }
  Ok(written)
}

/// Run [`on_availability_increase`] for every title with a copy on the shelf
/// and at least one outstanding watch.
pub fn notify_if_available(conn: &Connection, now: DateTime<Utc>) -> Result<usize> {
  let book_ids: Vec<String> = conn
    .prepare(
      "SELECT DISTINCT b.book_id
         FROM books b
         JOIN book_notification_requests w ON w.book_id = b.book_id
        WHERE b.available_copies > 0 AND w.notified = 0",
    )?
    .query_map([], |row| row.get(0))?
    .collect::<rusqlite::Result<_>>()?;

  let mut written = 0;
  for id in book_ids {
    let book = catalog::require_book(conn, decode_uuid(&id)?)?;
    written += on_availability_increase(conn, &book, now)?;
  }
  Ok(written)
}

// ─── Inbox ───────────────────────────────────────────────────────────────────

pub fn insert_notification(
  conn: &Connection,
  member_id: Uuid,
  message: &str,
  now: DateTime<Utc>,
) -> Result<Notification> {
  let notification = Notification {
    notification_id: Uuid::new_v4(),
    member_id,
    message: message.to_owned(),
    read: false,
    created_at: now,
  };
  conn.execute(
    "INSERT INTO notifications (notification_id, member_id, message, is_read, created_at)
     VALUES (?1, ?2, ?3, 0, ?4)",
    rusqlite::params![
      encode_uuid(notification.notification_id),
      encode_uuid(member_id),
      message,
      encode_dt(now),
    ],
  )?;
  Ok(notification)
}

pub fn list_notifications(
  conn: &Connection,
  member_id: Uuid,
  unread_only: bool,
) -> Result<Vec<Notification>> {
  let mut stmt = conn.prepare(&format!(
    "SELECT {} FROM notifications
      WHERE member_id = ?1 AND (?2 = 0 OR is_read = 0)
      ORDER BY created_at DESC, rowid DESC",
    RawNotification::COLUMNS
  ))?;
  let raws = stmt
    .query_map(rusqlite::params![encode_uuid(member_id), unread_only], RawNotification::from_row)?
    .collect::<rusqlite::Result<Vec<_>>>()?;
  raws.into_iter().map(RawNotification::into_notification).collect()
}

/// Members may only touch their own inbox; someone else's notification is
/// reported as missing.
pub fn mark_read(conn: &Connection, member_id: Uuid, notification_id: Uuid) -> Result<Notification> {
  let n = conn.execute(
    "UPDATE notifications SET is_read = 1 WHERE notification_id = ?1 AND member_id = ?2",
    [encode_uuid(notification_id), encode_uuid(member_id)],
  )?;
  if n == 0 {
    return Err(CoreError::not_found("notification", notification_id).into());
  }

  let raw = conn.query_row(
    &format!("SELECT {} FROM notifications WHERE notification_id = ?1", RawNotification::COLUMNS),
    [encode_uuid(notification_id)],
    RawNotification::from_row,
  )?;
  raw.into_notification()
}
