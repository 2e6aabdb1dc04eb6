//! Pull-based notifications.
//!
//! Members opt in to hear about a title with a [`BookNotificationRequest`].
//! The availability hook and the periodic sweep turn outstanding requests into
//! [`Notification`] rows; the fine sweep writes overdue notices to the same
//! table. Nothing is pushed; members poll their inbox.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A member's wish to be told when a title is back on the shelf.
/// Unique per (member, book).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookNotificationRequest {
  pub watch_id:   Uuid,
  pub member_id:  Uuid,
  pub book_id:    Uuid,
  /// Flips to `true` exactly once, in the same transaction that writes the
  /// notification.
  pub notified:   bool,
  pub created_at: DateTime<Utc>,
}

/// A message in a member's inbox.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
  pub notification_id: Uuid,
  pub member_id:       Uuid,
  pub message:         String,
  pub read:            bool,
  pub created_at:      DateTime<Utc>,
}

pub fn available_message(title: &str) -> String {
  format!("The book '{title}' is now available.")
}

pub fn overdue_message(title: &str, fine: u32) -> String {
  format!("Your borrowed book '{title}' is overdue. Current fine: {fine}")
}
