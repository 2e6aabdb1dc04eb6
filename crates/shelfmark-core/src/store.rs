//! The `LibraryStore` trait.
//!
//! Implemented by storage backends (e.g. `shelfmark-store-sqlite`). The API
//! and the server depend on this abstraction, not on any concrete backend.
//!
//! Every mutating method is one atomic unit of work: it either applies all of
//! its writes (record, counters, notifications) or none of them. Domain
//! failures are reported through [`DomainError::domain`].

use std::future::Future;

use uuid::Uuid;

use crate::{
  DomainError,
  accession::AccessionNumber,
  book::{Book, BookCreated, BookQuery, BookUpdate, BookUpdated, NewBook},
  copy::{BookCopy, CopyRemoved},
  fine::SweepReport,
  identity::{Member, NewMember},
  lending::{
    BookRequest, BorrowQuery, BorrowRecord, Decided, Decision, DeskIssue,
    LoanView, RequestQuery, Returned,
  },
  notification::{BookNotificationRequest, Notification},
};

/// Abstraction over a Shelfmark inventory-and-lending backend.
///
/// All methods return `Send` futures so the trait can be used from axum
/// handlers and spawned maintenance tasks.
pub trait LibraryStore: Send + Sync {
  type Error: DomainError;

  // ── Members ───────────────────────────────────────────────────────────

  /// Insert or refresh the mirror of an identity-provider subject.
  fn register_member(
    &self,
    member: NewMember,
  ) -> impl Future<Output = Result<Member, Self::Error>> + Send + '_;

  fn get_member(
    &self,
    member_id: Uuid,
  ) -> impl Future<Output = Result<Option<Member>, Self::Error>> + Send + '_;

  fn list_members(
    &self,
  ) -> impl Future<Output = Result<Vec<Member>, Self::Error>> + Send + '_;

  // ── Catalog ───────────────────────────────────────────────────────────

  /// Catalogue a title with `total_copies` new copies, or add a single copy
  /// if the ISBN is already known.
  fn create_book(
    &self,
    input: NewBook,
  ) -> impl Future<Output = Result<BookCreated, Self::Error>> + Send + '_;

  /// Apply a partial update. Raising `total_copies` registers new copies;
  /// lowering it is a validation error.
  fn update_book(
    &self,
    book_id: Uuid,
    update: BookUpdate,
  ) -> impl Future<Output = Result<BookUpdated, Self::Error>> + Send + '_;

  fn get_book(
    &self,
    book_id: Uuid,
  ) -> impl Future<Output = Result<Option<Book>, Self::Error>> + Send + '_;

  fn list_books(
    &self,
    query: BookQuery,
  ) -> impl Future<Output = Result<Vec<Book>, Self::Error>> + Send + '_;

  /// Delete a title together with its copies, requests, loans and watches.
  fn delete_book(
    &self,
    book_id: Uuid,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Delete several titles; unknown ids are skipped. Returns the number
  /// deleted.
  fn delete_books(
    &self,
    book_ids: Vec<Uuid>,
  ) -> impl Future<Output = Result<usize, Self::Error>> + Send + '_;

  // ── Copy registry ─────────────────────────────────────────────────────

  /// Register `count` new copies, each with a freshly allocated accession
  /// number, and grow both counters by `count`.
  fn add_copies(
    &self,
    book_id: Uuid,
    count: u32,
  ) -> impl Future<Output = Result<Vec<AccessionNumber>, Self::Error>> + Send + '_;

  /// Delete a copy whatever its loan state. `available_copies` is only
  /// decremented if the copy was on the shelf.
  fn remove_copy(
    &self,
    copy_id: Uuid,
  ) -> impl Future<Output = Result<CopyRemoved, Self::Error>> + Send + '_;

  fn list_copies(
    &self,
    book_id: Uuid,
  ) -> impl Future<Output = Result<Vec<BookCopy>, Self::Error>> + Send + '_;

  fn get_copy_by_accession(
    &self,
    accession_no: AccessionNumber,
  ) -> impl Future<Output = Result<Option<BookCopy>, Self::Error>> + Send + '_;

  // ── Lending workflow ──────────────────────────────────────────────────

  /// File a pending request. Fails with a conflict if the copy is on loan.
  fn create_request(
    &self,
    member_id: Uuid,
    copy_id: Uuid,
  ) -> impl Future<Output = Result<BookRequest, Self::Error>> + Send + '_;

  /// Approve or reject a pending request. Approval opens a loan and takes one
  /// copy off the shelf in the same transaction.
  fn decide_request(
    &self,
    request_id: Uuid,
    decision: Decision,
    comment: Option<String>,
  ) -> impl Future<Output = Result<Decided, Self::Error>> + Send + '_;

  fn get_request(
    &self,
    request_id: Uuid,
  ) -> impl Future<Output = Result<Option<BookRequest>, Self::Error>> + Send + '_;

  /// Newest first.
  fn list_requests(
    &self,
    query: RequestQuery,
  ) -> impl Future<Output = Result<Vec<BookRequest>, Self::Error>> + Send + '_;

  /// Close a loan, put the copy back on the shelf and notify watchers.
  fn return_copy(
    &self,
    borrow_id: Uuid,
  ) -> impl Future<Output = Result<Returned, Self::Error>> + Send + '_;

  /// Issue a copy at the desk, bypassing the approval queue. Records an
  /// already-approved request for the audit trail.
  fn direct_issue(
    &self,
    member_id: Uuid,
    accession_no: AccessionNumber,
  ) -> impl Future<Output = Result<DeskIssue, Self::Error>> + Send + '_;

  /// Take a copy back at the desk.
  fn direct_return(
    &self,
    member_id: Uuid,
    accession_no: AccessionNumber,
  ) -> impl Future<Output = Result<Returned, Self::Error>> + Send + '_;

  fn get_borrow(
    &self,
    borrow_id: Uuid,
  ) -> impl Future<Output = Result<Option<BorrowRecord>, Self::Error>> + Send + '_;

  /// Newest first.
  fn list_borrows(
    &self,
    query: BorrowQuery,
  ) -> impl Future<Output = Result<Vec<LoanView>, Self::Error>> + Send + '_;

  // ── Fine engine ───────────────────────────────────────────────────────

  /// Recompute fines on every open loan. Idempotent for a given day.
  fn sweep_fines(
    &self,
  ) -> impl Future<Output = Result<SweepReport, Self::Error>> + Send + '_;

  // ── Notification broker ───────────────────────────────────────────────

  /// Ask to be told when `book_id` is available. Duplicate requests conflict.
  fn request_notification(
    &self,
    member_id: Uuid,
    book_id: Uuid,
  ) -> impl Future<Output = Result<BookNotificationRequest, Self::Error>> + Send + '_;

  /// Notify every outstanding watcher of a title that has copies on the
  /// shelf. Returns the number of notifications written.
  fn notify_if_available(
    &self,
  ) -> impl Future<Output = Result<usize, Self::Error>> + Send + '_;

  /// Newest first.
  fn list_notifications(
    &self,
    member_id: Uuid,
    unread_only: bool,
  ) -> impl Future<Output = Result<Vec<Notification>, Self::Error>> + Send + '_;

  fn mark_notification_read(
    &self,
    member_id: Uuid,
    notification_id: Uuid,
  ) -> impl Future<Output = Result<Notification, Self::Error>> + Send + '_;
}
