//! [`SqliteStore`], the SQLite implementation of [`LibraryStore`].

use std::{path::Path, sync::Arc, time::Duration};

use rusqlite::{Connection, TransactionBehavior};
use uuid::Uuid;

use shelfmark_core::{
  Error as CoreError,
  accession::AccessionNumber,
  book::{Book, BookCreated, BookQuery, BookUpdate, BookUpdated, NewBook},
  clock::{Clock, SystemClock},
  copy::{BookCopy, CopyRemoved},
  fine::{LendingPolicy, SweepReport},
  identity::{Member, NewMember},
  lending::{
    BookRequest, BorrowQuery, BorrowRecord, Decided, Decision, DeskIssue, LoanView,
    RequestQuery, Returned,
  },
  notification::{BookNotificationRequest, Notification},
  store::LibraryStore,
};

use crate::{
  Error, Result, broker, catalog, fines,
  lending::{self, Ctx},
  members,
  schema::SCHEMA,
};

/// How long a writer waits for another connection's lock before giving up.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

// ─── Store ───────────────────────────────────────────────────────────────────

/// A Shelfmark store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection and clock are reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn:   tokio_rusqlite::Connection,
  clock:  Arc<dyn Clock>,
  policy: LendingPolicy,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    Self::init(conn).await
  }

  /// Open an in-memory store, mostly for tests.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    Self::init(conn).await
  }

  async fn init(conn: tokio_rusqlite::Connection) -> Result<Self> {
    let store = Self {
      conn,
      clock: Arc::new(SystemClock),
      policy: LendingPolicy::default(),
    };
    store.init_schema().await?;
    Ok(store)
  }

  /// Replace the clock that dates loans, fines and notifications.
  pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
    self.clock = clock;
    self
  }

  pub fn with_policy(mut self, policy: LendingPolicy) -> Self {
    self.policy = policy;
    self
  }

  pub fn policy(&self) -> LendingPolicy { self.policy }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.busy_timeout(BUSY_TIMEOUT)?;
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  fn ctx(&self) -> Ctx {
    Ctx { today: self.clock.today(), now: self.clock.now(), policy: self.policy }
  }

  /// Run `f` inside a `BEGIN IMMEDIATE` transaction. Commits if `f` succeeds;
  /// otherwise the transaction is dropped and rolls back.
  async fn write<R, F>(&self, f: F) -> Result<R>
  where
    R: Send + 'static,
    F: FnOnce(&Connection) -> Result<R> + Send + 'static,
  {
    self
      .conn
      .call(move |conn| {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        match f(&tx) {
          Ok(value) => {
            tx.commit()?;
            Ok(Ok(value))
          }
          Err(e) => Ok(Err(e)),
        }
      })
      .await?
  }

  /// [`Self::write`] for units of work that allocate accession numbers. A
  /// collision on the UNIQUE constraint is retried once in a fresh
  /// transaction; a second collision is an integrity violation.
  async fn write_allocating<R, F>(&self, f: F) -> Result<R>
  where
    R: Send + 'static,
    F: Fn(&Connection) -> Result<R> + Clone + Send + 'static,
  {
    match self.write(f.clone()).await {
      Err(Error::AccessionCollision(number)) => {
        tracing::warn!(accession_no = %number, "accession number collision; retrying");
        self.write(f).await.map_err(|e| match e {
          Error::AccessionCollision(number) => CoreError::Integrity(format!(
            "accession number {number} collided twice"
          ))
          .into(),
          other => other,
        })
      }
      other => other,
    }
  }

  async fn read<R, F>(&self, f: F) -> Result<R>
  where
    R: Send + 'static,
    F: FnOnce(&Connection) -> Result<R> + Send + 'static,
  {
    self.conn.call(move |conn| Ok(f(conn))).await?
  }
}

// ─── LibraryStore impl ───────────────────────────────────────────────────────

impl LibraryStore for SqliteStore {
  type Error = Error;

  // ── Members ───────────────────────────────────────────────────────────────

  async fn register_member(&self, member: NewMember) -> Result<Member> {
    let now = self.clock.now();
    let member = self.write(move |conn| members::upsert(conn, &member, now)).await?;
    tracing::info!(member_id = %member.member_id, role = %member.role, "member registered");
    Ok(member)
  }

  async fn get_member(&self, member_id: Uuid) -> Result<Option<Member>> {
    self.read(move |conn| members::load(conn, member_id)).await
  }

  async fn list_members(&self) -> Result<Vec<Member>> { self.read(members::list).await }

  // ── Catalog ───────────────────────────────────────────────────────────────

  async fn create_book(&self, input: NewBook) -> Result<BookCreated> {
    let now = self.clock.now();
    let created = self
      .write_allocating(move |conn| catalog::create_book(conn, input.clone(), now))
      .await?;
    tracing::info!(
      book_id = %created.book.book_id,
      existing = created.existing,
      copies = created.accession_numbers.len(),
      "book catalogued"
    );
    Ok(created)
  }

  async fn update_book(&self, book_id: Uuid, update: BookUpdate) -> Result<BookUpdated> {
    let now = self.clock.now();
    self
      .write_allocating(move |conn| catalog::update_book(conn, book_id, update.clone(), now))
      .await
  }

  async fn get_book(&self, book_id: Uuid) -> Result<Option<Book>> {
    self.read(move |conn| catalog::load_book(conn, book_id)).await
  }

  async fn list_books(&self, query: BookQuery) -> Result<Vec<Book>> {
    self.read(move |conn| catalog::list_books(conn, &query)).await
  }

  async fn delete_book(&self, book_id: Uuid) -> Result<()> {
    self.write(move |conn| catalog::delete_book(conn, book_id)).await?;
    tracing::info!(%book_id, "book deleted");
    Ok(())
  }

  async fn delete_books(&self, book_ids: Vec<Uuid>) -> Result<usize> {
    let deleted = self.write(move |conn| catalog::delete_books(conn, &book_ids)).await?;
    tracing::info!(deleted, "books deleted in bulk");
    Ok(deleted)
  }

  // ── Copy registry ─────────────────────────────────────────────────────────

  async fn add_copies(&self, book_id: Uuid, count: u32) -> Result<Vec<AccessionNumber>> {
    let now = self.clock.now();
    self
      .write_allocating(move |conn| catalog::add_copies(conn, book_id, count, now))
      .await
  }

  async fn remove_copy(&self, copy_id: Uuid) -> Result<CopyRemoved> {
    self.write(move |conn| catalog::remove_copy(conn, copy_id)).await
  }

  async fn list_copies(&self, book_id: Uuid) -> Result<Vec<BookCopy>> {
    self
      .read(move |conn| {
        catalog::require_book(conn, book_id)?;
        catalog::list_copies(conn, book_id)
      })
      .await
  }

  async fn get_copy_by_accession(&self, accession_no: AccessionNumber) -> Result<Option<BookCopy>> {
    self.read(move |conn| catalog::copy_by_accession(conn, &accession_no)).await
  }

  // ── Lending workflow ──────────────────────────────────────────────────────

  async fn create_request(&self, member_id: Uuid, copy_id: Uuid) -> Result<BookRequest> {
    let ctx = self.ctx();
    self.write(move |conn| lending::create_request(conn, member_id, copy_id, ctx)).await
  }

  async fn decide_request(
    &self,
    request_id: Uuid,
    decision: Decision,
    comment: Option<String>,
  ) -> Result<Decided> {
    let ctx = self.ctx();
    let decided = self
      .write(move |conn| lending::decide_request(conn, request_id, decision, comment, ctx))
      .await?;
    tracing::info!(%request_id, status = %decided.request.status, "request decided");
    Ok(decided)
  }

  async fn get_request(&self, request_id: Uuid) -> Result<Option<BookRequest>> {
    self.read(move |conn| lending::load_request(conn, request_id)).await
  }

  async fn list_requests(&self, query: RequestQuery) -> Result<Vec<BookRequest>> {
    self.read(move |conn| lending::list_requests(conn, &query)).await
  }

  async fn return_copy(&self, borrow_id: Uuid) -> Result<Returned> {
    let ctx = self.ctx();
    self.write(move |conn| lending::return_copy(conn, borrow_id, ctx)).await
  }

  async fn direct_issue(&self, member_id: Uuid, accession_no: AccessionNumber) -> Result<DeskIssue> {
    let ctx = self.ctx();
    self.write(move |conn| lending::direct_issue(conn, member_id, &accession_no, ctx)).await
  }

  async fn direct_return(&self, member_id: Uuid, accession_no: AccessionNumber) -> Result<Returned> {
    let ctx = self.ctx();
    self.write(move |conn| lending::direct_return(conn, member_id, &accession_no, ctx)).await
  }

  async fn get_borrow(&self, borrow_id: Uuid) -> Result<Option<BorrowRecord>> {
    self.read(move |conn| lending::load_borrow(conn, borrow_id)).await
  }

  async fn list_borrows(&self, query: BorrowQuery) -> Result<Vec<LoanView>> {
    let today = self.clock.today();
    self.read(move |conn| lending::list_borrows(conn, &query, today)).await
  }

  // ── Fine engine ───────────────────────────────────────────────────────────

  async fn sweep_fines(&self) -> Result<SweepReport> {
    let ctx = self.ctx();
    let report = self.write(move |conn| fines::sweep(conn, ctx)).await?;
    tracing::info!(examined = report.examined, fined = report.fined, "fine sweep finished");
    Ok(report)
  }

  // ── Notification broker ───────────────────────────────────────────────────

  async fn request_notification(
    &self,
    member_id: Uuid,
    book_id: Uuid,
  ) -> Result<BookNotificationRequest> {
    let now = self.clock.now();
    self
      .write(move |conn| broker::request_notification(conn, member_id, book_id, now))
      .await
  }

  async fn notify_if_available(&self) -> Result<usize> {
    let now = self.clock.now();
    let written = self.write(move |conn| broker::notify_if_available(conn, now)).await?;
    tracing::info!(written, "availability sweep finished");
    Ok(written)
  }

  async fn list_notifications(&self, member_id: Uuid, unread_only: bool) -> Result<Vec<Notification>> {
    self
      .read(move |conn| broker::list_notifications(conn, member_id, unread_only))
      .await
  }

  async fn mark_notification_read(&self, member_id: Uuid, notification_id: Uuid) -> Result<Notification> {
    self
      .write(move |conn| broker::mark_read(conn, member_id, notification_id))
      .await
  }
}
