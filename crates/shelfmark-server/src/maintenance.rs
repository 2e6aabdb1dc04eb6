//! The periodic fine and availability sweeps.

use std::time::Duration;

use serde::Serialize;
use shelfmark_core::{fine::SweepReport, store::LibraryStore};
use tokio::time::MissedTickBehavior;

/// What one maintenance pass did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PassReport {
  pub fines:    SweepReport,
  pub notified: usize,
}

/// Run the fine sweep, then the availability sweep. Both are idempotent, so
/// a pass that overlaps another process's pass is harmless.
pub async fn run_once<S: LibraryStore>(store: &S) -> Result<PassReport, S::Error> {
  let fines = store.sweep_fines().await?;
  let notified = store.notify_if_available().await?;
  Ok(PassReport { fines, notified })
}

/// Run a pass every `every` until the task is dropped. Failures are logged
/// and the next tick tries again.
pub async fn run_forever<S: LibraryStore>(store: &S, every: Duration) {
  let mut ticker = tokio::time::interval(every);
  ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

  loop {
    ticker.tick().await;
    match run_once(store).await {
      Ok(report) => tracing::debug!(
        examined = report.fines.examined,
        fined = report.fines.fined,
        notified = report.notified,
        "maintenance pass finished"
      ),
      Err(e) => tracing::error!(error = %e, "maintenance pass failed"),
    }
  }
}

#[cfg(test)]
mod tests {
  use std::sync::Arc;

  use chrono::NaiveDate;
  use shelfmark_core::{
    book::NewBook,
    clock::FixedClock,
    identity::{NewMember, Role},
  };
  use shelfmark_store_sqlite::SqliteStore;
  use uuid::Uuid;

  use super::*;

  #[tokio::test]
  async fn a_pass_fines_and_notifies_then_settles() {
    let clock = Arc::new(FixedClock::new(NaiveDate::from_ymd_opt(2024, 5, 1).unwrap()));
    let store = SqliteStore::open_in_memory().await.unwrap().with_clock(clock.clone());

    let (alice, bob) = (Uuid::new_v4(), Uuid::new_v4());
    for (id, name) in [(alice, "alice"), (bob, "bob")] {
      store
        .register_member(NewMember { member_id: id, username: name.into(), role: Role::Member })
        .await
        .unwrap();
    }
    let dune = store
      .create_book(NewBook::new("Dune", "Frank Herbert", "9780441013593", "Fiction").with_copies(2))
      .await
      .unwrap()
      .book;
    store.direct_issue(alice, "ACC00001".parse().unwrap()).await.unwrap();
    store.request_notification(bob, dune.book_id).await.unwrap();

    clock.advance(20);
    let first = run_once(&store).await.unwrap();
    assert_eq!(first.fines, SweepReport { examined: 1, fined: 1 });
    assert_eq!(first.notified, 1);

    let second = run_once(&store).await.unwrap();
    assert_eq!(second.fines.fined, 0);
    assert_eq!(second.notified, 0);
  }
}
