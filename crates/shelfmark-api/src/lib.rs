//! JSON REST API for Shelfmark.
//!
//! Exposes an axum [`Router`] backed by any [`LibraryStore`]. Callers are
//! identified by headers set by the upstream identity provider (see
//! [`identity`]); TLS and authentication proper are the caller's
//! responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", shelfmark_api::api_router(store.clone()))
//! ```

pub mod admin;
pub mod books;
pub mod error;
pub mod identity;
pub mod lending;
pub mod notifications;

use std::sync::Arc;

use axum::{
  Router,
  routing::{delete, get, post, put},
};
use shelfmark_core::store::LibraryStore;
use tower_http::trace::TraceLayer;

pub use error::ApiError;
pub use identity::Caller;

/// Build a fully-materialised API router for `store`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S>(store: Arc<S>) -> Router<()>
where
  S: LibraryStore + 'static,
{
  Router::new()
    // Catalog
    .route("/books", get(books::list::<S>).post(books::create::<S>))
    .route("/books/bulk-delete", post(books::bulk_delete::<S>))
    .route(
      "/books/{id}",
      get(books::get_one::<S>).patch(books::update::<S>).delete(books::delete::<S>),
    )
    .route("/books/{id}/copies", get(books::list_copies::<S>).post(books::add_copies::<S>))
    .route("/books/{id}/watch", post(notifications::watch::<S>))
    .route("/copies/{id}", delete(books::remove_copy::<S>))
    .route("/accessions/{number}", get(books::get_by_accession::<S>))
    // Lending
    .route("/requests", get(lending::list_requests::<S>).post(lending::create_request::<S>))
    .route("/requests/{id}", get(lending::get_request::<S>))
    .route("/requests/{id}/decision", post(lending::decide::<S>))
    .route("/borrows", get(lending::list_borrows::<S>))
    .route("/borrows/{id}/return", post(lending::return_borrow::<S>))
    .route("/desk/issue", post(lending::desk_issue::<S>))
    .route("/desk/return", post(lending::desk_return::<S>))
    // Inbox
    .route("/notifications", get(notifications::inbox::<S>))
    .route("/notifications/{id}/read", post(notifications::mark_read::<S>))
    // Administration
    .route("/members", get(admin::list_members::<S>))
    .route("/members/{id}", put(admin::put_member::<S>))
    .route("/maintenance/fines", post(admin::sweep_fines::<S>))
    .route("/maintenance/notifications", post(admin::notify_available::<S>))
    .layer(TraceLayer::new_for_http())
    .with_state(store)
}

#[cfg(test)]
mod tests;
