//! Handlers for availability watches and the member inbox.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/books/{id}/watch` | Member only; 201, 409 on a duplicate |
//! | `GET`  | `/notifications` | The caller's own inbox; `?unread_only=true` |
//! | `POST` | `/notifications/{id}/read` | |

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use serde::Deserialize;
use shelfmark_core::{identity::Capability, notification::Notification, store::LibraryStore};
use uuid::Uuid;

use crate::{error::ApiError, identity::Caller};

/// `POST /books/{id}/watch`
pub async fn watch<S: LibraryStore>(
  State(store): State<Arc<S>>,
  caller: Caller,
  Path(book_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
  caller.require(Capability::Borrow)?;
  let watch = store
    .request_notification(caller.id(), book_id)
    .await
    .map_err(ApiError::store)?;
  Ok((StatusCode::CREATED, Json(watch)))
}

#[derive(Debug, Deserialize)]
pub struct InboxParams {
  #[serde(default)]
  pub unread_only: bool,
}

/// `GET /notifications`
pub async fn inbox<S: LibraryStore>(
  State(store): State<Arc<S>>,
  caller: Caller,
  Query(params): Query<InboxParams>,
) -> Result<Json<Vec<Notification>>, ApiError> {
  let notifications = store
    .list_notifications(caller.id(), params.unread_only)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(notifications))
}

/// `POST /notifications/{id}/read`
pub async fn mark_read<S: LibraryStore>(
  State(store): State<Arc<S>>,
  caller: Caller,
  Path(id): Path<Uuid>,
) -> Result<Json<Notification>, ApiError> {
  let notification = store
    .mark_notification_read(caller.id(), id)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(notification))
}
