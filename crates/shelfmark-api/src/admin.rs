//! Member mirroring and maintenance triggers. Admin only.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/members` | |
//! | `PUT`  | `/members/{id}` | Body: `{"username":"...","role":"MEMBER"}` |
//! | `POST` | `/maintenance/fines` | Runs the fine sweep now |
//! | `POST` | `/maintenance/notifications` | Runs the availability sweep now |

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, State},
};
use serde::{Deserialize, Serialize};
use shelfmark_core::{
  fine::SweepReport,
  identity::{Capability, Member, NewMember, Role},
  store::LibraryStore,
};
use uuid::Uuid;

use crate::{error::ApiError, identity::Caller};

// ─── Members ──────────────────────────────────────────────────────────────────

/// `GET /members`
pub async fn list_members<S: LibraryStore>(
  State(store): State<Arc<S>>,
  caller: Caller,
) -> Result<Json<Vec<Member>>, ApiError> {
  caller.require(Capability::ManageMembers)?;
  let members = store.list_members().await.map_err(ApiError::store)?;
  Ok(Json(members))
}

#[derive(Debug, Deserialize)]
pub struct MemberBody {
  pub username: String,
  pub role:     Role,
}

/// `PUT /members/{id}`
pub async fn put_member<S: LibraryStore>(
  State(store): State<Arc<S>>,
  caller: Caller,
  Path(member_id): Path<Uuid>,
  Json(body): Json<MemberBody>,
) -> Result<Json<Member>, ApiError> {
  caller.require(Capability::ManageMembers)?;
  let member = store
    .register_member(NewMember { member_id, username: body.username, role: body.role })
    .await
    .map_err(ApiError::store)?;
  Ok(Json(member))
}

// ─── Maintenance ──────────────────────────────────────────────────────────────

/// `POST /maintenance/fines`
pub async fn sweep_fines<S: LibraryStore>(
  State(store): State<Arc<S>>,
  caller: Caller,
) -> Result<Json<SweepReport>, ApiError> {
  caller.require(Capability::RunMaintenance)?;
  let report = store.sweep_fines().await.map_err(ApiError::store)?;
  Ok(Json(report))
}

#[derive(Debug, Serialize)]
pub struct Notified {
  pub notified: usize,
}

/// `POST /maintenance/notifications`
pub async fn notify_available<S: LibraryStore>(
  State(store): State<Arc<S>>,
  caller: Caller,
) -> Result<Json<Notified>, ApiError> {
  caller.require(Capability::RunMaintenance)?;
  let notified = store.notify_if_available().await.map_err(ApiError::store)?;
  Ok(Json(Notified { notified }))
}
