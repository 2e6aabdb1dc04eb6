//! Handlers for the lending workflow.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/requests` | Member only. Body: `{"copy_id":"..."}`; 201 |
//! | `GET`  | `/requests` | `?status`, `?member_id`; members only see their own |
//! | `GET`  | `/requests/{id}` | |
//! | `POST` | `/requests/{id}/decision` | Body: `{"status":"APPROVED","comment":"..."}` |
//! | `GET`  | `/borrows` | `?member_id`, `?open_only`; members only see their own |
//! | `POST` | `/borrows/{id}/return` | The borrower, or the desk |
//! | `POST` | `/desk/issue` | Body: `{"member_id":"...","accession_no":"ACC00001"}` |
//! | `POST` | `/desk/return` | Same body |

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use serde::Deserialize;
use shelfmark_core::{
  Error as CoreError,
  accession::AccessionNumber,
  identity::Capability,
  lending::{
    BookRequest, BorrowQuery, Decided, Decision, DeskIssue, LoanView, RequestQuery,
    RequestStatus, Returned,
  },
  store::LibraryStore,
};
use uuid::Uuid;

use crate::{error::ApiError, identity::Caller};

// ─── Requests ─────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct CreateRequestBody {
  pub copy_id: Uuid,
}

/// `POST /requests`
pub async fn create_request<S: LibraryStore>(
  State(store): State<Arc<S>>,
  caller: Caller,
  Json(body): Json<CreateRequestBody>,
) -> Result<impl IntoResponse, ApiError> {
  caller.require(Capability::Borrow)?;
  let request = store
    .create_request(caller.id(), body.copy_id)
    .await
    .map_err(ApiError::store)?;
  Ok((StatusCode::CREATED, Json(request)))
}

#[derive(Debug, Deserialize)]
pub struct RequestListParams {
  pub status:    Option<RequestStatus>,
  pub member_id: Option<Uuid>,
}

/// `GET /requests`
pub async fn list_requests<S: LibraryStore>(
  State(store): State<Arc<S>>,
  caller: Caller,
  Query(params): Query<RequestListParams>,
) -> Result<Json<Vec<BookRequest>>, ApiError> {
  let member_id = caller.0.scope().or(params.member_id);
  let requests = store
    .list_requests(RequestQuery { member_id, status: params.status })
    .await
    .map_err(ApiError::store)?;
  Ok(Json(requests))
}

/// `GET /requests/{id}`
pub async fn get_request<S: LibraryStore>(
  State(store): State<Arc<S>>,
  caller: Caller,
  Path(id): Path<Uuid>,
) -> Result<Json<BookRequest>, ApiError> {
  let request = store
    .get_request(id)
    .await
    .map_err(ApiError::store)?
    .filter(|r| caller.0.scope().is_none_or(|me| me == r.member_id))
    .ok_or_else(|| CoreError::not_found("request", id))?;
  Ok(Json(request))
}

#[derive(Debug, Deserialize)]
pub struct DecisionBody {
  /// `APPROVED` or `REJECTED`; anything else is a 400.
  pub status:  String,
  pub comment: Option<String>,
}

/// `POST /requests/{id}/decision`
pub async fn decide<S: LibraryStore>(
  State(store): State<Arc<S>>,
  caller: Caller,
  Path(id): Path<Uuid>,
  Json(body): Json<DecisionBody>,
) -> Result<Json<Decided>, ApiError> {
  caller.require(Capability::DecideRequests)?;
  let decision: Decision = body.status.parse()?;
  let decided = store
    .decide_request(id, decision, body.comment)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(decided))
}

// ─── Borrows ──────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct BorrowListParams {
  pub member_id: Option<Uuid>,
  #[serde(default)]
  pub open_only: bool,
}

/// `GET /borrows`
pub async fn list_borrows<S: LibraryStore>(
  State(store): State<Arc<S>>,
  caller: Caller,
  Query(params): Query<BorrowListParams>,
) -> Result<Json<Vec<LoanView>>, ApiError> {
  let member_id = caller.0.scope().or(params.member_id);
  let loans = store
    .list_borrows(BorrowQuery { member_id, open_only: params.open_only })
    .await
    .map_err(ApiError::store)?;
  Ok(Json(loans))
}

/// `POST /borrows/{id}/return`
pub async fn return_borrow<S: LibraryStore>(
  State(store): State<Arc<S>>,
  caller: Caller,
  Path(id): Path<Uuid>,
) -> Result<Json<Returned>, ApiError> {
  if !caller.0.can(Capability::DeskService) {
    let borrow = store
      .get_borrow(id)
      .await
      .map_err(ApiError::store)?
      .ok_or_else(|| CoreError::not_found("borrow record", id))?;
    if borrow.member_id != caller.id() {
      return Err(CoreError::Forbidden("only the borrower may return this loan".into()).into());
    }
  }
  let returned = store.return_copy(id).await.map_err(ApiError::store)?;
  Ok(Json(returned))
}

// ─── Desk ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct DeskBody {
  pub member_id:    Uuid,
  pub accession_no: String,
}

impl DeskBody {
  fn accession(&self) -> Result<AccessionNumber, CoreError> { self.accession_no.parse() }
}

/// `POST /desk/issue`
pub async fn desk_issue<S: LibraryStore>(
  State(store): State<Arc<S>>,
  caller: Caller,
  Json(body): Json<DeskBody>,
) -> Result<impl IntoResponse, ApiError> {
  caller.require(Capability::DeskService)?;
  let accession_no = body.accession()?;
  let issued: DeskIssue = store
    .direct_issue(body.member_id, accession_no)
    .await
    .map_err(ApiError::store)?;
  Ok((StatusCode::CREATED, Json(issued)))
}

/// `POST /desk/return`
pub async fn desk_return<S: LibraryStore>(
  State(store): State<Arc<S>>,
  caller: Caller,
  Json(body): Json<DeskBody>,
) -> Result<Json<Returned>, ApiError> {
  caller.require(Capability::DeskService)?;
  let accession_no = body.accession()?;
  let returned = store
    .direct_return(body.member_id, accession_no)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(returned))
}
