//! Handlers for the catalog: `/books` and `/copies`.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/books` | `?q`, `?available_only`, `?limit`, `?offset` |
//! | `POST`   | `/books` | Body: [`NewBook`]; 201, or 200 if the ISBN was known |
//! | `POST`   | `/books/bulk-delete` | Body: `{"book_ids":[...]}` |
//! | `GET`    | `/books/{id}` | 404 if not found |
//! | `PATCH`  | `/books/{id}` | Body: [`BookUpdate`] |
//! | `DELETE` | `/books/{id}` | 204 |
//! | `GET`    | `/books/{id}/copies` | |
//! | `POST`   | `/books/{id}/copies` | Body: `{"count":n}`; 201 + new accession numbers |
//! | `DELETE` | `/copies/{id}` | Removes the copy whatever its loan state |
//! | `GET`    | `/accessions/{number}` | Copy lookup by accession number; 404 if unknown |
//!
//! Reads are open to any caller; writes need [`Capability::ManageCatalog`].

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use serde::{Deserialize, Serialize};
use shelfmark_core::{
  Error as CoreError,
  accession::AccessionNumber,
  book::{Book, BookQuery, BookUpdate, BookUpdated, NewBook},
  copy::{BookCopy, CopyRemoved},
  identity::Capability,
  store::LibraryStore,
};
use uuid::Uuid;

use crate::{error::ApiError, identity::Caller};

// ─── Books ────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ListParams {
  /// Substring matched against title, author, category, ISBN and publisher.
  pub q:              Option<String>,
  #[serde(default)]
  pub available_only: bool,
  pub limit:          Option<usize>,
  pub offset:         Option<usize>,
}

/// `GET /books`
pub async fn list<S: LibraryStore>(
  State(store): State<Arc<S>>,
  _caller: Caller,
  Query(params): Query<ListParams>,
) -> Result<Json<Vec<Book>>, ApiError> {
  let books = store
    .list_books(BookQuery {
      text:           params.q,
      available_only: params.available_only,
      limit:          params.limit,
      offset:         params.offset,
    })
    .await
    .map_err(ApiError::store)?;
  Ok(Json(books))
}

/// `POST /books`
pub async fn create<S: LibraryStore>(
  State(store): State<Arc<S>>,
  caller: Caller,
  Json(body): Json<NewBook>,
) -> Result<impl IntoResponse, ApiError> {
  caller.require(Capability::ManageCatalog)?;
  let created = store.create_book(body).await.map_err(ApiError::store)?;
  let status = if created.existing { StatusCode::OK } else { StatusCode::CREATED };
  Ok((status, Json(created)))
}

/// `GET /books/{id}`
pub async fn get_one<S: LibraryStore>(
  State(store): State<Arc<S>>,
  _caller: Caller,
  Path(id): Path<Uuid>,
) -> Result<Json<Book>, ApiError> {
  let book = store
    .get_book(id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| CoreError::book_not_found(id))?;
  Ok(Json(book))
}

/// `PATCH /books/{id}`
pub async fn update<S: LibraryStore>(
  State(store): State<Arc<S>>,
  caller: Caller,
  Path(id): Path<Uuid>,
  Json(body): Json<BookUpdate>,
) -> Result<Json<BookUpdated>, ApiError> {
  caller.require(Capability::ManageCatalog)?;
  let updated = store.update_book(id, body).await.map_err(ApiError::store)?;
  Ok(Json(updated))
}

/// `DELETE /books/{id}`
pub async fn delete<S: LibraryStore>(
  State(store): State<Arc<S>>,
  caller: Caller,
  Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
  caller.require(Capability::ManageCatalog)?;
  store.delete_book(id).await.map_err(ApiError::store)?;
  Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
pub struct BulkDeleteBody {
  pub book_ids: Vec<Uuid>,
}

#[derive(Debug, Serialize)]
pub struct BulkDeleted {
  pub deleted: usize,
}

/// `POST /books/bulk-delete`
pub async fn bulk_delete<S: LibraryStore>(
  State(store): State<Arc<S>>,
  caller: Caller,
  Json(body): Json<BulkDeleteBody>,
) -> Result<Json<BulkDeleted>, ApiError> {
  caller.require(Capability::ManageCatalog)?;
  let deleted = store.delete_books(body.book_ids).await.map_err(ApiError::store)?;
  Ok(Json(BulkDeleted { deleted }))
}

// ─── Copies ───────────────────────────────────────────────────────────────────

/// `GET /books/{id}/copies`
pub async fn list_copies<S: LibraryStore>(
  State(store): State<Arc<S>>,
  _caller: Caller,
  Path(id): Path<Uuid>,
) -> Result<Json<Vec<BookCopy>>, ApiError> {
  let copies = store.list_copies(id).await.map_err(ApiError::store)?;
  Ok(Json(copies))
}

#[derive(Debug, Deserialize)]
pub struct AddCopiesBody {
  pub count: u32,
}

#[derive(Debug, Serialize)]
pub struct CopiesAdded {
  pub accession_numbers: Vec<AccessionNumber>,
}

/// `POST /books/{id}/copies`
pub async fn add_copies<S: LibraryStore>(
  State(store): State<Arc<S>>,
  caller: Caller,
  Path(id): Path<Uuid>,
  Json(body): Json<AddCopiesBody>,
) -> Result<impl IntoResponse, ApiError> {
  caller.require(Capability::ManageCatalog)?;
  if body.count == 0 {
    return Err(CoreError::Validation("count must be at least 1".into()).into());
  }
  let accession_numbers = store.add_copies(id, body.count).await.map_err(ApiError::store)?;
  Ok((StatusCode::CREATED, Json(CopiesAdded { accession_numbers })))
}

/// `GET /accessions/{number}`
pub async fn get_by_accession<S: LibraryStore>(
  State(store): State<Arc<S>>,
  _caller: Caller,
  Path(number): Path<String>,
) -> Result<Json<BookCopy>, ApiError> {
  let accession: AccessionNumber = number.parse()?;
  let copy = store
    .get_copy_by_accession(accession.clone())
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| CoreError::not_found("copy", accession))?;
  Ok(Json(copy))
}

/// `DELETE /copies/{id}`
pub async fn remove_copy<S: LibraryStore>(
  State(store): State<Arc<S>>,
  caller: Caller,
  Path(id): Path<Uuid>,
) -> Result<Json<CopyRemoved>, ApiError> {
  caller.require(Capability::ManageCatalog)?;
  let removed = store.remove_copy(id).await.map_err(ApiError::store)?;
  Ok(Json(removed))
}
