//! Error taxonomy shared by every Shelfmark backend.

use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
  /// Malformed input: a blank required field, an unknown status value.
  #[error("validation failed: {0}")]
  Validation(String),

  #[error("{entity} not found: {id}")]
  NotFound { entity: &'static str, id: String },

  /// A state-machine precondition was violated.
  #[error("conflict: {0}")]
  Conflict(String),

  #[error("forbidden: {0}")]
  Forbidden(String),

  /// The store detected a broken invariant (negative counter, accession
  /// collision that survived a retry).
  #[error("integrity violation: {0}")]
  Integrity(String),
}

impl Error {
  pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
    Self::NotFound { entity, id: id.to_string() }
  }

  pub fn book_not_found(id: Uuid) -> Self { Self::not_found("book", id) }

  pub fn copy_not_found(id: Uuid) -> Self { Self::not_found("copy", id) }

  pub fn member_not_found(id: Uuid) -> Self { Self::not_found("member", id) }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Implemented by backend error types so callers can recover the domain
/// error (if any) hiding behind a storage failure.
pub trait DomainError: std::error::Error + Send + Sync + 'static {
  fn domain(&self) -> Option<&Error>;
}

impl DomainError for Error {
  fn domain(&self) -> Option<&Error> { Some(self) }
}
