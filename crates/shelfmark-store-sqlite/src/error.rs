//! Error type for `shelfmark-store-sqlite`.

use shelfmark_core::DomainError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error(transparent)]
  Core(#[from] shelfmark_core::Error),

  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("sqlite error: {0}")]
  Sqlite(#[from] rusqlite::Error),

  #[error("uuid parse error: {0}")]
  Uuid(#[from] uuid::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),

  #[error("unexpected stored value: {0}")]
  Decode(String),

  /// A freshly allocated accession number hit the UNIQUE constraint. The
  /// store retries the unit of work once before giving up.
  #[error("accession number {0} already issued")]
  AccessionCollision(String),
}

impl DomainError for Error {
  fn domain(&self) -> Option<&shelfmark_core::Error> {
    match self {
      Error::Core(e) => Some(e),
      _ => None,
    }
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
