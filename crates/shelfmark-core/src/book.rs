//! Catalog records, one [`Book`] per title, aggregating its physical copies.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result, accession::AccessionNumber};

/// Most copies one catalog call may register. Each copy is a row written
/// under the store's write lock.
pub const MAX_COPIES_PER_BATCH: u32 = 1_000;

/// Reject a copy batch larger than [`MAX_COPIES_PER_BATCH`].
pub fn check_copy_batch(count: u32) -> Result<()> {
  if count > MAX_COPIES_PER_BATCH {
    return Err(Error::Validation(format!(
      "at most {MAX_COPIES_PER_BATCH} copies may be added at once (requested {count})"
    )));
  }
  Ok(())
}

/// A catalogued title.
///
/// `total_copies` mirrors the number of registered copies and
/// `available_copies` the number of those with no open loan. Both are only
/// ever changed inside a store transaction, and
/// `available_copies <= total_copies` always holds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Book {
  pub book_id:          Uuid,
  pub title:            String,
  pub author:           String,
  pub isbn:             String,
  pub category:         String,
  pub publisher:        Option<String>,
  pub description:      Option<String>,
  /// Opaque reference into the external image store.
  pub image_ref:        Option<String>,
  pub total_copies:     u32,
  pub available_copies: u32,
  pub created_at:       DateTime<Utc>,
}

/// Input to [`crate::store::LibraryStore::create_book`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewBook {
  pub title:        String,
  pub author:       String,
  pub isbn:         String,
  pub category:     String,
  #[serde(default)]
  pub publisher:    Option<String>,
  #[serde(default)]
  pub description:  Option<String>,
  #[serde(default)]
  pub image_ref:    Option<String>,
  /// Number of copies to register for a new title. Ignored when the ISBN is
  /// already catalogued; exactly one copy is added instead.
  #[serde(default = "default_copies")]
  pub total_copies: u32,
}

fn default_copies() -> u32 { 1 }

impl NewBook {
  pub fn new(
    title: impl Into<String>,
    author: impl Into<String>,
    isbn: impl Into<String>,
    category: impl Into<String>,
  ) -> Self {
    Self {
      title:        title.into(),
      author:       author.into(),
      isbn:         isbn.into(),
      category:     category.into(),
      publisher:    None,
      description:  None,
      image_ref:    None,
      total_copies: default_copies(),
    }
  }

  pub fn with_copies(mut self, n: u32) -> Self {
    self.total_copies = n;
    self
  }

  /// Trim the required fields, reject blanks and oversized copy batches.
  pub fn validate(&mut self) -> Result<()> {
    check_copy_batch(self.total_copies)?;
    for (name, value) in [
      ("title", &mut self.title),
      ("author", &mut self.author),
      ("isbn", &mut self.isbn),
      ("category", &mut self.category),
    ] {
      let trimmed = value.trim();
      if trimmed.is_empty() {
        return Err(Error::Validation(format!("{name} is required")));
      }
      *value = trimmed.to_owned();
    }
    Ok(())
  }
}

/// Partial update accepted by [`crate::store::LibraryStore::update_book`].
/// `None` leaves a field untouched. For the optional fields (`publisher`,
/// `description`, `image_ref`) a blank string clears the stored value.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BookUpdate {
  pub title:        Option<String>,
  pub author:       Option<String>,
  pub isbn:         Option<String>,
  pub category:     Option<String>,
  pub publisher:    Option<String>,
  pub description:  Option<String>,
  pub image_ref:    Option<String>,
  /// May only grow; the difference is registered as new copies.
  pub total_copies: Option<u32>,
}

impl BookUpdate {
  pub fn validate(&self) -> Result<()> {
    for (name, value) in [
      ("title", &self.title),
      ("author", &self.author),
      ("isbn", &self.isbn),
      ("category", &self.category),
    ] {
      if value.as_deref().is_some_and(|v| v.trim().is_empty()) {
        return Err(Error::Validation(format!("{name} may not be blank")));
      }
    }
    Ok(())
  }

  /// Number of copies to add given the current total, or a validation error
  /// if the update tries to shrink the title.
  pub fn copies_to_add(&self, current_total: u32) -> Result<u32> {
    match self.total_copies {
      None => Ok(0),
      Some(n) if n < current_total => Err(Error::Validation(format!(
        "total_copies cannot decrease (currently {current_total}, requested {n})"
      ))),
      Some(n) => {
        let to_add = n - current_total;
        check_copy_batch(to_add)?;
        Ok(to_add)
      }
    }
  }
}

/// Result of [`crate::store::LibraryStore::create_book`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookCreated {
  pub book:              Book,
  /// `true` when the ISBN was already catalogued and one copy was added.
  pub existing:          bool,
  pub accession_numbers: Vec<AccessionNumber>,
}

/// Result of [`crate::store::LibraryStore::update_book`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookUpdated {
  pub book:              Book,
  pub accession_numbers: Vec<AccessionNumber>,
}

/// Parameters for [`crate::store::LibraryStore::list_books`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BookQuery {
  /// Case-insensitive match over title, author, category, isbn and publisher.
  pub text:           Option<String>,
  /// Only titles with at least one copy on the shelf.
  #[serde(default)]
  pub available_only: bool,
  pub limit:          Option<usize>,
  pub offset:         Option<usize>,
}
