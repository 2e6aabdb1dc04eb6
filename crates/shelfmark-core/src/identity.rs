//! Identities supplied by the external identity provider, and the capability
//! table that decides what each role may do.
//!
//! Shelfmark never manages credentials. A caller is a [`Principal`]: an opaque
//! subject id plus a [`Role`]. Known subjects are mirrored as [`Member`] rows
//! so that lending operations can check that a borrower exists.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use uuid::Uuid;

use crate::{Error, Result};

/// The closed set of roles issued by the identity provider.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display,
  EnumString,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
  Admin,
  Member,
}

/// Things a caller may be allowed to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum Capability {
  /// Create, update and delete books and copies.
  ManageCatalog,
  /// Approve or reject borrow requests.
  DecideRequests,
  /// Issue and take back copies by accession number.
  DeskService,
  /// See every member's requests and loans.
  ViewAllLoans,
  /// Trigger the fine and availability sweeps by hand.
  RunMaintenance,
  /// Mirror identities from the identity provider.
  ManageMembers,
  /// File borrow requests and ask for availability notifications.
  Borrow,
}

impl Role {
  /// The whole permission table. Nothing else in the workspace compares roles.
  pub fn grants(self, capability: Capability) -> bool {
    match self {
      Self::Admin => !matches!(capability, Capability::Borrow),
      Self::Member => matches!(capability, Capability::Borrow),
    }
  }
}

/// The authenticated caller of an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
  pub subject_id: Uuid,
  pub role:       Role,
}

impl Principal {
  pub fn new(subject_id: Uuid, role: Role) -> Self { Self { subject_id, role } }

  pub fn can(&self, capability: Capability) -> bool {
    self.role.grants(capability)
  }

  /// Fail with [`Error::Forbidden`] unless the role grants `capability`.
  pub fn authorize(&self, capability: Capability) -> Result<()> {
    if self.can(capability) {
      Ok(())
    } else {
      Err(Error::Forbidden(format!(
        "role {} may not {capability}",
        self.role
      )))
    }
  }

  /// `Some(subject_id)` when the caller should only see their own records.
  pub fn scope(&self) -> Option<Uuid> {
    (!self.can(Capability::ViewAllLoans)).then_some(self.subject_id)
  }
}

/// A subject mirrored from the identity provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Member {
  pub member_id:     Uuid,
  pub username:      String,
  pub role:          Role,
  pub registered_at: DateTime<Utc>,
}

impl Member {
  pub fn principal(&self) -> Principal { Principal::new(self.member_id, self.role) }

  /// Borrowing operations accept only subjects holding the member role.
  pub fn require_borrower(&self) -> Result<()> {
    self.principal().authorize(Capability::Borrow)
  }
}

/// Input to [`crate::store::LibraryStore::register_member`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewMember {
  pub member_id: Uuid,
  pub username:  String,
  pub role:      Role,
}

#[cfg(test)]
mod tests {
  use std::str::FromStr as _;

  use super::*;

  #[test]
  fn admins_cannot_borrow_and_members_cannot_administer() {
    assert!(Role::Admin.grants(Capability::DecideRequests));
    assert!(Role::Admin.grants(Capability::DeskService));
    assert!(!Role::Admin.grants(Capability::Borrow));

    assert!(Role::Member.grants(Capability::Borrow));
    assert!(!Role::Member.grants(Capability::ManageCatalog));
    assert!(!Role::Member.grants(Capability::ViewAllLoans));
  }

  #[test]
  fn authorize_reports_the_missing_capability() {
    let p = Principal::new(Uuid::new_v4(), Role::Member);
    let err = p.authorize(Capability::DecideRequests).unwrap_err();
    assert!(matches!(err, Error::Forbidden(ref m) if m.contains("decide_requests")));
  }

  #[test]
  fn members_are_scoped_to_themselves() {
    let id = Uuid::new_v4();
    assert_eq!(Principal::new(id, Role::Member).scope(), Some(id));
    assert_eq!(Principal::new(id, Role::Admin).scope(), None);
  }

  #[test]
  fn role_parses_from_provider_strings() {
    assert_eq!(Role::from_str("ADMIN").unwrap(), Role::Admin);
    assert_eq!(Role::from_str("MEMBER").unwrap(), Role::Member);
    assert!(Role::from_str("member").is_err());
    assert_eq!(Role::Member.to_string(), "MEMBER");
  }
}
