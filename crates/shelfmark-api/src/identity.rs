//! Caller identity, as asserted by the upstream identity provider.
//!
//! The provider authenticates the request and forwards the subject in two
//! headers. Shelfmark trusts them as given; anything missing or malformed is
//! a 401.

use axum::{
  extract::FromRequestParts,
  http::{HeaderMap, request::Parts},
};
use shelfmark_core::identity::{Capability, Principal, Role};
use uuid::Uuid;

use crate::error::ApiError;

pub const SUBJECT_ID_HEADER: &str = "x-subject-id";
pub const SUBJECT_ROLE_HEADER: &str = "x-subject-role";

/// The authenticated caller of a handler.
#[derive(Debug, Clone, Copy)]
pub struct Caller(pub Principal);

impl Caller {
  pub fn id(&self) -> Uuid { self.0.subject_id }

  pub fn require(&self, capability: Capability) -> Result<(), ApiError> {
    Ok(self.0.authorize(capability)?)
  }
}

/// Read the principal straight from headers.
pub fn principal_from_headers(headers: &HeaderMap) -> Result<Principal, ApiError> {
  let subject_id = Uuid::parse_str(header(headers, SUBJECT_ID_HEADER)?)
    .map_err(|_| ApiError::Unauthorized(format!("{SUBJECT_ID_HEADER} is not a UUID")))?;
  let role: Role = header(headers, SUBJECT_ROLE_HEADER)?
    .parse()
    .map_err(|_| ApiError::Unauthorized(format!("{SUBJECT_ROLE_HEADER} is not a known role")))?;

  Ok(Principal::new(subject_id, role))
}

fn header<'a>(headers: &'a HeaderMap, name: &str) -> Result<&'a str, ApiError> {
  headers
    .get(name)
    .and_then(|v| v.to_str().ok())
    .map(str::trim)
    .ok_or_else(|| ApiError::Unauthorized(format!("missing {name} header")))
}

impl<S: Send + Sync> FromRequestParts<S> for Caller {
  type Rejection = ApiError;

  async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
    principal_from_headers(&parts.headers).map(Caller)
  }
}
