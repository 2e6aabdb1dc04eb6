//! The identity mirror: subjects known to the library.

use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension as _};
use shelfmark_core::identity::{Member, NewMember};
use uuid::Uuid;

use crate::{
  Result,
  encode::{RawMember, encode_dt, encode_uuid},
};

pub fn upsert(conn: &Connection, input: &NewMember, now: DateTime<Utc>) -> Result<Member> {
  let username = input.username.trim();
  if username.is_empty() {
    return Err(shelfmark_core::Error::Validation("username is required".into()).into());
  }

  conn.execute(
    "INSERT INTO members (member_id, username, role, registered_at)
     VALUES (?1, ?2, ?3, ?4)
     ON CONFLICT (member_id) DO UPDATE
       SET username = excluded.username, role = excluded.role",
    rusqlite::params![
      encode_uuid(input.member_id),
      username,
      input.role.to_string(),
      encode_dt(now),
    ],
  )?;

  load(conn, input.member_id)?
    .ok_or_else(|| shelfmark_core::Error::member_not_found(input.member_id).into())
}

pub fn load(conn: &Connection, member_id: Uuid) -> Result<Option<Member>> {
  let raw = conn
    .query_row(
      &format!("SELECT {} FROM members WHERE member_id = ?1", RawMember::COLUMNS),
      [encode_uuid(member_id)],
      RawMember::from_row,
    )
    .optional()?;
  raw.map(RawMember::into_member).transpose()
}

/// Load a member and check that they may borrow.
pub fn require_borrower(conn: &Connection, member_id: Uuid) -> Result<Member> {
  let member =
    load(conn, member_id)?.ok_or_else(|| shelfmark_core::Error::member_not_found(member_id))?;
  member.require_borrower()?;
  Ok(member)
}

pub fn list(conn: &Connection) -> Result<Vec<Member>> {
  let mut stmt =
    conn.prepare(&format!("SELECT {} FROM members ORDER BY username", RawMember::COLUMNS))?;
  let raws = stmt
    .query_map([], RawMember::from_row)?
    .collect::<rusqlite::Result<Vec<_>>>()?;
  raws.into_iter().map(RawMember::into_member).collect()
}
