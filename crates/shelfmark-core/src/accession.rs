//! Accession numbers: the human-readable identifier stamped on one physical
//! copy.
//!
//! Issued numbers have the shape `ACC` + a zero-padded decimal sequence of at
//! least five digits (`ACC00001`). Numbers that predate this scheme are kept
//! verbatim; they simply have no [`sequence`](AccessionNumber::sequence).

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::Error;

const PREFIX: &str = "ACC";
const WIDTH: usize = 5;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccessionNumber(String);

impl AccessionNumber {
  pub fn from_sequence(n: u64) -> Self { Self(format!("{PREFIX}{n:0width$}", width = WIDTH)) }

  /// Wrap a stored value without checking its shape.
  pub fn from_stored(raw: String) -> Self { Self(raw) }

  /// The numeric suffix, if this number follows the `ACC<digits>` scheme.
  pub fn sequence(&self) -> Option<u64> { parse_sequence(&self.0) }

  pub fn as_str(&self) -> &str { &self.0 }

  pub fn into_inner(self) -> String { self.0 }
}

impl fmt::Display for AccessionNumber {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(&self.0) }
}

impl FromStr for AccessionNumber {
  type Err = Error;

  /// Accepts any non-blank token; scanners may send legacy numbers.
  fn from_str(s: &str) -> Result<Self, Self::Err> {
    let s = s.trim();
    if s.is_empty() {
      return Err(Error::Validation("accession number is required".into()));
    }
    Ok(Self(s.to_owned()))
  }
}

fn parse_sequence(s: &str) -> Option<u64> {
  let digits = s.strip_prefix(PREFIX)?;
  if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
    return None;
  }
  digits.parse().ok()
}

/// Compute the next sequence value to issue.
///
/// `existing` are the accession numbers currently in the registry,
/// `high_water` the largest sequence ever issued (deleted copies included) and
/// `copy_count` the number of registered copies. A number that does not parse
/// counts as `copy_count` for this computation only.
pub fn next_sequence<'a>(
  existing: impl IntoIterator<Item = &'a str>,
  high_water: u64,
  copy_count: u64,
) -> u64 {
  existing
    .into_iter()
    .map(|raw| parse_sequence(raw).unwrap_or(copy_count))
    .fold(high_water, u64::max)
    .saturating_add(1)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn formats_with_five_digit_padding() {
    assert_eq!(AccessionNumber::from_sequence(1).as_str(), "ACC00001");
    assert_eq!(AccessionNumber::from_sequence(12345).as_str(), "ACC12345");
    assert_eq!(AccessionNumber::from_sequence(123456).as_str(), "ACC123456");
  }

  #[test]
  fn sequence_requires_prefix_and_digits() {
    assert_eq!(AccessionNumber::from_sequence(42).sequence(), Some(42));
    assert_eq!(AccessionNumber::from_stored("ACC".into()).sequence(), None);
    assert_eq!(AccessionNumber::from_stored("ACC-7".into()).sequence(), None);
    assert_eq!(AccessionNumber::from_stored("B00017".into()).sequence(), None);
  }

  #[test]
  fn next_sequence_starts_at_one() {
    assert_eq!(next_sequence([], 0, 0), 1);
  }

  #[test]
  fn next_sequence_takes_the_max_not_the_last() {
    let existing = ["ACC00007", "ACC00003", "ACC00005"];
    assert_eq!(next_sequence(existing, 0, 3), 8);
  }

  #[test]
  fn high_water_mark_prevents_reissue_after_deletion() {
    assert_eq!(next_sequence(["ACC00002"], 9, 1), 10);
  }

  #[test]
  fn unparseable_numbers_fall_back_to_copy_count() {
    assert_eq!(next_sequence(["LEGACY-1", "ACC00002"], 0, 40), 41);
  }

  #[test]
  fn blank_scans_are_rejected() {
    assert!("  ".parse::<AccessionNumber>().is_err());
    assert_eq!(" ACC00009 ".parse::<AccessionNumber>().unwrap().as_str(), "ACC00009");
  }
}
