//! Runtime pieces of the Shelfmark server: configuration and the maintenance
//! driver. The binary in `main.rs` wires them to the API router.

pub mod maintenance;

use std::{path::PathBuf, time::Duration};

use serde::Deserialize;
use shelfmark_core::fine::{DEFAULT_FINE_PER_DAY, DEFAULT_LOAN_DAYS, LendingPolicy};
use thiserror::Error;

// ─── Configuration ────────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml` and
/// `SHELFMARK_*` environment variables. Every field has a default.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct ServerConfig {
  pub host:                      String,
  pub port:                      u16,
  pub store_path:                PathBuf,
  pub loan_days:                 u32,
  pub fine_per_day:              u32,
  /// Seconds between fine and availability sweeps.
  pub maintenance_interval_secs: u64,
}

impl Default for ServerConfig {
  fn default() -> Self {
    Self {
      host:                      "127.0.0.1".to_owned(),
      port:                      8080,
      store_path:                PathBuf::from("shelfmark.db"),
      loan_days:                 DEFAULT_LOAN_DAYS,
      fine_per_day:              DEFAULT_FINE_PER_DAY,
      maintenance_interval_secs: 60,
    }
  }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
  #[error("loan_days must be at least 1")]
  ZeroLoanDays,
  #[error("maintenance_interval_secs must be at least 1")]
  ZeroInterval,
}

impl ServerConfig {
  pub fn validate(&self) -> Result<(), ConfigError> {
    if self.loan_days == 0 {
      return Err(ConfigError::ZeroLoanDays);
    }
    if self.maintenance_interval_secs == 0 {
      return Err(ConfigError::ZeroInterval);
    }
    Ok(())
  }

  pub fn policy(&self) -> LendingPolicy {
    LendingPolicy { loan_days: self.loan_days, fine_per_day: self.fine_per_day }
  }

  pub fn maintenance_interval(&self) -> Duration {
    Duration::from_secs(self.maintenance_interval_secs)
  }

  pub fn address(&self) -> String { format!("{}:{}", self.host, self.port) }
}
