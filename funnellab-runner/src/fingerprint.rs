//! Content hashing and run-id minting.
//!
//! - `ConfigHash`: BLAKE3 over the canonical JSON of a stage's config snapshot.
//!   Struct fields serialize in declaration order, so equal snapshots always
//!   hash equal.
//! - Run ids: UTC timestamp + stage + a short hash salted with the funnel's
//!   identity, so reruns of the same config land in distinct directories.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::plan::StageName;
use crate::stage_config::ConfigSnapshot;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConfigHash(String);

impl ConfigHash {
    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self(blake3::hash(bytes).to_hex().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// First 12 hex characters, for directory names and logs.
    pub fn short(&self) -> &str {
        &self.0[..12]
    }
}

impl fmt::Display for ConfigHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

pub fn config_hash(snapshot: &ConfigSnapshot) -> Result<ConfigHash, serde_json::Error> {
    let json = serde_json::to_vec(snapshot)?;
    Ok(ConfigHash::from_bytes(&json))
}

/// `YYYYMMDDTHHMMSSZ_<stage>_<hash12>`.
pub fn mint_run_id(stage: StageName, now: DateTime<Utc>, funnel_id: &str) -> String {
    let mut hasher = blake3::Hasher::new();
    hasher.update(funnel_id.as_bytes());
    hasher.update(stage.as_str().as_bytes());
    hasher.update(&now.timestamp_nanos_opt().unwrap_or_default().to_le_bytes());
    let hash = hasher.finalize().to_hex();
    format!(
        "{}_{}_{}",
        now.format("%Y%m%dT%H%M%SZ"),
        stage.as_str(),
        &hash[..12]
    )
}
