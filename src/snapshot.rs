//! Snapshots: the entrance to all data committed at a point in time.
//!
//! A snapshot is a small JSON document pointing at a manifest list, written
//! once under `<root>/snapshot/snapshot-<id>`. Ids are strictly monotonic
//! starting at [`FIRST_SNAPSHOT_ID`]. The (commit user, commit identifier)
//! pair is the idempotency key for writer retries.

use crate::error::Result;
use crate::path::PathFactory;
use crate::Error;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::ErrorKind;

pub const FIRST_SNAPSHOT_ID: u64 = 1;

/// Type of changes in a snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CommitKind {
    /// New files appended by a writer.
    Append,
    /// Files replaced by compacting existing SSTs.
    Compact,
}

/// Immutable pointer to a table state at a commit.
///
/// The JSON field names are the wire form and must stay stable; unknown
/// fields are ignored on read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub id: u64,
    #[serde(rename = "manifestList")]
    pub manifest_list: String,
    #[serde(rename = "commitUser")]
    pub commit_user: String,
    #[serde(rename = "commitIdentifier")]
    pub commit_identifier: String,
    #[serde(rename = "commitKind")]
    pub commit_kind: CommitKind,
    #[serde(rename = "timeMillis")]
    pub time_millis: i64,
}

impl Snapshot {
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Reads the snapshot file for the given id. A missing file is
    /// `SnapshotNotFound`; anything else malformed is a `Format` error.
    pub fn read(factory: &PathFactory, id: u64) -> Result<Self> {
        let path = factory.snapshot_path(id);
        let json = fs::read_to_string(&path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => Error::SnapshotNotFound(id),
            _ => Error::Io(format!("failed to read {}: {e}", path.display())),
        })?;
        Self::from_json(&json)
    }
}

/// The highest committed snapshot id, or `None` for an empty table.
pub fn latest_snapshot_id(factory: &PathFactory) -> Result<Option<u64>> {
    let dir = factory.snapshot_dir();
    let entries = match fs::read_dir(&dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };

    let mut latest = None;
    for entry in entries {
        let name = entry?.file_name();
        let Some(id) = name
            .to_str()
            .and_then(|n| n.strip_prefix("snapshot-"))
            .and_then(|n| n.parse::<u64>().ok())
        else {
            continue;
        };
        latest = latest.max(Some(id));
    }
    Ok(latest)
}
