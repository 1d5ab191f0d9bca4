use crate::manifest::{ManifestEntry, ManifestFileMeta};
use crate::predicate::Predicate;
use crate::row::Row;

/// What to scan. An immutable value built by the caller; absent fields mean
/// "no constraint".
#[derive(Debug, Clone, Default)]
pub struct ScanRequest {
    /// Snapshot to resolve. `None` with no injected manifest list plans an
    /// empty table.
    pub snapshot_id: Option<u64>,
    /// Directly injected manifest metas, used to preview a commit before
    /// its snapshot file exists. Takes precedence over `snapshot_id` for
    /// resolution.
    pub manifest_list: Option<Vec<ManifestFileMeta>>,
    pub partition_filter: Option<Predicate>,
    /// Accepted and carried on the plan; not yet used to drop entries.
    pub key_filter: Option<Predicate>,
    /// Accepted and carried on the plan; not yet used to drop entries.
    pub value_filter: Option<Predicate>,
    pub bucket: Option<u32>,
}

impl ScanRequest {
    pub fn at_snapshot(snapshot_id: u64) -> Self {
        Self {
            snapshot_id: Some(snapshot_id),
            ..Default::default()
        }
    }

    pub fn for_manifest_list(metas: Vec<ManifestFileMeta>) -> Self {
        Self {
            manifest_list: Some(metas),
            ..Default::default()
        }
    }
}

/// The resolved live file set of a scan. Files keep commit order: within a
/// level, a later entry is newer.
#[derive(Debug, Clone, PartialEq)]
pub struct Plan {
    pub snapshot_id: Option<u64>,
    pub files: Vec<ManifestEntry>,
}

impl Plan {
    pub fn empty() -> Self {
        Self {
            snapshot_id: None,
            files: Vec::new(),
        }
    }

    /// The plan's entries for one (partition, bucket), in plan order.
    pub fn files_for(&self, partition: &Row, bucket: u32) -> Vec<ManifestEntry> {
        self.files
            .iter()
            .filter(|entry| entry.partition == *partition && entry.bucket == bucket)
            .cloned()
            .collect()
    }
}
