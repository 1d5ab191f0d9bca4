//! Maps logical entities to storage paths.
//!
//! Layout rooted at the table directory:
//!
//! ```text
//! <root>/snapshot/snapshot-<id>             JSON snapshot
//! <root>/manifest/<name>                    manifest or manifest-list file
//! <root>/<k1=v1/...>/bucket-<n>/<name>      SST data file
//! ```
//!
//! File names embed a uuid fixed at factory construction plus a monotonic
//! counter, so concurrent factories never collide and names within one
//! factory stay ordered.

use crate::row::Row;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use uuid::Uuid;

pub const SNAPSHOT_DIR: &str = "snapshot";
pub const MANIFEST_DIR: &str = "manifest";

pub struct PathFactory {
    root: PathBuf,
    partition_keys: Vec<String>,
    uuid: String,
    manifest_count: AtomicUsize,
}

impl PathFactory {
    pub fn new(root: impl Into<PathBuf>, partition_keys: Vec<String>) -> Self {
        Self {
            root: root.into(),
            partition_keys,
            uuid: Uuid::new_v4().to_string(),
            manifest_count: AtomicUsize::new(0),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn snapshot_dir(&self) -> PathBuf {
        self.root.join(SNAPSHOT_DIR)
    }

    pub fn snapshot_path(&self, id: u64) -> PathBuf {
        self.snapshot_dir().join(format!("snapshot-{id}"))
    }

    pub fn manifest_dir(&self) -> PathBuf {
        self.root.join(MANIFEST_DIR)
    }

    /// Resolves a manifest or manifest-list file name to its path.
    pub fn manifest_path(&self, file_name: &str) -> PathBuf {
        self.manifest_dir().join(file_name)
    }

    pub fn new_manifest_name(&self) -> String {
        let n = self.manifest_count.fetch_add(1, Ordering::SeqCst);
        format!("manifest-{}-{}", self.uuid, n)
    }

    pub fn new_manifest_list_name(&self) -> String {
        let n = self.manifest_count.fetch_add(1, Ordering::SeqCst);
        format!("manifest-list-{}-{}", self.uuid, n)
    }

    /// Renders a partition row as `k1=v1/k2=v2/...`. The empty partition of
    /// an unpartitioned table renders as an empty path.
    pub fn partition_dir(&self, partition: &Row) -> String {
        debug_assert_eq!(partition.arity(), self.partition_keys.len());
        self.partition_keys
            .iter()
            .zip(&partition.0)
            .map(|(key, value)| format!("{key}={value}"))
            .collect::<Vec<_>>()
            .join("/")
    }

    pub fn bucket_dir(&self, partition: &Row, bucket: u32) -> PathBuf {
        let mut dir = self.root.clone();
        let partition_dir = self.partition_dir(partition);
        if !partition_dir.is_empty() {
            dir = dir.join(partition_dir);
        }
        dir.join(format!("bucket-{bucket}"))
    }

    /// Creates a subordinate factory minting SST paths for one
    /// (partition, bucket).
    pub fn sst_path_factory(&self, partition: &Row, bucket: u32) -> SstPathFactory {
        SstPathFactory {
            dir: self.bucket_dir(partition, bucket),
            uuid: Uuid::new_v4().to_string(),
            count: AtomicUsize::new(0),
        }
    }
}

/// Localizes SST path minting to one (partition, bucket) directory.
pub struct SstPathFactory {
    dir: PathBuf,
    uuid: String,
    count: AtomicUsize,
}

impl SstPathFactory {
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn new_sst_name(&self) -> String {
        let n = self.count.fetch_add(1, Ordering::SeqCst);
        format!("sst-{}-{}", self.uuid, n)
    }

    pub fn to_path(&self, file_name: &str) -> PathBuf {
        self.dir.join(file_name)
    }
}
