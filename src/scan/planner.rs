//! Resolves a scan request to the live file set of a snapshot.
//!
//! Resolution replays the snapshot's manifest closure: every manifest in
//! the list is read (concurrently, on the shared IO pool), survivors of
//! partition pruning are folded ADD/DELETE in list order, and whatever
//! remains is live. The fold is serial and list-ordered, which makes the
//! plan a deterministic function of the snapshot regardless of pool size.

use super::plan::{Plan, ScanRequest};
use crate::error::Result;
use crate::manifest::{FileKind, Identifier, ManifestEntry, ManifestFile, ManifestFileMeta, ManifestList};
use crate::path::PathFactory;
use crate::pool::{CancelToken, IoPool};
use crate::row::RowType;
use crate::errcorrupt;
use crate::snapshot::Snapshot;
use std::collections::HashMap;
use std::sync::Arc;

pub struct SnapshotScanner {
    manifest_file: ManifestFile,
    manifest_list: ManifestList,
    factory: Arc<PathFactory>,
    pool: Arc<IoPool>,
    partition_type: RowType,
    key_type: RowType,
    value_type: RowType,
}

impl SnapshotScanner {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        factory: Arc<PathFactory>,
        pool: Arc<IoPool>,
        partition_type: RowType,
        key_type: RowType,
        value_type: RowType,
        manifest_target_size: u64,
    ) -> Self {
        let manifest_file = ManifestFile::new(
            factory.clone(),
            partition_type.arity(),
            manifest_target_size,
        );
        let manifest_list = ManifestList::new(factory.clone());
        Self {
            manifest_file,
            manifest_list,
            factory,
            pool,
            partition_type,
            key_type,
            value_type,
        }
    }

    /// Plans the scan described by `request`, observing `token` between
    /// manifest reads.
    pub fn plan(&self, request: &ScanRequest, token: &CancelToken) -> Result<Plan> {
        self.validate(request)?;

        let Some((snapshot_id, manifests)) = self.resolve(request)? else {
            return Ok(Plan::empty());
        };

        let total = manifests.len();
        let manifests = self.prune_manifests(request, manifests);
        tracing::debug!(
            snapshot = ?snapshot_id,
            total,
            kept = manifests.len(),
            "pruned manifest list"
        );

        // Fan the reads out; the join re-establishes list order.
        let entry_lists = self.pool.run_ordered(manifests, |meta| {
            token.check()?;
            self.manifest_file.read(&meta.file_name)
        })?;

        let entries = entry_lists
            .into_iter()
            .flatten()
            .filter(|entry| self.keep_entry(request, entry));

        let files = fold_entries(entries)?;
        tracing::debug!(snapshot = ?snapshot_id, files = files.len(), "planned scan");
        Ok(Plan { snapshot_id, files })
    }

    fn validate(&self, request: &ScanRequest) -> Result<()> {
        if let Some(filter) = &request.partition_filter {
            filter.validate(&self.partition_type)?;
        }
        if let Some(filter) = &request.key_filter {
            filter.validate(&self.key_type)?;
        }
        if let Some(filter) = &request.value_filter {
            filter.validate(&self.value_type)?;
        }
        Ok(())
    }

    /// Resolves the manifest metas to scan, or `None` for an empty table.
    #[allow(clippy::type_complexity)]
    fn resolve(
        &self,
        request: &ScanRequest,
    ) -> Result<Option<(Option<u64>, Vec<ManifestFileMeta>)>> {
        if let Some(metas) = &request.manifest_list {
            return Ok(Some((request.snapshot_id, metas.clone())));
        }
        let Some(id) = request.snapshot_id else {
            return Ok(None);
        };
        let snapshot = Snapshot::read(&self.factory, id)?;
        let metas = self.manifest_list.read(&snapshot.manifest_list)?;
        Ok(Some((Some(id), metas)))
    }

    fn prune_manifests(
        &self,
        request: &ScanRequest,
        manifests: Vec<ManifestFileMeta>,
    ) -> Vec<ManifestFileMeta> {
        let Some(filter) = &request.partition_filter else {
            return manifests;
        };
        manifests
            .into_iter()
            .filter(|meta| filter.test_stats(meta.num_entries(), &meta.partition_stats))
            .collect()
    }

    fn keep_entry(&self, request: &ScanRequest, entry: &ManifestEntry) -> bool {
        // Key and value filters wait for per-entry column stats pushdown;
        // they must not drop entries here.
        request
            .partition_filter
            .as_ref()
            .map_or(true, |f| f.test(&entry.partition))
            && request.bucket.map_or(true, |b| entry.bucket == b)
    }
}

/// Folds ADD/DELETE events in list order into the live file set, keeping
/// the commit order of surviving ADDs.
fn fold_entries(entries: impl Iterator<Item = ManifestEntry>) -> Result<Vec<ManifestEntry>> {
    let mut slots: Vec<Option<ManifestEntry>> = Vec::new();
    let mut index: HashMap<Identifier, usize> = HashMap::new();

    for entry in entries {
        let identifier = entry.identifier();
        match entry.kind {
            FileKind::Add => {
                if index.contains_key(&identifier) {
                    return errcorrupt!(
                        "trying to add file {identifier} which is already added"
                    );
                }
                index.insert(identifier, slots.len());
                slots.push(Some(entry));
            }
            FileKind::Delete => {
                let Some(slot) = index.get(&identifier) else {
                    return errcorrupt!(
                        "trying to delete file {identifier} which is not previously added"
                    );
                };
                slots[*slot] = None;
            }
        }
    }
    Ok(slots.into_iter().flatten().collect())
}
