//! Table store facade: wires the path factory, scan pool, planner, commit
//! layer, and merge read path together for one table.

use crate::commit::{BatchWriter, FileCommitter};
use crate::config::StoreConfig;
use crate::error::Result;
use crate::mergetree::{MergeFunction, MergeTreeReader};
use crate::path::PathFactory;
use crate::pool::{CancelToken, IoPool};
use crate::row::{DatumKind, Row, RowType};
use crate::scan::{Plan, SnapshotScanner};
use crate::snapshot::latest_snapshot_id;
use std::fs;
use std::sync::Arc;

/// Fixed schema of one table: partition keys, key and value row types, and
/// the merge semantics configured for the table.
#[derive(Debug, Clone)]
pub struct TableSchema {
    pub partition_keys: Vec<String>,
    pub partition_type: RowType,
    pub key_type: RowType,
    pub value_type: RowType,
    pub merge_function: MergeFunction,
}

impl TableSchema {
    pub fn unpartitioned(
        key_type: RowType,
        value_type: RowType,
        merge_function: MergeFunction,
    ) -> Self {
        Self {
            partition_keys: Vec::new(),
            partition_type: RowType::new(Vec::new()),
            key_type,
            value_type,
            merge_function,
        }
    }

    pub fn partitioned(
        partition_fields: Vec<(String, DatumKind)>,
        key_type: RowType,
        value_type: RowType,
        merge_function: MergeFunction,
    ) -> Self {
        let (partition_keys, kinds) = partition_fields.into_iter().unzip();
        Self {
            partition_keys,
            partition_type: RowType::new(kinds),
            key_type,
            value_type,
            merge_function,
        }
    }
}

pub struct TableStore {
    config: StoreConfig,
    schema: TableSchema,
    factory: Arc<PathFactory>,
    pool: Arc<IoPool>,
}

impl TableStore {
    pub fn open(config: StoreConfig, schema: TableSchema) -> Result<Self> {
        fs::create_dir_all(&config.root)?;
        let factory = Arc::new(PathFactory::new(
            config.root.clone(),
            schema.partition_keys.clone(),
        ));
        let pool = Arc::new(IoPool::new(config.scan_threads)?);
        Ok(Self {
            config,
            schema,
            factory,
            pool,
        })
    }

    pub fn schema(&self) -> &TableSchema {
        &self.schema
    }

    pub fn latest_snapshot(&self) -> Result<Option<u64>> {
        latest_snapshot_id(&self.factory)
    }

    pub fn new_scan(&self) -> SnapshotScanner {
        SnapshotScanner::new(
            self.factory.clone(),
            self.pool.clone(),
            self.schema.partition_type.clone(),
            self.schema.key_type.clone(),
            self.schema.value_type.clone(),
            self.config.manifest_target_size,
        )
    }

    pub fn new_committer(&self, commit_user: impl Into<String>) -> FileCommitter {
        FileCommitter::new(
            self.factory.clone(),
            self.schema.partition_type.arity(),
            self.config.manifest_target_size,
            commit_user,
        )
    }

    pub fn new_writer(&self, partition: &Row, bucket: u32) -> BatchWriter {
        BatchWriter::new(
            self.factory.sst_path_factory(partition, bucket),
            self.schema.key_type.arity(),
            self.schema.value_type.arity(),
            self.config.sst_block_rows,
        )
    }

    /// Opens a merged-view read over a plan's files for one
    /// (partition, bucket): tombstones are folded away.
    pub fn new_read(
        &self,
        plan: &Plan,
        partition: &Row,
        bucket: u32,
        token: CancelToken,
    ) -> Result<MergeTreeReader> {
        self.open_read(plan, partition, bucket, true, token)
    }

    /// Opens a changelog-view read: tombstone results are emitted.
    pub fn new_changelog_read(
        &self,
        plan: &Plan,
        partition: &Row,
        bucket: u32,
        token: CancelToken,
    ) -> Result<MergeTreeReader> {
        self.open_read(plan, partition, bucket, false, token)
    }

    fn open_read(
        &self,
        plan: &Plan,
        partition: &Row,
        bucket: u32,
        drop_tombstones: bool,
        token: CancelToken,
    ) -> Result<MergeTreeReader> {
        let entries = plan.files_for(partition, bucket);
        let sst_factory = self.factory.sst_path_factory(partition, bucket);
        MergeTreeReader::for_entries(
            &entries,
            &sst_factory,
            self.schema.merge_function,
            drop_tombstones,
            token,
        )
    }
}
