//! The write-side contract and the commit protocol.
//!
//! Writers report finished SST files as a [`CommitIncrement`]; the
//! committer turns the batch into manifest entries, extends the previous
//! snapshot's manifest list, and publishes a new snapshot file. Snapshot
//! files are created with `create_new`, so two committers racing on the
//! same id cannot both win.

use crate::error::Result;
use crate::kv::{KeyValue, ValueKind};
use crate::manifest::{ManifestEntry, ManifestFile, ManifestList};
use crate::mergetree::sst::{SstFileMeta, SstFileWriter};
use crate::path::{PathFactory, SstPathFactory};
use crate::row::Row;
use crate::snapshot::{latest_snapshot_id, CommitKind, Snapshot, FIRST_SNAPSHOT_ID};
use crate::Error;
use std::collections::BTreeMap;
use std::fs::OpenOptions;
use std::io::Write;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

/// Files produced by one writer batch. `new_files` and `compacted_after`
/// become ADDs, `compacted_before` become DELETEs.
#[derive(Debug, Clone, Default)]
pub struct CommitIncrement {
    pub new_files: Vec<SstFileMeta>,
    pub compacted_before: Vec<SstFileMeta>,
    pub compacted_after: Vec<SstFileMeta>,
}

impl CommitIncrement {
    pub fn append(new_files: Vec<SstFileMeta>) -> Self {
        Self {
            new_files,
            ..Default::default()
        }
    }

    pub fn compaction(before: Vec<SstFileMeta>, after: Vec<SstFileMeta>) -> Self {
        Self {
            new_files: Vec::new(),
            compacted_before: before,
            compacted_after: after,
        }
    }

    pub fn is_compaction(&self) -> bool {
        !self.compacted_before.is_empty() || !self.compacted_after.is_empty()
    }

    pub fn is_empty(&self) -> bool {
        self.new_files.is_empty()
            && self.compacted_before.is_empty()
            && self.compacted_after.is_empty()
    }
}

/// Contract the write path uses to report newly created SST metadata.
pub trait RecordWriter {
    fn write(&mut self, kind: ValueKind, key: Row, value: Row) -> Result<()>;

    /// Flushes buffered records and hands the produced files to the commit
    /// layer. The writer is reusable afterwards.
    fn prepare_commit(&mut self) -> Result<CommitIncrement>;
}

/// A minimal writer: buffers a batch in memory, deduplicates by key
/// (newest write wins), and emits one level-0 SST per commit.
pub struct BatchWriter {
    sst_factory: SstPathFactory,
    buffer: BTreeMap<Row, (Row, ValueKind)>,
    key_arity: usize,
    value_arity: usize,
    block_rows: usize,
}

impl BatchWriter {
    pub fn new(
        sst_factory: SstPathFactory,
        key_arity: usize,
        value_arity: usize,
        block_rows: usize,
    ) -> Self {
        Self {
            sst_factory,
            buffer: BTreeMap::new(),
            key_arity,
            value_arity,
            block_rows,
        }
    }
}

impl RecordWriter for BatchWriter {
    fn write(&mut self, kind: ValueKind, key: Row, value: Row) -> Result<()> {
        self.buffer.insert(key, (value, kind));
        Ok(())
    }

    fn prepare_commit(&mut self) -> Result<CommitIncrement> {
        if self.buffer.is_empty() {
            return Ok(CommitIncrement::default());
        }
        let mut writer = SstFileWriter::create(
            &self.sst_factory,
            self.key_arity,
            self.value_arity,
            self.block_rows,
            0,
        )?;
        for (key, (value, kind)) in std::mem::take(&mut self.buffer) {
            writer.write(KeyValue { key, value, kind })?;
        }
        Ok(CommitIncrement::append(vec![writer.finish()?]))
    }
}

/// Publishes commit increments as immutable snapshots.
pub struct FileCommitter {
    factory: Arc<PathFactory>,
    manifest_file: ManifestFile,
    manifest_list: ManifestList,
    commit_user: String,
}

impl FileCommitter {
    pub fn new(
        factory: Arc<PathFactory>,
        partition_arity: usize,
        manifest_target_size: u64,
        commit_user: impl Into<String>,
    ) -> Self {
        let manifest_file =
            ManifestFile::new(factory.clone(), partition_arity, manifest_target_size);
        let manifest_list = ManifestList::new(factory.clone());
        Self {
            factory,
            manifest_file,
            manifest_list,
            commit_user: commit_user.into(),
        }
    }

    /// Commits one increment for one (partition, bucket) and returns the
    /// published snapshot. Retrying with the same identifier returns the
    /// snapshot already committed for it.
    pub fn commit(
        &self,
        commit_identifier: &str,
        partition: &Row,
        bucket: u32,
        increment: CommitIncrement,
    ) -> Result<Snapshot> {
        let latest = match latest_snapshot_id(&self.factory)? {
            Some(id) => Some(Snapshot::read(&self.factory, id)?),
            None => None,
        };

        if let Some(snapshot) = &latest {
            if snapshot.commit_user == self.commit_user
                && snapshot.commit_identifier == commit_identifier
            {
                tracing::info!(
                    id = snapshot.id,
                    identifier = commit_identifier,
                    "increment already committed, returning existing snapshot"
                );
                return Ok(snapshot.clone());
            }
        }

        let commit_kind = if increment.is_compaction() {
            CommitKind::Compact
        } else {
            CommitKind::Append
        };
        let entries = to_entries(partition, bucket, increment);

        let mut metas = match &latest {
            Some(snapshot) => self.manifest_list.read(&snapshot.manifest_list)?,
            None => Vec::new(),
        };
        metas.extend(self.manifest_file.write(&entries)?);
        let manifest_list = self.manifest_list.write(&metas)?;

        let id = latest
            .map(|s| s.id + 1)
            .unwrap_or(FIRST_SNAPSHOT_ID);
        let snapshot = Snapshot {
            id,
            manifest_list,
            commit_user: self.commit_user.clone(),
            commit_identifier: commit_identifier.to_string(),
            commit_kind,
            time_millis: unix_time_millis(),
        };
        self.write_snapshot(&snapshot)?;

        tracing::info!(
            id,
            kind = ?commit_kind,
            entries = entries.len(),
            "committed snapshot"
        );
        Ok(snapshot)
    }

    /// Creates the snapshot file atomically; losing a race on the id is a
    /// commit conflict the caller retries.
    fn write_snapshot(&self, snapshot: &Snapshot) -> Result<()> {
        std::fs::create_dir_all(self.factory.snapshot_dir())?;
        let path = self.factory.snapshot_path(snapshot.id);
        let mut file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::AlreadyExists => Error::Io(format!(
                    "snapshot {} already exists, lost commit race",
                    snapshot.id
                )),
                _ => Error::Io(format!("failed to create {}: {e}", path.display())),
            })?;
        file.write_all(snapshot.to_json()?.as_bytes())?;
        file.sync_all()?;
        Ok(())
    }
}

fn to_entries(partition: &Row, bucket: u32, increment: CommitIncrement) -> Vec<ManifestEntry> {
    let CommitIncrement {
        new_files,
        compacted_before,
        compacted_after,
    } = increment;

    new_files
        .into_iter()
        .map(|file| ManifestEntry::add(partition.clone(), bucket, file))
        .chain(
            compacted_before
                .into_iter()
                .map(|file| ManifestEntry::delete(partition.clone(), bucket, file)),
        )
        .chain(
            compacted_after
                .into_iter()
                .map(|file| ManifestEntry::add(partition.clone(), bucket, file)),
        )
        .collect()
}

fn unix_time_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::FileKind;
    use crate::row;
    use crate::row::Row;
    use tempfile::TempDir;

    fn file_meta(name: &str, level: u32) -> SstFileMeta {
        SstFileMeta {
            file_name: name.to_string(),
            file_size: 128,
            row_count: 8,
            min_key: row![0],
            max_key: row![7],
            key_stats: vec![],
            value_stats: vec![],
            level,
        }
    }

    fn committer(dir: &TempDir, user: &str) -> FileCommitter {
        let factory = Arc::new(PathFactory::new(dir.path(), vec![]));
        FileCommitter::new(factory, 0, 1 << 20, user)
    }

    #[test]
    fn test_first_commit_is_snapshot_one() -> Result<()> {
        let dir = TempDir::new()?;
        let committer = committer(&dir, "writer");

        let snapshot = committer.commit(
            "batch-0",
            &Row::empty(),
            0,
            CommitIncrement::append(vec![file_meta("sst-0", 0)]),
        )?;

        assert_eq!(snapshot.id, FIRST_SNAPSHOT_ID);
        assert_eq!(snapshot.commit_kind, CommitKind::Append);

        let factory = Arc::new(PathFactory::new(dir.path(), vec![]));
        let read_back = Snapshot::read(&factory, 1)?;
        assert_eq!(read_back, snapshot);
        Ok(())
    }

    #[test]
    fn test_snapshot_ids_monotonic() -> Result<()> {
        let dir = TempDir::new()?;
        let committer = committer(&dir, "writer");

        for i in 0..3 {
            let snapshot = committer.commit(
                &format!("batch-{i}"),
                &Row::empty(),
                0,
                CommitIncrement::append(vec![file_meta(&format!("sst-{i}"), 0)]),
            )?;
            assert_eq!(snapshot.id, i + 1);
        }
        Ok(())
    }

    #[test]
    fn test_compaction_commit() -> Result<()> {
        let dir = TempDir::new()?;
        let committer = committer(&dir, "writer");

        committer.commit(
            "batch-0",
            &Row::empty(),
            0,
            CommitIncrement::append(vec![file_meta("sst-0", 0)]),
        )?;
        let snapshot = committer.commit(
            "compact-0",
            &Row::empty(),
            0,
            CommitIncrement::compaction(
                vec![file_meta("sst-0", 0)],
                vec![file_meta("sst-1", 1)],
            ),
        )?;
        assert_eq!(snapshot.commit_kind, CommitKind::Compact);

        // The new manifest carries one DELETE and one ADD.
        let factory = Arc::new(PathFactory::new(dir.path(), vec![]));
        let list = ManifestList::new(factory.clone());
        let metas = list.read(&snapshot.manifest_list)?;
        let manifest = ManifestFile::new(factory, 0, 1 << 20);
        let entries = manifest.read(&metas.last().unwrap().file_name)?;
        assert_eq!(
            entries.iter().map(|e| e.kind).collect::<Vec<_>>(),
            vec![FileKind::Delete, FileKind::Add]
        );
        Ok(())
    }

    #[test]
    fn test_retry_same_identifier_is_idempotent() -> Result<()> {
        let dir = TempDir::new()?;
        let committer = committer(&dir, "writer");

        let first = committer.commit(
            "batch-0",
            &Row::empty(),
            0,
            CommitIncrement::append(vec![file_meta("sst-0", 0)]),
        )?;
        let retried = committer.commit(
            "batch-0",
            &Row::empty(),
            0,
            CommitIncrement::append(vec![file_meta("sst-0", 0)]),
        )?;

        assert_eq!(retried, first);
        assert_eq!(
            latest_snapshot_id(&PathFactory::new(dir.path(), vec![]))?,
            Some(1)
        );
        Ok(())
    }

    #[test]
    fn test_lost_race_surfaces_as_io_error() -> Result<()> {
        let dir = TempDir::new()?;
        let committer = committer(&dir, "writer");
        let factory = PathFactory::new(dir.path(), vec![]);

        let snapshot = Snapshot {
            id: 1,
            manifest_list: "manifest-list-x-0".to_string(),
            commit_user: "writer".to_string(),
            commit_identifier: "batch-0".to_string(),
            commit_kind: CommitKind::Append,
            time_millis: 0,
        };

        // Another committer publishes snapshot 1 between our id pick and
        // our file creation.
        std::fs::create_dir_all(factory.snapshot_dir())?;
        std::fs::write(factory.snapshot_path(1), "{}")?;

        match committer.write_snapshot(&snapshot) {
            Err(Error::Io(msg)) => assert!(msg.contains("lost commit race"), "{msg}"),
            other => panic!("expected commit conflict, got {other:?}"),
        }
        Ok(())
    }

    #[test]
    fn test_batch_writer_dedups_within_batch() -> Result<()> {
        let dir = TempDir::new()?;
        let factory = PathFactory::new(dir.path(), vec![]);
        let mut writer = BatchWriter::new(factory.sst_path_factory(&Row::empty(), 0), 1, 1, 8);

        writer.write(ValueKind::Add, row![1], row![10])?;
        writer.write(ValueKind::Add, row![1], row![11])?;
        writer.write(ValueKind::Add, row![2], row![20])?;

        let increment = writer.prepare_commit()?;
        assert_eq!(increment.new_files.len(), 1);
        assert_eq!(increment.new_files[0].row_count, 2);
        assert!(!increment.is_compaction());

        // The writer is reusable; an empty batch produces nothing.
        assert!(writer.prepare_commit()?.is_empty());
        Ok(())
    }
}
