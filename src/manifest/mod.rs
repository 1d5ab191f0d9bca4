//! Manifest files: the append-only metadata log of the table.
//!
//! Where a WAL tracks changes to user data, manifests track changes to the
//! table structure itself - which SST files exist and the ADD/DELETE events
//! that created or removed them. A manifest list ties one snapshot to its
//! ordered set of manifests.
//!
//! # File format
//!
//! Both manifests and manifest lists are record files:
//!
//! ```text
//! +-------------------------+
//! | magic:u32 | version:u32 |
//! +-------------------------+
//! | len:u32 | payload | crc32:u32 |
//! +-------------------------+
//! | ...                     |
//! +-------------------------+
//! ```
//!
//! Records are [`ManifestEntry`] codecs in manifests and
//! [`ManifestFileMeta`] codecs in manifest lists. CRC32 detects corruption
//! per record; the magic distinguishes the two file types. Files are
//! write-once: a writer builds the full content, writes it, and syncs.

pub mod entry;
pub mod list;
pub mod meta;

pub use entry::{FileKind, Identifier, ManifestEntry};
pub use list::ManifestList;
pub use meta::ManifestFileMeta;

use crate::error::Result;
use crate::path::PathFactory;
use crate::stats::StatsCollector;
use crate::Error;
use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use crc::{Crc, CRC_32_ISCSI};
use std::fs;
use std::io::{Cursor, Read};
use std::path::Path;
use std::sync::Arc;

const CRC32: Crc<u32> = Crc::<u32>::new(&CRC_32_ISCSI);

const MANIFEST_MAGIC: u32 = 0x4D_41_4E_46; // "MANF"
const LIST_MAGIC: u32 = 0x4D_4C_53_54; // "MLST"
const FORMAT_VERSION: u32 = 1;

/// In-memory buffer accumulating one record file.
pub(crate) struct RecordFileBuffer {
    buf: Vec<u8>,
    records: usize,
}

impl RecordFileBuffer {
    pub(crate) fn new(magic: u32) -> Self {
        let mut buf = Vec::new();
        buf.write_u32::<BigEndian>(magic).unwrap();
        buf.write_u32::<BigEndian>(FORMAT_VERSION).unwrap();
        Self { buf, records: 0 }
    }

    pub(crate) fn push(&mut self, payload: &[u8]) {
        self.buf
            .write_u32::<BigEndian>(payload.len() as u32)
            .unwrap();
        self.buf.extend_from_slice(payload);
        self.buf
            .write_u32::<BigEndian>(CRC32.checksum(payload))
            .unwrap();
        self.records += 1;
    }

    pub(crate) fn len(&self) -> u64 {
        self.buf.len() as u64
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.records == 0
    }

    /// Writes the buffered file and syncs it. Record files are immutable
    /// once this returns.
    pub(crate) fn write_to(self, path: &Path) -> Result<u64> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let size = self.buf.len() as u64;
        fs::write(path, &self.buf)?;
        let file = fs::File::open(path)?;
        file.sync_all()?;
        Ok(size)
    }
}

/// Reads a record file back into raw payloads, validating magic and
/// per-record checksums.
pub(crate) fn read_record_file(path: &Path, magic: u32) -> Result<Vec<Vec<u8>>> {
    let bytes = fs::read(path)
        .map_err(|e| Error::Io(format!("failed to read {}: {e}", path.display())))?;
    let mut cursor = Cursor::new(bytes.as_slice());

    let file_magic = cursor
        .read_u32::<BigEndian>()
        .map_err(|_| Error::Format(format!("{} is truncated", path.display())))?;
    if file_magic != magic {
        return Err(Error::Format(format!(
            "{} has magic {file_magic:#010x}, expected {magic:#010x}",
            path.display()
        )));
    }
    let version = cursor.read_u32::<BigEndian>()?;
    if version != FORMAT_VERSION {
        return Err(Error::Format(format!(
            "{} has unsupported version {version}",
            path.display()
        )));
    }

    let mut payloads = Vec::new();
    while (cursor.position() as usize) < bytes.len() {
        let len = cursor.read_u32::<BigEndian>()? as usize;
        let mut payload = vec![0u8; len];
        cursor
            .read_exact(&mut payload)
            .map_err(|_| Error::Format(format!("{} has a truncated record", path.display())))?;
        let stored = cursor.read_u32::<BigEndian>()?;
        if CRC32.checksum(&payload) != stored {
            return Err(Error::Format(format!(
                "checksum mismatch in {}",
                path.display()
            )));
        }
        payloads.push(payload);
    }
    Ok(payloads)
}

/// Reads and writes manifest files, rolling writes to a new file once the
/// configured target size is exceeded.
pub struct ManifestFile {
    factory: Arc<PathFactory>,
    partition_arity: usize,
    target_size: u64,
}

impl ManifestFile {
    pub fn new(factory: Arc<PathFactory>, partition_arity: usize, target_size: u64) -> Self {
        Self {
            factory,
            partition_arity,
            target_size,
        }
    }

    /// Writes entries into one or more manifest files, returning their
    /// metas with derived partition stats.
    pub fn write(&self, entries: &[ManifestEntry]) -> Result<Vec<ManifestFileMeta>> {
        let mut metas = Vec::new();
        let mut writer = SingleManifestWriter::new(self.partition_arity);

        for entry in entries {
            writer.add(entry);
            if writer.buffer.len() >= self.target_size {
                metas.push(writer.finish(&self.factory)?);
                writer = SingleManifestWriter::new(self.partition_arity);
            }
        }
        if !writer.buffer.is_empty() {
            metas.push(writer.finish(&self.factory)?);
        }
        Ok(metas)
    }

    pub fn read(&self, file_name: &str) -> Result<Vec<ManifestEntry>> {
        let path = self.factory.manifest_path(file_name);
        read_record_file(&path, MANIFEST_MAGIC)?
            .iter()
            .map(|payload| ManifestEntry::decode(payload))
            .collect()
    }
}

struct SingleManifestWriter {
    buffer: RecordFileBuffer,
    partition_stats: StatsCollector,
    num_added: u64,
    num_deleted: u64,
}

impl SingleManifestWriter {
    fn new(partition_arity: usize) -> Self {
        Self {
            buffer: RecordFileBuffer::new(MANIFEST_MAGIC),
            partition_stats: StatsCollector::new(partition_arity),
            num_added: 0,
            num_deleted: 0,
        }
    }

    fn add(&mut self, entry: &ManifestEntry) {
        self.buffer.push(&entry.encode());
        self.partition_stats.collect(&entry.partition);
        match entry.kind {
            FileKind::Add => self.num_added += 1,
            FileKind::Delete => self.num_deleted += 1,
        }
    }

    fn finish(self, factory: &PathFactory) -> Result<ManifestFileMeta> {
        let file_name = factory.new_manifest_name();
        let file_size = self.buffer.write_to(&factory.manifest_path(&file_name))?;
        Ok(ManifestFileMeta {
            file_name,
            file_size,
            num_added_files: self.num_added,
            num_deleted_files: self.num_deleted,
            partition_stats: self.partition_stats.finish(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mergetree::sst::SstFileMeta;
    use crate::row;
    use crate::row::{Datum, Row};
    use tempfile::TempDir;

    fn test_file_meta(name: &str) -> SstFileMeta {
        SstFileMeta {
            file_name: name.to_string(),
            file_size: 100,
            row_count: 10,
            min_key: row![0],
            max_key: row![9],
            key_stats: vec![],
            value_stats: vec![],
            level: 0,
        }
    }

    fn manifest_file(dir: &TempDir, partition_arity: usize, target: u64) -> ManifestFile {
        let factory = Arc::new(PathFactory::new(
            dir.path(),
            (0..partition_arity).map(|i| format!("p{i}")).collect(),
        ));
        ManifestFile::new(factory, partition_arity, target)
    }

    #[test]
    fn test_write_read_roundtrip() -> Result<()> {
        let dir = TempDir::new()?;
        let manifest = manifest_file(&dir, 1, 1 << 20);

        let entries = vec![
            ManifestEntry::add(row!["east"], 0, test_file_meta("sst-0")),
            ManifestEntry::add(row!["west"], 1, test_file_meta("sst-1")),
            ManifestEntry::delete(row!["east"], 0, test_file_meta("sst-0")),
        ];

        let metas = manifest.write(&entries)?;
        assert_eq!(metas.len(), 1);
        assert_eq!(metas[0].num_added_files, 2);
        assert_eq!(metas[0].num_deleted_files, 1);
        assert_eq!(metas[0].partition_stats[0].min, Datum::Str("east".to_string()));
        assert_eq!(metas[0].partition_stats[0].max, Datum::Str("west".to_string()));

        let read_back = manifest.read(&metas[0].file_name)?;
        assert_eq!(read_back, entries);
        Ok(())
    }

    #[test]
    fn test_rolls_on_target_size() -> Result<()> {
        let dir = TempDir::new()?;
        // Tiny target so every entry rolls into its own file.
        let manifest = manifest_file(&dir, 0, 1);

        let entries: Vec<_> = (0..3)
            .map(|i| ManifestEntry::add(Row::empty(), 0, test_file_meta(&format!("sst-{i}"))))
            .collect();

        let metas = manifest.write(&entries)?;
        assert_eq!(metas.len(), 3);
        for (meta, entry) in metas.iter().zip(&entries) {
            assert_eq!(manifest.read(&meta.file_name)?, vec![entry.clone()]);
        }
        Ok(())
    }

    #[test]
    fn test_empty_write_produces_no_files() -> Result<()> {
        let dir = TempDir::new()?;
        let manifest = manifest_file(&dir, 0, 1 << 20);
        assert!(manifest.write(&[])?.is_empty());
        Ok(())
    }

    #[test]
    fn test_checksum_corruption_detected() -> Result<()> {
        let dir = TempDir::new()?;
        let manifest = manifest_file(&dir, 0, 1 << 20);

        let metas = manifest.write(&[ManifestEntry::add(
            Row::empty(),
            0,
            test_file_meta("sst-0"),
        )])?;

        // Flip a payload byte past the header and length prefix.
        let path = dir.path().join("manifest").join(&metas[0].file_name);
        let mut bytes = fs::read(&path)?;
        let target = bytes.len() - 8;
        bytes[target] ^= 0xFF;
        fs::write(&path, bytes)?;

        match manifest.read(&metas[0].file_name) {
            Err(Error::Format(msg)) => assert!(msg.contains("checksum"), "{msg}"),
            other => panic!("expected checksum failure, got {other:?}"),
        }
        Ok(())
    }

    #[test]
    fn test_wrong_magic_rejected() -> Result<()> {
        let dir = TempDir::new()?;
        let manifest = manifest_file(&dir, 0, 1 << 20);

        let metas = manifest.write(&[ManifestEntry::add(
            Row::empty(),
            0,
            test_file_meta("sst-0"),
        )])?;

        // A manifest list reader must refuse a manifest file.
        let path = dir.path().join("manifest").join(&metas[0].file_name);
        match read_record_file(&path, LIST_MAGIC) {
            Err(Error::Format(msg)) => assert!(msg.contains("magic"), "{msg}"),
            other => panic!("expected magic failure, got {other:?}"),
        }
        Ok(())
    }

    #[test]
    fn test_missing_manifest_is_io_error() {
        let dir = TempDir::new().unwrap();
        let manifest = manifest_file(&dir, 0, 1 << 20);
        assert!(matches!(manifest.read("no-such-file"), Err(Error::Io(_))));
    }
}
