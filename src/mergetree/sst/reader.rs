//! Reads one SST file as a lazy sequence of record batches.
//!
//! Each batch is one data block; the block is the unit of resource
//! ownership and must be dropped before the next call to
//! [`SstFileReader::read_batch`] (the `&mut` receiver enforces this).
//! Records within a file arrive in ascending key order, guaranteed by the
//! writer.

use super::block::BlockIter;
use super::writer::BlockHandle;
use crate::error::Result;
use crate::Error;
use byteorder::{BigEndian, ReadBytesExt};
use std::fs::File;
use std::io::{Cursor, Read, Seek, SeekFrom};
use std::path::Path;

pub struct SstFileReader {
    file: File,
    handles: Vec<BlockHandle>,
    next_block: usize,
}

impl SstFileReader {
    /// Opens an SST file and loads its block index.
    pub fn open(path: &Path) -> Result<Self> {
        let mut file = File::open(path)
            .map_err(|e| Error::Io(format!("failed to open {}: {e}", path.display())))?;
        let file_size = file.metadata()?.len();
        if file_size < 8 {
            return Err(Error::Format(format!("{} is truncated", path.display())));
        }

        file.seek(SeekFrom::End(-8))?;
        let index_offset = file.read_u64::<BigEndian>()?;
        if index_offset > file_size - 8 {
            return Err(Error::Format(format!(
                "{} has index offset {index_offset} past end of file",
                path.display()
            )));
        }

        let mut index_bytes = vec![0u8; (file_size - 8 - index_offset) as usize];
        file.seek(SeekFrom::Start(index_offset))?;
        file.read_exact(&mut index_bytes)?;

        let mut cursor = Cursor::new(index_bytes.as_slice());
        let count = cursor.read_u32::<BigEndian>()? as usize;
        let mut handles = Vec::with_capacity(count);
        for _ in 0..count {
            handles.push(BlockHandle {
                offset: cursor.read_u64::<BigEndian>()?,
                size: cursor.read_u32::<BigEndian>()?,
            });
        }

        Ok(Self {
            file,
            handles,
            next_block: 0,
        })
    }

    /// Returns the next batch of records, or `None` at end of file.
    pub fn read_batch(&mut self) -> Result<Option<BlockIter>> {
        let Some(handle) = self.handles.get(self.next_block) else {
            return Ok(None);
        };
        self.next_block += 1;

        let mut bytes = vec![0u8; handle.size as usize];
        self.file.seek(SeekFrom::Start(handle.offset))?;
        self.file.read_exact(&mut bytes)?;
        Ok(Some(BlockIter::new(bytes)?))
    }
}

#[cfg(test)]
mod tests {
    use super::super::writer::SstFileWriter;
    use super::*;
    use crate::kv::KeyValue;
    use crate::path::PathFactory;
    use crate::row;
    use crate::row::Row;
    use tempfile::TempDir;

    fn write_file(dir: &TempDir, kvs: &[(i64, i64)], block_rows: usize) -> Result<std::path::PathBuf> {
        let paths = PathFactory::new(dir.path(), vec![]);
        let sst = paths.sst_path_factory(&Row::empty(), 0);
        let mut writer = SstFileWriter::create(&sst, 1, 1, block_rows, 0)?;
        for (k, v) in kvs {
            writer.write(KeyValue::add(row![*k], row![*v]))?;
        }
        let meta = writer.finish()?;
        Ok(sst.to_path(&meta.file_name))
    }

    #[test]
    fn test_read_in_key_order() -> Result<()> {
        let dir = TempDir::new()?;
        let kvs: Vec<_> = (0..10).map(|i| (i, i * 10)).collect();
        let path = write_file(&dir, &kvs, 3)?;

        let mut reader = SstFileReader::open(&path)?;
        let mut read_back = Vec::new();
        let mut batches = 0;
        while let Some(batch) = reader.read_batch()? {
            batches += 1;
            for kv in batch {
                read_back.push(kv?);
            }
        }

        // 10 records at 3 rows per block.
        assert_eq!(batches, 4);
        let expected: Vec<_> = kvs
            .iter()
            .map(|(k, v)| KeyValue::add(row![*k], row![*v]))
            .collect();
        assert_eq!(read_back, expected);
        Ok(())
    }

    #[test]
    fn test_empty_file() -> Result<()> {
        let dir = TempDir::new()?;
        let path = write_file(&dir, &[], 4)?;

        let mut reader = SstFileReader::open(&path)?;
        assert!(reader.read_batch()?.is_none());
        Ok(())
    }

    #[test]
    fn test_truncated_file_rejected() -> Result<()> {
        let dir = TempDir::new()?;
        let path = dir.path().join("bogus");
        std::fs::write(&path, [0u8; 3])?;
        assert!(matches!(SstFileReader::open(&path), Err(Error::Format(_))));
        Ok(())
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("absent");
        assert!(matches!(SstFileReader::open(&path), Err(Error::Io(_))));
    }
}
