//! Writes one SST file: data blocks, a block index, and a footer with the
//! index offset.
//!
//! ```text
//! +-------------------+
//! | Block 1           |
//! | ...               |
//! | Block N           |
//! +-------------------+
//! | Index             |
//! +-------------------+
//! | Index Offset (u64)|
//! +-------------------+
//! ```
//!
//! The caller must feed records in ascending key order; the reader relies
//! on it.

use super::meta::SstFileMeta;
use crate::error::Result;
use crate::kv::KeyValue;
use crate::path::SstPathFactory;
use crate::row::Row;
use crate::stats::StatsCollector;
use byteorder::{BigEndian, WriteBytesExt};
use std::fs::{self, File};
use std::io::Write;

pub(crate) struct BlockHandle {
    pub offset: u64,
    pub size: u32,
}

pub(crate) fn encode_index(handles: &[BlockHandle], buf: &mut Vec<u8>) {
    buf.write_u32::<BigEndian>(handles.len() as u32).unwrap();
    for handle in handles {
        buf.write_u64::<BigEndian>(handle.offset).unwrap();
        buf.write_u32::<BigEndian>(handle.size).unwrap();
    }
}

pub struct SstFileWriter {
    file: File,
    file_name: String,
    offset: u64,
    handles: Vec<BlockHandle>,
    buffer: Vec<KeyValue>,
    block_rows: usize,
    key_stats: StatsCollector,
    value_stats: StatsCollector,
    min_key: Option<Row>,
    max_key: Option<Row>,
    level: u32,
}

impl SstFileWriter {
    /// Creates a new file in the factory's bucket directory.
    pub fn create(
        factory: &SstPathFactory,
        key_arity: usize,
        value_arity: usize,
        block_rows: usize,
        level: u32,
    ) -> Result<Self> {
        fs::create_dir_all(factory.dir())?;
        let file_name = factory.new_sst_name();
        let file = File::create(factory.to_path(&file_name))?;
        Ok(Self {
            file,
            file_name,
            offset: 0,
            handles: Vec::new(),
            buffer: Vec::new(),
            block_rows: block_rows.max(1),
            key_stats: StatsCollector::new(key_arity),
            value_stats: StatsCollector::new(value_arity),
            min_key: None,
            max_key: None,
            level,
        })
    }

    /// Appends one record. Keys must arrive in ascending order.
    pub fn write(&mut self, kv: KeyValue) -> Result<()> {
        debug_assert!(
            self.max_key.as_ref().map_or(true, |max| *max <= kv.key),
            "records must be written in ascending key order"
        );

        self.key_stats.collect(&kv.key);
        self.value_stats.collect(&kv.value);
        if self.min_key.is_none() {
            self.min_key = Some(kv.key.clone());
        }
        self.max_key = Some(kv.key.clone());

        self.buffer.push(kv);
        if self.buffer.len() >= self.block_rows {
            self.flush_block()?;
        }
        Ok(())
    }

    fn flush_block(&mut self) -> Result<()> {
        if self.buffer.is_empty() {
            return Ok(());
        }
        let block = super::block::encode_block(&self.buffer);
        self.file.write_all(&block)?;
        self.handles.push(BlockHandle {
            offset: self.offset,
            size: block.len() as u32,
        });
        self.offset += block.len() as u64;
        self.buffer.clear();
        Ok(())
    }

    /// Flushes remaining records, writes index and footer, and returns the
    /// file's descriptor.
    pub fn finish(mut self) -> Result<SstFileMeta> {
        self.flush_block()?;

        let index_offset = self.offset;
        let mut index = Vec::new();
        encode_index(&self.handles, &mut index);
        self.file.write_all(&index)?;
        self.file.write_u64::<BigEndian>(index_offset)?;
        self.file.sync_all()?;

        let file_size = index_offset + index.len() as u64 + 8;
        let row_count = self.key_stats.row_count();
        Ok(SstFileMeta {
            file_name: self.file_name,
            file_size,
            row_count,
            min_key: self.min_key.unwrap_or_default(),
            max_key: self.max_key.unwrap_or_default(),
            key_stats: self.key_stats.finish(),
            value_stats: self.value_stats.finish(),
            level: self.level,
        })
    }
}
