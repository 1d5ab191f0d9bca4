use crate::error::Result;
use crate::stats::{decode_stats, encode_stats, FieldStats};
use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use std::io::{Cursor, Read};

/// Descriptor of one manifest file, carried by the manifest list.
///
/// `partition_stats` summarizes the partitions of all contained entries and
/// lets the planner skip the manifest without opening it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestFileMeta {
    pub file_name: String,
    pub file_size: u64,
    pub num_added_files: u64,
    pub num_deleted_files: u64,
    pub partition_stats: Vec<FieldStats>,
}

impl ManifestFileMeta {
    /// Total entries in the manifest, the row count for stats pruning.
    pub fn num_entries(&self) -> u64 {
        self.num_added_files + self.num_deleted_files
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        buf.write_u32::<BigEndian>(self.file_name.len() as u32)
            .unwrap();
        buf.extend_from_slice(self.file_name.as_bytes());
        buf.write_u64::<BigEndian>(self.file_size).unwrap();
        buf.write_u64::<BigEndian>(self.num_added_files).unwrap();
        buf.write_u64::<BigEndian>(self.num_deleted_files).unwrap();
        encode_stats(&self.partition_stats, &mut buf);
        buf
    }

    pub fn decode(buf: &[u8]) -> Result<Self> {
        let mut cursor = Cursor::new(buf);
        let name_len = cursor.read_u32::<BigEndian>()? as usize;
        let mut name_bytes = vec![0u8; name_len];
        cursor.read_exact(&mut name_bytes)?;
        let file_name = String::from_utf8(name_bytes)
            .map_err(|e| crate::Error::Format(format!("invalid utf8 in file name: {e}")))?;

        let file_size = cursor.read_u64::<BigEndian>()?;
        let num_added_files = cursor.read_u64::<BigEndian>()?;
        let num_deleted_files = cursor.read_u64::<BigEndian>()?;
        let partition_stats = decode_stats(&mut cursor)?;

        Ok(ManifestFileMeta {
            file_name,
            file_size,
            num_added_files,
            num_deleted_files,
            partition_stats,
        })
    }
}
