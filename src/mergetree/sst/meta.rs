use crate::error::Result;
use crate::row::Row;
use crate::stats::{decode_stats, encode_stats, FieldStats};
use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use std::io::{Cursor, Read};

/// Descriptor of one SST data file. Immutable once written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SstFileMeta {
    pub file_name: String,
    pub file_size: u64,
    pub row_count: u64,
    pub min_key: Row,
    pub max_key: Row,
    pub key_stats: Vec<FieldStats>,
    pub value_stats: Vec<FieldStats>,
    /// Merge-tree tier; new writes enter at level 0.
    pub level: u32,
}

impl SstFileMeta {
    pub fn encode_into(&self, buf: &mut Vec<u8>) {
        buf.write_u32::<BigEndian>(self.file_name.len() as u32)
            .unwrap();
        buf.extend_from_slice(self.file_name.as_bytes());
        buf.write_u64::<BigEndian>(self.file_size).unwrap();
        buf.write_u64::<BigEndian>(self.row_count).unwrap();
        self.min_key.encode_into(buf);
        self.max_key.encode_into(buf);
        encode_stats(&self.key_stats, buf);
        encode_stats(&self.value_stats, buf);
        buf.write_u32::<BigEndian>(self.level).unwrap();
    }

    pub fn decode_from(cursor: &mut Cursor<&[u8]>) -> Result<Self> {
        let name_len = cursor.read_u32::<BigEndian>()? as usize;
        let mut name_bytes = vec![0u8; name_len];
        cursor.read_exact(&mut name_bytes)?;
        let file_name = String::from_utf8(name_bytes)
            .map_err(|e| crate::Error::Format(format!("invalid utf8 in file name: {e}")))?;

        let file_size = cursor.read_u64::<BigEndian>()?;
        let row_count = cursor.read_u64::<BigEndian>()?;
        let min_key = Row::decode_from(cursor)?;
        let max_key = Row::decode_from(cursor)?;
        let key_stats = decode_stats(cursor)?;
        let value_stats = decode_stats(cursor)?;
        let level = cursor.read_u32::<BigEndian>()?;

        Ok(SstFileMeta {
            file_name,
            file_size,
            row_count,
            min_key,
            max_key,
            key_stats,
            value_stats,
            level,
        })
    }
}
