//! Data blocks of an SST file.
//!
//! A block is the unit of batched reading: `count:u32 | records | crc32`,
//! where the checksum covers everything before it. Records are
//! [`KeyValue`] codecs in ascending key order.

use crate::error::Result;
use crate::kv::KeyValue;
use crate::Error;
use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use crc::{Crc, CRC_32_ISCSI};
use std::io::Cursor;

const CRC32: Crc<u32> = Crc::<u32>::new(&CRC_32_ISCSI);

/// Encodes one block from the given records.
pub fn encode_block(records: &[KeyValue]) -> Vec<u8> {
    let mut body = Vec::new();
    body.write_u32::<BigEndian>(records.len() as u32).unwrap();
    for record in records {
        record.encode_into(&mut body);
    }
    let checksum = CRC32.checksum(&body);
    body.write_u32::<BigEndian>(checksum).unwrap();
    body
}

/// A decoded block handle that yields records lazily. Dropping it releases
/// the block buffer; it is the batch of the SST read contract.
#[derive(Debug)]
pub struct BlockIter {
    bytes: Vec<u8>,
    position: u64,
    remaining: u32,
}

impl BlockIter {
    /// Validates the block checksum and prepares lazy decoding.
    pub fn new(bytes: Vec<u8>) -> Result<Self> {
        if bytes.len() < 8 {
            return Err(Error::Format("block too short".to_string()));
        }
        let body = &bytes[..bytes.len() - 4];
        let stored = (&bytes[bytes.len() - 4..]).read_u32::<BigEndian>()?;
        if CRC32.checksum(body) != stored {
            return Err(Error::Format("block checksum mismatch".to_string()));
        }

        let mut cursor = Cursor::new(body);
        let remaining = cursor.read_u32::<BigEndian>()?;
        Ok(Self {
            bytes,
            position: 4,
            remaining,
        })
    }
}

impl Iterator for BlockIter {
    type Item = Result<KeyValue>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;

        let body = &self.bytes[..self.bytes.len() - 4];
        let mut cursor = Cursor::new(body);
        cursor.set_position(self.position);
        let record = KeyValue::decode_from(&mut cursor);
        self.position = cursor.position();
        Some(record)
    }
}
