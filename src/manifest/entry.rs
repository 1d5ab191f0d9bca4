use crate::error::Result;
use crate::mergetree::sst::SstFileMeta;
use crate::row::Row;
use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use std::io::Cursor;

const KIND_ADD: u8 = 0x00;
const KIND_DELETE: u8 = 0x01;

/// Whether an entry adds a file to the table or removes one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Add,
    Delete,
}

impl FileKind {
    pub fn to_u8(self) -> u8 {
        match self {
            FileKind::Add => KIND_ADD,
            FileKind::Delete => KIND_DELETE,
        }
    }

    pub fn from_u8(byte: u8) -> Result<Self> {
        match byte {
            KIND_ADD => Ok(FileKind::Add),
            KIND_DELETE => Ok(FileKind::Delete),
            other => crate::errformat!("unknown file kind {other:#04x}"),
        }
    }
}

/// One ADD or DELETE event for one SST file.
///
/// Across all manifests of a snapshot's closure, each [`Identifier`] must
/// appear as exactly one ADD followed by at most one DELETE; any other
/// pattern is corruption.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestEntry {
    pub kind: FileKind,
    pub partition: Row,
    pub bucket: u32,
    pub file: SstFileMeta,
}

/// Globally unique identity of an entry within a table.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Identifier {
    pub partition: Row,
    pub bucket: u32,
    pub file_name: String,
}

impl std::fmt::Display for Identifier {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(
            f,
            "{:?}/bucket-{}/{}",
            self.partition.0, self.bucket, self.file_name
        )
    }
}

impl ManifestEntry {
    pub fn add(partition: Row, bucket: u32, file: SstFileMeta) -> Self {
        Self {
            kind: FileKind::Add,
            partition,
            bucket,
            file,
        }
    }

    pub fn delete(partition: Row, bucket: u32, file: SstFileMeta) -> Self {
        Self {
            kind: FileKind::Delete,
            partition,
            bucket,
            file,
        }
    }

    pub fn identifier(&self) -> Identifier {
        Identifier {
            partition: self.partition.clone(),
            bucket: self.bucket,
            file_name: self.file.file_name.clone(),
        }
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        buf.write_u8(self.kind.to_u8()).unwrap();
        self.partition.encode_into(&mut buf);
        buf.write_u32::<BigEndian>(self.bucket).unwrap();
        self.file.encode_into(&mut buf);
        buf
    }

    pub fn decode(buf: &[u8]) -> Result<Self> {
        let mut cursor = Cursor::new(buf);
        let kind = FileKind::from_u8(cursor.read_u8()?)?;
        let partition = Row::decode_from(&mut cursor)?;
        let bucket = cursor.read_u32::<BigEndian>()?;
        let file = SstFileMeta::decode_from(&mut cursor)?;
        Ok(ManifestEntry {
            kind,
            partition,
            bucket,
            file,
        })
    }
}
