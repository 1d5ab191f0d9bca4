use crate::error::Result;
use crate::row::Row;
use byteorder::{ReadBytesExt, WriteBytesExt};
use std::io::Cursor;

const KIND_ADD: u8 = 0x00;
const KIND_DELETE: u8 = 0x01;

/// Distinguishes an upsert from a tombstone at the row level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Add,
    Delete,
}

impl ValueKind {
    pub fn to_u8(self) -> u8 {
        match self {
            ValueKind::Add => KIND_ADD,
            ValueKind::Delete => KIND_DELETE,
        }
    }

    pub fn from_u8(byte: u8) -> Result<Self> {
        match byte {
            KIND_ADD => Ok(ValueKind::Add),
            KIND_DELETE => Ok(ValueKind::Delete),
            other => crate::errformat!("unknown value kind {other:#04x}"),
        }
    }
}

/// One keyed update: a key row, a value row, and the update kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyValue {
    pub key: Row,
    pub value: Row,
    pub kind: ValueKind,
}

impl KeyValue {
    pub fn add(key: Row, value: Row) -> Self {
        Self {
            key,
            value,
            kind: ValueKind::Add,
        }
    }

    pub fn delete(key: Row, value: Row) -> Self {
        Self {
            key,
            value,
            kind: ValueKind::Delete,
        }
    }

    pub fn encode_into(&self, buf: &mut Vec<u8>) {
        buf.write_u8(self.kind.to_u8()).unwrap();
        self.key.encode_into(buf);
        self.value.encode_into(buf);
    }

    pub fn decode_from(cursor: &mut Cursor<&[u8]>) -> Result<Self> {
        let kind = ValueKind::from_u8(cursor.read_u8()?)?;
        let key = Row::decode_from(cursor)?;
        let value = Row::decode_from(cursor)?;
        Ok(KeyValue { key, value, kind })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::row;
    use crate::Error;

    #[test]
    fn test_keyvalue_roundtrip() {
        let original = KeyValue::add(row![1], row![10]);

        let mut buf = Vec::new();
        original.encode_into(&mut buf);

        let mut cursor = Cursor::new(buf.as_slice());
        let decoded = KeyValue::decode_from(&mut cursor).expect("Failed to decode");
        assert_eq!(decoded, original);
    }

    #[test]
    fn test_tombstone_roundtrip() {
        let original = KeyValue::delete(row![2], Row::empty());

        let mut buf = Vec::new();
        original.encode_into(&mut buf);

        let mut cursor = Cursor::new(buf.as_slice());
        let decoded = KeyValue::decode_from(&mut cursor).expect("Failed to decode");
        assert_eq!(decoded, original);
        assert_eq!(decoded.kind, ValueKind::Delete);
    }

    #[test]
    fn test_unknown_kind_rejected() {
        assert!(matches!(ValueKind::from_u8(0x7F), Err(Error::Format(_))));
    }
}
