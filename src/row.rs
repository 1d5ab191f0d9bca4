//! Fixed-schema row tuples used for keys, values, and partitions.
//!
//! Rows are small ordered tuples of [`Datum`]s. All metadata codecs encode
//! rows with the same framing: a field count followed by one tagged datum
//! per field. Ordering is lexicographic over the fields, which gives the
//! key comparator used by the merge path.

use crate::error::Result;
use crate::Error;
use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use std::fmt::Display;
use std::io::{Cursor, Read};

const TAG_NULL: u8 = 0x00;
const TAG_INT: u8 = 0x01;
const TAG_STR: u8 = 0x02;

/// A single field value.
///
/// The derived ordering sorts nulls first, then integers, then strings;
/// fixed schemas mean cross-kind comparisons never decide real key order.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Datum {
    Null,
    Int(i64),
    Str(String),
}

/// The type of a non-null datum.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatumKind {
    Int,
    Str,
}

impl Datum {
    /// The kind of this datum, or `None` for null.
    pub fn kind(&self) -> Option<DatumKind> {
        match self {
            Datum::Null => None,
            Datum::Int(_) => Some(DatumKind::Int),
            Datum::Str(_) => Some(DatumKind::Str),
        }
    }

    /// Whether this datum can inhabit a field of the given kind. Null
    /// inhabits every kind.
    pub fn matches(&self, kind: DatumKind) -> bool {
        self.kind().map_or(true, |k| k == kind)
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Datum::Null)
    }

    pub fn encode_into(&self, buf: &mut Vec<u8>) {
        match self {
            Datum::Null => buf.write_u8(TAG_NULL).unwrap(),
            Datum::Int(v) => {
                buf.write_u8(TAG_INT).unwrap();
                buf.write_i64::<BigEndian>(*v).unwrap();
            }
            Datum::Str(s) => {
                buf.write_u8(TAG_STR).unwrap();
                buf.write_u32::<BigEndian>(s.len() as u32).unwrap();
                buf.extend_from_slice(s.as_bytes());
            }
        }
    }

    pub fn decode_from(cursor: &mut Cursor<&[u8]>) -> Result<Self> {
        match cursor.read_u8()? {
            TAG_NULL => Ok(Datum::Null),
            TAG_INT => Ok(Datum::Int(cursor.read_i64::<BigEndian>()?)),
            TAG_STR => {
                let len = cursor.read_u32::<BigEndian>()? as usize;
                let mut bytes = vec![0u8; len];
                cursor.read_exact(&mut bytes)?;
                let s = String::from_utf8(bytes)
                    .map_err(|e| Error::Format(format!("invalid utf8 in datum: {e}")))?;
                Ok(Datum::Str(s))
            }
            tag => crate::errformat!("unknown datum tag {tag:#04x}"),
        }
    }
}

impl Display for Datum {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Datum::Null => write!(f, "null"),
            Datum::Int(v) => write!(f, "{v}"),
            Datum::Str(s) => write!(f, "{s}"),
        }
    }
}

impl From<i64> for Datum {
    fn from(v: i64) -> Self {
        Datum::Int(v)
    }
}

impl From<&str> for Datum {
    fn from(s: &str) -> Self {
        Datum::Str(s.to_string())
    }
}

/// A fixed-arity tuple of datums.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Row(pub Vec<Datum>);

impl Row {
    pub fn new(fields: Vec<Datum>) -> Self {
        Self(fields)
    }

    /// The empty row, used as the partition of unpartitioned tables.
    pub fn empty() -> Self {
        Self(Vec::new())
    }

    pub fn arity(&self) -> usize {
        self.0.len()
    }

    pub fn field(&self, idx: usize) -> Option<&Datum> {
        self.0.get(idx)
    }

    pub fn encode_into(&self, buf: &mut Vec<u8>) {
        buf.write_u32::<BigEndian>(self.0.len() as u32).unwrap();
        for datum in &self.0 {
            datum.encode_into(buf);
        }
    }

    pub fn decode_from(cursor: &mut Cursor<&[u8]>) -> Result<Self> {
        let arity = cursor.read_u32::<BigEndian>()? as usize;
        let mut fields = Vec::with_capacity(arity);
        for _ in 0..arity {
            fields.push(Datum::decode_from(cursor)?);
        }
        Ok(Row(fields))
    }
}

/// The schema of a row: one kind per field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowType(pub Vec<DatumKind>);

impl RowType {
    pub fn new(kinds: Vec<DatumKind>) -> Self {
        Self(kinds)
    }

    pub fn arity(&self) -> usize {
        self.0.len()
    }

    pub fn kind(&self, idx: usize) -> Option<DatumKind> {
        self.0.get(idx).copied()
    }
}

/// Convenience constructor for integer rows, the common shape in tests.
#[macro_export]
macro_rules! row {
    ($($v:expr),* $(,)?) => {
        $crate::row::Row::new(vec![$($crate::row::Datum::from($v)),*])
    };
}
