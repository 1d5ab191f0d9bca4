//! Per-column min/max/null-count summaries.
//!
//! Stats are collected while writing manifests and SST files and consumed
//! by predicate range-pruning. A column that never saw a non-null value
//! keeps `Null` as both bounds.

use crate::error::Result;
use crate::row::{Datum, Row};
use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use std::io::Cursor;

/// Summary of one column over a set of rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldStats {
    pub min: Datum,
    pub max: Datum,
    pub null_count: u64,
}

impl FieldStats {
    pub fn empty() -> Self {
        Self {
            min: Datum::Null,
            max: Datum::Null,
            null_count: 0,
        }
    }

    pub fn encode_into(&self, buf: &mut Vec<u8>) {
        self.min.encode_into(buf);
        self.max.encode_into(buf);
        buf.write_u64::<BigEndian>(self.null_count).unwrap();
    }

    pub fn decode_from(cursor: &mut Cursor<&[u8]>) -> Result<Self> {
        let min = Datum::decode_from(cursor)?;
        let max = Datum::decode_from(cursor)?;
        let null_count = cursor.read_u64::<BigEndian>()?;
        Ok(FieldStats {
            min,
            max,
            null_count,
        })
    }
}

/// Encodes a full stats vector (one entry per column).
pub fn encode_stats(stats: &[FieldStats], buf: &mut Vec<u8>) {
    buf.write_u32::<BigEndian>(stats.len() as u32).unwrap();
    for s in stats {
        s.encode_into(buf);
    }
}

pub fn decode_stats(cursor: &mut Cursor<&[u8]>) -> Result<Vec<FieldStats>> {
    let count = cursor.read_u32::<BigEndian>()? as usize;
    let mut stats = Vec::with_capacity(count);
    for _ in 0..count {
        stats.push(FieldStats::decode_from(cursor)?);
    }
    Ok(stats)
}

/// Folds rows into per-column stats. Arity is fixed at construction; all
/// collected rows must match it.
#[derive(Debug, Clone)]
pub struct StatsCollector {
    columns: Vec<FieldStats>,
    rows: u64,
}

impl StatsCollector {
    pub fn new(arity: usize) -> Self {
        Self {
            columns: vec![FieldStats::empty(); arity],
            rows: 0,
        }
    }

    pub fn collect(&mut self, row: &Row) {
        debug_assert_eq!(row.arity(), self.columns.len());
        self.rows += 1;
        for (stats, datum) in self.columns.iter_mut().zip(&row.0) {
            if datum.is_null() {
                stats.null_count += 1;
                continue;
            }
            if stats.min.is_null() || *datum < stats.min {
                stats.min = datum.clone();
            }
            if stats.max.is_null() || *datum > stats.max {
                stats.max = datum.clone();
            }
        }
    }

    pub fn row_count(&self) -> u64 {
        self.rows
    }

    pub fn finish(self) -> Vec<FieldStats> {
        self.columns
    }
}
