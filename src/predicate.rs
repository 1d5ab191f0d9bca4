//! Boolean expressions over partition, key, and value fields.
//!
//! Predicates evaluate two ways: exactly against a concrete row, and
//! conservatively against per-column min/max/null-count stats. The stats
//! form must never return `false` when some covered row could match, so
//! pruning stays sound.

use crate::error::Result;
use crate::row::{Datum, DatumKind, Row, RowType};
use crate::stats::FieldStats;
use crate::Error;

/// A typed constant compared against a field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Literal {
    pub kind: DatumKind,
    pub value: Datum,
}

impl Literal {
    pub fn new(kind: DatumKind, value: Datum) -> Self {
        Self { kind, value }
    }
}

/// Predicate expression tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Predicate {
    Equal { field: usize, literal: Literal },
    And(Box<Predicate>, Box<Predicate>),
    Or(Box<Predicate>, Box<Predicate>),
}

impl Predicate {
    pub fn equal(field: usize, literal: Literal) -> Self {
        Predicate::Equal { field, literal }
    }

    pub fn and(left: Predicate, right: Predicate) -> Self {
        Predicate::And(Box::new(left), Box::new(right))
    }

    pub fn or(left: Predicate, right: Predicate) -> Self {
        Predicate::Or(Box::new(left), Box::new(right))
    }

    /// Exact evaluation against one row.
    pub fn test(&self, row: &Row) -> bool {
        match self {
            Predicate::Equal { field, literal } => {
                row.field(*field).is_some_and(|datum| *datum == literal.value)
            }
            Predicate::And(l, r) => l.test(row) && r.test(row),
            Predicate::Or(l, r) => l.test(row) || r.test(row),
        }
    }

    /// Conservative evaluation against column summaries. Returns `true`
    /// whenever any row covered by the stats could satisfy the predicate.
    pub fn test_stats(&self, row_count: u64, stats: &[FieldStats]) -> bool {
        if row_count == 0 {
            return false;
        }
        match self {
            Predicate::Equal { field, literal } => {
                let Some(s) = stats.get(*field) else {
                    // No stats collected for this column; cannot prune.
                    return true;
                };
                if literal.value.is_null() {
                    return s.null_count > 0;
                }
                if s.min.is_null() || s.max.is_null() {
                    // Bounds stay null only when no non-null value was seen.
                    return s.null_count < row_count;
                }
                if s.min.kind() != literal.value.kind() {
                    return true;
                }
                s.min <= literal.value && literal.value <= s.max
            }
            Predicate::And(l, r) => {
                l.test_stats(row_count, stats) && r.test_stats(row_count, stats)
            }
            Predicate::Or(l, r) => {
                l.test_stats(row_count, stats) || r.test_stats(row_count, stats)
            }
        }
    }

    /// Checks field indices and literal types against a schema. Failures
    /// surface as `FilterTypeMismatch` at plan time.
    pub fn validate(&self, row_type: &RowType) -> Result<()> {
        match self {
            Predicate::Equal { field, literal } => {
                let Some(kind) = row_type.kind(*field) else {
                    return Err(Error::FilterTypeMismatch(format!(
                        "field index {field} out of range for arity {}",
                        row_type.arity()
                    )));
                };
                if literal.kind != kind {
                    return Err(Error::FilterTypeMismatch(format!(
                        "literal kind {:?} does not match field {field} kind {kind:?}",
                        literal.kind
                    )));
                }
                if !literal.value.matches(literal.kind) {
                    return Err(Error::FilterTypeMismatch(format!(
                        "literal value {:?} is not a {:?}",
                        literal.value, literal.kind
                    )));
                }
                Ok(())
            }
            Predicate::And(l, r) | Predicate::Or(l, r) => {
                l.validate(row_type)?;
                r.validate(row_type)
            }
        }
    }
}

/// Builds a disjunction of per-partition conjunctions: one `Equal` per
/// field, `And`-combined within a row, `Or`-combined across rows. Rows of
/// arity zero contribute nothing; an empty result means no filtering.
pub fn from_partitions(row_type: &RowType, partitions: &[Row]) -> Option<Predicate> {
    partitions
        .iter()
        .filter(|p| p.arity() > 0)
        .map(|partition| {
            partition
                .0
                .iter()
                .enumerate()
                .map(|(i, datum)| {
                    let kind = row_type.kind(i).expect("partition arity matches schema");
                    Predicate::equal(i, Literal::new(kind, datum.clone()))
                })
                .reduce(Predicate::and)
                .expect("non-zero arity")
        })
        .reduce(Predicate::or)
}
