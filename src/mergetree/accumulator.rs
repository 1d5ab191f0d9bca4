//! Per-key combine functions for the merge read path.
//!
//! The merge reader feeds an accumulator every record sharing a key, in
//! newest-to-oldest order, then asks for at most one output record. Which
//! variant to use is table configuration, not a per-scan choice.

use crate::kv::ValueKind;
use crate::row::{Datum, Row};

/// Table-level choice of merge semantics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeFunction {
    /// Keep the newest record per key; a newest tombstone suppresses the key.
    Deduplicate,
    /// Fold integer value columns by addition.
    Sum,
}

impl MergeFunction {
    pub fn accumulator(self) -> Accumulator {
        match self {
            MergeFunction::Deduplicate => Accumulator::Deduplicate { current: None },
            MergeFunction::Sum => Accumulator::Sum {
                total: None,
                stopped: false,
                tombstone: false,
            },
        }
    }
}

/// Folds the records of one key into at most one output record.
#[derive(Debug, Clone)]
pub enum Accumulator {
    Deduplicate {
        current: Option<(Row, ValueKind)>,
    },
    Sum {
        total: Option<Row>,
        /// Once a tombstone is seen, records older than it are dead and
        /// must not contribute.
        stopped: bool,
        tombstone: bool,
    },
}

impl Accumulator {
    /// Begins a new key with its newest record.
    pub fn reset(&mut self, value: &Row, kind: ValueKind) {
        match self {
            Accumulator::Deduplicate { current } => {
                *current = Some((value.clone(), kind));
            }
            Accumulator::Sum {
                total,
                stopped,
                tombstone,
            } => {
                let deleted = kind == ValueKind::Delete;
                *tombstone = deleted;
                *stopped = deleted;
                *total = Some(value.clone());
            }
        }
    }

    /// Feeds one older record with the same key.
    pub fn add(&mut self, value: &Row, kind: ValueKind) {
        match self {
            // Newest record already won.
            Accumulator::Deduplicate { .. } => {}
            Accumulator::Sum {
                total,
                stopped,
                tombstone: _,
            } => {
                if *stopped {
                    return;
                }
                if kind == ValueKind::Delete {
                    *stopped = true;
                    return;
                }
                if let Some(acc) = total {
                    sum_into(acc, value);
                }
            }
        }
    }

    /// The merged record for the key, if any. A `Delete` kind marks a
    /// tombstone result; merged views drop it, changelog views emit it.
    pub fn result(&self) -> Option<(Row, ValueKind)> {
        match self {
            Accumulator::Deduplicate { current } => current.clone(),
            Accumulator::Sum {
                total, tombstone, ..
            } => total.clone().map(|row| {
                let kind = if *tombstone {
                    ValueKind::Delete
                } else {
                    ValueKind::Add
                };
                (row, kind)
            }),
        }
    }
}

/// Element-wise fold of `older` into `acc`. Integer fields add; a null on
/// either side yields the other side; non-integer fields keep the newer
/// (accumulated) value.
fn sum_into(acc: &mut Row, older: &Row) {
    for (a, o) in acc.0.iter_mut().zip(&older.0) {
        match (&*a, o) {
            (Datum::Int(x), Datum::Int(y)) => *a = Datum::Int(x + y),
            (Datum::Null, other) => *a = other.clone(),
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::row;
    use crate::row::Row;

    #[test]
    fn test_deduplicate_keeps_newest() {
        let mut acc = MergeFunction::Deduplicate.accumulator();
        acc.reset(&row![200], ValueKind::Add);
        acc.add(&row![20], ValueKind::Add);
        acc.add(&row![2], ValueKind::Add);

        assert_eq!(acc.result(), Some((row![200], ValueKind::Add)));
    }

    #[test]
    fn test_deduplicate_newest_tombstone() {
        let mut acc = MergeFunction::Deduplicate.accumulator();
        acc.reset(&row![0], ValueKind::Delete);
        acc.add(&row![20], ValueKind::Add);

        assert_eq!(acc.result(), Some((row![0], ValueKind::Delete)));
    }

    #[test]
    fn test_sum_folds_values() {
        let mut acc = MergeFunction::Sum.accumulator();
        acc.reset(&row![3], ValueKind::Add);
        acc.add(&row![2], ValueKind::Add);
        acc.add(&row![1], ValueKind::Add);

        assert_eq!(acc.result(), Some((row![6], ValueKind::Add)));
    }

    #[test]
    fn test_sum_stops_at_tombstone() {
        let mut acc = MergeFunction::Sum.accumulator();
        acc.reset(&row![5], ValueKind::Add);
        acc.add(&row![0], ValueKind::Delete);
        acc.add(&row![100], ValueKind::Add);

        // The record older than the delete is dead.
        assert_eq!(acc.result(), Some((row![5], ValueKind::Add)));
    }

    #[test]
    fn test_reset_clears_previous_key() {
        let mut acc = MergeFunction::Sum.accumulator();
        acc.reset(&row![3], ValueKind::Add);
        acc.add(&row![4], ValueKind::Add);

        acc.reset(&row![1], ValueKind::Add);
        assert_eq!(acc.result(), Some((row![1], ValueKind::Add)));
    }

    #[test]
    fn test_sum_null_field() {
        let mut acc = MergeFunction::Sum.accumulator();
        acc.reset(&Row::new(vec![Datum::Null]), ValueKind::Add);
        acc.add(&row![7], ValueKind::Add);

        assert_eq!(acc.result(), Some((row![7], ValueKind::Add)));
    }
}
