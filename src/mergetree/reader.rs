//! The merge-tree read path: a k-way merge over sorted SST files producing
//! one deduplicated, key-ordered stream.
//!
//! # Merge strategy
//!
//! Each input file is internally sorted, so a min-heap over the heads of
//! all inputs yields records in global key order:
//!
//! ```text
//! Files:  [a, d, g, ...]  [b, e, h, ...]  [c, f, i, ...]
//!             |               |               |
//! Heap:   [   a,              b,              c   ]
//!             | (pop minimum)
//! Output:     a
//! ```
//!
//! Inputs are ordered newest-first (ascending level, newer files first
//! within a level), and the heap breaks key ties by that order, so the
//! accumulator always sees a key's records newest-to-oldest. Each input
//! pulls one block at a time; memory stays bounded by one batch per file.

use super::accumulator::{Accumulator, MergeFunction};
use super::sst::block::BlockIter;
use super::sst::SstFileReader;
use crate::error::Result;
use crate::kv::{KeyValue, ValueKind};
use crate::manifest::ManifestEntry;
use crate::path::SstPathFactory;
use crate::pool::CancelToken;
use crate::row::Row;
use itertools::Itertools;
use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;

/// One input file, pulling a single batch at a time.
struct SourceCursor {
    reader: SstFileReader,
    batch: Option<BlockIter>,
    token: CancelToken,
}

impl SourceCursor {
    fn new(reader: SstFileReader, token: CancelToken) -> Self {
        Self {
            reader,
            batch: None,
            token,
        }
    }

    fn next(&mut self) -> Result<Option<KeyValue>> {
        loop {
            if let Some(batch) = &mut self.batch {
                match batch.next() {
                    Some(record) => return record.map(Some),
                    None => self.batch = None,
                }
            }
            // Between batches is the cancellation point; an in-flight
            // block read always completes.
            self.token.check()?;
            match self.reader.read_batch()? {
                Some(batch) => self.batch = Some(batch),
                None => return Ok(None),
            }
        }
    }
}

struct HeapEntry {
    key: Row,
    value: Row,
    kind: ValueKind,
    source: usize,
}

impl PartialEq for HeapEntry {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key && self.source == other.source
    }
}

impl Eq for HeapEntry {}

impl PartialOrd for HeapEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for HeapEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        match self.key.cmp(&other.key) {
            // Lower source index = newer data, surfaced first.
            Ordering::Equal => self.source.cmp(&other.source).reverse(),
            order => order.reverse(), // Reverse for min-heap behavior
        }
    }
}

/// Merges the SST files of one (partition, bucket) at a snapshot into a
/// strictly key-ascending stream with at most one record per key.
pub struct MergeTreeReader {
    sources: Vec<SourceCursor>,
    heap: BinaryHeap<HeapEntry>,
    current_key: Option<Row>,
    accumulator: Accumulator,
    drop_tombstones: bool,
    done: bool,
}

impl MergeTreeReader {
    /// Builds a reader over already-opened inputs ordered newest-first.
    pub fn new(
        readers: Vec<SstFileReader>,
        function: MergeFunction,
        drop_tombstones: bool,
        token: CancelToken,
    ) -> Result<Self> {
        let mut sources: Vec<_> = readers
            .into_iter()
            .map(|reader| SourceCursor::new(reader, token.clone()))
            .collect();

        let mut heap = BinaryHeap::new();
        for (source, cursor) in sources.iter_mut().enumerate() {
            if let Some(kv) = cursor.next()? {
                heap.push(HeapEntry {
                    key: kv.key,
                    value: kv.value,
                    kind: kv.kind,
                    source,
                });
            }
        }

        Ok(Self {
            sources,
            heap,
            current_key: None,
            accumulator: function.accumulator(),
            drop_tombstones,
            done: false,
        })
    }

    /// Opens the SST files behind a plan's entries for one
    /// (partition, bucket). Ordering is derived from the merge-tree level:
    /// lower levels are newer, and within a level later-committed files
    /// are newer.
    pub fn for_entries(
        entries: &[ManifestEntry],
        factory: &SstPathFactory,
        function: MergeFunction,
        drop_tombstones: bool,
        token: CancelToken,
    ) -> Result<Self> {
        let readers = entries
            .iter()
            .enumerate()
            .sorted_by_key(|(position, entry)| (entry.file.level, Reverse(*position)))
            .map(|(_, entry)| SstFileReader::open(&factory.to_path(&entry.file.file_name)))
            .collect::<Result<Vec<_>>>()?;
        Self::new(readers, function, drop_tombstones, token)
    }

    /// Closes out the key being accumulated, if it produces output.
    fn finish_current(&mut self) -> Option<KeyValue> {
        let key = self.current_key.take()?;
        let (value, kind) = self.accumulator.result()?;
        if self.drop_tombstones && kind == ValueKind::Delete {
            return None;
        }
        Some(KeyValue { key, value, kind })
    }
}

impl Iterator for MergeTreeReader {
    type Item = Result<KeyValue>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        loop {
            let Some(top) = self.heap.pop() else {
                self.done = true;
                return self.finish_current().map(Ok);
            };

            // Keep the popped source flowing before folding the record.
            match self.sources[top.source].next() {
                Ok(Some(kv)) => self.heap.push(HeapEntry {
                    key: kv.key,
                    value: kv.value,
                    kind: kv.kind,
                    source: top.source,
                }),
                Ok(None) => {}
                Err(e) => {
                    tracing::warn!(error = %e, "merge read terminated");
                    self.done = true;
                    return Some(Err(e));
                }
            }

            if self.current_key.as_ref() == Some(&top.key) {
                self.accumulator.add(&top.value, top.kind);
                continue;
            }

            let ready = self.finish_current();
            self.current_key = Some(top.key);
            self.accumulator.reset(&top.value, top.kind);
            if let Some(kv) = ready {
                return Some(Ok(kv));
            }
        }
    }
}
