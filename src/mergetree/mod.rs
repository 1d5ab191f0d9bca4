//! The merge tree: leveled, sorted SST files merged at read time.

pub mod accumulator;
pub mod reader;
pub mod sst;

pub use accumulator::{Accumulator, MergeFunction};
pub use reader::MergeTreeReader;
pub use sst::{SstFileMeta, SstFileReader, SstFileWriter};
