use std::path::PathBuf;

/// Configuration for a table store.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Root directory of the table.
    pub root: PathBuf,

    /// Target size for a single manifest file before the writer rolls to a
    /// new one (default: 8MB).
    pub manifest_target_size: u64,

    /// Number of key/value records per SST data block (default: 1024).
    pub sst_block_rows: usize,

    /// Worker threads in the shared manifest scan pool (default: 4).
    pub scan_threads: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("./tidestore"),
            manifest_target_size: 8 * 1024 * 1024, // 8MB
            sst_block_rows: 1024,
            scan_threads: 4,
        }
    }
}

impl StoreConfig {
    /// Create a new config rooted at the given directory
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            ..Default::default()
        }
    }

    /// Set the manifest rolling threshold
    pub fn manifest_target_size(mut self, size: u64) -> Self {
        self.manifest_target_size = size;
        self
    }

    /// Set the rows per SST data block
    pub fn sst_block_rows(mut self, rows: usize) -> Self {
        self.sst_block_rows = rows;
        self
    }

    /// Set the scan pool size
    pub fn scan_threads(mut self, threads: usize) -> Self {
        self.scan_threads = threads;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = StoreConfig::default();
        assert_eq!(config.root, PathBuf::from("./tidestore"));
        assert_eq!(config.manifest_target_size, 8 * 1024 * 1024);
        assert_eq!(config.sst_block_rows, 1024);
        assert_eq!(config.scan_threads, 4);
    }

    #[test]
    fn test_config_builder() {
        let config = StoreConfig::new("/tmp/table")
            .manifest_target_size(1024)
            .sst_block_rows(16)
            .scan_threads(2);

        assert_eq!(config.root, PathBuf::from("/tmp/table"));
        assert_eq!(config.manifest_target_size, 1024);
        assert_eq!(config.sst_block_rows, 16);
        assert_eq!(config.scan_threads, 2);
    }
}
