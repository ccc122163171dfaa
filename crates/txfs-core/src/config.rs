//! Configuration for a txfs store.

use std::fs::File;

/// Sync mode applied after log appends and cleanup rewrites.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SyncMode {
    /// No explicit sync - rely on the OS flushing the buffered write.
    None,
    /// Use fdatasync after each write.
    #[default]
    Fdatasync,
    /// Use full fsync after each write.
    Fsync,
}

impl SyncMode {
    /// Apply this sync mode to an already-flushed file handle.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying sync syscall fails.
    pub fn apply(self, file: &File) -> std::io::Result<()> {
        match self {
            Self::None => Ok(()),
            Self::Fdatasync => file.sync_data(),
            Self::Fsync => file.sync_all(),
        }
    }
}

/// Configuration for a store, chosen at init time.
#[derive(Debug, Clone, Copy, Default)]
pub struct StoreConfig {
    /// Emit per-operation diagnostics at `info` level instead of `debug`.
    pub verbose: bool,
    /// Durability mode for log appends and cleanup rewrites.
    pub sync_mode: SyncMode,
}

impl StoreConfig {
    /// Configuration with verbose diagnostics enabled.
    #[must_use]
    pub fn verbose() -> Self {
        Self { verbose: true, ..Self::default() }
    }

    /// Configuration optimized for throughput over durability.
    ///
    /// Log appends are buffered writes with no explicit sync; a crash can
    /// lose the last committed records.
    #[must_use]
    pub fn fast() -> Self {
        Self { sync_mode: SyncMode::None, ..Self::default() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = StoreConfig::default();
        assert!(!config.verbose);
        assert_eq!(config.sync_mode, SyncMode::Fdatasync);

        assert_eq!(StoreConfig::fast().sync_mode, SyncMode::None);
        assert!(StoreConfig::verbose().verbose);
    }
}
