//! Construction parameters for [`SpillBuffer`](crate::SpillBuffer).

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{BufferError, Result};

/// Default number of bytes held in memory before spilling: 5 MiB.
pub const DEFAULT_THRESHOLD: usize = 5 * 1024 * 1024;

/// Default size of each in-memory segment: 1 MiB.
pub const DEFAULT_SEGMENT_SIZE: usize = 1024 * 1024;

/// Builder-style configuration for a spill buffer.
///
/// `threshold` bytes are kept in memory, split into segments of at most
/// `segment_size` bytes. Everything written past the threshold goes to a
/// temporary file created in `temp_dir` (or the platform temp directory).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub threshold: usize,
    pub segment_size: usize,
    pub temp_dir: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
            segment_size: DEFAULT_SEGMENT_SIZE,
            temp_dir: None,
        }
    }
}

impl Config {
    pub fn with_threshold(mut self, threshold: usize) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn with_segment_size(mut self, segment_size: usize) -> Self {
        self.segment_size = segment_size;
        self
    }

    pub fn with_temp_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.temp_dir = Some(dir.as_ref().to_path_buf());
        self
    }

    /// Checks the construction preconditions.
    pub fn validate(&self) -> Result<()> {
        if self.segment_size == 0 {
            return Err(BufferError::InvalidSegmentSize);
        }
        Ok(())
    }

    /// Returns the sizes of the in-memory segments, in stream order.
    ///
    /// Full `segment_size` segments are laid out until the threshold is
    /// exhausted, followed by one partial segment for any remainder.
    pub fn segment_sizes(&self) -> Vec<usize> {
        if self.segment_size == 0 {
            return Vec::new();
        }
        let full = self.threshold / self.segment_size;
        let remainder = self.threshold % self.segment_size;

        let mut sizes = vec![self.segment_size; full];
        if remainder > 0 {
            sizes.push(remainder);
        }
        sizes
    }
}
