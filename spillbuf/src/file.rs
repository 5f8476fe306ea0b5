//! Unbounded disk-backed segment.

use std::fs::File;
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::PathBuf;

use parking_lot::Mutex;
use tempfile::Builder;
use tracing::debug;

use crate::error::{BufferError, Result};
use crate::position::{Capacity, Position};
use crate::segment::Segment;

enum Handle {
    Pending,
    Open(File),
    Released,
}

/// An unbounded segment backed by a private temporary file.
///
/// The file is created on the first write that reaches this segment. Its
/// directory entry is removed right away; the data stays reachable through
/// two open handles, one for writes and one for reads, until the
/// segment is force-released.
pub struct FileSegment {
    temp_dir: Option<PathBuf>,
    writer: Mutex<Handle>,
    reader: Mutex<Handle>,
}

impl FileSegment {
    /// Creates a FileSegment whose file will live in `temp_dir`, or in the
    /// platform temp directory when `None`.
    pub fn new(temp_dir: Option<PathBuf>) -> Self {
        FileSegment {
            temp_dir,
            writer: Mutex::new(Handle::Pending),
            reader: Mutex::new(Handle::Pending),
        }
    }

    /// Returns true once any byte has been written to disk.
    pub fn is_spilled(&self) -> bool {
        !matches!(*self.writer.lock(), Handle::Pending)
    }

    #[cfg(test)]
    fn is_released(&self) -> bool {
        matches!(*self.writer.lock(), Handle::Released)
    }

    fn create(&self) -> Result<File> {
        let mut builder = Builder::new();
        builder.prefix("spillbuf-");
        let named = match &self.temp_dir {
            Some(dir) => builder.tempfile_in(dir)?,
            None => builder.tempfile()?,
        };
        debug!("spillbuf: spilling to {}", named.path().display());

        *self.reader.lock() = Handle::Open(named.reopen()?);
        Ok(named.into_file())
    }
}

impl Segment for FileSegment {
    fn capacity(&self) -> Capacity {
        Capacity::Unbounded
    }

    fn read(&self, pos: Position, dst: &mut [u8]) -> Result<usize> {
        let n = (dst.len() as u64).min(pos.available()) as usize;
        if n == 0 {
            return Ok(0);
        }

        let mut reader = self.reader.lock();
        let file = match &mut *reader {
            Handle::Open(file) => file,
            _ => return Err(BufferError::Released),
        };
        file.seek(SeekFrom::Start(pos.read_pos))?;
        file.read_exact(&mut dst[..n])?;
        Ok(n)
    }

    /// Writes at `pos.write_count`, so bytes left behind by a failed write
    /// are overwritten by the next one instead of shifting the stream.
    fn write(&self, pos: Position, src: &[u8]) -> Result<usize> {
        if src.is_empty() {
            return Ok(0);
        }

        let mut writer = self.writer.lock();
        if matches!(*writer, Handle::Pending) {
            *writer = Handle::Open(self.create()?);
        }
        let file = match &mut *writer {
            Handle::Open(file) => file,
            _ => return Err(BufferError::Released),
        };
        file.seek(SeekFrom::Start(pos.write_count))?;
        file.write_all(src)?;
        Ok(src.len())
    }

    fn release(&self, force: bool) {
        if !force {
            return;
        }
        *self.writer.lock() = Handle::Released;
        *self.reader.lock() = Handle::Released;
    }
}
