//! The storage contract shared by every segment kind.

use crate::error::Result;
use crate::position::{Capacity, Position};

/// A contiguous range of the byte stream backed by one storage medium.
///
/// A segment never knows where it sits in the stream. Every call receives
/// cursors already translated into the segment's own coordinates, with
/// `pos.write_count` clamped to the capacity for reads.
///
/// Reads and writes are partial transfers: they move as many bytes as the
/// segment can take or hold and return that count, which may be 0.
/// Callers loop or move on to the next segment.
pub trait Segment: Send + Sync {
    /// Returns the storage capacity of this segment.
    fn capacity(&self) -> Capacity;

    /// Copies up to `dst.len()` bytes starting at `pos.read_pos`.
    fn read(&self, pos: Position, dst: &mut [u8]) -> Result<usize>;

    /// Stores up to `src.len()` bytes starting at `pos.write_count`.
    fn write(&self, pos: Position, src: &[u8]) -> Result<usize>;

    /// Drops the storage behind this segment.
    ///
    /// `force` is set only for whole-buffer teardown. Releasing twice is a
    /// no-op.
    fn release(&self, force: bool);
}
