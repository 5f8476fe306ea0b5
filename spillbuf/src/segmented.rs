//! Composite segment spanning the whole stream.

use std::sync::atomic::{AtomicUsize, Ordering};

use tracing::{debug, trace};

use crate::config::Config;
use crate::error::Result;
use crate::file::FileSegment;
use crate::memory::MemorySegment;
use crate::position::{Capacity, Position};
use crate::segment::Segment;

/// An ordered, fixed list of segments presented as one unbounded segment.
///
/// The list is laid out once as zero or more [`MemorySegment`]s followed by
/// a single [`FileSegment`]. Absolute stream positions are translated into
/// each segment's coordinates on every call, so the composite itself holds
/// no cursor state.
pub struct SegmentedBuffer {
    segments: Vec<Box<dyn Segment>>,
    // Count of leading segments already released incrementally.
    released: AtomicUsize,
}

impl SegmentedBuffer {
    /// Creates a SegmentedBuffer over `segments`.
    ///
    /// Every segment but the last must be bounded, and the last must be
    /// unbounded.
    pub fn new(segments: Vec<Box<dyn Segment>>) -> Self {
        debug_assert!(matches!(
            segments.last().map(|s| s.capacity()),
            Some(Capacity::Unbounded)
        ));
        debug_assert!(
            segments
                .iter()
                .rev()
                .skip(1)
                .all(|s| s.capacity() != Capacity::Unbounded)
        );
        SegmentedBuffer {
            segments,
            released: AtomicUsize::new(0),
        }
    }

    /// Lays out the in-memory segments described by `config`, then the
    /// spill segment.
    pub fn from_config(config: &Config) -> Self {
        let mut segments: Vec<Box<dyn Segment>> = config
            .segment_sizes()
            .into_iter()
            .map(|size| Box::new(MemorySegment::new(size)) as Box<dyn Segment>)
            .collect();
        segments.push(Box::new(FileSegment::new(config.temp_dir.clone())));
        Self::new(segments)
    }

    /// Returns the number of segments, including the spill segment.
    pub fn segment_count(&self) -> usize {
        self.segments.len()
    }

    /// Returns the total capacity of the bounded segments.
    pub fn memory_capacity(&self) -> u64 {
        self.segments
            .iter()
            .filter_map(|s| s.capacity().limit())
            .sum()
    }

    /// Returns how many of `write_count` bytes went past the memory budget.
    pub fn spilled_bytes(&self, write_count: u64) -> u64 {
        write_count.saturating_sub(self.memory_capacity())
    }

    /// Returns the number of segments released so far while live.
    pub fn released_segments(&self) -> usize {
        self.released.load(Ordering::Acquire)
    }

    /// Releases storage behind the read cursor.
    ///
    /// With `closed` set every segment is force-released. Otherwise each
    /// bounded segment whose end is at or behind `pos.read_pos` is released,
    /// stopping at the first one that still holds unread bytes.
    pub fn release_at(&self, closed: bool, pos: Position) {
        if closed {
            for segment in &self.segments {
                segment.release(true);
            }
            self.released.store(self.segments.len(), Ordering::Release);
            debug!("spillbuf: released all {} segments", self.segments.len());
            return;
        }

        let mut end = 0u64;
        for (i, segment) in self.segments.iter().enumerate() {
            let Some(n) = segment.capacity().limit() else {
                break;
            };
            end += n;
            if end > pos.read_pos {
                break;
            }
            if i >= self.released.load(Ordering::Acquire) {
                segment.release(false);
                self.released.store(i + 1, Ordering::Release);
                trace!("spillbuf: released segment {} (end={})", i, end);
            }
        }
    }
}

impl Segment for SegmentedBuffer {
    fn capacity(&self) -> Capacity {
        Capacity::Unbounded
    }

    /// Reads across segments starting at the absolute `pos.read_pos`.
    ///
    /// Each segment is visited at most once per call, so a segment with
    /// nothing to give cannot stall the scan.
    fn read(&self, pos: Position, dst: &mut [u8]) -> Result<usize> {
        let mut pos = pos;
        let mut start = 0u64;
        let mut total = 0;

        for segment in &self.segments {
            if total == dst.len() {
                break;
            }
            let capacity = segment.capacity();
            if let Some(rel) = pos.relative_to(start, capacity).for_read(capacity) {
                let n = segment.read(rel, &mut dst[total..])?;
                total += n;
                pos.read_pos += n as u64;
            }
            if let Some(n) = capacity.limit() {
                start += n;
            }
        }
        Ok(total)
    }

    /// Writes across segments starting at the absolute `pos.write_count`.
    fn write(&self, pos: Position, src: &[u8]) -> Result<usize> {
        let mut pos = pos;
        let mut start = 0u64;
        let mut total = 0;

        for segment in &self.segments {
            if total == src.len() {
                break;
            }
            let capacity = segment.capacity();
            if let Some(rel) = pos.relative_to(start, capacity).for_write() {
                let n = segment.write(rel, &src[total..])?;
                total += n;
                pos.write_count += n as u64;
            }
            if let Some(n) = capacity.limit() {
                start += n;
            }
        }
        Ok(total)
    }

    /// Force-releases every segment. Incremental release needs the read
    /// cursor and goes through [`SegmentedBuffer::release_at`].
    fn release(&self, force: bool) {
        if force {
            self.release_at(true, Position::default());
        }
    }
}
