//! Stream cursors and their translation into segment coordinates.

/// Read cursor and write counter of a byte stream.
///
/// `read_pos <= write_count` always holds for the absolute position of a
/// buffer. `read_pos` only moves on the consumer thread and `write_count`
/// only on the producer thread.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Position {
    pub read_pos: u64,
    pub write_count: u64,
}

/// Storage capacity of a segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capacity {
    Bounded(u64),
    Unbounded,
}

impl Capacity {
    /// Returns the byte limit, or `None` for an unbounded segment.
    pub fn limit(self) -> Option<u64> {
        match self {
            Capacity::Bounded(n) => Some(n),
            Capacity::Unbounded => None,
        }
    }
}

/// A [`Position`] translated into one segment's coordinate space.
///
/// `None` means the cursor is not in range for the segment: it lies before
/// the segment start or past its end.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelativePosition {
    pub read_pos: Option<u64>,
    pub write_count: Option<u64>,
}

impl Position {
    pub fn new(read_pos: u64, write_count: u64) -> Self {
        debug_assert!(read_pos <= write_count);
        Self {
            read_pos,
            write_count,
        }
    }

    /// Number of bytes written but not yet read.
    pub fn available(&self) -> u64 {
        self.write_count.saturating_sub(self.read_pos)
    }

    /// Translates this absolute position into the coordinates of a segment
    /// starting at `start`.
    ///
    /// A cursor exactly at `start + capacity` stays in range: it belongs to
    /// the current, now full (or drained), segment and not to the next one.
    pub fn relative_to(&self, start: u64, capacity: Capacity) -> RelativePosition {
        let translate = |abs: u64| -> Option<u64> {
            if abs < start {
                return None;
            }
            match capacity {
                Capacity::Bounded(n) if abs > start + n => None,
                _ => Some(abs - start),
            }
        };

        RelativePosition {
            read_pos: translate(self.read_pos),
            write_count: translate(self.write_count),
        }
    }
}

impl RelativePosition {
    /// Resolves the cursors a segment should read with, or `None` if the
    /// read cursor is outside the segment.
    ///
    /// A write counter past the end of a bounded segment is clamped to the
    /// segment capacity.
    pub fn for_read(&self, capacity: Capacity) -> Option<Position> {
        let read_pos = self.read_pos?;
        let write_count = self.write_count.or(capacity.limit())?;
        Some(Position {
            read_pos,
            write_count,
        })
    }

    /// Resolves the cursors a segment should write with, or `None` if the
    /// write counter is outside the segment.
    ///
    /// The read cursor is irrelevant to writes; when it lies before the
    /// segment it is reported as the segment start.
    pub fn for_write(&self) -> Option<Position> {
        let write_count = self.write_count?;
        Some(Position {
            read_pos: self.read_pos.unwrap_or(0).min(write_count),
            write_count,
        })
    }
}
