//! Fixed-size in-memory segment.

use parking_lot::Mutex;

use crate::error::{BufferError, Result};
use crate::position::{Capacity, Position};
use crate::segment::Segment;

/// A bounded segment backed by one heap allocation.
///
/// The allocation is made up front and dropped by [`Segment::release`],
/// forced or not, once the segment has been fully consumed.
pub struct MemorySegment {
    capacity: u64,
    data: Mutex<Option<Box<[u8]>>>,
}

impl MemorySegment {
    /// Creates a new MemorySegment holding `size` bytes.
    pub fn new(size: usize) -> Self {
        MemorySegment {
            capacity: size as u64,
            data: Mutex::new(Some(vec![0u8; size].into_boxed_slice())),
        }
    }

    #[cfg(test)]
    fn is_released(&self) -> bool {
        self.data.lock().is_none()
    }
}

impl Segment for MemorySegment {
    fn capacity(&self) -> Capacity {
        Capacity::Bounded(self.capacity)
    }

    fn read(&self, pos: Position, dst: &mut [u8]) -> Result<usize> {
        let end = pos.write_count.min(self.capacity);
        let n = (dst.len() as u64).min(end.saturating_sub(pos.read_pos)) as usize;
        if n == 0 {
            return Ok(0);
        }

        let data = self.data.lock();
        let data = data.as_ref().ok_or(BufferError::Released)?;
        let start = pos.read_pos as usize;
        dst[..n].copy_from_slice(&data[start..start + n]);
        Ok(n)
    }

    fn write(&self, pos: Position, src: &[u8]) -> Result<usize> {
        let n = (src.len() as u64).min(self.capacity.saturating_sub(pos.write_count)) as usize;
        if n == 0 {
            return Ok(0);
        }

        let mut data = self.data.lock();
        let data = data.as_mut().ok_or(BufferError::Released)?;
        let start = pos.write_count as usize;
        data[start..start + n].copy_from_slice(&src[..n]);
        Ok(n)
    }

    fn release(&self, _force: bool) {
        self.data.lock().take();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_read() {
        let seg = MemorySegment::new(8);
        assert_eq!(seg.capacity(), Capacity::Bounded(8));

        let n = seg.write(Position::new(0, 0), b"abc").unwrap();
        assert_eq!(n, 3);

        let mut dst = [0u8; 8];
        let n = seg.read(Position::new(0, 3), &mut dst).unwrap();
        assert_eq!(n, 3);
        assert_eq!(&dst[..3], b"abc");
    }

    #[test]
    fn test_partial_write_when_full() {
        let seg = MemorySegment::new(4);
        assert_eq!(seg.write(Position::new(0, 0), b"abcdef").unwrap(), 4);
        assert_eq!(seg.write(Position::new(0, 4), b"gh").unwrap(), 0);
    }

    #[test]
    fn test_partial_read() {
        let seg = MemorySegment::new(8);
        seg.write(Position::new(0, 0), b"abcdef").unwrap();

        let mut dst = [0u8; 4];
        assert_eq!(seg.read(Position::new(1, 6), &mut dst).unwrap(), 4);
        assert_eq!(&dst, b"bcde");

        assert_eq!(seg.read(Position::new(5, 6), &mut dst).unwrap(), 1);
        assert_eq!(dst[0], b'f');

        assert_eq!(seg.read(Position::new(6, 6), &mut dst).unwrap(), 0);
    }

    #[test]
    fn test_release() {
        let seg = MemorySegment::new(4);
        seg.write(Position::new(0, 0), b"abcd").unwrap();
        assert!(!seg.is_released());

        seg.release(false);
        assert!(seg.is_released());
        seg.release(true);
        assert!(seg.is_released());

        // A drained segment is never copied from again.
        let mut dst = [0u8; 4];
        assert_eq!(seg.read(Position::new(4, 4), &mut dst).unwrap(), 0);
        assert!(matches!(
            seg.read(Position::new(0, 4), &mut dst),
            Err(BufferError::Released)
        ));
    }
}
