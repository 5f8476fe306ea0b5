//! Thread-safe byte stream buffer that spills to disk.
//!
//! [`SpillBuffer`] connects one producer thread to one consumer thread with
//! bounded memory use. Writes never block: the first `threshold` bytes of
//! the stream are held in fixed-size memory segments, and everything after
//! that is appended to a private temporary file. Reads block until data
//! arrives or the writer closes.
//!
//! ```
//! use giztoy_spillbuf::{Config, SpillBuffer};
//!
//! let cfg = Config::default().with_threshold(4).with_segment_size(2);
//! let (mut writer, mut reader) = SpillBuffer::with_config(cfg).unwrap().split();
//!
//! writer.write(b"abcdef").unwrap(); // "ef" lands on disk
//! writer.close();
//!
//! let mut data = [0u8; 6];
//! assert_eq!(reader.read(&mut data).unwrap(), 6);
//! assert_eq!(&data, b"abcdef");
//! assert_eq!(reader.read(&mut data).unwrap(), 0);
//! ```
//!
//! # Storage Layout
//!
//! The stream is split across an ordered list of segments fixed at
//! construction: zero or more [`MemorySegment`]s followed by one
//! [`FileSegment`]. A [`SegmentedBuffer`] routes each read and write by
//! translating the absolute stream [`Position`] into every segment's own
//! coordinates.
//!
//! # Closing
//!
//! The [`Writer`] and [`Reader`] close independently, explicitly or on
//! drop. Closing the writer lets the reader drain what is left and then
//! see end of stream. Memory segments are freed as soon as they have been
//! read; the temporary file is closed once both sides are closed.

mod config;
mod error;
mod file;
mod memory;
mod position;
mod segment;
mod segmented;
mod stream;

pub use config::{Config, DEFAULT_SEGMENT_SIZE, DEFAULT_THRESHOLD};
pub use error::{BufferError, Result};
pub use file::FileSegment;
pub use memory::MemorySegment;
pub use position::{Capacity, Position, RelativePosition};
pub use segment::Segment;
pub use segmented::SegmentedBuffer;
pub use stream::{Reader, SpillBuffer, Writer};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stream_sides_are_send() {
        fn assert_send<T: Send>() {}
        assert_send::<Writer>();
        assert_send::<Reader>();
        assert_send::<SpillBuffer>();
    }

    #[test]
    fn test_segments_are_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<MemorySegment>();
        assert_send_sync::<FileSegment>();
        assert_send_sync::<SegmentedBuffer>();
    }
}
