//! Blocking producer/consumer stream over a [`SegmentedBuffer`].

use std::io;
use std::sync::Arc;

use parking_lot::{Condvar, Mutex};
use tracing::trace;

use crate::config::Config;
use crate::error::{BufferError, Result};
use crate::position::Position;
use crate::segment::Segment;
use crate::segmented::SegmentedBuffer;

/// A byte stream buffer that spills to disk past a memory threshold.
///
/// `SpillBuffer` decouples one producer thread from one consumer thread.
/// Bytes written through the [`Writer`] become readable through the
/// [`Reader`] in arrival order. The first `threshold` bytes of the stream
/// live in memory; the rest goes to a private temporary file.
///
/// Memory segments are dropped as soon as the reader has moved past them.
/// The temporary file is closed once both sides are closed.
///
/// # Example
///
/// ```
/// use giztoy_spillbuf::SpillBuffer;
/// use std::thread;
///
/// let (mut writer, mut reader) = SpillBuffer::new(4, 2).unwrap().split();
///
/// // Producer thread
/// let producer = thread::spawn(move || {
///     writer.write(b"hello, ").unwrap();
///     writer.write(b"world").unwrap();
///     writer.close();
/// });
///
/// // Consumer thread
/// let mut out = Vec::new();
/// let mut chunk = [0u8; 3];
/// loop {
///     let n = reader.read(&mut chunk).unwrap();
///     if n == 0 {
///         break;
///     }
///     out.extend_from_slice(&chunk[..n]);
/// }
///
/// producer.join().unwrap();
/// assert_eq!(out, b"hello, world");
/// ```
pub struct SpillBuffer {
    inner: Arc<SpillBufferInner>,
}

struct SpillBufferInner {
    segments: SegmentedBuffer,
    state: Mutex<SpillBufferState>,
    readable: Condvar,
}

struct SpillBufferState {
    position: Position,
    writer_closed: bool,
    reader_closed: bool,
}

impl SpillBufferState {
    fn is_closed(&self) -> bool {
        self.writer_closed && self.reader_closed
    }
}

impl SpillBuffer {
    /// Creates a SpillBuffer keeping `threshold` bytes in memory, in
    /// segments of at most `segment_size` bytes.
    pub fn new(threshold: usize, segment_size: usize) -> Result<Self> {
        Self::with_config(
            Config::default()
                .with_threshold(threshold)
                .with_segment_size(segment_size),
        )
    }

    /// Creates a SpillBuffer with the default 5 MiB threshold and 1 MiB
    /// segments.
    pub fn with_defaults() -> Result<Self> {
        Self::with_config(Config::default())
    }

    /// Creates a SpillBuffer from `config`.
    ///
    /// Returns an error if the configuration is invalid.
    pub fn with_config(config: Config) -> Result<Self> {
        config.validate()?;
        Ok(SpillBuffer {
            inner: Arc::new(SpillBufferInner {
                segments: SegmentedBuffer::from_config(&config),
                state: Mutex::new(SpillBufferState {
                    position: Position::default(),
                    writer_closed: false,
                    reader_closed: false,
                }),
                readable: Condvar::new(),
            }),
        })
    }

    /// Splits the buffer into its single producer and single consumer.
    pub fn split(self) -> (Writer, Reader) {
        let writer = Writer {
            inner: Arc::clone(&self.inner),
        };
        let reader = Reader { inner: self.inner };
        (writer, reader)
    }
}

impl SpillBufferInner {
    fn total_bytes_written(&self) -> u64 {
        self.state.lock().position.write_count
    }

    fn spilled_bytes(&self) -> u64 {
        let write_count = self.total_bytes_written();
        self.segments.spilled_bytes(write_count)
    }

    fn is_closed(&self) -> bool {
        self.state.lock().is_closed()
    }
}

/// The producer side of a [`SpillBuffer`].
///
/// Dropping the writer closes it.
pub struct Writer {
    inner: Arc<SpillBufferInner>,
}

impl Writer {
    /// Writes `data` to the buffer and wakes the reader.
    ///
    /// Never blocks: bytes past the memory threshold go to disk. Returns
    /// the number of bytes written.
    ///
    /// Returns an error if the writer has been closed or the spill file
    /// cannot be written.
    pub fn write(&mut self, data: &[u8]) -> Result<usize> {
        let pos = {
            let state = self.inner.state.lock();
            if state.writer_closed {
                return Err(BufferError::Closed);
            }
            state.position
        };
        if data.is_empty() {
            return Ok(0);
        }

        let n = self.inner.segments.write(pos, data)?;

        let mut state = self.inner.state.lock();
        state.position.write_count += n as u64;
        self.inner.readable.notify_all();
        Ok(n)
    }

    /// Writes a single byte.
    pub fn write_byte(&mut self, byte: u8) -> Result<()> {
        self.write(&[byte]).map(|_| ())
    }

    /// Closes the write side of the buffer.
    ///
    /// The reader can still drain everything written so far. Closing twice
    /// is a no-op.
    pub fn close(&mut self) {
        let mut state = self.inner.state.lock();
        if state.writer_closed {
            return;
        }
        state.writer_closed = true;
        self.inner.readable.notify_all();
        if state.reader_closed {
            self.inner.segments.release_at(true, state.position);
        }
    }

    /// Returns the total number of bytes written so far.
    pub fn total_bytes_written(&self) -> u64 {
        self.inner.total_bytes_written()
    }

    /// Returns the number of bytes written past the memory threshold.
    pub fn spilled_bytes(&self) -> u64 {
        self.inner.spilled_bytes()
    }

    /// Returns true once both the writer and the reader are closed.
    pub fn is_closed(&self) -> bool {
        self.inner.is_closed()
    }
}

impl Drop for Writer {
    fn drop(&mut self) {
        self.close();
    }
}

impl io::Write for Writer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        Writer::write(self, buf).map_err(io::Error::from)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// The consumer side of a [`SpillBuffer`].
///
/// Dropping the reader closes it.
pub struct Reader {
    inner: Arc<SpillBufferInner>,
}

impl Reader {
    /// Reads data from the buffer.
    ///
    /// Blocks while nothing is readable and the writer is still open.
    /// Returns the number of bytes read, or 0 once the writer is closed and
    /// every byte has been read. An empty `buf` returns 0 immediately.
    ///
    /// Returns an error if the reader has been closed or the spill file
    /// cannot be read.
    pub fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }

        let pos = {
            let mut state = self.inner.state.lock();
            if state.reader_closed {
                return Err(BufferError::Closed);
            }
            while state.position.available() == 0 {
                if state.writer_closed {
                    return Ok(0);
                }
                trace!("spillbuf: reader waiting at {}", state.position.read_pos);
                self.inner.readable.wait(&mut state);
            }
            state.position
        };

        let n = self.inner.segments.read(pos, buf)?;

        let (closed, pos) = {
            let mut state = self.inner.state.lock();
            state.position.read_pos += n as u64;
            (state.is_closed(), state.position)
        };
        self.inner.segments.release_at(closed, pos);
        Ok(n)
    }

    /// Reads a single byte, or `None` once the stream is exhausted.
    pub fn read_byte(&mut self) -> Result<Option<u8>> {
        let mut byte = [0u8; 1];
        match self.read(&mut byte)? {
            0 => Ok(None),
            _ => Ok(Some(byte[0])),
        }
    }

    /// Returns the number of bytes that can be read without blocking.
    pub fn available(&self) -> u64 {
        self.inner.state.lock().position.available()
    }

    /// Marking is accepted and ignored.
    pub fn mark(&mut self, _read_limit: usize) {}

    /// Returns false: the stream cannot be rewound.
    pub fn mark_supported(&self) -> bool {
        false
    }

    /// Always fails with [`BufferError::ResetNotSupported`].
    pub fn reset(&mut self) -> Result<()> {
        Err(BufferError::ResetNotSupported)
    }

    /// Closes the read side of the buffer. Closing twice is a no-op.
    pub fn close(&mut self) {
        let mut state = self.inner.state.lock();
        if state.reader_closed {
            return;
        }
        state.reader_closed = true;
        if state.writer_closed {
            self.inner.segments.release_at(true, state.position);
        }
    }

    /// Returns the total number of bytes written so far.
    pub fn total_bytes_written(&self) -> u64 {
        self.inner.total_bytes_written()
    }

    /// Returns the number of bytes written past the memory threshold.
    pub fn spilled_bytes(&self) -> u64 {
        self.inner.spilled_bytes()
    }

    /// Returns the number of memory segments already dropped.
    pub fn released_segments(&self) -> usize {
        self.inner.segments.released_segments()
    }

    /// Returns true once both the writer and the reader are closed.
    pub fn is_closed(&self) -> bool {
        self.inner.is_closed()
    }
}

impl Drop for Reader {
    fn drop(&mut self) {
        self.close();
    }
}

impl io::Read for Reader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        Reader::read(self, buf).map_err(io::Error::from)
    }
}
