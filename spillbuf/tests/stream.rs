use std::io::Read;
use std::thread;
use std::time::Duration;

use giztoy_spillbuf::{Config, Reader, SpillBuffer, Writer};
use tracing_subscriber::EnvFilter;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn split(threshold: usize, segment_size: usize) -> (Writer, Reader) {
    init_tracing();
    SpillBuffer::new(threshold, segment_size).unwrap().split()
}

fn drain(reader: &mut Reader, chunk: usize) -> Vec<u8> {
    let mut out = Vec::new();
    let mut buf = vec![0u8; chunk];
    loop {
        let n = reader.read(&mut buf).unwrap();
        if n == 0 {
            return out;
        }
        out.extend_from_slice(&buf[..n]);
    }
}

// Deterministic, non-repeating-looking payload.
fn payload(len: usize, seed: u32) -> Vec<u8> {
    let mut x = seed.wrapping_mul(2_654_435_761).max(1);
    (0..len)
        .map(|_| {
            x ^= x << 13;
            x ^= x >> 17;
            x ^= x << 5;
            x as u8
        })
        .collect()
}

const ALPHABET_25: &[u8] = b"abcdefghijklmnopqrstuvwxy";

#[test]
fn test_single_byte() {
    let (mut writer, mut reader) = split(1024, 256);
    writer.write_byte(65).unwrap();
    assert_eq!(reader.read_byte().unwrap(), Some(65));
}

#[test]
fn test_read_spanning_two_memory_segments() {
    let (mut writer, mut reader) = split(26, 13);
    writer.write(ALPHABET_25).unwrap();

    let mut data = [0u8; 26];
    assert_eq!(reader.read(&mut data).unwrap(), 25);
    assert_eq!(&data[..25], ALPHABET_25);
    assert_eq!(reader.spilled_bytes(), 0);
}

#[test]
fn test_read_spanning_memory_and_disk() {
    let (mut writer, mut reader) = split(13, 13);
    writer.write(ALPHABET_25).unwrap();

    let mut data = [0u8; 26];
    assert_eq!(reader.read(&mut data).unwrap(), 25);
    assert_eq!(&data[..25], ALPHABET_25);
    assert_eq!(reader.spilled_bytes(), 12);
}

#[test]
fn test_spill_then_eof() {
    let (mut writer, mut reader) = split(4, 2);
    writer.write(b"abcdef").unwrap();
    writer.close();

    let mut data = [0u8; 6];
    assert_eq!(reader.read(&mut data).unwrap(), 6);
    assert_eq!(&data, b"abcdef");
    assert_eq!(reader.read(&mut data).unwrap(), 0);
}

#[test]
fn test_disk_only() {
    let (mut writer, mut reader) = split(0, 16);
    writer.write(b"straight to disk").unwrap();
    writer.close();

    assert_eq!(drain(&mut reader, 5), b"straight to disk");
}

#[test]
fn test_round_trip_any_chunking() {
    let writes: Vec<Vec<u8>> = [1usize, 7, 0, 13, 64, 3, 200, 1]
        .iter()
        .enumerate()
        .map(|(i, &len)| payload(len, i as u32 + 1))
        .collect();
    let expected: Vec<u8> = writes.concat();

    for chunk in [1usize, 2, 5, 13, 64, 1024] {
        let (mut writer, mut reader) = split(40, 9);
        for w in &writes {
            assert_eq!(writer.write(w).unwrap(), w.len());
        }
        writer.close();

        assert_eq!(drain(&mut reader, chunk), expected, "chunk={}", chunk);
    }
}

#[test]
fn test_disk_spill_recovers_everything() {
    let threshold = 4096;
    let data = payload(threshold + 1500, 42);

    let (mut writer, mut reader) = split(threshold, 1000);
    writer.write(&data).unwrap();
    writer.close();
    assert_eq!(writer.spilled_bytes(), 1500);

    let mut out = Vec::new();
    reader.read_to_end(&mut out).unwrap();
    assert_eq!(out, data);
}

#[test]
fn test_reader_blocks_until_first_write() {
    let (mut writer, mut reader) = split(1024, 256);

    let consumer = thread::spawn(move || {
        let mut data = [0u8; 64];
        let n = reader.read(&mut data).unwrap();
        data[..n].to_vec()
    });

    thread::sleep(Duration::from_millis(50));
    writer.write(b"first").unwrap();

    // The whole write is stored before the reader is woken.
    assert_eq!(consumer.join().unwrap(), b"first");
}

#[test]
fn test_early_close_does_not_truncate() {
    let (mut writer, mut reader) = split(8, 4);
    writer.write(b"0123456789abcdef").unwrap();
    writer.close();

    let mut data = [0u8; 3];
    let mut out = Vec::new();
    while out.len() < 16 {
        let n = reader.read(&mut data).unwrap();
        assert!(n > 0, "premature end of stream after {} bytes", out.len());
        out.extend_from_slice(&data[..n]);
    }
    assert_eq!(out, b"0123456789abcdef");
    assert_eq!(reader.read(&mut data).unwrap(), 0);
}

#[test]
fn test_available_never_exceeds_unread() {
    let (mut writer, mut reader) = split(10, 4);
    let mut unread = 0u64;

    for (i, len) in [3usize, 9, 1, 20].into_iter().enumerate() {
        writer.write(&payload(len, i as u32)).unwrap();
        unread += len as u64;
        assert_eq!(reader.available(), unread);

        let n = reader.read(&mut [0u8; 5]).unwrap() as u64;
        unread -= n;
        assert!(reader.available() <= unread);
    }
}

#[test]
fn test_concurrent_producer_consumer() {
    let data = payload(256 * 1024, 7);
    let expected = data.clone();

    let cfg = Config::default()
        .with_threshold(64 * 1024)
        .with_segment_size(8 * 1024);
    init_tracing();
    let (mut writer, mut reader) = SpillBuffer::with_config(cfg).unwrap().split();

    let producer = thread::spawn(move || {
        for chunk in data.chunks(1000) {
            let mut rest = chunk;
            while !rest.is_empty() {
                let n = writer.write(rest).unwrap();
                rest = &rest[n..];
            }
        }
        writer.close();
    });

    let out = drain(&mut reader, 777);
    producer.join().unwrap();

    assert_eq!(out.len(), expected.len());
    assert_eq!(out, expected);
}

#[test]
fn test_both_closed_releases_storage() {
    let (mut writer, mut reader) = split(4, 2);
    writer.write(b"abcdef").unwrap();

    reader.close();
    assert!(!writer.is_closed());

    writer.close();
    assert!(writer.is_closed());
    assert_eq!(writer.total_bytes_written(), 6);
}

#[cfg(unix)]
#[test]
fn test_temp_dir_stays_clean() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = Config::default()
        .with_threshold(4)
        .with_segment_size(2)
        .with_temp_dir(dir.path());
    let (mut writer, mut reader) = SpillBuffer::with_config(cfg).unwrap().split();

    writer.write(b"spilled past memory").unwrap();
    writer.close();
    assert_eq!(drain(&mut reader, 4), b"spilled past memory");

    drop(reader);
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}
