//! E2E: the stdio-like compressed file API.

mod common;

use std::io::Read;

use common::{codec, lorem, ALL_CODECS};
use crimp::{Error, File};

#[test]
fn write_then_read_round_trip() {
    let input = lorem();
    let dir = tempfile::tempdir().expect("tempdir");

    for name in ALL_CODECS {
        let c = codec(name);
        let path = dir.path().join(format!("data.{name}"));

        let file = File::open(c, &path, "w", None).expect("open for write");
        for chunk in input.chunks(300) {
            file.write(chunk).unwrap_or_else(|e| panic!("{name}: write failed: {e}"));
        }
        file.close().unwrap_or_else(|e| panic!("{name}: close failed: {e}"));

        let file = File::open(c, &path, "r", None).expect("open for read");
        let mut recovered = Vec::new();
        let mut tmp = [0u8; 256];
        loop {
            let n = file.read(&mut tmp).unwrap_or_else(|e| panic!("{name}: read failed: {e}"));
            if n == 0 {
                break;
            }
            recovered.extend_from_slice(&tmp[..n]);
        }
        assert!(file.eof(), "{name}: eof flag not set after draining");
        assert_eq!(recovered, input, "{name}: file round trip differs");
    }
}

#[test]
fn empty_file_round_trip() {
    let dir = tempfile::tempdir().expect("tempdir");
    for name in ["zlib", "store", "brotli"] {
        let c = codec(name);
        let path = dir.path().join(format!("empty.{name}"));

        let file = File::open(c, &path, "w", None).expect("open for write");
        file.close().unwrap_or_else(|e| panic!("{name}: close failed: {e}"));

        let file = File::open(c, &path, "r", None).expect("open for read");
        let mut tmp = [0u8; 64];
        let n = file.read(&mut tmp).unwrap_or_else(|e| panic!("{name}: read failed: {e}"));
        assert_eq!(n, 0, "{name}: empty stream must read as empty");
    }
}

#[test]
fn read_adapter_implements_io_read() {
    let input = lorem();
    let dir = tempfile::tempdir().expect("tempdir");
    let c = codec("zstd");
    let path = dir.path().join("data.zst");

    let file = File::open(c, &path, "w", None).expect("open for write");
    file.write(&input).expect("write");
    file.close().expect("close");

    let file = File::open(c, &path, "r", None).expect("open for read");
    let mut recovered = Vec::new();
    (&file).read_to_end(&mut recovered).expect("read_to_end");
    assert_eq!(recovered, input);
}

#[test]
fn in_memory_handles_work() {
    let input = lorem();
    let c = codec("zlib");

    // Compress into a shared Vec through the writer adapter.
    let sink = std::sync::Arc::new(std::sync::Mutex::new(Vec::new()));
    struct SharedSink(std::sync::Arc<std::sync::Mutex<Vec<u8>>>);
    impl std::io::Write for SharedSink {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }
        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    let file = File::from_writer(c, SharedSink(sink.clone()), None).expect("from_writer");
    file.write(&input).expect("write");
    file.close().expect("close");

    let packed = sink.lock().unwrap().clone();
    let file = File::from_reader(c, std::io::Cursor::new(packed), None).expect("from_reader");
    let mut recovered = Vec::new();
    (&file).read_to_end(&mut recovered).expect("read");
    assert_eq!(recovered, input);
}

#[test]
fn flush_pushes_data_through_flushable_codecs() {
    let input = lorem();
    let dir = tempfile::tempdir().expect("tempdir");
    let c = codec("zlib");
    let path = dir.path().join("flushed.zz");

    let file = File::open(c, &path, "w", None).expect("open");
    file.write(&input[..1000]).expect("write");
    file.flush().expect("flush");

    // After a flush, the on-disk prefix is already a decodable stream
    // prefix (this is what flush is for).
    let on_disk = std::fs::metadata(&path).expect("metadata").len();
    assert!(on_disk > 0, "flush produced no bytes");

    file.write(&input[1000..]).expect("write rest");
    file.close().expect("close");

    let file = File::open(c, &path, "r", None).expect("open for read");
    let mut recovered = Vec::new();
    (&file).read_to_end(&mut recovered).expect("read");
    assert_eq!(recovered, input);
}

#[test]
fn flush_on_non_flushable_codec_fails() {
    let dir = tempfile::tempdir().expect("tempdir");
    let c = codec("store");
    let path = dir.path().join("data.store");

    let file = File::open(c, &path, "w", None).expect("open");
    file.write(b"payload").expect("write");
    assert_eq!(file.flush().unwrap_err(), Error::InvalidOperation);
    // Like every file failure, the refusal is sticky.
    assert_eq!(file.write(b" more").unwrap_err(), Error::InvalidOperation);
    assert_eq!(file.error(), Some(Error::InvalidOperation));
}

#[test]
fn direction_mixing_is_refused() {
    let dir = tempfile::tempdir().expect("tempdir");
    let c = codec("store");
    let path = dir.path().join("mix.store");
    std::fs::write(&path, b"x").expect("seed file");

    let file = File::open(c, &path, "r", None).expect("open for read");
    assert_eq!(file.write(b"nope").unwrap_err(), Error::InvalidOperation);

    let file = File::open(c, &path, "w", None).expect("open for write");
    let mut tmp = [0u8; 8];
    assert_eq!(file.read(&mut tmp).unwrap_err(), Error::InvalidOperation);
}

#[test]
fn bad_mode_is_refused() {
    let dir = tempfile::tempdir().expect("tempdir");
    let c = codec("store");
    assert_eq!(
        File::open(c, dir.path().join("x"), "a", None).unwrap_err(),
        Error::BadParam
    );
}

#[test]
fn lock_groups_operations() {
    let input = lorem();
    let dir = tempfile::tempdir().expect("tempdir");
    let c = codec("zstd");
    let path = dir.path().join("locked.zst");

    let file = File::open(c, &path, "w", None).expect("open");
    {
        let mut guard = file.lock();
        for chunk in input.chunks(512) {
            guard.write(chunk).expect("write");
        }
        assert!(guard.error().is_none());
    }
    file.close().expect("close");

    let file = File::open(c, &path, "r", None).expect("open for read");
    let mut guard = file.lock();
    let mut recovered = Vec::new();
    let mut tmp = [0u8; 512];
    loop {
        let n = guard.read(&mut tmp).expect("read");
        if n == 0 {
            break;
        }
        recovered.extend_from_slice(&tmp[..n]);
    }
    assert!(guard.eof());
    assert_eq!(recovered, input);
}
