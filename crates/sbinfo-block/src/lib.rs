#![forbid(unsafe_code)]
//! Byte-source acquisition for superblock decoding.
//!
//! Provides the `ByteDevice` trait, a file-backed device using positional
//! reads, a device over any `Read + Seek` stream, and the fixed-offset read
//! of the ext4 superblock region that skips the boot block.

use parking_lot::Mutex;
use sbinfo_error::{Result, SbError};
use sbinfo_types::{ByteOffset, EXT4_SUPERBLOCK_OFFSET, EXT4_SUPERBLOCK_SIZE};
use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::os::unix::fs::FileExt;
use std::path::Path;
use tracing::{debug, trace};

/// Byte-addressed, read-only source for fixed-offset I/O (pread semantics).
pub trait ByteDevice: Send + Sync {
    /// Identifier used in error messages (path or caller-supplied name).
    fn source_id(&self) -> &str;

    /// Length in bytes as reported by the source. Character devices report 0.
    fn len_bytes(&self) -> u64;

    /// Read exactly `buf.len()` bytes from `offset` into `buf`.
    fn read_exact_at(&self, offset: ByteOffset, buf: &mut [u8]) -> Result<()>;
}

fn check_range(dev: &dyn ByteDevice, offset: ByteOffset, len: usize) -> Result<()> {
    let len_u64 = u64::try_from(len).map_err(|_| {
        SbError::access(
            dev.source_id(),
            io::Error::new(io::ErrorKind::InvalidInput, "read length overflows u64"),
        )
    })?;
    let end = offset.checked_add(len_u64).ok_or_else(|| {
        SbError::access(
            dev.source_id(),
            io::Error::new(io::ErrorKind::InvalidInput, "read range overflows u64"),
        )
    })?;
    if end.0 > dev.len_bytes() {
        return Err(SbError::access(
            dev.source_id(),
            io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!(
                    "read out of bounds: offset={offset} len={len} source_len={}",
                    dev.len_bytes()
                ),
            ),
        ));
    }
    Ok(())
}

/// File-backed byte device using `pread`-style I/O.
///
/// Opened read-only; the handle is released when the device is dropped.
/// Works on regular files and device nodes alike: reads are not checked
/// against `len_bytes`, a short source surfaces as `UnexpectedEof` from the
/// read itself.
#[derive(Debug)]
pub struct FileByteDevice {
    file: File,
    len: u64,
    source_id: String,
}

impl FileByteDevice {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let source_id = path.display().to_string();
        let file = File::open(path).map_err(|err| SbError::access(&source_id, err))?;
        // metadata().len() is 0 for block devices; the seek end is not.
        let len = (&file)
            .seek(SeekFrom::End(0))
            .map_err(|err| SbError::access(&source_id, err))?;
        debug!(source = %source_id, len, "opened image file");
        Ok(Self {
            file,
            len,
            source_id,
        })
    }
}

impl ByteDevice for FileByteDevice {
    fn source_id(&self) -> &str {
        &self.source_id
    }

    fn len_bytes(&self) -> u64 {
        self.len
    }

    fn read_exact_at(&self, offset: ByteOffset, buf: &mut [u8]) -> Result<()> {
        self.file
            .read_exact_at(buf, offset.0)
            .map_err(|err| SbError::access(&self.source_id, err))
    }
}

/// Byte device over an already-open seekable stream.
///
/// Reads seek to the requested offset first, so the stream position is not
/// preserved. Pass `&mut R` to keep ownership of the stream.
pub struct ReaderByteDevice<R> {
    reader: Mutex<R>,
    len: u64,
    source_id: String,
}

impl<R: Read + Seek + Send> ReaderByteDevice<R> {
    pub fn new(source_id: impl Into<String>, mut reader: R) -> Result<Self> {
        let source_id = source_id.into();
        let len = reader
            .seek(SeekFrom::End(0))
            .map_err(|err| SbError::access(&source_id, err))?;
        debug!(source = %source_id, len, "wrapped byte stream");
        Ok(Self {
            reader: Mutex::new(reader),
            len,
            source_id,
        })
    }
}

impl<R> std::fmt::Debug for ReaderByteDevice<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReaderByteDevice")
            .field("source_id", &self.source_id)
            .field("len", &self.len)
            .finish_non_exhaustive()
    }
}

impl<R: Read + Seek + Send> ByteDevice for ReaderByteDevice<R> {
    fn source_id(&self) -> &str {
        &self.source_id
    }

    fn len_bytes(&self) -> u64 {
        self.len
    }

    fn read_exact_at(&self, offset: ByteOffset, buf: &mut [u8]) -> Result<()> {
        check_range(self, offset, buf.len())?;
        let mut reader = self.reader.lock();
        reader
            .seek(SeekFrom::Start(offset.0))
            .and_then(|_| reader.read_exact(buf))
            .map_err(|err| SbError::access(&self.source_id, err))
    }
}

/// Read the ext4 superblock region (1024 bytes at offset 1024).
///
/// A source that ends before byte 2048 is an access error
/// (`UnexpectedEof`), not a parse error.
pub fn read_ext4_superblock_region(dev: &dyn ByteDevice) -> Result<[u8; EXT4_SUPERBLOCK_SIZE]> {
    let offset = u64::try_from(EXT4_SUPERBLOCK_OFFSET)
        .map(ByteOffset)
        .map_err(|_| SbError::Parse("ext4 superblock offset does not fit u64".to_owned()))?;
    let mut buf = [0_u8; EXT4_SUPERBLOCK_SIZE];
    dev.read_exact_at(offset, &mut buf)?;
    trace!(source = dev.source_id(), %offset, "read superblock region");
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use sbinfo_types::EXT4_MIN_IMAGE_SIZE;
    use std::io::{Cursor, Write};

    fn image_with_marker(len: usize) -> Vec<u8> {
        let mut image = vec![0_u8; len];
        if len >= EXT4_MIN_IMAGE_SIZE {
            image[EXT4_SUPERBLOCK_OFFSET] = 0x5A;
            image[EXT4_MIN_IMAGE_SIZE - 1] = 0xA5;
        }
        image
    }

    #[test]
    fn file_device_reads_superblock_region() {
        let mut file = tempfile::NamedTempFile::new().expect("tempfile");
        file.write_all(&image_with_marker(4096)).expect("write");
        file.flush().expect("flush");

        let dev = FileByteDevice::open(file.path()).expect("open");
        assert_eq!(dev.len_bytes(), 4096);
        assert_eq!(dev.source_id(), file.path().display().to_string());

        let region = read_ext4_superblock_region(&dev).expect("region");
        assert_eq!(region[0], 0x5A);
        assert_eq!(region[EXT4_SUPERBLOCK_SIZE - 1], 0xA5);
    }

    #[test]
    fn short_file_is_unexpected_eof() {
        let mut file = tempfile::NamedTempFile::new().expect("tempfile");
        file.write_all(&image_with_marker(1500)).expect("write");
        file.flush().expect("flush");

        let dev = FileByteDevice::open(file.path()).expect("open");
        let err = read_ext4_superblock_region(&dev).expect_err("short");
        match err {
            SbError::Access { cause, .. } => {
                assert_eq!(cause.kind(), io::ErrorKind::UnexpectedEof);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn char_device_reads_despite_zero_length() {
        let dev = FileByteDevice::open("/dev/zero").expect("open /dev/zero");
        assert_eq!(dev.len_bytes(), 0);

        let region = read_ext4_superblock_region(&dev).expect("region");
        assert!(region.iter().all(|&b| b == 0));
    }

    #[test]
    fn reader_device_borrows_stream() {
        let mut cursor = Cursor::new(image_with_marker(2048));
        {
            let dev = ReaderByteDevice::new("borrowed", &mut cursor).expect("wrap");
            let region = read_ext4_superblock_region(&dev).expect("region");
            assert_eq!(region[0], 0x5A);
        }
        assert_eq!(cursor.get_ref().len(), 2048);
    }

    #[test]
    fn file_device_missing_path_is_access_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let missing = dir.path().join("absent.img");

        let err = FileByteDevice::open(&missing).expect_err("missing");
        match err {
            SbError::Access { source_id, cause } => {
                assert_eq!(source_id, missing.display().to_string());
                assert_eq!(cause.kind(), io::ErrorKind::NotFound);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn short_source_is_access_error() {
        let dev = ReaderByteDevice::new("short", Cursor::new(image_with_marker(2047)))
            .expect("wrap");
        let err = read_ext4_superblock_region(&dev).expect_err("short");
        match err {
            SbError::Access { source_id, cause } => {
                assert_eq!(source_id, "short");
                assert_eq!(cause.kind(), io::ErrorKind::UnexpectedEof);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn reader_device_reads_exact_ranges() {
        let dev = ReaderByteDevice::new("cursor", Cursor::new(image_with_marker(2048)))
            .expect("wrap");
        let region = read_ext4_superblock_region(&dev).expect("region");
        assert_eq!(region[0], 0x5A);
        assert_eq!(region[EXT4_SUPERBLOCK_SIZE - 1], 0xA5);

        let mut buf = [0_u8; 8];
        let err = dev
            .read_exact_at(ByteOffset(2044), &mut buf)
            .expect_err("out of bounds");
        assert!(matches!(err, SbError::Access { .. }));
    }
}
