#![forbid(unsafe_code)]
//! Layout constants and bounds-checked field readers shared by the sbinfo
//! crates.
//!
//! Everything here operates on byte slices. Readers never panic on short
//! input; they return [`ParseError::InsufficientData`] instead.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Size of the boot block that precedes the superblock. Always skipped.
pub const EXT4_BOOT_BLOCK_SIZE: usize = 1024;
pub const EXT4_SUPERBLOCK_OFFSET: usize = EXT4_BOOT_BLOCK_SIZE;
pub const EXT4_SUPERBLOCK_SIZE: usize = 1024;
pub const EXT4_SUPER_MAGIC: u16 = 0xEF53;

/// Minimum image length needed to hold the boot block plus the superblock.
pub const EXT4_MIN_IMAGE_SIZE: usize = EXT4_SUPERBLOCK_OFFSET + EXT4_SUPERBLOCK_SIZE;

/// Byte offset on a byte source (pread semantics).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ByteOffset(pub u64);

impl ByteOffset {
    /// Add a byte count, returning `None` on overflow.
    #[must_use]
    pub fn checked_add(self, bytes: u64) -> Option<Self> {
        self.0.checked_add(bytes).map(Self)
    }
}

impl fmt::Display for ByteOffset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("insufficient data: need {needed} bytes at offset {offset}, got {actual}")]
    InsufficientData {
        needed: usize,
        offset: usize,
        actual: usize,
    },
    #[error("invalid magic: expected {expected:#x}, got {actual:#x}")]
    InvalidMagic { expected: u64, actual: u64 },
    #[error("invalid field: {field} ({reason})")]
    InvalidField {
        field: &'static str,
        reason: &'static str,
    },
    /// An enum-coded field holds a value missing from its lookup table.
    #[error("unknown code for {field}: {code}")]
    UnknownCode { field: &'static str, code: u32 },
    /// Decoding the field depends on a feature this parser does not handle.
    #[error("unsupported field: {field} ({reason})")]
    Unsupported {
        field: &'static str,
        reason: &'static str,
    },
}

#[inline]
pub fn ensure_slice(data: &[u8], offset: usize, len: usize) -> Result<&[u8], ParseError> {
    let Some(end) = offset.checked_add(len) else {
        return Err(ParseError::InvalidField {
            field: "offset",
            reason: "overflow",
        });
    };

    if end > data.len() {
        return Err(ParseError::InsufficientData {
            needed: len,
            offset,
            actual: data.len().saturating_sub(offset),
        });
    }

    Ok(&data[offset..end])
}

#[inline]
pub fn read_le_u16(data: &[u8], offset: usize) -> Result<u16, ParseError> {
    let bytes = ensure_slice(data, offset, 2)?;
    Ok(u16::from_le_bytes([bytes[0], bytes[1]]))
}

#[inline]
pub fn read_le_u32(data: &[u8], offset: usize) -> Result<u32, ParseError> {
    let bytes = ensure_slice(data, offset, 4)?;
    Ok(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
}

#[inline]
pub fn read_fixed<const N: usize>(data: &[u8], offset: usize) -> Result<[u8; N], ParseError> {
    let bytes = ensure_slice(data, offset, N)?;
    let mut out = [0_u8; N];
    out.copy_from_slice(bytes);
    Ok(out)
}

/// Render every byte as one character, keeping NUL and padding bytes.
///
/// Bytes above 0x7F map to the Latin-1 code point of the same value.
#[must_use]
pub fn bytes_as_chars(bytes: &[u8]) -> String {
    bytes.iter().copied().map(char::from).collect()
}

/// Block size in bytes for an ext4 `s_log_block_size` value.
///
/// Returns `None` when the shift does not fit in a `u32`.
#[must_use]
pub fn ext4_block_size_from_log(log_block_size: u32) -> Option<u32> {
    let shift = 10_u32.checked_add(log_block_size)?;
    1_u32.checked_shl(shift)
}
