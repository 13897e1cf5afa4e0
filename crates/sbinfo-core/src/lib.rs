#![forbid(unsafe_code)]
//! ext4 superblock decoder.
//!
//! [`SuperblockDecoder`] reads the superblock region from an image, checks
//! the signature, and exposes raw and display accessors for every decoded
//! field. [`produce_report`] composes the display accessors into the ordered
//! label/value list that a CLI prints.
//!
//! ```ignore
//! let decoder = SuperblockDecoder::open("/path/to/image.ext4")?;
//! for entry in produce_report(&decoder)?.entries {
//!     println!("{}: {}", entry.label, entry.value);
//! }
//! ```

use sbinfo_block::{ByteDevice, FileByteDevice, ReaderByteDevice, read_ext4_superblock_region};
use sbinfo_error::{Result, SbError};
use sbinfo_types::{EXT4_SUPERBLOCK_SIZE, ParseError};
use serde::Serialize;
use std::io::{self, Read, Seek};
use std::path::Path;
use tracing::debug;

pub use sbinfo_error as error;
pub use sbinfo_ondisk::Ext4Superblock;

/// Map a parse failure to the user-facing error, attaching the source.
fn parse_error_to_sb(source_id: &str, e: &ParseError) -> SbError {
    match e {
        ParseError::InvalidMagic { actual, .. } => SbError::InvalidSuperblock {
            source_id: source_id.to_owned(),
            // The magic field is 16 bits wide; wider values never reach here.
            magic: u16::try_from(*actual).unwrap_or(u16::MAX),
        },
        ParseError::InsufficientData { .. } => SbError::access(
            source_id,
            io::Error::new(io::ErrorKind::UnexpectedEof, e.to_string()),
        ),
        ParseError::UnknownCode { field, code } => SbError::UnknownCode {
            field: (*field).to_owned(),
            code: *code,
        },
        ParseError::Unsupported { field, reason } => {
            SbError::UnsupportedFeature(format!("{field}: {reason}"))
        }
        ParseError::InvalidField { .. } => SbError::Parse(e.to_string()),
    }
}

/// A validated ext4 superblock read from one source.
///
/// Construction is all-or-nothing: an instance exists only if the region was
/// read in full and carried the ext4 magic. The instance holds no file
/// handle and never changes, so it can be shared freely across threads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SuperblockDecoder {
    source_id: String,
    superblock: Ext4Superblock,
}

impl SuperblockDecoder {
    /// Open an image file, skip the boot block, and decode the superblock.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let dev = FileByteDevice::open(path)?;
        Self::from_device(&dev)
    }

    /// Decode from an already-open seekable stream.
    ///
    /// The stream is read from its start regardless of its current position.
    /// Pass `&mut R` to keep using the stream afterwards.
    pub fn open_reader<R: Read + Seek + Send>(
        source_id: impl Into<String>,
        reader: R,
    ) -> Result<Self> {
        let dev = ReaderByteDevice::new(source_id, reader)?;
        Self::from_device(&dev)
    }

    /// Decode from any byte device.
    pub fn from_device(dev: &dyn ByteDevice) -> Result<Self> {
        let region = read_ext4_superblock_region(dev)?;
        Self::from_region(dev.source_id(), &region)
    }

    /// Decode an in-memory superblock region (boot block already skipped).
    pub fn from_region(source_id: impl Into<String>, region: &[u8]) -> Result<Self> {
        let source_id = source_id.into();
        let superblock = Ext4Superblock::parse_superblock_region(region)
            .map_err(|e| parse_error_to_sb(&source_id, &e))?;
        debug!(
            source = %source_id,
            inodes = superblock.inodes_count,
            blocks = superblock.blocks_count,
            "decoded ext4 superblock"
        );
        Ok(Self {
            source_id,
            superblock,
        })
    }

    #[must_use]
    pub fn source_id(&self) -> &str {
        &self.source_id
    }

    /// Decoded fields; the public fields are the raw accessors.
    #[must_use]
    pub fn superblock(&self) -> &Ext4Superblock {
        &self.superblock
    }

    /// The full 1024-byte superblock buffer.
    #[must_use]
    pub fn raw_superblock(&self) -> &[u8] {
        let raw = self.superblock.raw_bytes();
        debug_assert_eq!(raw.len(), EXT4_SUPERBLOCK_SIZE);
        raw
    }

    fn lift<T>(&self, r: std::result::Result<T, ParseError>) -> Result<T> {
        r.map_err(|e| parse_error_to_sb(&self.source_id, &e))
    }

    // ── raw accessors ────────────────────────────────────────────────────

    #[must_use]
    pub fn total_inode_count(&self) -> u32 {
        self.superblock.inodes_count
    }

    #[must_use]
    pub fn total_block_count(&self) -> u32 {
        self.superblock.blocks_count
    }

    #[must_use]
    pub fn reserved_block_count(&self) -> u32 {
        self.superblock.reserved_blocks_count
    }

    #[must_use]
    pub fn free_block_count(&self) -> u32 {
        self.superblock.free_blocks_count
    }

    #[must_use]
    pub fn free_inode_count(&self) -> u32 {
        self.superblock.free_inodes_count
    }

    #[must_use]
    pub fn first_data_block(&self) -> u32 {
        self.superblock.first_data_block
    }

    #[must_use]
    pub fn log_block_size(&self) -> u32 {
        self.superblock.log_block_size
    }

    #[must_use]
    pub fn blocks_per_group(&self) -> u32 {
        self.superblock.blocks_per_group
    }

    #[must_use]
    pub fn inodes_per_group(&self) -> u32 {
        self.superblock.inodes_per_group
    }

    #[must_use]
    pub fn time_last_mounted(&self) -> u32 {
        self.superblock.mtime
    }

    #[must_use]
    pub fn time_last_written(&self) -> u32 {
        self.superblock.wtime
    }

    #[must_use]
    pub fn mount_count(&self) -> u32 {
        self.superblock.mnt_count
    }

    #[must_use]
    pub fn magic(&self) -> u16 {
        self.superblock.magic
    }

    #[must_use]
    pub fn state(&self) -> u16 {
        self.superblock.state.bits()
    }

    #[must_use]
    pub fn error_policy(&self) -> u16 {
        self.superblock.errors
    }

    #[must_use]
    pub fn creator_os(&self) -> u16 {
        self.superblock.creator_os
    }

    #[must_use]
    pub fn volume_uuid(&self) -> [u8; 16] {
        self.superblock.uuid
    }

    #[must_use]
    pub fn volume_label(&self) -> [u8; 16] {
        self.superblock.volume_name
    }

    #[must_use]
    pub fn journal_uuid(&self) -> [u8; 16] {
        self.superblock.journal_uuid
    }

    // ── display accessors ────────────────────────────────────────────────

    /// Block size in bytes, `1024 << log_block_size`.
    pub fn block_size(&self) -> Result<u32> {
        self.lift(self.superblock.block_size())
    }

    pub fn log_cluster_size(&self) -> Result<u32> {
        self.lift(self.superblock.log_cluster_size())
    }

    pub fn cluster_size(&self) -> Result<u32> {
        self.lift(self.superblock.cluster_size())
    }

    pub fn clusters_per_group(&self) -> Result<u32> {
        self.lift(self.superblock.clusters_per_group())
    }

    #[must_use]
    pub fn magic_display(&self) -> String {
        self.superblock.magic_display()
    }

    #[must_use]
    pub fn time_last_mounted_display(&self) -> String {
        self.superblock.mtime_display()
    }

    #[must_use]
    pub fn time_last_written_display(&self) -> String {
        self.superblock.wtime_display()
    }

    #[must_use]
    pub fn state_display(&self) -> String {
        self.superblock.state_display()
    }

    pub fn error_policy_display(&self) -> Result<&'static str> {
        self.lift(self.superblock.errors_display())
    }

    pub fn creator_os_display(&self) -> Result<&'static str> {
        self.lift(self.superblock.creator_os_display())
    }

    #[must_use]
    pub fn volume_uuid_display(&self) -> String {
        self.superblock.uuid_display()
    }

    #[must_use]
    pub fn volume_label_display(&self) -> String {
        self.superblock.volume_name_display()
    }

    #[must_use]
    pub fn journal_uuid_display(&self) -> String {
        self.superblock.journal_uuid_display()
    }
}

// ── report assembly ─────────────────────────────────────────────────────────

/// One `Label: value` line of a report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportEntry {
    pub label: &'static str,
    pub value: String,
}

/// Ordered superblock summary for one source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Report {
    pub source: String,
    pub entries: Vec<ReportEntry>,
}

impl Report {
    /// Value of the first entry with `label`, if any.
    #[must_use]
    pub fn get(&self, label: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|entry| entry.label == label)
            .map(|entry| entry.value.as_str())
    }
}

impl std::fmt::Display for Report {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for entry in &self.entries {
            writeln!(f, "{}: {}", entry.label, entry.value)?;
        }
        Ok(())
    }
}

pub const LABEL_MAGIC: &str = "Magic number";
pub const LABEL_INODE_COUNT: &str = "Inode count";
pub const LABEL_BLOCK_COUNT: &str = "Block count";
pub const LABEL_RESERVED_BLOCKS: &str = "Reserved block count";
pub const LABEL_FREE_INODES: &str = "Free inodes";
pub const LABEL_FREE_BLOCKS: &str = "Free blocks";
pub const LABEL_FIRST_BLOCK: &str = "First block";
pub const LABEL_BLOCK_SIZE: &str = "Block size";
pub const LABEL_BLOCKS_PER_GROUP: &str = "Blocks per group";
pub const LABEL_INODES_PER_GROUP: &str = "Inodes per group";
pub const LABEL_LAST_MOUNT: &str = "Last mount time";
pub const LABEL_LAST_WRITE: &str = "Last write time";
pub const LABEL_MOUNT_COUNT: &str = "Mount count";
pub const LABEL_STATE: &str = "Filesystem state";
pub const LABEL_VOLUME_NAME: &str = "Filesystem volume name";
pub const LABEL_UUID: &str = "Filesystem UUID";
pub const LABEL_JOURNAL_UUID: &str = "Journal UUID";

/// Compose the display accessors into the fixed report order.
///
/// Fails as a whole if any accessor fails; no partial report is returned.
pub fn produce_report(decoder: &SuperblockDecoder) -> Result<Report> {
    let entry = |label: &'static str, value: String| ReportEntry { label, value };

    let entries = vec![
        entry(LABEL_MAGIC, decoder.magic_display()),
        entry(LABEL_INODE_COUNT, decoder.total_inode_count().to_string()),
        entry(LABEL_BLOCK_COUNT, decoder.total_block_count().to_string()),
        entry(
            LABEL_RESERVED_BLOCKS,
            decoder.reserved_block_count().to_string(),
        ),
        entry(LABEL_FREE_INODES, decoder.free_inode_count().to_string()),
        entry(LABEL_FREE_BLOCKS, decoder.free_block_count().to_string()),
        entry(LABEL_FIRST_BLOCK, decoder.first_data_block().to_string()),
        entry(LABEL_BLOCK_SIZE, decoder.block_size()?.to_string()),
        entry(
            LABEL_BLOCKS_PER_GROUP,
            decoder.blocks_per_group().to_string(),
        ),
        entry(
            LABEL_INODES_PER_GROUP,
            decoder.inodes_per_group().to_string(),
        ),
        entry(LABEL_LAST_MOUNT, decoder.time_last_mounted_display()),
        entry(LABEL_LAST_WRITE, decoder.time_last_written_display()),
        entry(LABEL_MOUNT_COUNT, decoder.mount_count().to_string()),
        entry(LABEL_STATE, decoder.state_display()),
        entry(LABEL_VOLUME_NAME, decoder.volume_label_display()),
        entry(LABEL_UUID, decoder.volume_uuid_display()),
        entry(LABEL_JOURNAL_UUID, decoder.journal_uuid_display()),
    ];

    Ok(Report {
        source: decoder.source_id().to_owned(),
        entries,
    })
}
