#![forbid(unsafe_code)]

use chrono::{Local, TimeZone};
use sbinfo_types::{
    EXT4_SUPER_MAGIC, EXT4_SUPERBLOCK_OFFSET, EXT4_SUPERBLOCK_SIZE, ParseError, bytes_as_chars,
    ext4_block_size_from_log, read_fixed, read_le_u16, read_le_u32,
};
use serde::Serialize;
use uuid::Uuid;

// ── coded-value tables ─────────────────────────────────────────────────────

/// `s_errors`: behaviour when the kernel detects an error.
pub const ERROR_POLICIES: &[(u32, &str)] = &[
    (1, "Continue"),
    (2, "Remount read-only"),
    (3, "Panic"),
];

/// `s_creator_os`: operating system that created the filesystem.
pub const CREATOR_OS_NAMES: &[(u32, &str)] = &[
    (0, "Linux"),
    (1, "Hurd"),
    (2, "Masix"),
    (3, "FreeBSD"),
    (4, "Lites"),
];

/// `s_rev_level` names. Not surfaced by any accessor.
pub const REVISION_LEVELS: &[(u32, &str)] = &[(0, "original"), (1, "V2")];

/// Look up `code` in a coded-value table.
///
/// A missing code is an error, never a placeholder string.
pub fn lookup_code(
    table: &[(u32, &'static str)],
    field: &'static str,
    code: u32,
) -> Result<&'static str, ParseError> {
    table
        .iter()
        .find(|(known, _)| *known == code)
        .map(|(_, name)| *name)
        .ok_or(ParseError::UnknownCode { field, code })
}

// ── filesystem state ───────────────────────────────────────────────────────

/// ext4 filesystem state flags (`s_state`).
///
/// Unknown bits are ignored when rendering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Ext4State(pub u16);

impl Ext4State {
    pub const CLEANLY_UNMOUNTED: Self = Self(0x0001);
    pub const ERRORS_DETECTED: Self = Self(0x0002);
    pub const ORPHANS_BEING_RECOVERED: Self = Self(0x0004);

    /// All known state flags, in rendering order.
    const KNOWN: &[(u16, &'static str)] = &[
        (0x0001, "cleanly_unmounted"),
        (0x0002, "errors_detected"),
        (0x0004, "orphans_being_recovered"),
    ];

    #[must_use]
    pub fn bits(self) -> u16 {
        self.0
    }

    #[must_use]
    pub fn contains(self, flag: Self) -> bool {
        (self.0 & flag.0) != 0
    }

    /// Names of all set known flags, in table order.
    #[must_use]
    pub fn describe(self) -> Vec<&'static str> {
        Self::KNOWN
            .iter()
            .filter(|(bit, _)| self.0 & bit != 0)
            .map(|(_, name)| *name)
            .collect()
    }
}

impl std::fmt::Display for Ext4State {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.describe().join(" "))
    }
}

// ── rendering helpers ──────────────────────────────────────────────────────

/// Render epoch seconds as local time, `n/a` for zero.
#[must_use]
pub fn format_timestamp(secs: u32) -> String {
    if secs == 0 {
        return "n/a".to_owned();
    }
    Local
        .timestamp_opt(i64::from(secs), 0)
        .earliest()
        .map_or_else(
            || secs.to_string(),
            |time| time.format("%a %b %e %H:%M:%S %Y").to_string(),
        )
}

/// Canonical hyphenated UUID text.
#[must_use]
pub fn format_uuid(bytes: [u8; 16]) -> String {
    Uuid::from_bytes(bytes).hyphenated().to_string()
}

// ── superblock ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Ext4Superblock {
    // ── Counts ───────────────────────────────────────────────────────────
    pub inodes_count: u32,
    pub blocks_count: u32,
    pub reserved_blocks_count: u32,
    pub free_blocks_count: u32,
    pub free_inodes_count: u32,

    // ── Geometry ─────────────────────────────────────────────────────────
    pub first_data_block: u32,
    pub log_block_size: u32,
    pub blocks_per_group: u32,
    pub inodes_per_group: u32,

    // ── Timestamps & mounts ──────────────────────────────────────────────
    pub mtime: u32,
    pub wtime: u32,
    pub mnt_count: u32,

    // ── Identity & state ─────────────────────────────────────────────────
    pub magic: u16,
    pub state: Ext4State,
    pub errors: u16,
    pub creator_os: u16,
    pub uuid: [u8; 16],
    pub volume_name: [u8; 16],
    pub journal_uuid: [u8; 16],

    /// The region the fields were decoded from. Length is always
    /// `EXT4_SUPERBLOCK_SIZE`.
    #[serde(skip)]
    raw: Vec<u8>,
}

impl Ext4Superblock {
    /// Parse an ext4 superblock from a 1024-byte superblock region.
    ///
    /// Bytes past the first `EXT4_SUPERBLOCK_SIZE` are ignored.
    pub fn parse_superblock_region(region: &[u8]) -> Result<Self, ParseError> {
        if region.len() < EXT4_SUPERBLOCK_SIZE {
            return Err(ParseError::InsufficientData {
                needed: EXT4_SUPERBLOCK_SIZE,
                offset: 0,
                actual: region.len(),
            });
        }
        let region = &region[..EXT4_SUPERBLOCK_SIZE];

        let magic = read_le_u16(region, 0x38)?;
        if magic != EXT4_SUPER_MAGIC {
            return Err(ParseError::InvalidMagic {
                expected: u64::from(EXT4_SUPER_MAGIC),
                actual: u64::from(magic),
            });
        }

        Ok(Self {
            // Counts
            inodes_count: read_le_u32(region, 0x00)?,
            blocks_count: read_le_u32(region, 0x04)?,
            reserved_blocks_count: read_le_u32(region, 0x08)?,
            free_blocks_count: read_le_u32(region, 0x0C)?,
            free_inodes_count: read_le_u32(region, 0x10)?,

            // Geometry
            first_data_block: read_le_u32(region, 0x14)?,
            log_block_size: read_le_u32(region, 0x18)?,
            blocks_per_group: read_le_u32(region, 0x20)?,
            inodes_per_group: read_le_u32(region, 0x28)?,

            // Timestamps & mounts
            mtime: read_le_u32(region, 0x2C)?,
            wtime: read_le_u32(region, 0x30)?,
            mnt_count: read_le_u32(region, 0x34)?,

            // Identity & state
            magic,
            state: Ext4State(read_le_u16(region, 0x3A)?),
            errors: read_le_u16(region, 0x3C)?,
            creator_os: read_le_u16(region, 0x3E)?,
            uuid: read_fixed::<16>(region, 0x68)?,
            volume_name: read_fixed::<16>(region, 0x78)?,
            journal_uuid: read_fixed::<16>(region, 0xD0)?,

            raw: region.to_vec(),
        })
    }

    /// Parse from a full image (boot block included).
    pub fn parse_from_image(image: &[u8]) -> Result<Self, ParseError> {
        let end = EXT4_SUPERBLOCK_OFFSET
            .checked_add(EXT4_SUPERBLOCK_SIZE)
            .ok_or(ParseError::InvalidField {
                field: "superblock_offset",
                reason: "overflow",
            })?;

        if image.len() < end {
            return Err(ParseError::InsufficientData {
                needed: EXT4_SUPERBLOCK_SIZE,
                offset: EXT4_SUPERBLOCK_OFFSET,
                actual: image.len().saturating_sub(EXT4_SUPERBLOCK_OFFSET),
            });
        }

        Self::parse_superblock_region(&image[EXT4_SUPERBLOCK_OFFSET..end])
    }

    /// The undecoded superblock region.
    #[must_use]
    pub fn raw_bytes(&self) -> &[u8] {
        &self.raw
    }

    /// Block size in bytes: `1024 << s_log_block_size`.
    pub fn block_size(&self) -> Result<u32, ParseError> {
        ext4_block_size_from_log(self.log_block_size).ok_or(ParseError::InvalidField {
            field: "s_log_block_size",
            reason: "invalid shift",
        })
    }

    /// `s_log_cluster_size` is only meaningful once bigalloc is checked.
    #[allow(clippy::unused_self, clippy::unnecessary_wraps)]
    pub fn log_cluster_size(&self) -> Result<u32, ParseError> {
        Err(ParseError::Unsupported {
            field: "s_log_cluster_size",
            reason: "requires bigalloc feature detection",
        })
    }

    #[allow(clippy::unused_self, clippy::unnecessary_wraps)]
    pub fn cluster_size(&self) -> Result<u32, ParseError> {
        Err(ParseError::Unsupported {
            field: "cluster_size",
            reason: "requires bigalloc feature detection",
        })
    }

    #[allow(clippy::unused_self, clippy::unnecessary_wraps)]
    pub fn clusters_per_group(&self) -> Result<u32, ParseError> {
        Err(ParseError::Unsupported {
            field: "s_clusters_per_group",
            reason: "requires bigalloc feature detection",
        })
    }

    #[must_use]
    pub fn magic_display(&self) -> String {
        format!("{:#x}", self.magic)
    }

    #[must_use]
    pub fn mtime_display(&self) -> String {
        format_timestamp(self.mtime)
    }

    #[must_use]
    pub fn wtime_display(&self) -> String {
        format_timestamp(self.wtime)
    }

    /// Space-joined state flag names; empty when no known bit is set.
    #[must_use]
    pub fn state_display(&self) -> String {
        self.state.to_string()
    }

    pub fn errors_display(&self) -> Result<&'static str, ParseError> {
        lookup_code(ERROR_POLICIES, "s_errors", u32::from(self.errors))
    }

    pub fn creator_os_display(&self) -> Result<&'static str, ParseError> {
        lookup_code(CREATOR_OS_NAMES, "s_creator_os", u32::from(self.creator_os))
    }

    #[must_use]
    pub fn uuid_display(&self) -> String {
        format_uuid(self.uuid)
    }

    #[must_use]
    pub fn journal_uuid_display(&self) -> String {
        format_uuid(self.journal_uuid)
    }

    /// Every label byte as one character. Padding is kept.
    #[must_use]
    pub fn volume_name_display(&self) -> String {
        bytes_as_chars(&self.volume_name)
    }
}
