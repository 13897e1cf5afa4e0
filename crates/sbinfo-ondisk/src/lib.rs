#![forbid(unsafe_code)]
//! On-disk format parsing for the ext4 superblock.
//!
//! Pure parsing crate: no I/O, no side effects. Turns the 1024-byte
//! superblock region into an [`Ext4Superblock`] whose public fields are the
//! raw decoded values and whose `*_display` methods render them for humans.

pub mod ext4;

pub use ext4::{
    CREATOR_OS_NAMES, ERROR_POLICIES, Ext4State, Ext4Superblock, REVISION_LEVELS,
    format_timestamp, format_uuid, lookup_code,
};
