#![forbid(unsafe_code)]
//! Error types for sbinfo.
//!
//! # Error Taxonomy
//!
//! sbinfo uses a two-layer error model:
//!
//! | Layer | Type | Crate | Purpose |
//! |-------|------|-------|---------|
//! | Parsing | `ParseError` | `sbinfo-types` | Layout violations and coded-value failures found while decoding bytes |
//! | Runtime | `SbError` | `sbinfo-error` (this crate) | User-facing errors for the CLI and API consumers |
//!
//! `sbinfo-error` does not depend on `sbinfo-types`. The conversion from
//! `ParseError` to `SbError` lives in `sbinfo-core`, which knows the source
//! identifier the bytes came from.
//!
//! | ParseError Variant | SbError Variant |
//! |--------------------|-----------------|
//! | `InsufficientData` | `Access` (truncated image) |
//! | `InvalidMagic` | `InvalidSuperblock` |
//! | `UnknownCode` | `UnknownCode` |
//! | `Unsupported` | `UnsupportedFeature` |
//! | `InvalidField` | `Parse` |
//!
//! ## errno Mapping
//!
//! | Variant | errno |
//! |---------|-------|
//! | `Access` | raw OS error, else `EIO` |
//! | `InvalidSuperblock` | `EINVAL` |
//! | `UnknownCode` | `EINVAL` |
//! | `UnsupportedFeature` | `EOPNOTSUPP` |
//! | `Parse` | `EINVAL` |

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SbError {
    /// The byte source could not be opened or is shorter than boot block
    /// plus superblock.
    #[error("cannot read superblock from {source_id}: {cause}")]
    Access {
        source_id: String,
        #[source]
        cause: std::io::Error,
    },

    /// The magic field does not carry the ext4 signature.
    #[error("{source_id} is not a valid ext4 filesystem (magic {magic:#06x})")]
    InvalidSuperblock { source_id: String, magic: u16 },

    /// An enum-coded field holds a value absent from its lookup table.
    ///
    /// Never replaced by a placeholder: an unrecognized code may mean
    /// corruption or an on-disk revision this build does not know.
    #[error("unknown {field} code: {code}")]
    UnknownCode { field: String, code: u32 },

    /// The requested field needs a feature check that is not implemented.
    #[error("unsupported feature: {0}")]
    UnsupportedFeature(String),

    /// Any other parse failure surfaced to the user.
    #[error("parse error: {0}")]
    Parse(String),
}

impl SbError {
    /// Build an `Access` error from an identifier and an I/O cause.
    pub fn access(source_id: impl Into<String>, cause: std::io::Error) -> Self {
        Self::Access {
            source_id: source_id.into(),
            cause,
        }
    }

    /// Convert this error into a POSIX errno, used by the CLI as exit status.
    ///
    /// The mapping is exhaustive; adding a variant is a compile error until
    /// its errno is assigned.
    #[must_use]
    pub fn to_errno(&self) -> libc::c_int {
        match self {
            Self::Access { cause, .. } => cause.raw_os_error().unwrap_or(libc::EIO),
            Self::InvalidSuperblock { .. } | Self::UnknownCode { .. } | Self::Parse(_) => {
                libc::EINVAL
            }
            Self::UnsupportedFeature(_) => libc::EOPNOTSUPP,
        }
    }
}

/// Result alias using `SbError`.
pub type Result<T> = std::result::Result<T, SbError>;
