//! Error types for PDB path extraction.
//!
//! Three layers, mirroring how the crate is used:
//! - [`PdbError`] is the typed outcome of the debug-directory pipeline and
//!   keeps "no debug info" apart from "corrupt or hostile image".
//! - [`ImageError`] is what the bundled loader reports when an image's
//!   headers cannot be trusted at all.
//! - [`Error`] wraps both for the one-call convenience API.

use std::fmt;
use thiserror::Error;

/// Why no PDB path is available. None of these indicate corruption.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotFoundReason {
    /// Debug-directory processing is disabled by [`crate::ParseOptions`].
    DebugSupportDisabled,
    /// The optional header has too few data directories to hold a debug entry.
    NoDebugDirectory,
    /// The debug data directory is present but has size zero.
    EmptyDebugDirectory,
    /// No debug entry is tagged as CodeView.
    NoCodeViewEntry,
}

impl fmt::Display for NotFoundReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DebugSupportDisabled => write!(f, "debug support disabled"),
            Self::NoDebugDirectory => write!(f, "image has no debug data directory"),
            Self::EmptyDebugDirectory => write!(f, "debug directory is empty"),
            Self::NoCodeViewEntry => write!(f, "no CodeView debug entry"),
        }
    }
}

/// The specific check a malformed image failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MalformedReason {
    DirectorySizeNotMultiple { size: u32 },
    DirectoryOutOfImage { virtual_address: u32, size: u32 },
    DirectoryNotInSection { virtual_address: u32 },
    DirectoryExceedsRawData { section_index: usize },
    DirectoryOffsetOverflow,
    DirectoryMisaligned { offset: u32 },
    DirectoryOutOfFile { offset: u32 },
    CodeViewTooSmall { size: u32 },
    CodeViewOffsetUnderflow { offset: u32 },
    CodeViewOutOfFile { offset: u32, size: u32 },
    CodeViewMisaligned { offset: u32 },
    UnknownCodeViewSignature(u32),
    EmptyPdbPath,
    UnterminatedPdbPath,
}

impl fmt::Display for MalformedReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DirectorySizeNotMultiple { size } => {
                write!(f, "debug directory size {} is not a whole number of entries", size)
            }
            Self::DirectoryOutOfImage {
                virtual_address,
                size,
            } => write!(
                f,
                "debug directory 0x{:08x}+0x{:x} exceeds the image",
                virtual_address, size
            ),
            Self::DirectoryNotInSection { virtual_address } => write!(
                f,
                "debug directory at 0x{:08x} is not contained in any section",
                virtual_address
            ),
            Self::DirectoryExceedsRawData { section_index } => write!(
                f,
                "debug directory exceeds the raw data of section {}",
                section_index
            ),
            Self::DirectoryOffsetOverflow => write!(f, "debug directory file offset overflows"),
            Self::DirectoryMisaligned { offset } => {
                write!(f, "debug directory file offset 0x{:x} is misaligned", offset)
            }
            Self::DirectoryOutOfFile { offset } => {
                write!(f, "debug directory at file offset 0x{:x} exceeds the file", offset)
            }
            Self::CodeViewTooSmall { size } => {
                write!(f, "CodeView data of {} bytes cannot hold a signature", size)
            }
            Self::CodeViewOffsetUnderflow { offset } => write!(
                f,
                "CodeView file offset 0x{:x} lies inside the stripped header",
                offset
            ),
            Self::CodeViewOutOfFile { offset, size } => write!(
                f,
                "CodeView data 0x{:x}+0x{:x} exceeds the file",
                offset, size
            ),
            Self::CodeViewMisaligned { offset } => {
                write!(f, "CodeView file offset 0x{:x} is misaligned", offset)
            }
            Self::UnknownCodeViewSignature(sig) => {
                write!(f, "unknown CodeView signature 0x{:08x}", sig)
            }
            Self::EmptyPdbPath => write!(f, "PDB path is empty"),
            Self::UnterminatedPdbPath => write!(f, "PDB path is not NUL-terminated"),
        }
    }
}

/// Outcome of a failed PDB path lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PdbError {
    /// The image carries no PDB path. A normal outcome.
    #[error("PDB path not found: {0}")]
    NotFound(NotFoundReason),

    /// The debug data is corrupt or hostile.
    #[error("malformed debug data: {0}")]
    Malformed(MalformedReason),

    /// The image descriptor breaks an invariant its loader must guarantee.
    #[error("image descriptor contract violated: {0}")]
    ContractViolation(&'static str),
}

impl PdbError {
    pub(crate) fn not_found(reason: NotFoundReason) -> Self {
        tracing::trace!(%reason, "no PDB path");
        Self::NotFound(reason)
    }

    pub(crate) fn malformed(reason: MalformedReason) -> Self {
        tracing::debug!(%reason, "malformed debug data");
        Self::Malformed(reason)
    }

    /// Loader invariants are not data validation: panic in debug builds and
    /// surface as a distinct variant otherwise.
    #[track_caller]
    pub(crate) fn contract(what: &'static str) -> Self {
        tracing::error!(violation = what, "image descriptor contract violated");
        if cfg!(debug_assertions) {
            panic!("image descriptor contract violated: {}", what);
        }
        Self::ContractViolation(what)
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    pub fn is_malformed(&self) -> bool {
        matches!(self, Self::Malformed(_))
    }

    pub fn is_contract_violation(&self) -> bool {
        matches!(self, Self::ContractViolation(_))
    }
}

/// Errors from the bundled image loader.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ImageError {
    #[error("Truncated header: expected {expected} bytes, got {actual}")]
    TruncatedHeader { expected: usize, actual: usize },

    #[error("Invalid image signature")]
    InvalidSignature,

    #[error("Invalid PE signature")]
    InvalidPeSignature,

    #[error("Invalid optional header magic: 0x{0:04x}")]
    InvalidMagic(u16),

    #[error("TE images are prohibited")]
    TeProhibited,

    #[error("Invalid TE stripped size: {0}")]
    InvalidStrippedSize(u16),

    #[error("Optional header too small: {size} bytes, need {required}")]
    OptionalHeaderTooSmall { size: u16, required: u64 },

    #[error("Section table exceeds the file")]
    SectionTableOutOfBounds,

    #[error("Section {index} exceeds the image")]
    SectionOutOfImage { index: usize },

    #[error("Section {index} raw data exceeds the file")]
    SectionOutOfFile { index: usize },

    #[error("Section {index} overlaps or precedes the previous section")]
    SectionsUnordered { index: usize },

    #[error("Image buffer too large: {0} bytes")]
    ImageTooLarge(usize),
}

/// Main error type for the convenience API.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Image(#[from] ImageError),

    #[error(transparent)]
    Pdb(#[from] PdbError),

    /// Option (de)serialization errors
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result type alias for crate operations
pub type Result<T> = std::result::Result<T, Error>;
