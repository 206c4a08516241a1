//! CodeView record parsing

use std::ffi::CStr;
use std::fmt;

use tracing::trace;

use crate::config::ParseOptions;
use crate::error::{MalformedReason, NotFoundReason, PdbError};
use crate::formats::pe::directories::debug::parse_debug_directory;
use crate::formats::pe::types::*;
use crate::formats::pe::utils::{checked_end, is_aligned, ReadExt};
use crate::formats::pe::ImageDescriptor;

type Result<T> = std::result::Result<T, PdbError>;

/// PDB path borrowed from the image buffer.
///
/// The view always ends with a NUL byte and is never empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PdbPath<'data> {
    bytes: &'data [u8],
    offset: u32,
    signature: CodeViewSignature,
}

impl<'data> PdbPath<'data> {
    /// The name bytes including the terminator.
    pub fn as_bytes_with_nul(&self) -> &'data [u8] {
        self.bytes
    }

    /// The name bytes up to the first NUL.
    pub fn as_bytes(&self) -> &'data [u8] {
        self.as_c_str().to_bytes()
    }

    pub fn as_c_str(&self) -> &'data CStr {
        CStr::from_bytes_until_nul(self.bytes).unwrap_or_default()
    }

    pub fn to_str(&self) -> std::result::Result<&'data str, std::str::Utf8Error> {
        std::str::from_utf8(self.as_bytes())
    }

    pub fn as_ptr(&self) -> *const u8 {
        self.bytes.as_ptr()
    }

    /// Length including the terminator.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Buffer offset of the first name byte.
    pub fn offset(&self) -> u32 {
        self.offset
    }

    pub fn signature(&self) -> CodeViewSignature {
        self.signature
    }
}

impl AsRef<[u8]> for PdbPath<'_> {
    fn as_ref(&self) -> &[u8] {
        self.bytes
    }
}

impl fmt::Display for PdbPath<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", String::from_utf8_lossy(self.as_bytes()))
    }
}

/// Find the PDB path named by the image's first CodeView debug entry.
pub fn find_pdb_path<'data>(
    image: &ImageDescriptor<'data>,
    options: &ParseOptions,
) -> Result<PdbPath<'data>> {
    let directory = parse_debug_directory(image, options)?;

    let (index, entry) = directory
        .codeview()
        .ok_or_else(|| PdbError::not_found(NotFoundReason::NoCodeViewEntry))?;
    trace!(index, size = entry.size_of_data, "CodeView entry found");

    extract_pdb_path(image, &entry, options)
}

/// Validate the CodeView record behind `entry` and borrow its PDB path.
pub fn extract_pdb_path<'data>(
    image: &ImageDescriptor<'data>,
    entry: &DebugEntry,
    options: &ParseOptions,
) -> Result<PdbPath<'data>> {
    let data = image.data();
    let size = entry.size_of_data;

    if size < 4 {
        return Err(PdbError::malformed(MalformedReason::CodeViewTooSmall {
            size,
        }));
    }

    let mut offset = entry.pointer_to_raw_data;
    if options.allow_te {
        offset = offset
            .checked_sub(image.te_stripped_offset())
            .ok_or_else(|| {
                PdbError::malformed(MalformedReason::CodeViewOffsetUnderflow { offset })
            })?;
    } else {
        debug_assert_eq!(image.te_stripped_offset(), 0);
    }

    let record = checked_end(offset, size, data.len())
        .and_then(|_| data.read_slice_at(offset as usize, size as usize))
        .ok_or_else(|| PdbError::malformed(MalformedReason::CodeViewOutOfFile { offset, size }))?;
    if !is_aligned(offset, 4) {
        return Err(PdbError::malformed(MalformedReason::CodeViewMisaligned {
            offset,
        }));
    }

    // size >= 4 was checked above
    let raw_signature = record.read_u32_le_at(0).unwrap_or_default();
    let signature = CodeViewSignature::from_u32(raw_signature).ok_or_else(|| {
        PdbError::malformed(MalformedReason::UnknownCodeViewSignature(raw_signature))
    })?;

    let header_size = signature.header_size();
    let name_size = size
        .checked_sub(header_size)
        .ok_or_else(|| PdbError::malformed(MalformedReason::CodeViewTooSmall { size }))?;
    if name_size == 0 {
        return Err(PdbError::malformed(MalformedReason::EmptyPdbPath));
    }

    let name = &record[header_size as usize..];
    if name.last() != Some(&0) {
        return Err(PdbError::malformed(MalformedReason::UnterminatedPdbPath));
    }

    let path = PdbPath {
        bytes: name,
        offset: offset + header_size,
        signature,
    };
    trace!(%signature, offset = path.offset, len = path.len(), "PDB path extracted");
    Ok(path)
}
