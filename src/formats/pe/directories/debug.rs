//! Debug directory parsing
//!
//! Finds the debug data directory of an image, proves its virtual range is
//! sane, maps it to a raw file offset through the section table and exposes
//! the entry array as a borrowed view. The directory descriptor, the section
//! table and the entries all come from the file and are checked with
//! overflow-aware arithmetic before anything is sliced.

use tracing::trace;

use crate::config::ParseOptions;
use crate::error::{MalformedReason, NotFoundReason, PdbError};
use crate::formats::pe::types::*;
use crate::formats::pe::utils::{is_aligned, ReadExt};
use crate::formats::pe::ImageDescriptor;

type Result<T> = std::result::Result<T, PdbError>;

/// Debug directory whose virtual range passed size and extent checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidatedDirectory {
    pub virtual_address: u32,
    pub size: u32,
    pub count: u32,
}

/// Borrowed view over the debug directory entries in the file buffer.
#[derive(Debug, Clone, Copy)]
pub struct DebugDirectory<'data> {
    raw: &'data [u8],
    file_offset: u32,
}

impl<'data> DebugDirectory<'data> {
    /// View `size` bytes of entries at `file_offset`, or `None` if they do
    /// not fit in `data`.
    pub fn new(data: &'data [u8], file_offset: u32, size: u32) -> Option<Self> {
        let raw = data.read_slice_at(file_offset as usize, size as usize)?;
        Some(Self { raw, file_offset })
    }

    pub fn file_offset(&self) -> u32 {
        self.file_offset
    }

    pub fn len(&self) -> usize {
        self.raw.len() / DEBUG_ENTRY_SIZE
    }

    pub fn is_empty(&self) -> bool {
        self.raw.len() < DEBUG_ENTRY_SIZE
    }

    pub fn get(&self, index: usize) -> Option<DebugEntry> {
        let offset = index.checked_mul(DEBUG_ENTRY_SIZE)?;
        parse_debug_entry(self.raw.read_slice_at(offset, DEBUG_ENTRY_SIZE)?)
    }

    pub fn iter(&self) -> impl Iterator<Item = DebugEntry> + 'data {
        let raw = self.raw;
        raw.chunks_exact(DEBUG_ENTRY_SIZE)
            .filter_map(parse_debug_entry)
    }

    /// First entry tagged CodeView, with its index. Later CodeView entries
    /// are ignored.
    pub fn codeview(&self) -> Option<(usize, DebugEntry)> {
        self.iter().enumerate().find(|(_, entry)| entry.is_codeview())
    }
}

/// Decode one 28-byte debug directory entry
pub fn parse_debug_entry(raw: &[u8]) -> Option<DebugEntry> {
    Some(DebugEntry {
        characteristics: raw.read_u32_le_at(0)?,
        time_date_stamp: raw.read_u32_le_at(4)?,
        major_version: raw.read_u16_le_at(8)?,
        minor_version: raw.read_u16_le_at(10)?,
        debug_type: raw.read_u32_le_at(12)?,
        size_of_data: raw.read_u32_le_at(16)?,
        address_of_raw_data: raw.read_u32_le_at(20)?,
        pointer_to_raw_data: raw.read_u32_le_at(24)?,
    })
}

/// Locate, validate and map the debug directory of `image`.
pub fn parse_debug_directory<'data>(
    image: &ImageDescriptor<'data>,
    options: &ParseOptions,
) -> Result<DebugDirectory<'data>> {
    if !options.debug_support {
        return Err(PdbError::not_found(NotFoundReason::DebugSupportDisabled));
    }

    let directory = locate_debug_directory(image, options)?;
    let directory = validate_debug_directory(directory, image.size_of_image())?;
    let file_offset = map_debug_directory(image, &directory, options)?;

    let view = DebugDirectory::new(image.data(), file_offset, directory.size).ok_or_else(|| {
        PdbError::malformed(MalformedReason::DirectoryOutOfFile {
            offset: file_offset,
        })
    })?;
    trace!(
        file_offset,
        entries = directory.count,
        "debug directory mapped"
    );
    Ok(view)
}

/// Read the debug data directory descriptor for the image's format.
pub fn locate_debug_directory(
    image: &ImageDescriptor<'_>,
    options: &ParseOptions,
) -> Result<DataDirectory> {
    let data = image.data();

    let offset = match image.format() {
        ImageFormat::Te { .. } => {
            if !options.allow_te {
                return Err(PdbError::contract("TE image with TE support disabled"));
            }
            TE_DEBUG_DIRECTORY_OFFSET
        }
        ImageFormat::Pe32 { exe_hdr_offset } => pe_debug_directory_offset(
            data,
            exe_hdr_offset,
            PE32_NUMBER_OF_RVA_AND_SIZES_OFFSET,
            PE32_DATA_DIRECTORY_OFFSET,
        )?,
        ImageFormat::Pe32Plus { exe_hdr_offset } => pe_debug_directory_offset(
            data,
            exe_hdr_offset,
            PE32PLUS_NUMBER_OF_RVA_AND_SIZES_OFFSET,
            PE32PLUS_DATA_DIRECTORY_OFFSET,
        )?,
    };

    data.read_slice_at(offset, DATA_DIRECTORY_SIZE)
        .and_then(parse_data_directory)
        .ok_or_else(|| PdbError::contract("debug data directory outside the file"))
}

fn parse_data_directory(raw: &[u8]) -> Option<DataDirectory> {
    Some(DataDirectory {
        virtual_address: raw.read_u32_le_at(0)?,
        size: raw.read_u32_le_at(4)?,
    })
}

fn pe_debug_directory_offset(
    data: &[u8],
    exe_hdr_offset: u32,
    count_offset: usize,
    directory_offset: usize,
) -> Result<usize> {
    let optional = (exe_hdr_offset as usize)
        .checked_add(OPTIONAL_HEADER_OFFSET)
        .ok_or_else(|| PdbError::contract("optional header offset overflows"))?;

    let number_of_rva_and_sizes = optional
        .checked_add(count_offset)
        .and_then(|offset| data.read_u32_le_at(offset))
        .ok_or_else(|| PdbError::contract("optional header outside the file"))?;
    if number_of_rva_and_sizes as usize <= IMAGE_DIRECTORY_ENTRY_DEBUG {
        return Err(PdbError::not_found(NotFoundReason::NoDebugDirectory));
    }

    optional
        .checked_add(directory_offset + IMAGE_DIRECTORY_ENTRY_DEBUG * DATA_DIRECTORY_SIZE)
        .ok_or_else(|| PdbError::contract("optional header offset overflows"))
}

/// Check the directory is non-empty, a whole number of entries, and inside
/// the image extent.
pub fn validate_debug_directory(
    directory: DataDirectory,
    size_of_image: u32,
) -> Result<ValidatedDirectory> {
    let DataDirectory {
        virtual_address,
        size,
    } = directory;

    if size == 0 {
        return Err(PdbError::not_found(NotFoundReason::EmptyDebugDirectory));
    }

    if size as usize % DEBUG_ENTRY_SIZE != 0 {
        return Err(PdbError::malformed(
            MalformedReason::DirectorySizeNotMultiple { size },
        ));
    }

    match virtual_address.checked_add(size) {
        Some(top) if top <= size_of_image => {}
        _ => {
            return Err(PdbError::malformed(MalformedReason::DirectoryOutOfImage {
                virtual_address,
                size,
            }))
        }
    }

    Ok(ValidatedDirectory {
        virtual_address,
        size,
        count: size / DEBUG_ENTRY_SIZE as u32,
    })
}

/// Translate the directory's virtual range to a raw file offset.
pub fn map_debug_directory(
    image: &ImageDescriptor<'_>,
    directory: &ValidatedDirectory,
    options: &ParseOptions,
) -> Result<u32> {
    let sections = image.sections()?;

    let (index, section) = sections
        .section_containing_range(directory.virtual_address, directory.size)
        .ok_or_else(|| {
            PdbError::malformed(MalformedReason::DirectoryNotInSection {
                virtual_address: directory.virtual_address,
            })
        })?;

    // Containment proves section.virtual_address <= directory.virtual_address.
    let section_offset = directory.virtual_address - section.virtual_address;
    match section_offset.checked_add(directory.size) {
        Some(raw_top) if raw_top <= section.size_of_raw_data => {}
        _ => {
            return Err(PdbError::malformed(
                MalformedReason::DirectoryExceedsRawData {
                    section_index: index,
                },
            ))
        }
    }

    let mut file_offset = section
        .pointer_to_raw_data
        .checked_add(section_offset)
        .ok_or_else(|| PdbError::malformed(MalformedReason::DirectoryOffsetOverflow))?;

    // Gated on configuration rather than format; PE images strip nothing.
    if options.allow_te {
        let stripped = image.te_stripped_offset();
        if stripped > section.pointer_to_raw_data {
            return Err(PdbError::contract(
                "TE stripped offset exceeds a section's raw data pointer",
            ));
        }
        file_offset -= stripped;
    } else {
        debug_assert_eq!(image.te_stripped_offset(), 0);
    }

    if !is_aligned(file_offset, DEBUG_ENTRY_ALIGN) {
        return Err(PdbError::malformed(MalformedReason::DirectoryMisaligned {
            offset: file_offset,
        }));
    }

    trace!(section = %section.name(), index, file_offset, "debug directory in section");
    Ok(file_offset)
}
