//! Image header parsing
//!
//! Classifies a raw buffer as PE32, PE32+ or TE and establishes the
//! invariants the debug-directory code relies on: the section table lies in
//! the buffer, every section fits the image extent, sections are ordered and
//! disjoint, and every section's raw data lies in the buffer once the TE
//! stripped offset is taken away.

use tracing::debug;

use crate::config::ParseOptions;
use crate::error::ImageError;
use crate::formats::pe::sections::SectionTable;
use crate::formats::pe::types::*;
use crate::formats::pe::utils::{checked_end, ReadExt};
use crate::formats::pe::ImageDescriptor;

type Result<T> = std::result::Result<T, ImageError>;

fn truncated(expected: usize, data: &[u8]) -> ImageError {
    ImageError::TruncatedHeader {
        expected,
        actual: data.len(),
    }
}

/// Classify and validate an image buffer
pub fn parse_image<'data>(
    data: &'data [u8],
    options: &ParseOptions,
) -> Result<ImageDescriptor<'data>> {
    if u32::try_from(data.len()).is_err() {
        return Err(ImageError::ImageTooLarge(data.len()));
    }

    let signature = data.read_u16_le_at(0).ok_or_else(|| truncated(2, data))?;
    let image = match signature {
        DOS_SIGNATURE => {
            let exe_hdr_offset = parse_dos_header(data)?;
            parse_pe_headers(data, exe_hdr_offset)?
        }
        TE_SIGNATURE => {
            if !options.allow_te {
                return Err(ImageError::TeProhibited);
            }
            parse_te_header(data)?
        }
        _ if data.read_slice_at(0, 4) == Some(&PE_SIGNATURE[..]) => parse_pe_headers(data, 0)?,
        _ => return Err(ImageError::InvalidSignature),
    };

    debug!(
        format = %image.format(),
        size_of_image = image.size_of_image(),
        sections = image.number_of_sections(),
        file_size = data.len(),
        "classified image"
    );
    Ok(image)
}

/// Parse the DOS header, returning `e_lfanew`
pub fn parse_dos_header(data: &[u8]) -> Result<u32> {
    if data.len() < DOS_HEADER_SIZE {
        return Err(truncated(DOS_HEADER_SIZE, data));
    }
    data.read_u32_le_at(DOS_LFANEW_OFFSET)
        .ok_or_else(|| truncated(DOS_HEADER_SIZE, data))
}

/// Parse PE32/PE32+ NT headers located at `exe_hdr_offset`
pub fn parse_pe_headers(data: &[u8], exe_hdr_offset: u32) -> Result<ImageDescriptor<'_>> {
    let exe = exe_hdr_offset as usize;
    let opt = exe
        .checked_add(OPTIONAL_HEADER_OFFSET)
        .ok_or(ImageError::InvalidPeSignature)?;

    let signature = data.read_slice_at(exe, 4).ok_or_else(|| truncated(opt, data))?;
    if signature != PE_SIGNATURE {
        return Err(ImageError::InvalidPeSignature);
    }

    let number_of_sections = data.read_u16_le_at(exe + 6).ok_or_else(|| truncated(opt, data))?;
    let size_of_optional_header = data
        .read_u16_le_at(exe + 20)
        .ok_or_else(|| truncated(opt, data))?;

    let optional = data
        .read_slice_at(opt, usize::from(size_of_optional_header))
        .ok_or_else(|| truncated(opt.saturating_add(usize::from(size_of_optional_header)), data))?;

    let magic = optional
        .read_u16_le_at(0)
        .ok_or(ImageError::OptionalHeaderTooSmall {
            size: size_of_optional_header,
            required: 2,
        })?;
    let (format, count_offset, directory_offset) = match magic {
        PE32_MAGIC => (
            ImageFormat::Pe32 { exe_hdr_offset },
            PE32_NUMBER_OF_RVA_AND_SIZES_OFFSET,
            PE32_DATA_DIRECTORY_OFFSET,
        ),
        PE32PLUS_MAGIC => (
            ImageFormat::Pe32Plus { exe_hdr_offset },
            PE32PLUS_NUMBER_OF_RVA_AND_SIZES_OFFSET,
            PE32PLUS_DATA_DIRECTORY_OFFSET,
        ),
        other => return Err(ImageError::InvalidMagic(other)),
    };

    let too_small = |required: u64| ImageError::OptionalHeaderTooSmall {
        size: size_of_optional_header,
        required,
    };
    // The count field sits just before the directories, so this read
    // succeeding also proves the fixed part is present.
    let number_of_rva_and_sizes = optional
        .read_u32_le_at(count_offset)
        .ok_or_else(|| too_small(directory_offset as u64))?;
    let required =
        directory_offset as u64 + u64::from(number_of_rva_and_sizes) * DATA_DIRECTORY_SIZE as u64;
    if required > u64::from(size_of_optional_header) {
        return Err(too_small(required));
    }

    let size_of_image = optional
        .read_u32_le_at(OPTIONAL_HEADER_SIZE_OF_IMAGE_OFFSET)
        .ok_or_else(|| too_small(directory_offset as u64))?;

    let sections_offset = opt + usize::from(size_of_optional_header);
    let table = SectionTable::new(data, sections_offset, number_of_sections)
        .ok_or(ImageError::SectionTableOutOfBounds)?;
    validate_sections(data, &table, size_of_image, 0)?;

    Ok(ImageDescriptor::new(
        data,
        format,
        size_of_image,
        sections_offset as u32,
        number_of_sections,
    ))
}

/// Parse a TE header at the start of `data`
pub fn parse_te_header(data: &[u8]) -> Result<ImageDescriptor<'_>> {
    let header = data
        .read_slice_at(0, TE_HEADER_SIZE)
        .ok_or_else(|| truncated(TE_HEADER_SIZE, data))?;

    let number_of_sections = header.read_u8_at(4).map(u16::from).unwrap_or_default();
    let stripped_size = header.read_u16_le_at(6).unwrap_or_default();
    let stripped_offset = u32::from(stripped_size)
        .checked_sub(TE_HEADER_SIZE as u32)
        .ok_or(ImageError::InvalidStrippedSize(stripped_size))?;

    let table = SectionTable::new(data, TE_HEADER_SIZE, number_of_sections)
        .ok_or(ImageError::SectionTableOutOfBounds)?;

    // TE drops SizeOfImage; the highest section end stands in for it.
    let mut size_of_image = 0u32;
    for (index, section) in table.iter().enumerate() {
        let top = section
            .virtual_top()
            .ok_or(ImageError::SectionOutOfImage { index })?;
        size_of_image = size_of_image.max(top);
    }
    validate_sections(data, &table, size_of_image, stripped_offset)?;

    Ok(ImageDescriptor::new(
        data,
        ImageFormat::Te { stripped_offset },
        size_of_image,
        TE_HEADER_SIZE as u32,
        number_of_sections,
    ))
}

fn validate_sections(
    data: &[u8],
    table: &SectionTable<'_>,
    size_of_image: u32,
    stripped_offset: u32,
) -> Result<()> {
    let mut previous_top = 0u32;

    for (index, section) in table.iter().enumerate() {
        let top = section
            .virtual_top()
            .filter(|&top| top <= size_of_image)
            .ok_or(ImageError::SectionOutOfImage { index })?;
        if section.virtual_address < previous_top {
            return Err(ImageError::SectionsUnordered { index });
        }
        previous_top = top;

        if section.size_of_raw_data == 0 {
            continue;
        }
        section
            .pointer_to_raw_data
            .checked_sub(stripped_offset)
            .and_then(|start| checked_end(start, section.size_of_raw_data, data.len()))
            .ok_or(ImageError::SectionOutOfFile { index })?;
    }

    Ok(())
}
