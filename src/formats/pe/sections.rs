//! Section table access for PE and TE images

use crate::formats::pe::types::*;
use crate::formats::pe::utils::ReadExt;

/// Borrowed view over an on-disk section header array.
///
/// Headers are decoded on demand, so walking the table never allocates.
#[derive(Debug, Clone, Copy)]
pub struct SectionTable<'data> {
    raw: &'data [u8],
}

impl<'data> SectionTable<'data> {
    /// View `count` headers starting at `offset`, or `None` if the table
    /// does not fit in `data`.
    pub fn new(data: &'data [u8], offset: usize, count: u16) -> Option<Self> {
        let len = usize::from(count).checked_mul(SECTION_HEADER_SIZE)?;
        let raw = data.read_slice_at(offset, len)?;
        Some(Self { raw })
    }

    pub fn len(&self) -> usize {
        self.raw.len() / SECTION_HEADER_SIZE
    }

    pub fn is_empty(&self) -> bool {
        self.raw.is_empty()
    }

    /// Decode the header at `index`
    pub fn get(&self, index: usize) -> Option<SectionHeader> {
        let offset = index.checked_mul(SECTION_HEADER_SIZE)?;
        parse_section_header(self.raw.read_slice_at(offset, SECTION_HEADER_SIZE)?)
    }

    pub fn iter(&self) -> impl Iterator<Item = SectionHeader> + 'data {
        let raw = self.raw;
        raw.chunks_exact(SECTION_HEADER_SIZE)
            .filter_map(parse_section_header)
    }

    /// First section whose virtual range fully contains `[rva, rva + size)`,
    /// with its index.
    pub fn section_containing_range(&self, rva: u32, size: u32) -> Option<(usize, SectionHeader)> {
        self.iter()
            .enumerate()
            .find(|(_, s)| s.contains_range(rva, size))
    }
}

/// Decode one 40-byte section header
pub fn parse_section_header(raw: &[u8]) -> Option<SectionHeader> {
    let mut name = [0u8; 8];
    name.copy_from_slice(raw.read_slice_at(0, 8)?);

    Some(SectionHeader {
        name,
        virtual_size: raw.read_u32_le_at(8)?,
        virtual_address: raw.read_u32_le_at(12)?,
        size_of_raw_data: raw.read_u32_le_at(16)?,
        pointer_to_raw_data: raw.read_u32_le_at(20)?,
        characteristics: raw.read_u32_le_at(36)?,
    })
}
