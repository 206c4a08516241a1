//! PE/COFF and TE image support
//!
//! [`ImageDescriptor`] is the validated view of an image buffer that the
//! debug-directory and CodeView readers work from. It borrows the buffer and
//! never copies out of it.

pub mod directories;
pub mod headers;
pub mod sections;
pub mod types;
pub mod utils;

#[cfg(test)]
#[allow(dead_code)]
#[path = "../../../tests/common/image_builder.rs"]
mod image_builder;
#[cfg(test)]
mod testing;

pub use directories::{find_pdb_path, DebugDirectory, PdbPath};
pub use sections::SectionTable;
pub use types::*;

use crate::config::ParseOptions;
use crate::error::{ImageError, PdbError};

/// A classified image buffer.
///
/// Built by [`ImageDescriptor::parse`], which guarantees the section table
/// lies inside the buffer, every section fits within `size_of_image`, and
/// sections are ordered and disjoint. Descriptors assembled by hand with
/// [`ImageDescriptor::new`] carry the same obligations; breaking them is
/// reported as a contract violation rather than malformed input.
#[derive(Debug, Clone, Copy)]
pub struct ImageDescriptor<'data> {
    data: &'data [u8],
    format: ImageFormat,
    size_of_image: u32,
    sections_offset: u32,
    number_of_sections: u16,
}

impl<'data> ImageDescriptor<'data> {
    /// Assemble a descriptor from already-validated header facts
    pub fn new(
        data: &'data [u8],
        format: ImageFormat,
        size_of_image: u32,
        sections_offset: u32,
        number_of_sections: u16,
    ) -> Self {
        debug_assert!(
            SectionTable::new(data, sections_offset as usize, number_of_sections).is_some(),
            "section table outside image buffer"
        );
        Self {
            data,
            format,
            size_of_image,
            sections_offset,
            number_of_sections,
        }
    }

    /// Classify and validate `data` as a PE32, PE32+ or TE image
    pub fn parse(data: &'data [u8], options: &ParseOptions) -> Result<Self, ImageError> {
        headers::parse_image(data, options)
    }

    pub fn data(&self) -> &'data [u8] {
        self.data
    }

    pub fn format(&self) -> ImageFormat {
        self.format
    }

    pub fn size_of_image(&self) -> u32 {
        self.size_of_image
    }

    /// File offset of the first section header
    pub fn sections_offset(&self) -> u32 {
        self.sections_offset
    }

    pub fn number_of_sections(&self) -> u16 {
        self.number_of_sections
    }

    /// Bytes removed from the front of a TE image, zero otherwise
    pub fn te_stripped_offset(&self) -> u32 {
        self.format.te_stripped_offset()
    }

    pub fn file_size(&self) -> usize {
        self.data.len()
    }

    /// Borrow the section table.
    ///
    /// A table that does not fit the buffer means the descriptor was built
    /// without validation.
    pub fn sections(&self) -> Result<SectionTable<'data>, PdbError> {
        SectionTable::new(
            self.data,
            self.sections_offset as usize,
            self.number_of_sections,
        )
        .ok_or_else(|| PdbError::contract("section table outside image buffer"))
    }

    /// Locate, validate and map the debug directory
    pub fn debug_directory(&self, options: &ParseOptions) -> Result<DebugDirectory<'data>, PdbError> {
        directories::parse_debug_directory(self, options)
    }

    /// Borrow the PDB path named by the first CodeView debug entry
    pub fn pdb_path(&self, options: &ParseOptions) -> Result<PdbPath<'data>, PdbError> {
        find_pdb_path(self, options)
    }
}
