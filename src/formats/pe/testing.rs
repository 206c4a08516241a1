//! Synthetic images for unit tests, built with the shared `ImageBuilder`

use crate::formats::pe::image_builder::{ImageBuilder, Section};
use crate::formats::pe::types::*;

pub const TEST_SIZE_OF_IMAGE: u32 = 0x2000;

/// `.rdata` at RVA 0x1000, file offset 0x200
pub const RDATA: SectionHeader = SectionHeader {
    name: *b".rdata\0\0",
    virtual_size: 0x200,
    virtual_address: 0x1000,
    size_of_raw_data: 0x200,
    pointer_to_raw_data: 0x200,
    characteristics: 0x4000_0040,
};

/// `.rdata` for a TE image stripped by 0x1c0 bytes: buffer offset 0x80
pub const TE_RDATA: SectionHeader = SectionHeader {
    name: *b".rdata\0\0",
    virtual_size: 0x200,
    virtual_address: 0x1000,
    size_of_raw_data: 0x100,
    pointer_to_raw_data: 0x240,
    characteristics: 0x4000_0040,
};

pub fn put_u32(data: &mut [u8], offset: usize, value: u32) {
    data[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
}

fn builder_section(section: &SectionHeader) -> Section {
    Section {
        name: section.name,
        virtual_address: section.virtual_address,
        virtual_size: section.virtual_size,
        pointer_to_raw_data: section.pointer_to_raw_data,
        size_of_raw_data: section.size_of_raw_data,
    }
}

fn with_sections(builder: ImageBuilder, sections: &[SectionHeader]) -> ImageBuilder {
    sections
        .iter()
        .fold(builder, |builder, section| builder.section(builder_section(section)))
}

/// DOS stub at 0, NT headers at 0x40, optional header at 0x58
pub fn pe_image(
    magic: u16,
    number_of_rva_and_sizes: u32,
    sections: &[SectionHeader],
    debug_dir: DataDirectory,
    file_len: usize,
) -> Vec<u8> {
    let builder = if magic == PE32PLUS_MAGIC {
        ImageBuilder::pe32plus()
    } else {
        ImageBuilder::pe32()
    };
    let builder = builder
        .number_of_rva_and_sizes(number_of_rva_and_sizes)
        .size_of_image(TEST_SIZE_OF_IMAGE)
        .debug_directory(debug_dir.virtual_address, debug_dir.size)
        .file_len(file_len);
    with_sections(builder, sections).build()
}

/// TE header at 0, sections at 40
pub fn te_image(
    sections: &[SectionHeader],
    debug_dir: DataDirectory,
    stripped_size: u16,
    file_len: usize,
) -> Vec<u8> {
    let builder = ImageBuilder::te(stripped_size)
        .debug_directory(debug_dir.virtual_address, debug_dir.size)
        .file_len(file_len);
    with_sections(builder, sections).build()
}

pub fn put_debug_entry(
    data: &mut [u8],
    offset: usize,
    debug_type: u32,
    size_of_data: u32,
    pointer_to_raw_data: u32,
) {
    put_u32(data, offset + 12, debug_type);
    put_u32(data, offset + 16, size_of_data);
    put_u32(data, offset + 24, pointer_to_raw_data);
}

/// Write a CodeView record at `offset`, returning its size of data
pub fn put_codeview(data: &mut [u8], offset: usize, signature: CodeViewSignature, name: &[u8]) -> u32 {
    put_u32(data, offset, signature.as_u32());
    let start = offset + signature.header_size() as usize;
    data[start..start + name.len()].copy_from_slice(name);
    signature.header_size() + name.len() as u32
}
