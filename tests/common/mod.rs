//! Common test utilities and helpers.
//!
//! Integration tests synthesize their images with [`ImageBuilder`] rather
//! than shipping binaries.

#![allow(dead_code)]

pub mod image_builder;

pub use image_builder::{ImageBuilder, Section};

/// Size of the fixed RSDS header (signature, GUID, age)
pub const RSDS_HEADER_SIZE: u32 = 24;

/// Standard `.rdata` used by most tests: RVA 0x1000, file offset 0x200
pub fn rdata() -> Section {
    Section::new(".rdata", 0x1000, 0x200, 0x200, 0x200)
}

/// PE32+ image whose single debug entry is an RSDS record naming `name`.
///
/// The directory sits at RVA 0x1000 (file 0x200), the record at file 0x280.
pub fn rsds_image(name: &[u8]) -> Vec<u8> {
    let size = RSDS_HEADER_SIZE + name.len() as u32;
    ImageBuilder::pe32plus()
        .section(rdata())
        .debug_directory(0x1000, 28)
        .debug_entry(0x200, 2, size, 0x280)
        .rsds(0x280, name)
        .build()
}
