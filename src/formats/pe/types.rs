//! Core PE/TE data types and structures

use std::fmt;

// Image signatures
pub const DOS_SIGNATURE: u16 = 0x5A4D; // MZ
pub const TE_SIGNATURE: u16 = 0x5A56; // VZ
pub const PE_SIGNATURE: [u8; 4] = *b"PE\0\0";
pub const PE32_MAGIC: u16 = 0x10B;
pub const PE32PLUS_MAGIC: u16 = 0x20B;

// Header layout
pub const DOS_HEADER_SIZE: usize = 64;
pub const DOS_LFANEW_OFFSET: usize = 60;
pub const COFF_HEADER_SIZE: usize = 20;
/// PE signature plus COFF header; the optional header starts here.
pub const OPTIONAL_HEADER_OFFSET: usize = 4 + COFF_HEADER_SIZE;
pub const PE32_NUMBER_OF_RVA_AND_SIZES_OFFSET: usize = 92;
pub const PE32_DATA_DIRECTORY_OFFSET: usize = 96;
pub const PE32PLUS_NUMBER_OF_RVA_AND_SIZES_OFFSET: usize = 108;
pub const PE32PLUS_DATA_DIRECTORY_OFFSET: usize = 112;
pub const OPTIONAL_HEADER_SIZE_OF_IMAGE_OFFSET: usize = 56;
pub const TE_HEADER_SIZE: usize = 40;
pub const TE_DEBUG_DIRECTORY_OFFSET: usize = 32;

// Record sizes
pub const DATA_DIRECTORY_SIZE: usize = 8;
pub const SECTION_HEADER_SIZE: usize = 40;
pub const DEBUG_ENTRY_SIZE: usize = 28;
/// Debug entries are arrays of naturally aligned 32-bit fields.
pub const DEBUG_ENTRY_ALIGN: u32 = 4;

pub const IMAGE_DIRECTORY_ENTRY_DEBUG: usize = 6;
pub const IMAGE_DEBUG_TYPE_CODEVIEW: u32 = 2;

// CodeView signatures, read as little-endian words
pub const CODEVIEW_SIGNATURE_NB10: u32 = u32::from_le_bytes(*b"NB10");
pub const CODEVIEW_SIGNATURE_RSDS: u32 = u32::from_le_bytes(*b"RSDS");
pub const CODEVIEW_SIGNATURE_MTOC: u32 = u32::from_le_bytes(*b"MTOC");

/// Container format of a classified image, with the fields only that
/// format has.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    Pe32 { exe_hdr_offset: u32 },
    Pe32Plus { exe_hdr_offset: u32 },
    /// `stripped_offset` is the TE header's `StrippedSize` minus the TE
    /// header itself: how far every recorded raw offset must move back.
    Te { stripped_offset: u32 },
}

impl ImageFormat {
    /// Zero for the PE variants, which strip nothing.
    pub fn te_stripped_offset(&self) -> u32 {
        match self {
            Self::Te { stripped_offset } => *stripped_offset,
            Self::Pe32 { .. } | Self::Pe32Plus { .. } => 0,
        }
    }

    pub fn is_64bit(&self) -> bool {
        matches!(self, Self::Pe32Plus { .. })
    }
}

impl fmt::Display for ImageFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pe32 { .. } => write!(f, "PE32"),
            Self::Pe32Plus { .. } => write!(f, "PE32+"),
            Self::Te { .. } => write!(f, "TE"),
        }
    }
}

/// Data directory entry
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DataDirectory {
    pub virtual_address: u32,
    pub size: u32,
}

/// Section header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SectionHeader {
    pub name: [u8; 8],
    pub virtual_size: u32,
    pub virtual_address: u32,
    pub size_of_raw_data: u32,
    pub pointer_to_raw_data: u32,
    pub characteristics: u32,
}

impl SectionHeader {
    pub fn name(&self) -> String {
        let end = self.name.iter().position(|&b| b == 0).unwrap_or(8);
        String::from_utf8_lossy(&self.name[..end]).to_string()
    }

    /// End of the section in virtual space, `None` on overflow.
    pub fn virtual_top(&self) -> Option<u32> {
        self.virtual_address.checked_add(self.virtual_size)
    }

    /// Whether `[rva, rva + size)` lies entirely inside the section's
    /// virtual range.
    pub fn contains_range(&self, rva: u32, size: u32) -> bool {
        let (Some(top), Some(section_top)) = (rva.checked_add(size), self.virtual_top()) else {
            return false;
        };
        rva >= self.virtual_address && top <= section_top
    }
}

/// Debug directory entry (IMAGE_DEBUG_DIRECTORY)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DebugEntry {
    pub characteristics: u32,
    pub time_date_stamp: u32,
    pub major_version: u16,
    pub minor_version: u16,
    pub debug_type: u32,
    pub size_of_data: u32,
    pub address_of_raw_data: u32,
    pub pointer_to_raw_data: u32,
}

impl DebugEntry {
    pub fn is_codeview(&self) -> bool {
        self.debug_type == IMAGE_DEBUG_TYPE_CODEVIEW
    }
}

/// Recognized CodeView record layouts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodeViewSignature {
    /// PDB 2.0: signature, offset, timestamp, age
    Nb10,
    /// PDB 7.0: signature, GUID, age
    Rsds,
    /// Mach-O converted images: signature, UUID
    Mtoc,
}

impl CodeViewSignature {
    pub fn from_u32(value: u32) -> Option<Self> {
        match value {
            CODEVIEW_SIGNATURE_NB10 => Some(Self::Nb10),
            CODEVIEW_SIGNATURE_RSDS => Some(Self::Rsds),
            CODEVIEW_SIGNATURE_MTOC => Some(Self::Mtoc),
            _ => None,
        }
    }

    pub fn as_u32(&self) -> u32 {
        match self {
            Self::Nb10 => CODEVIEW_SIGNATURE_NB10,
            Self::Rsds => CODEVIEW_SIGNATURE_RSDS,
            Self::Mtoc => CODEVIEW_SIGNATURE_MTOC,
        }
    }

    /// Size of the fixed record header that precedes the PDB path.
    pub fn header_size(&self) -> u32 {
        match self {
            Self::Nb10 => 16,
            Self::Rsds => 24,
            Self::Mtoc => 20,
        }
    }
}

impl fmt::Display for CodeViewSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Nb10 => write!(f, "NB10"),
            Self::Rsds => write!(f, "RSDS"),
            Self::Mtoc => write!(f, "MTOC"),
        }
    }
}
