//! Utility functions for PE parsing
//!
//! All offsets here may come from the image itself, so every helper
//! computes ranges with checked arithmetic and returns `None` instead of
//! panicking.

/// Extension trait for reading little-endian primitives from byte slices
pub trait ReadExt {
    fn read_u8_at(&self, offset: usize) -> Option<u8>;
    fn read_u16_le_at(&self, offset: usize) -> Option<u16>;
    fn read_u32_le_at(&self, offset: usize) -> Option<u32>;
    fn read_slice_at(&self, offset: usize, len: usize) -> Option<&[u8]>;
}

impl ReadExt for [u8] {
    #[inline(always)]
    fn read_u8_at(&self, offset: usize) -> Option<u8> {
        self.get(offset).copied()
    }

    #[inline(always)]
    fn read_u16_le_at(&self, offset: usize) -> Option<u16> {
        self.read_slice_at(offset, 2)
            .and_then(|b| b.try_into().ok())
            .map(u16::from_le_bytes)
    }

    #[inline(always)]
    fn read_u32_le_at(&self, offset: usize) -> Option<u32> {
        self.read_slice_at(offset, 4)
            .and_then(|b| b.try_into().ok())
            .map(u32::from_le_bytes)
    }

    #[inline(always)]
    fn read_slice_at(&self, offset: usize, len: usize) -> Option<&[u8]> {
        self.get(offset..offset.checked_add(len)?)
    }
}

/// Whether `value` is a multiple of `alignment` (a power of two).
#[inline(always)]
pub fn is_aligned(value: u32, alignment: u32) -> bool {
    debug_assert!(alignment.is_power_of_two());
    value & (alignment - 1) == 0
}

/// `offset + size` as an in-bounds end for a buffer of `len` bytes.
#[inline(always)]
pub fn checked_end(offset: u32, size: u32, len: usize) -> Option<u32> {
    let end = offset.checked_add(size)?;
    (end as usize <= len).then_some(end)
}
