//! Fluent builder for synthetic PE32, PE32+ and TE images.
//!
//! PE layout: DOS header at 0 with `e_lfanew = 0x40`, NT headers at 0x40,
//! optional header at 0x58, section table right after the data directories.
//! TE layout: 40-byte header at 0, section table at 40. Raw patches are
//! addressed by buffer offset, so for TE images callers account for the
//! stripped offset themselves.

const PE32_MAGIC: u16 = 0x10b;
const PE32PLUS_MAGIC: u16 = 0x20b;

#[derive(Debug, Clone, Copy)]
enum Kind {
    Pe32,
    Pe32Plus,
    Te { stripped_size: u16 },
}

#[derive(Debug, Clone)]
pub struct Section {
    pub name: [u8; 8],
    pub virtual_address: u32,
    pub virtual_size: u32,
    pub pointer_to_raw_data: u32,
    pub size_of_raw_data: u32,
}

impl Section {
    pub fn new(
        name: &str,
        virtual_address: u32,
        virtual_size: u32,
        pointer_to_raw_data: u32,
        size_of_raw_data: u32,
    ) -> Self {
        let mut raw = [0u8; 8];
        let len = name.len().min(8);
        raw[..len].copy_from_slice(&name.as_bytes()[..len]);
        Self {
            name: raw,
            virtual_address,
            virtual_size,
            pointer_to_raw_data,
            size_of_raw_data,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ImageBuilder {
    kind: Kind,
    number_of_rva_and_sizes: u32,
    size_of_image: u32,
    sections: Vec<Section>,
    debug_directory: (u32, u32),
    file_len: usize,
    patches: Vec<(usize, Vec<u8>)>,
}

impl ImageBuilder {
    fn with_kind(kind: Kind) -> Self {
        Self {
            kind,
            number_of_rva_and_sizes: 16,
            size_of_image: 0x2000,
            sections: Vec::new(),
            debug_directory: (0, 0),
            file_len: 0x400,
            patches: Vec::new(),
        }
    }

    pub fn pe32() -> Self {
        Self::with_kind(Kind::Pe32)
    }

    pub fn pe32plus() -> Self {
        Self::with_kind(Kind::Pe32Plus)
    }

    /// TE image whose header claims `stripped_size` bytes were removed
    pub fn te(stripped_size: u16) -> Self {
        Self::with_kind(Kind::Te { stripped_size })
    }

    pub fn number_of_rva_and_sizes(mut self, count: u32) -> Self {
        self.number_of_rva_and_sizes = count;
        self
    }

    pub fn size_of_image(mut self, size: u32) -> Self {
        self.size_of_image = size;
        self
    }

    pub fn section(mut self, section: Section) -> Self {
        self.sections.push(section);
        self
    }

    pub fn debug_directory(mut self, virtual_address: u32, size: u32) -> Self {
        self.debug_directory = (virtual_address, size);
        self
    }

    pub fn file_len(mut self, len: usize) -> Self {
        self.file_len = len;
        self
    }

    /// Copy `bytes` into the buffer at `offset`
    pub fn bytes(mut self, offset: usize, bytes: &[u8]) -> Self {
        self.patches.push((offset, bytes.to_vec()));
        self
    }

    /// Write a 28-byte debug directory entry at buffer `offset`
    pub fn debug_entry(
        self,
        offset: usize,
        debug_type: u32,
        size_of_data: u32,
        pointer_to_raw_data: u32,
    ) -> Self {
        let mut entry = [0u8; 28];
        entry[12..16].copy_from_slice(&debug_type.to_le_bytes());
        entry[16..20].copy_from_slice(&size_of_data.to_le_bytes());
        entry[24..28].copy_from_slice(&pointer_to_raw_data.to_le_bytes());
        self.bytes(offset, &entry)
    }

    /// Write an RSDS record (zeroed GUID and age) followed by `name`
    pub fn rsds(self, offset: usize, name: &[u8]) -> Self {
        let mut record = b"RSDS".to_vec();
        record.resize(24, 0);
        record.extend_from_slice(name);
        self.bytes(offset, &record)
    }

    pub fn build(&self) -> Vec<u8> {
        let mut data = vec![0u8; self.file_len];
        let sections_offset = match self.kind {
            Kind::Pe32 | Kind::Pe32Plus => self.write_pe_headers(&mut data),
            Kind::Te { stripped_size } => self.write_te_header(&mut data, stripped_size),
        };

        for (i, section) in self.sections.iter().enumerate() {
            let base = sections_offset + i * 40;
            data[base..base + 8].copy_from_slice(&section.name);
            put_u32(&mut data, base + 8, section.virtual_size);
            put_u32(&mut data, base + 12, section.virtual_address);
            put_u32(&mut data, base + 16, section.size_of_raw_data);
            put_u32(&mut data, base + 20, section.pointer_to_raw_data);
            put_u32(&mut data, base + 36, 0x4000_0040);
        }

        for (offset, bytes) in &self.patches {
            data[*offset..*offset + bytes.len()].copy_from_slice(bytes);
        }
        data
    }

    fn write_pe_headers(&self, data: &mut [u8]) -> usize {
        data[0..2].copy_from_slice(b"MZ");
        put_u32(data, 60, 0x40);
        data[0x40..0x44].copy_from_slice(b"PE\0\0");

        let (machine, magic, count_offset, directory_offset) = match self.kind {
            Kind::Pe32Plus => (0x8664u16, PE32PLUS_MAGIC, 108, 112),
            _ => (0x014c, PE32_MAGIC, 92, 96),
        };
        let size_of_optional_header =
            directory_offset + self.number_of_rva_and_sizes as usize * 8;
        put_u16(data, 0x44, machine);
        put_u16(data, 0x46, self.sections.len() as u16);
        put_u16(data, 0x54, size_of_optional_header as u16);

        let opt = 0x58;
        put_u16(data, opt, magic);
        put_u32(data, opt + 56, self.size_of_image);
        put_u32(data, opt + count_offset, self.number_of_rva_and_sizes);
        if self.number_of_rva_and_sizes > 6 {
            let entry = opt + directory_offset + 6 * 8;
            put_u32(data, entry, self.debug_directory.0);
            put_u32(data, entry + 4, self.debug_directory.1);
        }
        opt + size_of_optional_header
    }

    fn write_te_header(&self, data: &mut [u8], stripped_size: u16) -> usize {
        data[0..2].copy_from_slice(b"VZ");
        put_u16(data, 2, 0x8664);
        data[4] = self.sections.len() as u8;
        data[5] = 10;
        put_u16(data, 6, stripped_size);
        put_u32(data, 32, self.debug_directory.0);
        put_u32(data, 36, self.debug_directory.1);
        40
    }
}

fn put_u16(data: &mut [u8], offset: usize, value: u16) {
    data[offset..offset + 2].copy_from_slice(&value.to_le_bytes());
}

fn put_u32(data: &mut [u8], offset: usize, value: u32) {
    data[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
}
