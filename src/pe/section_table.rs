use std::io::{self, Read};

use zerocopy::{FromBytes, Immutable, KnownLayout, LittleEndian, U16, U32};

use crate::{pe::coff::CoffHeader, read::ReadBytesExt};

/// A single `IMAGE_SECTION_HEADER` entry.
#[derive(Clone, Copy, Debug, FromBytes, Immutable, KnownLayout)]
#[repr(C)]
struct SectionHeader {
    name: [u8; 8],
    virtual_size: U32<LittleEndian>,
    virtual_address: U32<LittleEndian>,
    size_of_raw_data: U32<LittleEndian>,
    pointer_to_raw_data: U32<LittleEndian>,
    pointer_to_relocations: U32<LittleEndian>,
    pointer_to_linenumbers: U32<LittleEndian>,
    number_of_relocations: U16<LittleEndian>,
    number_of_linenumbers: U16<LittleEndian>,
    characteristics: U32<LittleEndian>,
}

/// The section table, used to translate resource-directory RVAs into file offsets.
#[derive(Clone, Debug)]
pub struct SectionTable {
    sections: Vec<SectionHeader>,
}

impl SectionTable {
    pub fn read_from<R>(mut reader: R, coff_header: CoffHeader) -> io::Result<Self>
    where
        R: Read,
    {
        let sections = (0..coff_header.number_of_sections())
            .map(|_| reader.read_t::<SectionHeader>())
            .collect::<io::Result<Vec<_>>>()?;

        Ok(Self { sections })
    }

    /// Translates a relative virtual address into a file offset by locating the section that
    /// contains it.
    pub fn to_file_offset(&self, rva: u32) -> io::Result<u32> {
        self.sections
            .iter()
            .find(|section| {
                let start = section.virtual_address.get();
                let end = start + section.virtual_size.get().max(section.size_of_raw_data.get());
                (start..end).contains(&rva)
            })
            .map(|section| section.pointer_to_raw_data.get() + (rva - section.virtual_address.get()))
            .ok_or_else(|| {
                io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!("RVA {rva:#x} is not contained in any section"),
                )
            })
    }
}
