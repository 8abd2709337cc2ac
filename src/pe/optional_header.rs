use std::io::{self, Read};

use zerocopy::LE;

use crate::{pe::section_table::SectionTable, read::ReadBytesExt};

/// A single entry of the optional header's data directory array.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct DataDirectory {
    virtual_address: u32,
    size: u32,
}

impl DataDirectory {
    fn read_from<R: Read>(mut reader: R) -> io::Result<Self> {
        Ok(Self {
            virtual_address: reader.read_u32::<LE>()?,
            size: reader.read_u32::<LE>()?,
        })
    }

    /// Returns the size, in bytes, of the data this directory entry points at.
    #[must_use]
    #[inline]
    pub const fn size(self) -> u32 {
        self.size
    }

    /// Resolves this directory entry's virtual address to a file offset using the section table.
    pub fn file_offset(self, sections: &SectionTable) -> io::Result<u32> {
        sections.to_file_offset(self.virtual_address)
    }
}

/// The `DataDirectory` array at the end of the optional header.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct DataDirectories(Vec<DataDirectory>);

impl DataDirectories {
    /// Index of the resource table entry, per the PE/COFF specification.
    const RESOURCE_TABLE_INDEX: usize = 2;

    /// Returns the resource table directory entry, if the image has one.
    #[must_use]
    pub fn resource_table(&self) -> Option<DataDirectory> {
        self.0
            .get(Self::RESOURCE_TABLE_INDEX)
            .copied()
            .filter(|directory| directory.virtual_address != 0)
    }
}

/// The PE optional header, which varies in size between PE32 and PE32+ (64-bit) images.
///
/// Only the fields needed to locate the resource table are kept; everything else is skipped
/// while reading.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct OptionalHeader {
    magic: u16,
    pub data_directories: DataDirectories,
}

impl OptionalHeader {
    const PE32_MAGIC: u16 = 0x10b;
    const PE32_PLUS_MAGIC: u16 = 0x20b;

    pub fn read_from<R>(mut reader: R) -> io::Result<Self>
    where
        R: Read,
    {
        let magic = reader.read_u16::<LE>()?;
        let is_pe32_plus = magic == Self::PE32_PLUS_MAGIC;

        if magic != Self::PE32_MAGIC && magic != Self::PE32_PLUS_MAGIC {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("unknown optional header magic: {magic:#06x}"),
            ));
        }

        // MajorLinkerVersion, MinorLinkerVersion, SizeOfCode, SizeOfInitializedData,
        // SizeOfUninitializedData, AddressOfEntryPoint, BaseOfCode
        let mut standard_fields = [0u8; 1 + 1 + 4 + 4 + 4 + 4 + 4];
        reader.read_exact(&mut standard_fields)?;

        // PE32 additionally has a BaseOfData field that PE32+ drops in favour of a wider
        // ImageBase.
        if !is_pe32_plus {
            let mut base_of_data = [0u8; 4];
            reader.read_exact(&mut base_of_data)?;
        }

        let natural_width = if is_pe32_plus { 8 } else { 4 };

        // ImageBase
        Self::skip(&mut reader, natural_width)?;

        // SectionAlignment, FileAlignment
        let mut alignment = [0u8; 8];
        reader.read_exact(&mut alignment)?;

        // MajorOSVersion..MinorSubsystemVersion (4 u16 pairs) + Win32VersionValue + SizeOfImage
        // + SizeOfHeaders + CheckSum
        let mut version_fields = [0u8; 2 * 4 + 4 + 4 + 4 + 4];
        reader.read_exact(&mut version_fields)?;

        let _subsystem = reader.read_u16::<LE>()?;
        let _dll_characteristics = reader.read_u16::<LE>()?;

        // SizeOfStackReserve, SizeOfStackCommit, SizeOfHeapReserve, SizeOfHeapCommit
        for _ in 0..4 {
            Self::skip(&mut reader, natural_width)?;
        }

        let _loader_flags = reader.read_u32::<LE>()?;
        let number_of_rva_and_sizes = reader.read_u32::<LE>()?;

        let data_directories = (0..number_of_rva_and_sizes)
            .map(|_| DataDirectory::read_from(&mut reader))
            .collect::<io::Result<Vec<_>>>()?;

        Ok(Self {
            magic,
            data_directories: DataDirectories(data_directories),
        })
    }

    fn skip<R: Read>(mut reader: R, bytes: usize) -> io::Result<()> {
        let mut buf = [0u8; 8];
        reader.read_exact(&mut buf[..bytes])
    }
}
