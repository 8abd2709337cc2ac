mod data_entry;
mod directory;
mod directory_entry_data;
pub mod image;
mod section_reader;
mod r#type;

pub use data_entry::ImageResourceDataEntry;
pub use directory::ResourceDirectory;
pub use directory_entry_data::ResourceDirectoryEntryData;
pub use image::ImageResourceDirectoryEntry;
pub use r#type::ResourceType;
pub use section_reader::SectionReader;

use std::io::{self, Read};

use zerocopy::{FromBytes, Immutable, KnownLayout, LittleEndian, U16, U32};

use crate::read::ReadBytesExt;

/// An `IMAGE_RESOURCE_DIRECTORY`, the fixed-size header in front of a directory's entry array.
#[derive(Clone, Copy, Debug, FromBytes, Immutable, KnownLayout)]
#[repr(C)]
struct ResourceDirectoryHeader {
    characteristics: U32<LittleEndian>,
    time_date_stamp: U32<LittleEndian>,
    major_version: U16<LittleEndian>,
    minor_version: U16<LittleEndian>,
    number_of_name_entries: U16<LittleEndian>,
    number_of_id_entries: U16<LittleEndian>,
}

/// A resource directory table: a header plus its named and ID-keyed entries.
///
/// Inno Setup's offset table is always looked up by numeric ID, so named entries are skipped
/// rather than decoded.
#[derive(Clone, Debug)]
pub struct ResourceDirectoryTable {
    entries: Vec<ImageResourceDirectoryEntry>,
}

impl ResourceDirectoryTable {
    pub fn read_from<R>(mut reader: R) -> io::Result<Self>
    where
        R: Read,
    {
        let header = reader.read_t::<ResourceDirectoryHeader>()?;

        let entry_count = u32::from(header.number_of_name_entries.get())
            + u32::from(header.number_of_id_entries.get());

        let entries = (0..entry_count)
            .map(|_| reader.read_t::<ImageResourceDirectoryEntry>())
            .collect::<io::Result<Vec<_>>>()?;

        Ok(Self { entries })
    }

    #[must_use]
    pub fn find_id_entry(&self, id: u32) -> Option<&ImageResourceDirectoryEntry> {
        self.entries
            .iter()
            .find(|entry| !entry.is_named() && entry.name_or_id() == id)
    }

    pub fn entries(&self) -> impl Iterator<Item = &ImageResourceDirectoryEntry> {
        self.entries.iter()
    }
}
