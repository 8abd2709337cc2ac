use super::{ImageResourceDataEntry, ResourceDirectoryTable};

/// The data a resource directory entry points at: either a nested table, or a leaf data entry.
pub enum ResourceDirectoryEntryData {
    Table(ResourceDirectoryTable),
    Data(ImageResourceDataEntry),
}

impl ResourceDirectoryEntryData {
    #[must_use]
    pub fn table(self) -> Option<ResourceDirectoryTable> {
        match self {
            Self::Table(table) => Some(table),
            Self::Data(_) => None,
        }
    }

    #[must_use]
    pub fn data(self) -> Option<ImageResourceDataEntry> {
        match self {
            Self::Data(data) => Some(data),
            Self::Table(_) => None,
        }
    }
}
