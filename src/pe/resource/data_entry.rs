use zerocopy::{FromBytes, Immutable, KnownLayout, LittleEndian, U32};

/// An `IMAGE_RESOURCE_DATA_ENTRY`: the leaf of a resource directory tree, pointing at the
/// resource's raw bytes by RVA.
#[derive(Clone, Copy, Debug, FromBytes, Immutable, KnownLayout)]
#[repr(C)]
pub struct ImageResourceDataEntry {
    offset_to_data: U32<LittleEndian>,
    size: U32<LittleEndian>,
    code_page: U32<LittleEndian>,
    reserved: U32<LittleEndian>,
}

impl ImageResourceDataEntry {
    /// Returns the RVA of the resource's raw data.
    #[must_use]
    #[inline]
    pub const fn offset_to_data(self) -> u32 {
        self.offset_to_data.get()
    }

    /// Returns the size, in bytes, of the resource's raw data.
    #[must_use]
    #[inline]
    pub const fn size(self) -> u32 {
        self.size.get()
    }
}
