use zerocopy::{FromBytes, Immutable, KnownLayout, LittleEndian, U16, U32};

/// The COFF file header, immediately following the PE signature.
#[derive(Clone, Copy, Debug, FromBytes, Immutable, KnownLayout)]
#[repr(C)]
pub struct CoffHeader {
    machine: U16<LittleEndian>,
    number_of_sections: U16<LittleEndian>,
    time_date_stamp: U32<LittleEndian>,
    pointer_to_symbol_table: U32<LittleEndian>,
    number_of_symbols: U32<LittleEndian>,
    size_of_optional_header: U16<LittleEndian>,
    characteristics: U16<LittleEndian>,
}

impl CoffHeader {
    #[must_use]
    #[inline]
    pub const fn machine(self) -> u16 {
        self.machine.get()
    }

    #[must_use]
    #[inline]
    pub const fn number_of_sections(self) -> u16 {
        self.number_of_sections.get()
    }

    #[must_use]
    #[inline]
    pub const fn size_of_optional_header(self) -> u16 {
        self.size_of_optional_header.get()
    }
}
