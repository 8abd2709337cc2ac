use std::io;

use zerocopy::{FromBytes, Immutable, KnownLayout, LittleEndian, U32};

use crate::read::ReadBytesExt;

/// The MS-DOS stub header every PE/COFF image begins with.
///
/// Only the magic number and the pointer to the PE header are used; the rest of the legacy
/// MZ header fields are preserved as padding so the struct lines up with the real 64-byte layout.
#[derive(Clone, Copy, Debug, Eq, PartialEq, FromBytes, Immutable, KnownLayout)]
#[repr(C)]
pub struct DosHeader {
    magic: [u8; 2],
    _reserved: [u8; 0x3a],
    pe_pointer: U32<LittleEndian>,
}

impl DosHeader {
    const MAGIC: [u8; 2] = *b"MZ";

    pub fn try_read_from_io<R>(mut reader: R) -> io::Result<Self>
    where
        R: io::Read,
    {
        let header = reader.read_t::<Self>()?;

        if header.magic != Self::MAGIC {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                "missing MZ signature",
            ));
        }

        Ok(header)
    }

    /// Returns the file offset of the PE signature.
    #[must_use]
    #[inline]
    pub const fn pe_pointer(self) -> u32 {
        self.pe_pointer.get()
    }
}
