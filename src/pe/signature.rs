use std::io;

use zerocopy::{FromBytes, Immutable, KnownLayout};

use crate::read::ReadBytesExt;

/// The `PE\0\0` signature separating the DOS stub from the COFF header.
#[derive(Clone, Copy, Debug, Eq, PartialEq, FromBytes, Immutable, KnownLayout)]
#[repr(C)]
pub struct Signature([u8; 4]);

impl Signature {
    const PE: [u8; 4] = *b"PE\0\0";

    pub fn try_read_from_io<R>(mut reader: R) -> io::Result<Self>
    where
        R: io::Read,
    {
        let signature = reader.read_t::<Self>()?;

        if signature.0 != Self::PE {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                "missing PE signature",
            ));
        }

        Ok(signature)
    }
}
