use std::io::{self, Read};

use liblzma::stream::{LzmaOptions, Stream};
use zerocopy::LE;

use crate::read::ReadBytesExt;

/// The 5-byte header Inno Setup writes in front of a raw LZMA1 stream.
///
/// This is the same layout as the classic `.lzma` ("lzma_alone") header, minus the trailing
/// 8-byte uncompressed size field, which Inno Setup omits since the size is already known from
/// the surrounding block.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct LzmaStreamHeader {
    literal_context_bits: u32,
    literal_position_bits: u32,
    position_bits: u32,
    dictionary_size: u32,
}

impl LzmaStreamHeader {
    pub fn read<R>(mut reader: R) -> io::Result<Stream>
    where
        R: Read,
    {
        let properties = reader.read_u8()?;
        let dictionary_size = reader.read_u32::<LE>()?;

        if properties >= 9 * 5 * 5 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("invalid LZMA1 properties byte: {properties}"),
            ));
        }

        let mut remainder = u32::from(properties);
        let literal_context_bits = remainder % 9;
        remainder /= 9;
        let literal_position_bits = remainder % 5;
        let position_bits = remainder / 5;

        let header = Self {
            literal_context_bits,
            literal_position_bits,
            position_bits,
            dictionary_size,
        };

        header.into_stream()
    }

    fn into_stream(self) -> io::Result<Stream> {
        let mut options = LzmaOptions::new_preset(9)
            .map_err(|err| io::Error::new(io::ErrorKind::InvalidData, err))?;

        options
            .literal_context_bits(self.literal_context_bits)
            .map_err(|err| io::Error::new(io::ErrorKind::InvalidData, err))?;
        options
            .literal_position_bits(self.literal_position_bits)
            .map_err(|err| io::Error::new(io::ErrorKind::InvalidData, err))?;
        options
            .position_bits(self.position_bits)
            .map_err(|err| io::Error::new(io::ErrorKind::InvalidData, err))?;
        options.dict_size(self.dictionary_size);

        Stream::new_lzma_decoder(&options)
            .map_err(|err| io::Error::new(io::ErrorKind::InvalidData, err))
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::LzmaStreamHeader;

    #[test]
    fn rejects_invalid_properties_byte() {
        let buf = [225u8, 0, 0, 0, 0]; // 225 = 9 * 5 * 5, one past the valid range
        let err = LzmaStreamHeader::read(Cursor::new(buf)).unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::InvalidData);
    }

    #[test]
    fn accepts_default_lzma_sdk_properties() {
        // lc=3, lp=0, pb=2 is the default used by the LZMA SDK, encoded as (pb * 5 + lp) * 9 + lc
        let properties = (2 * 5 + 0) * 9 + 3;
        let buf = [properties, 0x00, 0x00, 0x10, 0x00]; // 1 MiB dictionary
        assert!(LzmaStreamHeader::read(Cursor::new(buf)).is_ok());
    }
}
