//! Decodes a single chunk: a CRC32-framed, optionally encrypted, compressed byte range within
//! one or more slices, containing one or more files back to back.
//!
//! Grounded in `stream::chunk`/`chunk_reader` (`original_source/src/stream/chunk.hpp`) for the
//! overall shape, and in `ChunkFilter.cpp`/`.hpp` for the CRC32 sub-block framing, which is
//! identical to the header stream's framing ([`InnoBlockReader`]) and is reused here as-is.

use std::io::{self, Read};

use bzip2::read::BzDecoder;
use flate2::read::ZlibDecoder;
use liblzma::{
    read::XzDecoder,
    stream::{Filters, LzmaOptions, Stream},
};

use crate::{
    error::ExtractError,
    extract::{crypto::ChunkDecryptor, slice::SliceReader},
    lzma_stream_header::LzmaStreamHeader,
    read::{InnoBlockReader, chunk::Chunk, chunk::Compression},
};

/// Reads raw bytes for a chunk out of a [`SliceReader`], restricted to `[offset, offset + size)`
/// within `first_slice` and transparently continuing across slices as `SliceReader::read` does.
struct ChunkSliceSource<'a> {
    slice: &'a mut SliceReader,
    remaining: u64,
}

impl Read for ChunkSliceSource<'_> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.remaining == 0 {
            return Ok(0);
        }
        let max = usize::try_from(self.remaining).unwrap_or(usize::MAX).min(buf.len());
        let read = self
            .slice
            .read(&mut buf[..max])
            .map_err(|error| io::Error::new(io::ErrorKind::Other, error))?;
        self.remaining -= read as u64;
        Ok(read)
    }
}

/// Reverses the encryption layer over a byte stream, decrypting each block as it is read.
struct DecryptingReader<R> {
    inner: R,
    decryptor: ChunkDecryptor,
}

impl<R: Read> Read for DecryptingReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let read = self.inner.read(buf)?;
        self.decryptor.decrypt(&mut buf[..read]);
        Ok(read)
    }
}

type Framed<'a> = InnoBlockReader<ChunkSliceSource<'a>>;
type Decrypted<'a> = DecryptingReader<Framed<'a>>;

fn lzma2_decoder_stream() -> io::Result<Stream> {
    let options = LzmaOptions::new_preset(9).map_err(|err| io::Error::new(io::ErrorKind::InvalidData, err))?;
    let mut filters = Filters::new();
    filters.lzma2(&options);
    Stream::new_raw_decoder(&filters).map_err(|err| io::Error::new(io::ErrorKind::InvalidData, err))
}

/// Decompressed, decrypted byte stream for a single chunk, ready to be cut into files.
pub enum ChunkReader<'a> {
    Stored(Decrypted<'a>),
    Zlib(ZlibDecoder<Decrypted<'a>>),
    BZip2(BzDecoder<Decrypted<'a>>),
    LZMA1(XzDecoder<Decrypted<'a>>),
    LZMA2(XzDecoder<Decrypted<'a>>),
}

impl<'a> ChunkReader<'a> {
    /// Positions `slice` at the start of `chunk` and builds a decoder for its compression method.
    ///
    /// # Errors
    ///
    /// Returns [`ExtractError::PasswordRequired`]/[`ExtractError::WrongPassword`] for an
    /// encrypted chunk with no or an incorrect password,
    /// [`ExtractError::UnsupportedEncryption`] for a chunk encrypted with the unimplemented
    /// XChaCha20 scheme, and [`ExtractError::UnsupportedCompression`] if `chunk.compression` is
    /// [`Compression::Unknown`].
    pub fn new(
        slice: &'a mut SliceReader,
        chunk: &Chunk,
        password_salt: Option<&[u8; 8]>,
        password: Option<&str>,
    ) -> Result<Self, ExtractError> {
        if !slice.seek(chunk.first_slice as usize, chunk.offset)? {
            return Err(ExtractError::Io(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "chunk offset is past the end of its first slice",
            )));
        }

        let decryptor = ChunkDecryptor::new(chunk.encryption, password_salt, password)?;

        let source = ChunkSliceSource {
            slice,
            remaining: chunk.size,
        };
        let framed = InnoBlockReader::new(source);
        let mut decrypted = DecryptingReader {
            inner: framed,
            decryptor,
        };

        Ok(match chunk.compression {
            Compression::Stored => Self::Stored(decrypted),
            Compression::Zlib => Self::Zlib(ZlibDecoder::new(decrypted)),
            Compression::BZip2 => Self::BZip2(BzDecoder::new(decrypted)),
            Compression::LZMA1 => {
                let stream = LzmaStreamHeader::read(&mut decrypted)?;
                Self::LZMA1(XzDecoder::new_stream(decrypted, stream))
            }
            Compression::LZMA2 => {
                let stream = lzma2_decoder_stream()?;
                Self::LZMA2(XzDecoder::new_stream(decrypted, stream))
            }
            Compression::Unknown => {
                return Err(ExtractError::UnsupportedCompression(
                    chunk.compression.to_string(),
                ));
            }
        })
    }
}

impl Read for ChunkReader<'_> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            Self::Stored(reader) => reader.read(buf),
            Self::Zlib(reader) => reader.read(buf),
            Self::BZip2(reader) => reader.read(buf),
            Self::LZMA1(reader) => reader.read(buf),
            Self::LZMA2(reader) => reader.read(buf),
        }
    }
}
