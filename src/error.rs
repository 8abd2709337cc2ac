use std::{fmt, io};

use camino::Utf8PathBuf;
use thiserror::Error;

use crate::{Inno, extract::slice::SliceError, version::InnoVersion};

#[derive(Error, Debug)]
pub enum InnoError {
    #[error("File is not an Inno installer")]
    NotInnoFile,
    #[error("Unexpected data at end of {0} Inno header stream")]
    UnexpectedExtraData(HeaderStream),
    #[error(
        "Inno Setup version {0} is newer than the maximum supported version {}",
        Inno::MAX_SUPPORTED_VERSION
    )]
    UnsupportedVersion(InnoVersion),
    #[error("Unknown Inno setup version: {0}")]
    UnknownVersion(String),
    #[error("Unknown Inno Setup loader signature: {0:?}")]
    UnknownLoaderSignature([u8; 12]),
    #[error(
        "Inno CRC32 checksum mismatch reading {location}. Expected {expected} but calculated {actual}"
    )]
    CrcChecksumMismatch {
        location: &'static str,
        actual: u32,
        expected: u32,
    },
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Errors raised while streaming the payload of an already-parsed installer.
#[derive(Error, Debug)]
pub enum ExtractError {
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error("Checksum mismatch extracting {location}")]
    ChecksumMismatch { location: String },
    #[error("This installer is password-protected; a password is required")]
    PasswordRequired,
    #[error("The provided password is incorrect")]
    WrongPassword,
    #[error("No decoder is available for compression method {0}")]
    UnsupportedCompression(String),
    #[error(
        "XChaCha20 chunk encryption is not supported: its key derivation and nonce construction \
         have no attested reference and decrypting with a guessed scheme would silently corrupt \
         output"
    )]
    UnsupportedEncryption,
    #[error(transparent)]
    Slice(#[from] SliceError),
    #[error("destination {0} already exists and the collision policy is set to error")]
    DestinationCollision(Utf8PathBuf),
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum HeaderStream {
    Primary,
    Secondary,
}

impl fmt::Display for HeaderStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Primary => f.write_str("Primary"),
            Self::Secondary => f.write_str("Secondary"),
        }
    }
}
