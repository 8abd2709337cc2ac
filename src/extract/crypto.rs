//! Chunk decryption.
//!
//! Only the legacy ARC4 scheme (< 6.4) is implemented. Its key derivation is attested by
//! `setup/header.cpp`'s password-check hashing, which reuses the exact same
//! `"PasswordCheckHash" || salt || password` preimage for both the stored password checksum and
//! the chunk key. The modern XChaCha20 scheme (6.4+) has no surviving source anywhere in this
//! crate's reference material beyond the `encryption_method` enum naming in `stream/chunk.hpp`
//! and the on-disk `EncryptionHeader` layout — neither its key derivation nor its per-chunk nonce
//! construction is attested, so [`ChunkDecryptor::new`] refuses to guess at it and returns
//! [`ExtractError::UnsupportedEncryption`] instead.

use md5::{Digest, Md5};
use rc4::{
    Rc4,
    cipher::{KeyInit, StreamCipher, consts::U16},
};
use sha1::Sha1;

use crate::{entry::checksum::Checksum, error::ExtractError, read::chunk::Encryption};

/// Literal prefix Inno Setup prepends to the on-disk 8-byte password salt before using it as a
/// hash preimage, both for the legacy password-verification checksum and for ARC4 key
/// derivation. Confirmed in `setup/header.cpp`, where the salt is prefixed once, immediately
/// after being read, and never used in its raw form again.
const PASSWORD_CHECK_HASH_PREFIX: &[u8] = b"PasswordCheckHash";

/// Derives the 16-byte ARC4 key used for legacy (< 6.4) chunk encryption: the configured hash
/// run over `"PasswordCheckHash" || salt || password`, truncated to 16 bytes.
fn legacy_key(hash_sha1: bool, salt: &[u8; 8], password: &str) -> [u8; 16] {
    let mut key = [0u8; 16];
    if hash_sha1 {
        let mut hasher = Sha1::new();
        Digest::update(&mut hasher, PASSWORD_CHECK_HASH_PREFIX);
        Digest::update(&mut hasher, salt);
        Digest::update(&mut hasher, password.as_bytes());
        key.copy_from_slice(&Digest::finalize(hasher)[..16]);
    } else {
        let mut hasher = Md5::new();
        Digest::update(&mut hasher, PASSWORD_CHECK_HASH_PREFIX);
        Digest::update(&mut hasher, salt);
        Digest::update(&mut hasher, password.as_bytes());
        key.copy_from_slice(&Digest::finalize(hasher)[..16]);
    }
    key
}

/// Verifies a candidate password against the legacy (< 6.4) checksum stored in
/// `Header::password`, hashing `"PasswordCheckHash" || salt || password` with whichever
/// algorithm `expected` was recorded with.
#[must_use]
pub fn verify_legacy_password(expected: &Checksum, salt: &[u8; 8], password: &str) -> bool {
    match expected {
        Checksum::MD5(md5) => {
            let mut hasher = Md5::new();
            Digest::update(&mut hasher, PASSWORD_CHECK_HASH_PREFIX);
            Digest::update(&mut hasher, salt);
            Digest::update(&mut hasher, password.as_bytes());
            Digest::finalize(hasher).as_slice() == md5.inner().as_slice()
        }
        Checksum::Sha1(sha1) => {
            let mut hasher = Sha1::new();
            Digest::update(&mut hasher, PASSWORD_CHECK_HASH_PREFIX);
            Digest::update(&mut hasher, salt);
            Digest::update(&mut hasher, password.as_bytes());
            Digest::finalize(hasher).as_slice() == sha1.inner().as_slice()
        }
        // Only MD5 and SHA-1 password checksums are attested for the legacy scheme; any other
        // variant stored in `Header::password` cannot be a password check we know how to verify.
        _ => false,
    }
}

/// Wraps a chunk's raw (de-framed) byte stream with the decryption scheme its [`Encryption`]
/// variant calls for.
pub enum ChunkDecryptor {
    Plaintext,
    Arc4(Rc4<U16>),
}

impl ChunkDecryptor {
    pub fn new(
        encryption: Encryption,
        password_salt: Option<&[u8; 8]>,
        password: Option<&str>,
    ) -> Result<Self, ExtractError> {
        match encryption {
            Encryption::Plaintext => Ok(Self::Plaintext),
            Encryption::Arc4Md5 | Encryption::Arc4Sha1 => {
                let password = password.ok_or(ExtractError::PasswordRequired)?;
                let salt = password_salt.ok_or(ExtractError::PasswordRequired)?;
                // The legacy password check is performed once, at header-parse time, against
                // `Header::password`; by the time we get here the password is already known
                // good, so only the key needs deriving.
                let key = legacy_key(encryption == Encryption::Arc4Sha1, salt, password);
                Ok(Self::Arc4(Rc4::new(&key.into())))
            }
            Encryption::XChaCha20 => Err(ExtractError::UnsupportedEncryption),
        }
    }

    pub fn decrypt(&mut self, data: &mut [u8]) {
        match self {
            Self::Plaintext => {}
            Self::Arc4(cipher) => cipher.apply_keystream(data),
        }
    }
}
