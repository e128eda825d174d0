use std::convert::TryFrom;

use openssl::{
    hash::{Hasher, MessageDigest},
    memcmp,
};
use thiserror::Error;

use crate::{CryptoError, HASH_SIZE, IV_SIZE, TRAILER_SIZE};

/// Running SHA-512 over everything in a sealed stream except its trailer.
pub struct IntegrityHash {
    hasher: Hasher,
}

impl IntegrityHash {
    pub fn new() -> Result<Self, CryptoError> {
        Hasher::new(MessageDigest::sha512())
            .map(|hasher| IntegrityHash { hasher })
            .map_err(CryptoError::LibraryError)
    }

    pub fn update(&mut self, data: &[u8]) -> Result<(), CryptoError> {
        self.hasher.update(data).map_err(CryptoError::LibraryError)
    }

    pub fn finish(mut self) -> Result<[u8; HASH_SIZE], CryptoError> {
        let d = self.hasher.finish().map_err(CryptoError::LibraryError)?;
        let mut digest = [0; HASH_SIZE];
        digest.copy_from_slice(&d);
        Ok(digest)
    }
}

#[derive(Debug, Error, Eq, PartialEq)]
pub enum IntegrityError {
    #[error("hash mismatch (calculated {}, expected {})", hex::encode(.computed), hex::encode(.expected))]
    DigestMismatch { computed: Vec<u8>, expected: Vec<u8> },

    #[error("iv mismatch (found {}, expected {})", hex::encode(.used), hex::encode(.embedded))]
    IvMismatch { used: Vec<u8>, embedded: Vec<u8> },
}

/// The fixed-size block at the end of every plaintext stream: a digest of
/// the preceding content followed by a copy of the IV.
#[derive(Clone)]
pub struct Trailer {
    digest: [u8; HASH_SIZE],
    iv: [u8; IV_SIZE],
}

impl Trailer {
    pub fn digest(&self) -> &[u8] {
        &self.digest[..]
    }

    pub fn iv(&self) -> &[u8] {
        &self.iv[..]
    }

    /// Checks the digest first, then the IV copy. Either mismatch is fatal.
    pub fn check(&self, computed: &[u8; HASH_SIZE], used_iv: &[u8; IV_SIZE]) -> Result<(), IntegrityError> {
        if !memcmp::eq(&computed[..], &self.digest[..]) {
            return Err(IntegrityError::DigestMismatch {
                computed: computed.to_vec(),
                expected: self.digest.to_vec(),
            });
        }

        if !memcmp::eq(&used_iv[..], &self.iv[..]) {
            return Err(IntegrityError::IvMismatch {
                used: used_iv.to_vec(),
                embedded: self.iv.to_vec(),
            });
        }

        Ok(())
    }
}

impl<'a> TryFrom<&'a [u8]> for Trailer {
    type Error = usize;

    /// Fails with the actual length when `b` is not exactly a trailer.
    fn try_from(b: &'a [u8]) -> Result<Trailer, usize> {
        if b.len() != TRAILER_SIZE {
            return Err(b.len());
        }
        let mut digest = [0; HASH_SIZE];
        let mut iv = [0; IV_SIZE];
        digest.copy_from_slice(&b[..HASH_SIZE]);
        iv.copy_from_slice(&b[HASH_SIZE..]);
        Ok(Trailer { digest, iv })
    }
}
