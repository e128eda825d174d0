// primitives for unwrapping, decrypting and verifying sealed uploads

mod decrypter;
mod digest;
mod key;

pub use decrypter::CbcDecrypter;
pub use digest::{IntegrityError, IntegrityHash, Trailer};
pub use key::{KeyPadding, PrivateKey, SymmetricKey};

use openssl::error::ErrorStack;
use thiserror::Error;

pub const IV_SIZE: usize = 128 / 8;
pub const KEY_SIZE: usize = 256 / 8;
pub const HASH_SIZE: usize = 512 / 8;
pub const TRAILER_SIZE: usize = HASH_SIZE + IV_SIZE;

#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("malformed private key: {0}")]
    BadPrivateKey(ErrorStack),

    #[error("private key components are inconsistent")]
    InconsistentPrivateKey,

    #[error("wrapped key is {0} bytes, expected {1}")]
    WrappedKeySize(usize, usize),

    #[error("failed to unwrap symmetric key")]
    BadKey,

    #[error("invalid key size {0}")]
    KeySize(usize),

    #[error("cipher failure: {0}")]
    Cipher(ErrorStack),

    #[error("crypto library error: {0}")]
    LibraryError(ErrorStack),
}
