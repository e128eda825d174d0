use std::convert::TryFrom;
use std::fmt;

use log::debug;
use openssl::{
    pkey::Private,
    rsa::{Padding, Rsa},
};
use zeroize::{Zeroize, Zeroizing};

use crate::{CryptoError, KEY_SIZE};

/// Padding scheme the symmetric key was wrapped with.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum KeyPadding {
    Oaep,
    Pkcs1,
}

impl Default for KeyPadding {
    fn default() -> Self {
        KeyPadding::Oaep
    }
}

impl From<KeyPadding> for Padding {
    fn from(p: KeyPadding) -> Padding {
        match p {
            KeyPadding::Oaep => Padding::PKCS1_OAEP,
            KeyPadding::Pkcs1 => Padding::PKCS1,
        }
    }
}

/// A 256-bit AES key recovered from an envelope. The bytes are scrubbed
/// when the value is dropped.
pub struct SymmetricKey([u8; KEY_SIZE]);

impl SymmetricKey {
    pub fn as_bytes(&self) -> &[u8] {
        &self.0[..]
    }
}

impl<'a> TryFrom<&'a [u8]> for SymmetricKey {
    type Error = CryptoError;

    fn try_from(b: &'a [u8]) -> Result<SymmetricKey, CryptoError> {
        if b.len() != KEY_SIZE {
            return Err(CryptoError::KeySize(b.len()));
        }
        let mut key = [0; KEY_SIZE];
        key.copy_from_slice(b);
        Ok(SymmetricKey(key))
    }
}

impl Drop for SymmetricKey {
    fn drop(&mut self) {
        self.0.zeroize();
    }
}

impl fmt::Debug for SymmetricKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SymmetricKey(..)")
    }
}

/// The RSA key that unwraps per-upload symmetric keys. Loaded once and
/// shared read-only between sessions.
pub struct PrivateKey {
    rsa: Rsa<Private>,
    padding: KeyPadding,
}

impl PrivateKey {
    pub fn from_pem(pem: &[u8], padding: KeyPadding) -> Result<PrivateKey, CryptoError> {
        let rsa = Rsa::private_key_from_pem(pem).map_err(CryptoError::BadPrivateKey)?;
        if !rsa.check_key().map_err(CryptoError::BadPrivateKey)? {
            return Err(CryptoError::InconsistentPrivateKey);
        }
        Ok(PrivateKey { rsa, padding })
    }

    /// Size in bytes of a wrapped key, i.e. the modulus size.
    pub fn wrapped_key_size(&self) -> usize {
        self.rsa.size() as usize
    }

    pub fn bits(&self) -> usize {
        self.wrapped_key_size() * 8
    }

    pub fn unwrap_key(&self, wrapped: &[u8]) -> Result<SymmetricKey, CryptoError> {
        let expected = self.wrapped_key_size();
        if wrapped.len() != expected {
            return Err(CryptoError::WrappedKeySize(wrapped.len(), expected));
        }

        let mut buf = Zeroizing::new(vec![0; expected]);
        let n = self
            .rsa
            .private_decrypt(wrapped, &mut buf[..], self.padding.into())
            .map_err(|e| {
                debug!("Private key decrypt failed: {}", e);
                CryptoError::BadKey
            })?;

        SymmetricKey::try_from(&buf[..n])
    }
}

impl fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PrivateKey")
            .field("bits", &self.bits())
            .field("padding", &self.padding)
            .finish()
    }
}
