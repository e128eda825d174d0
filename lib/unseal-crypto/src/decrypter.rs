use openssl::symm::{Cipher, Crypter, Mode};

use crate::{CryptoError, SymmetricKey, IV_SIZE};

/// Streaming AES-256-CBC decryptor. Ciphertext goes in as arbitrarily
/// sized chunks; plaintext comes out whenever whole blocks are available,
/// with the final (padded) block held back until `finalize`.
pub struct CbcDecrypter {
    crypter: Crypter,
    block_size: usize,
}

impl CbcDecrypter {
    pub fn new(key: &SymmetricKey, iv: &[u8; IV_SIZE]) -> Result<Self, CryptoError> {
        let cipher = Cipher::aes_256_cbc();
        let crypter = Crypter::new(cipher, Mode::Decrypt, key.as_bytes(), Some(&iv[..]))
            .map_err(CryptoError::LibraryError)?;

        Ok(CbcDecrypter {
            crypter,
            block_size: cipher.block_size(),
        })
    }

    /// Decrypts `input`, appending whatever plaintext is ready to `out`.
    pub fn update(&mut self, input: &[u8], out: &mut Vec<u8>) -> Result<(), CryptoError> {
        let start = out.len();
        out.resize(start + input.len() + self.block_size, 0);
        let n = self
            .crypter
            .update(input, &mut out[start..])
            .map_err(CryptoError::Cipher)?;
        out.truncate(start + n);
        Ok(())
    }

    /// Flushes the last block and strips its padding.
    pub fn finalize(mut self, out: &mut Vec<u8>) -> Result<(), CryptoError> {
        let start = out.len();
        out.resize(start + self.block_size, 0);
        let n = self
            .crypter
            .finalize(&mut out[start..])
            .map_err(CryptoError::Cipher)?;
        out.truncate(start + n);
        Ok(())
    }
}
