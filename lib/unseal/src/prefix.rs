use std::mem;

use crate::crypto::IV_SIZE;

/// The unencrypted prefix of a sealed stream.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Envelope {
    pub iv: [u8; IV_SIZE],
    pub wrapped_key: Vec<u8>,
}

/// Collects the IV and the wrapped key from input that may be split at any
/// byte, including across the boundary between the two fields.
#[derive(Debug)]
pub struct PrefixAccumulator {
    iv: Vec<u8>,
    wrapped_key: Vec<u8>,
    wrapped_key_size: usize,
}

fn take_into<'a>(field: &mut Vec<u8>, size: usize, chunk: &'a [u8]) -> &'a [u8] {
    let n = std::cmp::min(chunk.len(), size - field.len());
    field.extend_from_slice(&chunk[..n]);
    &chunk[n..]
}

impl PrefixAccumulator {
    pub fn new(wrapped_key_size: usize) -> Self {
        PrefixAccumulator {
            iv: Vec::with_capacity(IV_SIZE),
            wrapped_key: Vec::with_capacity(wrapped_key_size),
            wrapped_key_size,
        }
    }

    pub fn required(&self) -> usize {
        IV_SIZE + self.wrapped_key_size
    }

    pub fn collected(&self) -> usize {
        self.iv.len() + self.wrapped_key.len()
    }

    pub fn is_complete(&self) -> bool {
        self.collected() == self.required()
    }

    /// Consumes as much of `chunk` as the prefix still needs. Once both
    /// fields are full, returns the unconsumed tail of `chunk` (possibly
    /// empty), which belongs to the ciphertext.
    pub fn feed<'a>(&mut self, chunk: &'a [u8]) -> Option<&'a [u8]> {
        let rest = take_into(&mut self.iv, IV_SIZE, chunk);
        let rest = take_into(&mut self.wrapped_key, self.wrapped_key_size, rest);

        if self.is_complete() {
            Some(rest)
        } else {
            None
        }
    }

    /// Hands over the collected fields. Only meaningful once complete.
    pub fn take_envelope(&mut self) -> Envelope {
        let mut iv = [0; IV_SIZE];
        iv.copy_from_slice(&self.iv);
        self.iv.clear();

        Envelope {
            iv,
            wrapped_key: mem::take(&mut self.wrapped_key),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn prefix(wrapped: usize) -> Vec<u8> {
        (0..IV_SIZE + wrapped).map(|x| x as u8).collect()
    }

    #[test]
    fn single_delivery_with_trailing_ciphertext() {
        let mut data = prefix(32);
        data.extend_from_slice(b"cipher");
        let mut acc = PrefixAccumulator::new(32);

        assert_eq!(acc.feed(&data), Some(&b"cipher"[..]));
        let env = acc.take_envelope();
        assert_eq!(&env.iv[..], &data[..IV_SIZE]);
        assert_eq!(env.wrapped_key, data[IV_SIZE..IV_SIZE + 32].to_vec());
    }

    #[test]
    fn byte_at_a_time() {
        let data = prefix(256);
        let mut acc = PrefixAccumulator::new(256);

        let (last, head) = data.split_last().unwrap();
        for b in head {
            assert_eq!(acc.feed(std::slice::from_ref(b)), None);
        }
        assert_eq!(acc.collected(), data.len() - 1);
        assert_eq!(acc.feed(std::slice::from_ref(last)), Some(&[][..]));

        let env = acc.take_envelope();
        assert_eq!(env.wrapped_key.len(), 256);
        assert_eq!(env.wrapped_key[255], data[data.len() - 1]);
    }

    #[test]
    fn chunk_straddles_iv_and_key() {
        let data = prefix(64);
        let mut acc = PrefixAccumulator::new(64);

        assert_eq!(acc.feed(&data[..10]), None);
        assert_eq!(acc.feed(&data[10..40]), None);
        assert_eq!(acc.feed(&data[40..]), Some(&[][..]));

        let env = acc.take_envelope();
        assert_eq!(&env.iv[..], &data[..IV_SIZE]);
        assert_eq!(env.wrapped_key, data[IV_SIZE..].to_vec());
    }

    #[test]
    fn empty_chunks_are_harmless() {
        let mut acc = PrefixAccumulator::new(8);
        assert_eq!(acc.feed(&[]), None);
        assert_eq!(acc.required(), IV_SIZE + 8);
        assert!(!acc.is_complete());
    }
}
