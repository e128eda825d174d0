use log::debug;

use crate::{
    crypto::{CbcDecrypter, IntegrityHash, PrivateKey, HASH_SIZE, IV_SIZE},
    demux::{Frame, FrameDemuxer, Phase},
    prefix::{Envelope, PrefixAccumulator},
    DecodeError, EnvelopeError,
};

/// Outcome of a session whose trailer checked out.
#[derive(Debug, Clone)]
pub struct Verified {
    pub digest: [u8; HASH_SIZE],
}

impl Verified {
    pub fn digest_hex(&self) -> String {
        hex::encode(&self.digest[..])
    }
}

struct Streaming {
    iv: [u8; IV_SIZE],
    decrypter: CbcDecrypter,
    demuxer: FrameDemuxer,
    scratch: Vec<u8>,
}

impl Streaming {
    fn open(key: &PrivateKey, envelope: Envelope) -> Result<Streaming, DecodeError> {
        let symmetric = key
            .unwrap_key(&envelope.wrapped_key)
            .map_err(EnvelopeError::KeyRecovery)?;

        let mut hash = IntegrityHash::new()?;
        hash.update(&envelope.iv)?;
        hash.update(symmetric.as_bytes())?;

        let decrypter = CbcDecrypter::new(&symmetric, &envelope.iv)?;
        // scrubs the key bytes
        drop(symmetric);

        Ok(Streaming {
            iv: envelope.iv,
            decrypter,
            demuxer: FrameDemuxer::new(hash),
            scratch: Vec::new(),
        })
    }

    fn update(&mut self, ciphertext: &[u8], out: &mut Vec<Frame>) -> Result<(), DecodeError> {
        self.scratch.clear();
        self.decrypter.update(ciphertext, &mut self.scratch)?;
        self.demuxer.push(&self.scratch, out)
    }

    fn finish(mut self, out: &mut Vec<Frame>) -> Result<Verified, DecodeError> {
        self.scratch.clear();
        self.decrypter.finalize(&mut self.scratch)?;
        self.demuxer.push(&self.scratch, out)?;

        let (trailer, hash) = self.demuxer.finish()?;
        let digest = hash.finish()?;
        trailer.check(&digest, &self.iv)?;

        Ok(Verified { digest })
    }
}

enum Stage {
    Envelope(PrefixAccumulator),
    Streaming(Box<Streaming>),
}

/// The complete decode state for one input: raw bytes in, classified
/// frames out, and a verdict at the end. A session borrows the private key
/// but owns everything else, so sessions never share mutable state.
pub struct DecodeSession<'k> {
    key: &'k PrivateKey,
    stage: Stage,
    consumed: u64,
}

impl<'k> DecodeSession<'k> {
    pub fn new(key: &'k PrivateKey) -> Self {
        DecodeSession {
            key,
            stage: Stage::Envelope(PrefixAccumulator::new(key.wrapped_key_size())),
            consumed: 0,
        }
    }

    /// None while still collecting the envelope.
    pub fn phase(&self) -> Option<Phase> {
        match &self.stage {
            Stage::Envelope(_) => None,
            Stage::Streaming(s) => Some(s.demuxer.phase()),
        }
    }

    pub fn consumed(&self) -> u64 {
        self.consumed
    }

    /// Feeds the next chunk of the wire stream. Any frames that become
    /// available are appended to `out`. After an error the session must be
    /// abandoned.
    pub fn update(&mut self, mut chunk: &[u8], out: &mut Vec<Frame>) -> Result<(), DecodeError> {
        self.consumed += chunk.len() as u64;

        if let Stage::Envelope(acc) = &mut self.stage {
            chunk = match acc.feed(chunk) {
                None => return Ok(()),
                Some(rest) => rest,
            };

            debug!("Envelope complete after {} bytes", acc.required());
            let envelope = acc.take_envelope();
            self.stage = Stage::Streaming(Box::new(Streaming::open(self.key, envelope)?));
        }

        match &mut self.stage {
            Stage::Streaming(s) => s.update(chunk, out),
            Stage::Envelope(_) => Ok(()),
        }
    }

    /// Signals end of stream, flushing the last frames into `out` and
    /// checking the trailer.
    pub fn finish(self, out: &mut Vec<Frame>) -> Result<Verified, DecodeError> {
        match self.stage {
            Stage::Envelope(acc) => {
                Err(EnvelopeError::Truncated(acc.collected(), acc.required()).into())
            }
            Stage::Streaming(s) => s.finish(out),
        }
    }
}
