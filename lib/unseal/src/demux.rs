use std::{cmp::min, mem};

use log::debug;

use crate::{
    crypto::{IntegrityHash, Trailer, TRAILER_SIZE},
    DecodeError, FramingError,
};

/// The only plaintext layout currently produced: JSON header map followed
/// by a multipart body.
pub const FORMAT_MULTIPART: u8 = 0x01;

/// Space reserved up front for the header block. Longer headers grow the
/// buffer as their bytes arrive, so a bad length field costs nothing until
/// the bytes actually show up.
const HEADER_RESERVE: usize = 64 * 1024;

const HEADER_LENGTH_SIZE: usize = 4;

/// A piece of the plaintext stream, classified.
#[derive(Debug, Eq, PartialEq)]
pub enum Frame {
    /// The complete header block. Emitted exactly once.
    Header(Vec<u8>),

    /// Body bytes that are known not to belong to the trailer.
    Body(Vec<u8>),
}

/// Where the demuxer is in the stream.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum Phase {
    ReadingFormat,
    ReadingHeaderLength,
    ReadingHeader,
    ReadingBody,
}

enum State {
    ReadingFormat,
    ReadingHeaderLength {
        raw: [u8; HEADER_LENGTH_SIZE],
        have: usize,
    },
    ReadingHeader {
        len: usize,
        buf: Vec<u8>,
    },
    ReadingBody {
        tail: Vec<u8>,
    },
}

/// Splits the plaintext into format tag, header length, header and body,
/// feeding the integrity hash as it goes.
///
/// States only ever move forward. Once in the body, the last
/// `TRAILER_SIZE` bytes seen are always held back, since until the stream
/// ends there is no telling whether they are body or trailer.
pub struct FrameDemuxer {
    state: State,
    hash: IntegrityHash,
}

fn body_state() -> State {
    State::ReadingBody {
        tail: Vec::with_capacity(2 * TRAILER_SIZE),
    }
}

impl FrameDemuxer {
    /// `hash` must already hold the envelope contribution (IV and key).
    pub fn new(hash: IntegrityHash) -> Self {
        FrameDemuxer {
            state: State::ReadingFormat,
            hash,
        }
    }

    pub fn phase(&self) -> Phase {
        match self.state {
            State::ReadingFormat => Phase::ReadingFormat,
            State::ReadingHeaderLength { .. } => Phase::ReadingHeaderLength,
            State::ReadingHeader { .. } => Phase::ReadingHeader,
            State::ReadingBody { .. } => Phase::ReadingBody,
        }
    }

    /// Classifies `input`, appending any completed frames to `out`.
    pub fn push(&mut self, mut input: &[u8], out: &mut Vec<Frame>) -> Result<(), DecodeError> {
        while !input.is_empty() {
            input = self.step(input, out)?;
        }
        Ok(())
    }

    fn step<'a>(&mut self, input: &'a [u8], out: &mut Vec<Frame>) -> Result<&'a [u8], DecodeError> {
        let hash = &mut self.hash;

        let (rest, next) = match &mut self.state {
            State::ReadingFormat => {
                let tag = input[0];
                if tag != FORMAT_MULTIPART {
                    return Err(FramingError::UnknownFormat(tag).into());
                }
                hash.update(&input[..1])?;
                let next = State::ReadingHeaderLength {
                    raw: [0; HEADER_LENGTH_SIZE],
                    have: 0,
                };
                (&input[1..], Some(next))
            }

            State::ReadingHeaderLength { raw, have } => {
                let n = min(HEADER_LENGTH_SIZE - *have, input.len());
                raw[*have..*have + n].copy_from_slice(&input[..n]);
                *have += n;

                let next = if *have == HEADER_LENGTH_SIZE {
                    hash.update(&raw[..])?;
                    let len = u32::from_le_bytes(*raw) as usize;
                    debug!("Header is {} bytes", len);
                    if len == 0 {
                        out.push(Frame::Header(Vec::new()));
                        Some(body_state())
                    } else {
                        Some(State::ReadingHeader {
                            len,
                            buf: Vec::with_capacity(min(len, HEADER_RESERVE)),
                        })
                    }
                } else {
                    None
                };
                (&input[n..], next)
            }

            State::ReadingHeader { len, buf } => {
                let n = min(*len - buf.len(), input.len());
                hash.update(&input[..n])?;
                buf.extend_from_slice(&input[..n]);

                let next = if buf.len() == *len {
                    out.push(Frame::Header(mem::take(buf)));
                    Some(body_state())
                } else {
                    None
                };
                (&input[n..], next)
            }

            State::ReadingBody { tail } => {
                let total = tail.len() + input.len();
                if total > TRAILER_SIZE {
                    let release = total - TRAILER_SIZE;
                    let from_tail = min(release, tail.len());
                    let from_input = release - from_tail;

                    let mut body = Vec::with_capacity(release);
                    body.extend(tail.drain(..from_tail));
                    body.extend_from_slice(&input[..from_input]);
                    tail.extend_from_slice(&input[from_input..]);

                    hash.update(&body)?;
                    out.push(Frame::Body(body));
                } else {
                    tail.extend_from_slice(input);
                }
                (&input[input.len()..], None)
            }
        };

        if let Some(s) = next {
            self.state = s;
        }
        Ok(rest)
    }

    /// Called at end of stream. Hands back the trailer held in the window
    /// together with the hash, which by now covers everything but the
    /// trailer.
    pub fn finish(self) -> Result<(Trailer, IntegrityHash), DecodeError> {
        match self.state {
            State::ReadingBody { tail } => {
                use std::convert::TryFrom;
                let trailer = Trailer::try_from(&tail[..]).map_err(FramingError::TrailerSize)?;
                Ok((trailer, self.hash))
            }
            _ => Err(FramingError::Truncated.into()),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::crypto::{HASH_SIZE, IV_SIZE};

    fn plaintext(header: &[u8], body: &[u8], trailer: &[u8]) -> Vec<u8> {
        let mut v = vec![FORMAT_MULTIPART];
        v.extend_from_slice(&(header.len() as u32).to_le_bytes());
        v.extend_from_slice(header);
        v.extend_from_slice(body);
        v.extend_from_slice(trailer);
        v
    }

    fn fake_trailer() -> Vec<u8> {
        (0..TRAILER_SIZE).map(|x| 200u8.wrapping_add(x as u8)).collect()
    }

    struct Split {
        header: Vec<u8>,
        body: Vec<u8>,
        headers_seen: usize,
        trailer: Trailer,
    }

    fn demux(data: &[u8], chunk: usize) -> Result<Split, DecodeError> {
        let mut d = FrameDemuxer::new(IntegrityHash::new().unwrap());
        let mut frames = Vec::new();
        for c in data.chunks(chunk) {
            d.push(c, &mut frames)?;
        }
        let (trailer, _) = d.finish()?;

        let mut split = Split {
            header: Vec::new(),
            body: Vec::new(),
            headers_seen: 0,
            trailer,
        };
        for f in frames {
            match f {
                Frame::Header(h) => {
                    assert!(split.body.is_empty(), "header after body");
                    split.header = h;
                    split.headers_seen += 1;
                }
                Frame::Body(b) => {
                    assert!(!b.is_empty());
                    split.body.extend(b);
                }
            }
        }
        Ok(split)
    }

    #[test]
    fn body_sizes_around_the_trailer_window() {
        let trailer = fake_trailer();
        for size in &[0, 1, TRAILER_SIZE - 1, TRAILER_SIZE, TRAILER_SIZE + 1000] {
            let body: Vec<u8> = (0..*size).map(|x| (x % 251) as u8).collect();
            let data = plaintext(b"{\"a\":\"b\"}", &body, &trailer);

            for chunk in &[1, 7, 4096, data.len()] {
                let s = demux(&data, *chunk).unwrap();
                assert_eq!(s.body, body, "body size {} chunk {}", size, chunk);
                assert_eq!(s.header, b"{\"a\":\"b\"}".to_vec());
                assert_eq!(s.headers_seen, 1);
                assert_eq!(s.trailer.digest(), &trailer[..HASH_SIZE]);
                assert_eq!(s.trailer.iv(), &trailer[HASH_SIZE..]);
            }
        }
    }

    #[test]
    fn empty_header_moves_straight_to_body() {
        let data = plaintext(b"", b"xyz", &fake_trailer());
        let s = demux(&data, 3).unwrap();
        assert_eq!(s.headers_seen, 1);
        assert!(s.header.is_empty());
        assert_eq!(s.body, b"xyz".to_vec());
    }

    #[test]
    fn header_completion_mid_delivery_continues_into_body() {
        let data = plaintext(b"hh", b"body", &fake_trailer());
        let mut d = FrameDemuxer::new(IntegrityHash::new().unwrap());
        let mut frames = Vec::new();
        d.push(&data, &mut frames).unwrap();

        assert_eq!(d.phase(), Phase::ReadingBody);
        assert_eq!(
            frames,
            vec![Frame::Header(b"hh".to_vec()), Frame::Body(b"body".to_vec())]
        );
    }

    #[test]
    fn phases_advance_in_order() {
        let data = plaintext(b"hdr", b"", &fake_trailer());
        let mut d = FrameDemuxer::new(IntegrityHash::new().unwrap());
        let mut frames = Vec::new();

        assert_eq!(d.phase(), Phase::ReadingFormat);
        d.push(&data[..1], &mut frames).unwrap();
        assert_eq!(d.phase(), Phase::ReadingHeaderLength);
        d.push(&data[1..4], &mut frames).unwrap();
        assert_eq!(d.phase(), Phase::ReadingHeaderLength);
        d.push(&data[4..6], &mut frames).unwrap();
        assert_eq!(d.phase(), Phase::ReadingHeader);
        d.push(&data[6..8], &mut frames).unwrap();
        assert_eq!(d.phase(), Phase::ReadingBody);
        assert!(frames.len() == 1);
    }

    #[test]
    fn short_trailer_is_a_framing_error() {
        let data = plaintext(b"h", b"", &fake_trailer()[..TRAILER_SIZE - 1]);
        match demux(&data, 5) {
            Err(DecodeError::Framing(FramingError::TrailerSize(n))) => assert_eq!(n, TRAILER_SIZE - 1),
            Err(e) => panic!("Expected trailer size error, got {:?}", e),
            Ok(_) => panic!("Expected trailer size error"),
        }
    }

    #[test]
    fn stream_ending_inside_header_is_truncated() {
        let data = plaintext(b"a long header", b"", b"");
        match demux(&data[..8], 1) {
            Err(DecodeError::Framing(FramingError::Truncated)) => {}
            Err(e) => panic!("Expected truncation, got {:?}", e),
            Ok(_) => panic!("Expected truncation"),
        }
    }

    #[test]
    fn unknown_format_is_rejected() {
        let mut data = plaintext(b"h", b"", &fake_trailer());
        data[0] = 0x7f;
        match demux(&data, 4096) {
            Err(DecodeError::Framing(FramingError::UnknownFormat(0x7f))) => {}
            Err(e) => panic!("Expected unknown format, got {:?}", e),
            Ok(_) => panic!("Expected unknown format"),
        }
    }

    #[test]
    fn any_u32_header_length_is_accepted() {
        let mut data = vec![FORMAT_MULTIPART];
        data.extend_from_slice(&u32::MAX.to_le_bytes());
        data.extend_from_slice(b"{\"a\":1}");
        let mut d = FrameDemuxer::new(IntegrityHash::new().unwrap());

        d.push(&data, &mut Vec::new()).unwrap();
        assert_eq!(d.phase(), Phase::ReadingHeader);
        assert!(matches!(d.finish(), Err(DecodeError::Framing(FramingError::Truncated))));
    }

    #[test]
    fn hash_excludes_the_trailer() {
        use openssl::sha::sha512;

        let header = b"{}";
        let body = vec![42u8; 300];
        let data = plaintext(header, &body, &fake_trailer());

        let mut d = FrameDemuxer::new(IntegrityHash::new().unwrap());
        for c in data.chunks(13) {
            d.push(c, &mut Vec::new()).unwrap();
        }
        let (_, hash) = d.finish().unwrap();

        let covered = &data[..data.len() - TRAILER_SIZE];
        assert_eq!(&hash.finish().unwrap()[..], &sha512(covered)[..]);
        assert_eq!(IV_SIZE + HASH_SIZE, TRAILER_SIZE);
    }
}
