pub use unseal_crypto as crypto;
pub use unseal_storage as storage;

mod artifacts;
mod batch;
mod decode;
mod demux;
mod error;
mod extract;
pub mod names;
mod prefix;
mod session;
mod source;
mod split;

pub use artifacts::Artifacts;
pub use batch::{Batch, BatchOptions, BatchReport};
pub use decode::{decode_file, decode_raw, decode_to_dir, OutputOptions, Report};
pub use demux::{Frame, FrameDemuxer, Phase, FORMAT_MULTIPART};
pub use error::{DecodeError, EnvelopeError, FramingError, HeaderError};
pub use extract::{boundary_from_header, extract_parts, Extraction};
pub use prefix::{Envelope, PrefixAccumulator};
pub use session::{DecodeSession, Verified};
pub use source::{file_stream, READ_CHUNK_SIZE};
pub use split::split_body;
