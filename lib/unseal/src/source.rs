use std::io;

use bytes::BytesMut;
use futures::stream;
use tokio::{fs::File, io::AsyncReadExt};

use crate::storage::ByteStream;

pub const READ_CHUNK_SIZE: usize = 64 * 1024;

/// Reads `file` as a stream of chunks of at most `chunk_size` bytes.
pub fn file_stream(file: File, chunk_size: usize) -> ByteStream {
    let chunk_size = chunk_size.max(1);
    Box::pin(stream::try_unfold(file, move |mut f| async move {
        let mut buf = BytesMut::with_capacity(chunk_size);
        let n = f.read_buf(&mut buf).await?;
        let next = if n == 0 { None } else { Some((buf.freeze(), f)) };
        Ok::<_, io::Error>(next)
    }))
}
