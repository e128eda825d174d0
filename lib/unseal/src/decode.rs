use std::{
    ffi::OsString,
    io,
    path::{Path, PathBuf},
};

use async_trait::async_trait;
use bytes::Bytes;
use futures::{channel::mpsc, SinkExt, Stream, TryStreamExt};
use log::{debug, error, info};
use tokio::{fs, io::AsyncWriteExt, task::JoinHandle};

use crate::{
    crypto::PrivateKey,
    demux::Frame,
    extract::{boundary_from_header, extract_parts, open_output},
    names,
    session::{DecodeSession, Verified},
    source::{file_stream, READ_CHUNK_SIZE},
    Artifacts, DecodeError, Extraction,
};

/// Body chunks buffered between the decoder and the part writer.
const BODY_QUEUE_DEPTH: usize = 16;

#[derive(Debug, Clone)]
pub struct OutputOptions {
    /// Parent of the per-input output directories.
    pub root: PathBuf,

    /// Replace files that already exist instead of skipping them.
    pub overwrite_existing: bool,
}

impl Default for OutputOptions {
    fn default() -> Self {
        OutputOptions {
            root: PathBuf::from("."),
            overwrite_existing: false,
        }
    }
}

/// A verified, committed decode.
#[derive(Debug)]
pub struct Report {
    pub verified: Verified,
    pub outputs: usize,
    pub location: PathBuf,
}

/// Consumer of the frames a session produces.
#[async_trait]
trait FrameSink: Send {
    async fn header(&mut self, header: Vec<u8>) -> Result<(), DecodeError>;

    async fn body(&mut self, body: Vec<u8>) -> Result<(), DecodeError>;

    /// Finishes output and reports what was created, so it can be rolled
    /// back if the stream turned out to be bad.
    async fn close(self) -> Extraction;
}

async fn deliver<K: FrameSink>(sink: &mut K, frames: &mut Vec<Frame>) -> Result<(), DecodeError> {
    for f in frames.drain(..) {
        match f {
            Frame::Header(h) => sink.header(h).await?,
            Frame::Body(b) => sink.body(b).await?,
        }
    }
    Ok(())
}

async fn pump<I, K>(
    input: &mut I,
    mut session: DecodeSession<'_>,
    sink: &mut K,
) -> Result<Verified, DecodeError>
where
    I: Stream<Item = io::Result<Bytes>> + Unpin,
    K: FrameSink,
{
    let mut frames = Vec::new();
    while let Some(chunk) = input.try_next().await? {
        session.update(&chunk, &mut frames)?;
        deliver(sink, &mut frames).await?;
    }

    debug!("End of stream after {} bytes", session.consumed());
    let verified = session.finish(&mut frames)?;
    deliver(sink, &mut frames).await?;
    Ok(verified)
}

/// Drives one input through a session into `sink`. Any failure, whether
/// from the stream or from the sink, wipes whatever the sink created.
async fn run<I, K>(name: &str, mut input: I, key: &PrivateKey, mut sink: K) -> Result<(Verified, usize), DecodeError>
where
    I: Stream<Item = io::Result<Bytes>> + Unpin,
    K: FrameSink,
{
    let verdict = pump(&mut input, DecodeSession::new(key), &mut sink).await;
    let Extraction { artifacts, result } = sink.close().await;

    match verdict.and_then(|v| result.map(|n| (v, n))) {
        Ok(done) => Ok(done),
        Err(e) => {
            error!("Failed {}: {}", name, e);
            if !artifacts.is_empty() {
                artifacts.wipe();
            }
            Err(e)
        }
    }
}

enum PartSink {
    Waiting {
        dir: PathBuf,
        overwrite: bool,
    },
    Extracting {
        tx: Option<mpsc::Sender<io::Result<Bytes>>>,
        task: JoinHandle<Extraction>,
    },
}

#[async_trait]
impl FrameSink for PartSink {
    async fn header(&mut self, header: Vec<u8>) -> Result<(), DecodeError> {
        if let PartSink::Waiting { dir, overwrite } = self {
            let boundary = boundary_from_header(&header)?;
            let (tx, rx) = mpsc::channel(BODY_QUEUE_DEPTH);
            let task = tokio::spawn(extract_parts(rx, boundary, dir.clone(), *overwrite));
            *self = PartSink::Extracting { tx: Some(tx), task };
        }
        Ok(())
    }

    async fn body(&mut self, body: Vec<u8>) -> Result<(), DecodeError> {
        if let PartSink::Extracting { tx, .. } = self {
            if let Some(sender) = tx {
                if sender.send(Ok(Bytes::from(body))).await.is_err() {
                    // the parser saw the closing boundary; the rest is
                    // still hashed but no longer parsed
                    debug!("Part parser finished early, ignoring remaining body");
                    *tx = None;
                }
            }
        }
        Ok(())
    }

    async fn close(self) -> Extraction {
        match self {
            PartSink::Waiting { .. } => Extraction::nothing(),
            PartSink::Extracting { tx, task } => {
                drop(tx);
                task.await.unwrap_or_else(|e| Extraction {
                    artifacts: Artifacts::default(),
                    result: Err(io::Error::new(io::ErrorKind::Other, e).into()),
                })
            }
        }
    }
}

/// Decodes one sealed input named `name`, extracting its parts into a
/// directory under `options.root` named after the input.
pub async fn decode_to_dir<I>(
    name: &str,
    input: I,
    key: &PrivateKey,
    options: &OutputOptions,
) -> Result<Report, DecodeError>
where
    I: Stream<Item = io::Result<Bytes>> + Unpin,
{
    let location = options.root.join(names::output_dir_name(name));
    info!(" Parsing  {}", name);

    let sink = PartSink::Waiting {
        dir: location.clone(),
        overwrite: options.overwrite_existing,
    };
    let (verified, outputs) = run(name, input, key, sink).await?;

    Ok(Report {
        verified,
        outputs,
        location,
    })
}

/// Decodes a local sealed file into a directory named after it.
pub async fn decode_file(path: &Path, key: &PrivateKey, options: &OutputOptions) -> Result<Report, DecodeError> {
    let f = fs::File::open(path).await?;
    let name = path.to_string_lossy();
    decode_to_dir(&name, file_stream(f, READ_CHUNK_SIZE), key, options).await
}

struct RawSink {
    headers_path: PathBuf,
    body_path: PathBuf,
    overwrite: bool,
    body: Option<fs::File>,
    artifacts: Artifacts,
}

impl RawSink {
    /// Existing files are skipped like existing parts: the stream is still
    /// verified, but nothing is written over them.
    async fn create(&mut self, path: &Path) -> Result<Option<fs::File>, DecodeError> {
        match open_output(path, self.overwrite).await? {
            Some(f) => {
                self.artifacts.created_file(path.to_path_buf());
                Ok(Some(f))
            }
            None => {
                info!("  Skipping existing {:?}", path);
                Ok(None)
            }
        }
    }
}

#[async_trait]
impl FrameSink for RawSink {
    async fn header(&mut self, header: Vec<u8>) -> Result<(), DecodeError> {
        let headers_path = self.headers_path.clone();
        if let Some(mut f) = self.create(&headers_path).await? {
            f.write_all(&header).await?;
            f.flush().await?;
        }

        let body_path = self.body_path.clone();
        self.body = self.create(&body_path).await?;
        Ok(())
    }

    async fn body(&mut self, body: Vec<u8>) -> Result<(), DecodeError> {
        if let Some(f) = self.body.as_mut() {
            f.write_all(&body).await?;
        }
        Ok(())
    }

    async fn close(self) -> Extraction {
        let RawSink { body, artifacts, .. } = self;
        let flushed = match body {
            Some(mut f) => f.flush().await,
            None => Ok(()),
        };
        let result = flushed.map(|_| artifacts.files().len()).map_err(DecodeError::from);
        Extraction { artifacts, result }
    }
}

fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut s = OsString::from(path.as_os_str());
    s.push(suffix);
    PathBuf::from(s)
}

/// Decodes a local sealed file without splitting the body: the header goes
/// to `<path>.headers.txt` and the body to `<path>.txt`.
pub async fn decode_raw(path: &Path, key: &PrivateKey, options: &OutputOptions) -> Result<Report, DecodeError> {
    let f = fs::File::open(path).await?;
    let sink = RawSink {
        headers_path: with_suffix(path, ".headers.txt"),
        body_path: with_suffix(path, ".txt"),
        overwrite: options.overwrite_existing,
        body: None,
        artifacts: Artifacts::default(),
    };

    let name = path.to_string_lossy();
    let (verified, outputs) = run(&name, file_stream(f, READ_CHUNK_SIZE), key, sink).await?;

    Ok(Report {
        verified,
        outputs,
        location: with_suffix(path, ".txt"),
    })
}
