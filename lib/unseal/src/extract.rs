use std::{
    io,
    path::{Path, PathBuf},
};

use bytes::Bytes;
use futures::Stream;
use log::{debug, info};
use multer::Multipart;
use serde_json::{Map, Value};
use tokio::{fs, io::AsyncWriteExt};

use crate::{names, Artifacts, DecodeError, HeaderError};

/// What a part extraction left behind, whether or not it succeeded.
#[derive(Debug)]
pub struct Extraction {
    pub artifacts: Artifacts,
    pub result: Result<usize, DecodeError>,
}

impl Extraction {
    pub fn nothing() -> Self {
        Extraction {
            artifacts: Artifacts::default(),
            result: Ok(0),
        }
    }
}

/// Pulls the multipart boundary out of a JSON header map. Header names are
/// matched case-insensitively.
pub fn boundary_from_header(header: &[u8]) -> Result<String, HeaderError> {
    let map: Map<String, Value> = serde_json::from_slice(header).map_err(HeaderError::Json)?;

    let content_type = map
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case("content-type"))
        .and_then(|(_, v)| v.as_str())
        .ok_or(HeaderError::MissingContentType)?;

    multer::parse_boundary(content_type).map_err(|e| {
        debug!("Unusable content type {:?}: {}", content_type, e);
        HeaderError::MissingContentType
    })
}

/// Writes every file part of a multipart `body` into `dir`. The directory
/// is created on the first file part. Existing files are left alone unless
/// `overwrite` is set.
pub async fn extract_parts<S>(body: S, boundary: String, dir: PathBuf, overwrite: bool) -> Extraction
where
    S: Stream<Item = io::Result<Bytes>> + Send + 'static,
{
    let mut artifacts = Artifacts::default();
    let multipart = Multipart::new(body, boundary);
    let result = write_parts(multipart, &dir, overwrite, &mut artifacts).await;
    Extraction { artifacts, result }
}

async fn write_parts(
    mut multipart: Multipart<'_>,
    dir: &Path,
    overwrite: bool,
    artifacts: &mut Artifacts,
) -> Result<usize, DecodeError> {
    let mut dir_ready = false;
    let mut written = 0;

    while let Some(mut field) = multipart.next_field().await.map_err(HeaderError::Multipart)? {
        let raw_name = match field.file_name() {
            Some(n) => n.to_owned(),
            None => {
                info!("IGNORED Field [{}]", field.name().unwrap_or_default());
                continue;
            }
        };

        let name = match names::part_file_name(&raw_name) {
            Some(n) => n,
            None => {
                info!("IGNORED part with unusable file name {:?}", raw_name);
                continue;
            }
        };

        if !dir_ready {
            prepare_dir(dir, artifacts).await?;
            dir_ready = true;
        }

        let path = dir.join(&name);
        let mut file = match open_output(&path, overwrite).await? {
            Some(f) => f,
            None => {
                info!("  Skipping existing {:?}", path);
                continue;
            }
        };
        artifacts.created_file(path);

        info!("  Working on {}", name);
        while let Some(chunk) = field.chunk().await.map_err(HeaderError::Multipart)? {
            file.write_all(&chunk).await?;
        }
        file.flush().await?;
        written += 1;
    }

    Ok(written)
}

async fn prepare_dir(dir: &Path, artifacts: &mut Artifacts) -> io::Result<()> {
    match fs::create_dir(dir).await {
        Ok(_) => {
            artifacts.created_dir(dir.to_path_buf());
            Ok(())
        }
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => Ok(()),
        Err(e) => Err(e),
    }
}

/// Opens `path` for writing. Returns None when the file exists and
/// `overwrite` is off.
pub(crate) async fn open_output(path: &Path, overwrite: bool) -> io::Result<Option<fs::File>> {
    let mut opts = fs::OpenOptions::new();
    opts.write(true);
    if overwrite {
        opts.create(true).truncate(true);
    } else {
        opts.create_new(true);
    }

    match opts.open(path).await {
        Ok(f) => Ok(Some(f)),
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists && !overwrite => Ok(None),
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use futures::stream;

    const BODY: &str = "--X\r\n\
        Content-Disposition: form-data; name=\"note\"\r\n\r\n\
        just a field\r\n\
        --X\r\n\
        Content-Disposition: form-data; name=\"upload\"; filename=\"a.txt\"\r\n\
        Content-Type: text/plain\r\n\r\n\
        hello\r\n\
        --X\r\n\
        Content-Disposition: form-data; name=\"upload\"; filename=\"../b.txt\"\r\n\r\n\
        world\r\n\
        --X--\r\n";

    fn body_stream(body: &'static str, chunk: usize) -> impl Stream<Item = io::Result<Bytes>> + Send + 'static {
        let chunks: Vec<io::Result<Bytes>> = body
            .as_bytes()
            .chunks(chunk)
            .map(|c| Ok(Bytes::copy_from_slice(c)))
            .collect();
        stream::iter(chunks)
    }

    #[test]
    fn boundary_lookup_ignores_header_case() {
        let h = br#"{"Content-Type":"multipart/form-data; boundary=X","host":"h"}"#;
        assert_eq!(boundary_from_header(h).unwrap(), "X");
    }

    #[test]
    fn header_must_be_json_object() {
        assert!(matches!(boundary_from_header(b"not json"), Err(HeaderError::Json(_))));
        assert!(matches!(boundary_from_header(b"[1,2]"), Err(HeaderError::Json(_))));
    }

    #[test]
    fn header_must_carry_multipart_content_type() {
        assert!(matches!(
            boundary_from_header(br#"{"host":"h"}"#),
            Err(HeaderError::MissingContentType)
        ));
        assert!(matches!(
            boundary_from_header(br#"{"content-type":"text/plain"}"#),
            Err(HeaderError::MissingContentType)
        ));
    }

    #[tokio::test]
    async fn writes_file_parts_and_skips_fields() {
        let root = tempfile::tempdir().unwrap();
        let dir = root.path().join("out");

        let x = extract_parts(body_stream(BODY, 5), "X".to_string(), dir.clone(), false).await;

        assert_eq!(x.result.unwrap(), 2);
        assert_eq!(std::fs::read(dir.join("a.txt")).unwrap(), b"hello");
        let files: Vec<_> = std::fs::read_dir(&dir).unwrap().collect();
        assert_eq!(files.len(), 2);
        assert_eq!(x.artifacts.files().len(), 2);
        assert_eq!(x.artifacts.dirs(), &[dir][..]);
    }

    #[tokio::test]
    async fn existing_files_are_skipped_without_overwrite() {
        let root = tempfile::tempdir().unwrap();
        let dir = root.path().join("out");
        std::fs::create_dir(&dir).unwrap();
        std::fs::write(dir.join("a.txt"), b"original").unwrap();

        let x = extract_parts(body_stream(BODY, 64), "X".to_string(), dir.clone(), false).await;

        assert_eq!(x.result.unwrap(), 1);
        assert_eq!(std::fs::read(dir.join("a.txt")).unwrap(), b"original");
        assert!(x.artifacts.files().iter().all(|f| !f.ends_with("a.txt")));
        assert!(x.artifacts.dirs().is_empty());
    }

    #[tokio::test]
    async fn existing_files_are_replaced_with_overwrite() {
        let root = tempfile::tempdir().unwrap();
        let dir = root.path().join("out");
        std::fs::create_dir(&dir).unwrap();
        std::fs::write(dir.join("a.txt"), b"original").unwrap();

        let x = extract_parts(body_stream(BODY, 64), "X".to_string(), dir.clone(), true).await;

        assert_eq!(x.result.unwrap(), 2);
        assert_eq!(std::fs::read(dir.join("a.txt")).unwrap(), b"hello");
    }

    #[tokio::test]
    async fn truncated_body_reports_error_and_artifacts() {
        let root = tempfile::tempdir().unwrap();
        let dir = root.path().join("out");
        let cut = &BODY[..BODY.find("world").unwrap()];

        let x = extract_parts(body_stream(cut, 7), "X".to_string(), dir.clone(), false).await;

        assert!(matches!(x.result, Err(DecodeError::Header(HeaderError::Multipart(_)))));
        assert!(!x.artifacts.is_empty());
        x.artifacts.wipe();
        assert!(!dir.exists());
    }
}
