use std::{io, path::Path};

use log::info;
use tokio::fs;

use crate::{
    extract::{boundary_from_header, extract_parts},
    names,
    source::{file_stream, READ_CHUNK_SIZE},
    DecodeError, Extraction, HeaderError, OutputOptions,
};

/// Splits a body written by a raw decode into its parts. The header map is
/// read from the sibling `<stem>.headers.txt`, and parts land in a directory
/// under `options.root` named after the twice-stripped body name. Existing
/// files are never replaced.
pub async fn split_body(body_path: &Path, options: &OutputOptions) -> Result<usize, DecodeError> {
    let name = body_path.to_string_lossy();
    let stem = names::strip_ext(&name);
    let headers_path = body_path.with_file_name(format!("{}.headers.txt", stem));

    let header = fs::read(&headers_path).await.map_err(|e| match e.kind() {
        io::ErrorKind::NotFound => HeaderError::MissingHeaderFile(headers_path.clone()).into(),
        _ => DecodeError::from(e),
    })?;
    let boundary = boundary_from_header(&header)?;

    let dir = options.root.join(names::output_dir_name(stem));
    info!("Writing files to: {:?}", dir);

    let f = fs::File::open(body_path).await?;
    let Extraction { artifacts, result } =
        extract_parts(file_stream(f, READ_CHUNK_SIZE), boundary, dir, false).await;

    match result {
        Ok(n) => {
            info!("FINISHED!");
            Ok(n)
        }
        Err(e) => {
            artifacts.wipe();
            Err(e)
        }
    }
}
