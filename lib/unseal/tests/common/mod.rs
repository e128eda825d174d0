//! A producer for sealed streams, mirroring what the uploader writes.

#![allow(dead_code)]

use std::io;

use bytes::Bytes;
use futures::{stream, Stream};
use openssl::{
    pkey::Private,
    rand::rand_bytes,
    rsa::{Padding, Rsa},
    sha::Sha512,
    symm::{encrypt, Cipher},
};
use unseal::crypto::{KeyPadding, PrivateKey, IV_SIZE, KEY_SIZE};

pub const BOUNDARY: &str = "X";

pub struct Keys {
    pub rsa: Rsa<Private>,
    pub private: PrivateKey,
}

pub fn keys() -> Keys {
    let rsa = Rsa::generate(2048).unwrap();
    let pem = rsa.private_key_to_pem().unwrap();
    let private = PrivateKey::from_pem(&pem, KeyPadding::Oaep).unwrap();
    Keys { rsa, private }
}

/// Knobs for producing deliberately broken streams.
#[derive(Default)]
pub struct Tamper {
    pub flip_body_bit: Option<usize>,
    pub embedded_iv: Option<[u8; IV_SIZE]>,
    pub trailer_len: Option<usize>,
    pub format: Option<u8>,
}

pub fn seal(rsa: &Rsa<Private>, header: &[u8], body: &[u8]) -> Vec<u8> {
    seal_with(rsa, header, body, &Tamper::default())
}

pub fn seal_with(rsa: &Rsa<Private>, header: &[u8], body: &[u8], tamper: &Tamper) -> Vec<u8> {
    let mut iv = [0u8; IV_SIZE];
    let mut key = [0u8; KEY_SIZE];
    rand_bytes(&mut iv).unwrap();
    rand_bytes(&mut key).unwrap();

    let mut wrapped = vec![0; rsa.size() as usize];
    let n = rsa.public_encrypt(&key, &mut wrapped, Padding::PKCS1_OAEP).unwrap();
    wrapped.truncate(n);

    let format = [tamper.format.unwrap_or(0x01)];
    let header_len = (header.len() as u32).to_le_bytes();

    let mut hash = Sha512::new();
    hash.update(&iv);
    hash.update(&key);
    hash.update(&format);
    hash.update(&header_len);
    hash.update(header);
    hash.update(body);
    let digest = hash.finish();

    let mut plain = Vec::new();
    plain.extend_from_slice(&format);
    plain.extend_from_slice(&header_len);
    plain.extend_from_slice(header);
    plain.extend_from_slice(body);
    if let Some(bit) = tamper.flip_body_bit {
        let at = format.len() + header_len.len() + header.len() + bit / 8;
        plain[at] ^= 1 << (bit % 8);
    }

    let mut trailer = digest.to_vec();
    trailer.extend_from_slice(&tamper.embedded_iv.unwrap_or(iv));
    trailer.truncate(tamper.trailer_len.unwrap_or(trailer.len()));
    plain.extend_from_slice(&trailer);

    let ciphertext = encrypt(Cipher::aes_256_cbc(), &key, Some(&iv), &plain).unwrap();

    let mut out = iv.to_vec();
    out.extend_from_slice(&wrapped);
    out.extend_from_slice(&ciphertext);
    out
}

pub fn multipart_header() -> Vec<u8> {
    format!(r#"{{"content-type":"multipart/form-data; boundary={}"}}"#, BOUNDARY).into_bytes()
}

/// A multipart body holding the given (file name, content) parts.
pub fn multipart_body(parts: &[(&str, &[u8])]) -> Vec<u8> {
    let mut body = Vec::new();
    for (name, content) in parts {
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        body.extend_from_slice(
            format!(
                "Content-Disposition: form-data; name=\"file\"; filename=\"{}\"\r\n\
                 Content-Type: application/octet-stream\r\n\r\n",
                name
            )
            .as_bytes(),
        );
        body.extend_from_slice(content);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
    body
}

pub fn chunked(data: &[u8], chunk: usize) -> impl Stream<Item = io::Result<Bytes>> + Unpin {
    let chunks: Vec<io::Result<Bytes>> = data
        .chunks(chunk.max(1))
        .map(|c| Ok(Bytes::copy_from_slice(c)))
        .collect();
    stream::iter(chunks)
}

/// All paths below `root`, files and directories alike.
pub fn tree(root: &std::path::Path) -> Vec<std::path::PathBuf> {
    let mut found = Vec::new();
    let mut pending = vec![root.to_path_buf()];
    while let Some(dir) = pending.pop() {
        for entry in std::fs::read_dir(&dir).unwrap() {
            let p = entry.unwrap().path();
            if p.is_dir() {
                pending.push(p.clone());
            }
            found.push(p);
        }
    }
    found.sort();
    found
}
