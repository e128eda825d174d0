//! Mapping untrusted identifiers onto safe local file names.

use sanitize_filename::sanitize;

fn basename_with(path: &str, is_sep: impl Fn(char) -> bool) -> &str {
    let trimmed = path.trim_end_matches(|c| is_sep(c));
    match trimmed.rfind(|c| is_sep(c)) {
        Some(n) => &trimmed[n + 1..],
        None => trimmed,
    }
}

/// Last component of `path` using `/` as the only separator.
pub fn posix_basename(path: &str) -> &str {
    basename_with(path, |c| c == '/')
}

/// Last component of `path` treating both `/` and `\` as separators and
/// ignoring a leading drive designator.
pub fn win32_basename(path: &str) -> &str {
    let b = path.as_bytes();
    let path = if b.len() >= 2 && b[1] == b':' && b[0].is_ascii_alphabetic() {
        &path[2..]
    } else {
        path
    };
    basename_with(path, |c| c == '/' || c == '\\')
}

/// The basename of `path` with its final extension removed. A leading dot
/// does not start an extension.
pub fn strip_ext(path: &str) -> &str {
    let base = posix_basename(path);
    match base.rfind('.') {
        Some(n) if n > 0 => &base[..n],
        _ => base,
    }
}

/// Directory name for the output of the input called `identifier`.
pub fn output_dir_name(identifier: &str) -> String {
    sanitize(strip_ext(identifier))
}

/// Local name for an embedded part. The name is computed under both path
/// conventions and the shorter result kept, so a traversal prefix hidden
/// from one convention is still stripped by the other. Returns None when
/// nothing usable is left.
pub fn part_file_name(raw: &str) -> Option<String> {
    let nice = sanitize(raw);
    let a = win32_basename(&nice);
    let b = posix_basename(&nice);
    let name = if a.len() < b.len() { a } else { b };

    match name {
        "" | "." | ".." => None,
        n => Some(n.to_owned()),
    }
}
