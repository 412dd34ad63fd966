//! Reversible mapping between archive paths and URL-safe identifiers.
//!
//! Identifiers are the raw path bytes in unpadded base64 with the URL-safe
//! alphabet, so they fit in a single path segment and decode back to the
//! exact path. The codec performs no existence check.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CodecError {
    #[error("Malformed identifier: {0}")]
    Malformed(#[from] base64::DecodeError),
    #[error("Identifier does not decode to a valid path")]
    InvalidPath,
}

/// Encode `path` as an external identifier.
pub fn encode(path: &Path) -> String {
    URL_SAFE_NO_PAD.encode(path_bytes(path))
}

/// Recover the path an identifier was produced from.
///
/// # Errors
///
/// Returns [`CodecError::Malformed`] if `id` is not canonical unpadded
/// URL-safe base64.
pub fn decode(id: &str) -> Result<PathBuf, CodecError> {
    let bytes = URL_SAFE_NO_PAD.decode(id)?;
    bytes_to_path(bytes)
}

#[cfg(unix)]
fn path_bytes(path: &Path) -> Vec<u8> {
    use std::os::unix::ffi::OsStrExt;
    path.as_os_str().as_bytes().to_vec()
}

#[cfg(unix)]
fn bytes_to_path(bytes: Vec<u8>) -> Result<PathBuf, CodecError> {
    use std::ffi::OsString;
    use std::os::unix::ffi::OsStringExt;
    Ok(PathBuf::from(OsString::from_vec(bytes)))
}

// Elsewhere paths travel as UTF-8; non-Unicode paths are encoded lossily.
#[cfg(not(unix))]
fn path_bytes(path: &Path) -> Vec<u8> {
    path.to_string_lossy().into_owned().into_bytes()
}

#[cfg(not(unix))]
fn bytes_to_path(bytes: Vec<u8>) -> Result<PathBuf, CodecError> {
    String::from_utf8(bytes)
        .map(PathBuf::from)
        .map_err(|_| CodecError::InvalidPath)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_paths() {
        for raw in [
            "data/vol1.zip",
            "/srv/manga/Series 01/第1巻.cbz",
            "a",
            "",
            "data/../odd name?#&.zip",
            "data/with/many/nested/levels/that/need/padding.zip",
        ] {
            let path = Path::new(raw);
            assert_eq!(decode(&encode(path)).unwrap(), path, "{raw}");
        }
    }

    #[cfg(unix)]
    #[test]
    fn round_trips_non_utf8_paths() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let path = Path::new(OsStr::from_bytes(b"data/\xff\xfe.zip"));
        assert_eq!(decode(&encode(path)).unwrap(), path);
    }

    #[test]
    fn identifiers_are_url_safe() {
        // Bytes chosen to hit '+' and '/' in the standard alphabet.
        let id = encode(Path::new("data/\u{3ff}\u{3ff}?>>>.zip"));
        assert!(
            id.bytes()
                .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_'),
            "{id}"
        );
    }

    #[test]
    fn distinct_paths_get_distinct_identifiers() {
        assert_ne!(
            encode(Path::new("data/a.zip")),
            encode(Path::new("data/b.zip"))
        );
        assert_ne!(encode(Path::new("data/a")), encode(Path::new("data/a ")));
    }

    #[test]
    fn rejects_malformed_identifiers() {
        for bad in ["not base64!", "abc=", "a", "ab+/", "favicon.ico"] {
            assert!(
                matches!(decode(bad), Err(CodecError::Malformed(_))),
                "{bad}"
            );
        }
    }
}
