//! Open one entry of one archive on demand.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

use crate::io::LocalFileReader;
use crate::zip::{EntryStream, ZipError, ZipParser};

#[derive(Error, Debug)]
pub enum LocatorError {
    #[error("Entry {index} out of range: archive has {count} entries")]
    OutOfRange { index: usize, count: usize },
    #[error("Archive not found: {0}")]
    Missing(PathBuf),
    #[error("Cannot open archive {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error(transparent)]
    Archive(#[from] ZipError),
}

impl LocatorError {
    /// Whether the caller asked for something that does not exist, as
    /// opposed to the archive failing to read.
    pub fn is_not_found(&self) -> bool {
        matches!(self, LocatorError::OutOfRange { .. } | LocatorError::Missing(_))
    }
}

/// Open entry `index` of the archive at `path`.
///
/// Every call opens its own file handle and parses the central directory
/// afresh; nothing is shared between calls. The returned stream owns the
/// handle, which is closed when the stream is consumed or dropped.
///
/// # Errors
///
/// - [`LocatorError::OutOfRange`] if `index` is not below the archive's
///   entry count
/// - [`LocatorError::Missing`] if nothing exists at `path`
/// - [`LocatorError::Open`] / [`LocatorError::Archive`] for any other
///   I/O or format failure
pub async fn open_entry(
    path: &Path,
    index: usize,
) -> Result<EntryStream<LocalFileReader>, LocatorError> {
    let owned = path.to_path_buf();
    let opened = tokio::task::spawn_blocking(move || LocalFileReader::open(&owned))
        .await
        .map_err(io::Error::other)
        .and_then(|opened| opened);
    let reader = opened.map_err(|source| match source.kind() {
        io::ErrorKind::NotFound => LocatorError::Missing(path.to_path_buf()),
        _ => LocatorError::Open {
            path: path.to_path_buf(),
            source,
        },
    })?;

    let parser = ZipParser::new(Arc::new(reader));
    let entries = parser.entries().await?;
    let entry = entries.get(index).ok_or(LocatorError::OutOfRange {
        index,
        count: entries.len(),
    })?;

    Ok(parser.open_entry(entry).await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{ZipSpec, write_volume, write_zip};

    async fn read_all(path: &Path, index: usize) -> Result<Vec<u8>, LocatorError> {
        let stream = open_entry(path, index).await?;
        let mut out = Vec::new();
        stream.copy_to(&mut out).await?;
        Ok(out)
    }

    #[tokio::test]
    async fn every_valid_index_opens() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vol1.zip");
        write_volume(&path, 3);

        for i in 0..3 {
            let data = read_all(&path, i).await.unwrap();
            assert_eq!(data, format!("page {i}").as_bytes());
        }
    }

    #[tokio::test]
    async fn index_past_end_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vol1.zip");
        write_volume(&path, 3);

        for i in [3, 5, usize::MAX] {
            let err = read_all(&path, i).await.unwrap_err();
            assert!(err.is_not_found(), "{err}");
            assert!(matches!(err, LocatorError::OutOfRange { count: 3, .. }));
        }
    }

    #[tokio::test]
    async fn missing_archive_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let err = read_all(&dir.path().join("gone.zip"), 0).await.unwrap_err();
        assert!(matches!(err, LocatorError::Missing(_)), "{err}");
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn corrupt_archive_is_a_server_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.zip");
        std::fs::write(&path, b"this is not a zip archive at all").unwrap();

        let err = read_all(&path, 0).await.unwrap_err();
        assert!(matches!(err, LocatorError::Archive(_)), "{err}");
        assert!(!err.is_not_found());
    }

    #[tokio::test]
    async fn concurrent_reads_of_one_archive_are_isolated() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mixed.zip");
        let first = vec![1u8; 200_000];
        let second: Vec<u8> = (0..200_000u32).map(|i| (i % 13) as u8).collect();
        write_zip(
            &path,
            &[
                ZipSpec::deflated("a.jpg", &first),
                ZipSpec::deflated("b.jpg", &second),
            ],
        );

        let (a, b) = tokio::join!(
            tokio::spawn({
                let path = path.clone();
                async move { read_all(&path, 0).await.unwrap() }
            }),
            tokio::spawn({
                let path = path.clone();
                async move { read_all(&path, 1).await.unwrap() }
            }),
        );
        assert_eq!(a.unwrap(), first);
        assert_eq!(b.unwrap(), second);
    }
}
