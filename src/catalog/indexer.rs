//! Startup scan of the archive root.
//!
//! Walks the root once (sorted by file name, so the resulting listing is
//! stable), reads the central directory of every archive it finds and
//! keys a [`CatalogEntry`] by the archive's encoded path.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::io::LocalFileReader;
use crate::zip::{ZipError, ZipParser};

use super::codec;
use super::store::{Catalog, CatalogEntry};

/// File extensions recognised as zip archives.
pub const ARCHIVE_EXTENSIONS: &[&str] = &["zip", "cbz"];

/// What to do when an individual archive cannot be read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IndexPolicy {
    /// Log and skip the archive; fail only if nothing could be indexed.
    #[default]
    BestEffort,
    /// Abort on the first unreadable archive or directory.
    Strict,
}

#[derive(Error, Debug)]
pub enum IndexError {
    #[error("Cannot walk {path}: {source}")]
    Walk {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },
    #[error("Cannot index {path}: {source}")]
    Archive {
        path: PathBuf,
        #[source]
        source: ZipError,
    },
    #[error("None of the {failed} archives under {root} could be indexed")]
    NothingIndexed { root: PathBuf, failed: usize },
    #[error("Directory walk task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// An archive left out of the catalog.
#[derive(Debug)]
pub struct SkippedArchive {
    pub path: PathBuf,
    pub error: ZipError,
}

/// Outcome of a scan: the catalog plus whatever had to be left out.
#[derive(Debug)]
pub struct IndexReport {
    pub catalog: Catalog,
    pub skipped: Vec<SkippedArchive>,
}

/// Build the catalog for every archive under `root`.
///
/// Non-archive files are ignored. Under [`IndexPolicy::BestEffort`] an
/// unreadable archive or subdirectory is logged and skipped.
///
/// # Errors
///
/// - [`IndexError::Walk`] if `root` itself cannot be read, or under
///   [`IndexPolicy::Strict`] for any unreadable subdirectory
/// - [`IndexError::Archive`] under [`IndexPolicy::Strict`] for the first
///   archive that fails to parse
/// - [`IndexError::NothingIndexed`] if archives were found but every one
///   of them failed
pub async fn index(root: &Path, policy: IndexPolicy) -> Result<IndexReport, IndexError> {
    info!(root = %root.display(), ?policy, "indexing archives");

    let walk_root = root.to_path_buf();
    let archives = tokio::task::spawn_blocking(move || discover(&walk_root, policy)).await??;

    let mut catalog = Catalog::new();
    let mut skipped = Vec::new();

    for path in &archives {
        match index_archive(path).await {
            Ok(entry) => {
                debug!(
                    path = %path.display(),
                    entries = entry.entry_names.len(),
                    pages = entry.entry_count(),
                    "indexed archive"
                );
                catalog.insert(codec::encode(path), entry);
            }
            Err(error) if policy == IndexPolicy::Strict => {
                return Err(IndexError::Archive {
                    path: path.clone(),
                    source: error,
                });
            }
            Err(error) => {
                warn!(path = %path.display(), error = %error, "skipping unreadable archive");
                skipped.push(SkippedArchive {
                    path: path.clone(),
                    error,
                });
            }
        }
    }

    if catalog.is_empty() && !skipped.is_empty() {
        return Err(IndexError::NothingIndexed {
            root: root.to_path_buf(),
            failed: skipped.len(),
        });
    }
    if catalog.is_empty() {
        warn!(root = %root.display(), "no archives found");
    }

    info!(
        indexed = catalog.len(),
        skipped = skipped.len(),
        "indexing finished"
    );
    Ok(IndexReport { catalog, skipped })
}

/// Collect archive paths under `root` in walk order.
///
/// Runs on the blocking pool; walkdir only offers synchronous I/O.
fn discover(root: &Path, policy: IndexPolicy) -> Result<Vec<PathBuf>, IndexError> {
    let mut archives = Vec::new();
    for dent in WalkDir::new(root).follow_links(true).sort_by_file_name() {
        let dent = match dent {
            Ok(dent) => dent,
            Err(err) if err.depth() == 0 || policy == IndexPolicy::Strict => {
                let path = err.path().unwrap_or(root).to_path_buf();
                return Err(IndexError::Walk { path, source: err });
            }
            Err(err) => {
                warn!(error = %err, "skipping unreadable directory entry");
                continue;
            }
        };

        if dent.file_type().is_file() && is_archive_path(dent.path()) {
            archives.push(dent.into_path());
        }
    }
    Ok(archives)
}

/// Read one archive's central directory into a catalog entry.
///
/// The file handle is closed before this returns.
pub async fn index_archive(path: &Path) -> Result<CatalogEntry, ZipError> {
    let reader = LocalFileReader::open(path)?;
    let parser = ZipParser::new(Arc::new(reader));
    let entries = parser.entries().await?;
    Ok(CatalogEntry::new(path, &entries))
}

/// Whether `path` carries one of the [`ARCHIVE_EXTENSIONS`].
pub fn is_archive_path(path: &Path) -> bool {
    path.extension()
        .and_then(OsStr::to_str)
        .is_some_and(|ext| ARCHIVE_EXTENSIONS.iter().any(|a| ext.eq_ignore_ascii_case(a)))
}
