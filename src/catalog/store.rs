//! The in-memory catalog: identifier → indexed archive metadata.
//!
//! Built once before the server accepts connections and shared behind an
//! `Arc` afterwards; nothing mutates it while requests are served.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::zip::ZipFileEntry;

/// Entry name extensions treated as viewable pages.
pub const PAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "webp", "avif", "bmp"];

#[derive(Error, Debug)]
#[error("Unknown archive identifier: {id}")]
pub struct LookupError {
    pub id: String,
}

/// One viewable page: an image entry and its position in the archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    /// Index of the entry in the archive's central directory
    pub index: usize,
    pub name: String,
}

/// Metadata of one indexed archive.
#[derive(Debug, Clone)]
pub struct CatalogEntry {
    /// Display name (base file name of the archive)
    pub name: String,
    /// Location on disk at index time
    pub path: PathBuf,
    /// Every entry name, in central directory order
    pub entry_names: Vec<String>,
    /// Image entries, in central directory order
    pub pages: Vec<Page>,
}

impl CatalogEntry {
    pub fn new(path: &Path, entries: &[ZipFileEntry]) -> Self {
        let name = path
            .file_name()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.to_string_lossy().into_owned());

        let pages = entries
            .iter()
            .enumerate()
            .filter(|(_, e)| !e.is_directory && is_page_name(&e.file_name))
            .map(|(index, e)| Page {
                index,
                name: e.file_name.clone(),
            })
            .collect();

        Self {
            name,
            path: path.to_path_buf(),
            entry_names: entries.iter().map(|e| e.file_name.clone()).collect(),
            pages,
        }
    }

    /// Number of viewable pages.
    pub fn entry_count(&self) -> usize {
        self.pages.len()
    }
}

/// Whether an entry name looks like an image page.
pub fn is_page_name(name: &str) -> bool {
    Path::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| PAGE_EXTENSIONS.iter().any(|p| ext.eq_ignore_ascii_case(p)))
}

/// Identifier-keyed catalog preserving insertion order for listings.
#[derive(Debug, Default)]
pub struct Catalog {
    entries: Vec<(String, CatalogEntry)>,
    by_id: HashMap<String, usize>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an entry. A repeated identifier replaces the earlier entry in
    /// place.
    pub fn insert(&mut self, id: String, entry: CatalogEntry) {
        match self.by_id.get(&id) {
            Some(&slot) => self.entries[slot].1 = entry,
            None => {
                self.by_id.insert(id.clone(), self.entries.len());
                self.entries.push((id, entry));
            }
        }
    }

    pub fn lookup(&self, id: &str) -> Result<&CatalogEntry, LookupError> {
        self.by_id
            .get(id)
            .map(|&slot| &self.entries[slot].1)
            .ok_or_else(|| LookupError { id: id.to_string() })
    }

    /// All entries with their identifiers, in insertion order.
    pub fn all(&self) -> impl Iterator<Item = (&str, &CatalogEntry)> {
        self.entries.iter().map(|(id, entry)| (id.as_str(), entry))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<(String, CatalogEntry)> for Catalog {
    fn from_iter<I: IntoIterator<Item = (String, CatalogEntry)>>(iter: I) -> Self {
        let mut catalog = Catalog::new();
        for (id, entry) in iter {
            catalog.insert(id, entry);
        }
        catalog
    }
}
