//! Shared test utilities: archive fixtures written at test time.

use std::fs::File;
use std::io::Write;
use std::path::Path;

use zip::CompressionMethod;
use zip::write::{FileOptions, ZipWriter};

/// One entry to place in a generated archive.
pub struct ZipSpec<'a> {
    pub name: &'a str,
    pub data: &'a [u8],
    pub method: Option<CompressionMethod>,
}

impl<'a> ZipSpec<'a> {
    pub fn stored(name: &'a str, data: &'a [u8]) -> Self {
        Self {
            name,
            data,
            method: Some(CompressionMethod::Stored),
        }
    }

    pub fn deflated(name: &'a str, data: &'a [u8]) -> Self {
        Self {
            name,
            data,
            method: Some(CompressionMethod::Deflated),
        }
    }

    /// A directory entry; `name` must end with `/`.
    pub fn dir(name: &'a str) -> Self {
        Self {
            name,
            data: b"",
            method: None,
        }
    }
}

pub fn write_zip(path: &Path, entries: &[ZipSpec<'_>]) {
    write_zip_with_comment(path, entries, "");
}

pub fn write_zip_with_comment(path: &Path, entries: &[ZipSpec<'_>], comment: &str) {
    let mut writer = ZipWriter::new(File::create(path).unwrap());
    for spec in entries {
        match spec.method {
            Some(method) => {
                let options = FileOptions::default().compression_method(method);
                writer.start_file(spec.name, options).unwrap();
                writer.write_all(spec.data).unwrap();
            }
            None => writer
                .add_directory(spec.name.trim_end_matches('/'), FileOptions::default())
                .unwrap(),
        }
    }
    if !comment.is_empty() {
        writer.set_comment(comment);
    }
    writer.finish().unwrap();
}

/// An archive with `count` stored pages named `p0.jpg`, `p1.jpg`, ...
/// whose contents are `page <n>`.
pub fn write_volume(path: &Path, count: usize) {
    let names: Vec<String> = (0..count).map(|i| format!("p{i}.jpg")).collect();
    let bodies: Vec<String> = (0..count).map(|i| format!("page {i}")).collect();
    let specs: Vec<ZipSpec<'_>> = names
        .iter()
        .zip(&bodies)
        .map(|(name, body)| ZipSpec::stored(name, body.as_bytes()))
        .collect();
    write_zip(path, &specs);
}
