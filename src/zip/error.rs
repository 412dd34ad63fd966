use std::io;
use thiserror::Error;

/// Errors raised while reading an archive's structures or entry data.
#[derive(Error, Debug)]
pub enum ZipError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("Not a valid ZIP file: {0}")]
    Invalid(&'static str),
    #[error("Unsupported compression method: {0}")]
    UnsupportedCompression(u16),
    #[error("Encrypted entries are not supported: {0}")]
    Encrypted(String),
    #[error("Corrupt deflate stream: {0}")]
    Inflate(#[from] flate2::DecompressError),
    #[error("Size mismatch for {name}: expected {expected} bytes, got {actual}")]
    SizeMismatch {
        name: String,
        expected: u64,
        actual: u64,
    },
    #[error("CRC mismatch for {name}: expected {expected:08x}, got {actual:08x}")]
    ChecksumMismatch {
        name: String,
        expected: u32,
        actual: u32,
    },
}

pub type Result<T> = std::result::Result<T, ZipError>;
