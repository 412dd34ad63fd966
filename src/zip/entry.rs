//! Streaming access to a single entry's data.

use flate2::{Crc, Decompress, FlushDecompress, Status};
use std::sync::Arc;
use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::io::ReadAt;

use super::error::{Result, ZipError};
use super::structures::{CompressionMethod, ZipFileEntry};

/// Bytes read from the archive (and produced by the inflater) per step.
const CHUNK_SIZE: usize = 64 * 1024;

/// A readable view over one entry of an open archive.
///
/// Holds its own reference to the archive reader; dropping the stream
/// releases the archive handle once no other owner remains.
pub struct EntryStream<R: ReadAt> {
    reader: Arc<R>,
    entry: ZipFileEntry,
    data_offset: u64,
}

impl<R: ReadAt> EntryStream<R> {
    pub(super) fn new(reader: Arc<R>, entry: ZipFileEntry, data_offset: u64) -> Self {
        Self {
            reader,
            entry,
            data_offset,
        }
    }

    /// Central directory record of the entry being streamed.
    pub fn entry(&self) -> &ZipFileEntry {
        &self.entry
    }

    /// Decompressed length as recorded in the central directory.
    pub fn len(&self) -> u64 {
        self.entry.uncompressed_size
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copy the decompressed entry into `sink`, chunk by chunk.
    ///
    /// The produced length and CRC-32 are checked against the central
    /// directory once the data is exhausted. The stream is consumed either
    /// way, so the archive handle is released on every exit path.
    ///
    /// # Returns
    ///
    /// The number of bytes written to `sink`.
    pub async fn copy_to<W>(self, sink: &mut W) -> Result<u64>
    where
        W: AsyncWrite + Unpin + ?Sized,
    {
        let mut crc = Crc::new();

        let written = match self.entry.compression_method {
            CompressionMethod::Stored => self.copy_stored(sink, &mut crc).await?,
            CompressionMethod::Deflate => self.copy_deflated(sink, &mut crc).await?,
            CompressionMethod::Unknown(method) => {
                return Err(ZipError::UnsupportedCompression(method));
            }
        };
        sink.flush().await?;

        if written != self.entry.uncompressed_size {
            return Err(ZipError::SizeMismatch {
                name: self.entry.file_name.clone(),
                expected: self.entry.uncompressed_size,
                actual: written,
            });
        }
        if crc.sum() != self.entry.crc32 {
            return Err(ZipError::ChecksumMismatch {
                name: self.entry.file_name.clone(),
                expected: self.entry.crc32,
                actual: crc.sum(),
            });
        }

        Ok(written)
    }

    async fn copy_stored<W>(&self, sink: &mut W, crc: &mut Crc) -> Result<u64>
    where
        W: AsyncWrite + Unpin + ?Sized,
    {
        let mut buf = vec![0u8; CHUNK_SIZE.min(self.entry.compressed_size as usize)];
        let mut offset = self.data_offset;
        let mut remaining = self.entry.compressed_size;

        while remaining > 0 {
            let n = (remaining as usize).min(buf.len());
            self.reader.read_exact_at(offset, &mut buf[..n]).await?;
            crc.update(&buf[..n]);
            sink.write_all(&buf[..n]).await?;
            offset += n as u64;
            remaining -= n as u64;
        }

        Ok(self.entry.compressed_size)
    }

    async fn copy_deflated<W>(&self, sink: &mut W, crc: &mut Crc) -> Result<u64>
    where
        W: AsyncWrite + Unpin + ?Sized,
    {
        let mut input = vec![0u8; CHUNK_SIZE];
        let mut output = vec![0u8; CHUNK_SIZE];
        // Raw deflate: ZIP entries carry no zlib header.
        let mut inflater = Decompress::new(false);

        let mut offset = self.data_offset;
        let mut remaining = self.entry.compressed_size;
        let (mut start, mut end) = (0usize, 0usize);

        loop {
            if start == end && remaining > 0 {
                let n = (remaining as usize).min(input.len());
                self.reader.read_exact_at(offset, &mut input[..n]).await?;
                offset += n as u64;
                remaining -= n as u64;
                (start, end) = (0, n);
            }

            let flush = if remaining == 0 {
                FlushDecompress::Finish
            } else {
                FlushDecompress::None
            };
            let in_before = inflater.total_in();
            let out_before = inflater.total_out();
            let status = inflater.decompress(&input[start..end], &mut output, flush)?;
            let consumed = (inflater.total_in() - in_before) as usize;
            let produced = (inflater.total_out() - out_before) as usize;
            start += consumed;

            // Never emit more than the directory promised.
            if inflater.total_out() > self.entry.uncompressed_size {
                return Err(ZipError::SizeMismatch {
                    name: self.entry.file_name.clone(),
                    expected: self.entry.uncompressed_size,
                    actual: inflater.total_out(),
                });
            }
            if produced > 0 {
                crc.update(&output[..produced]);
                sink.write_all(&output[..produced]).await?;
            }

            if status == Status::StreamEnd {
                return Ok(inflater.total_out());
            }
            if consumed == 0 && produced == 0 {
                return Err(ZipError::Invalid("deflate stream ended early"));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::io::LocalFileReader;
    use crate::test_helpers::{ZipSpec, write_zip};
    use crate::zip::{ZipError, ZipParser};
    use std::sync::Arc;

    async fn read_entry(path: &std::path::Path, index: usize) -> Result<Vec<u8>, ZipError> {
        let parser = ZipParser::new(Arc::new(LocalFileReader::open(path).unwrap()));
        let entries = parser.entries().await?;
        let stream = parser.open_entry(&entries[index]).await?;
        let mut out = Vec::new();
        stream.copy_to(&mut out).await?;
        Ok(out)
    }

    #[tokio::test]
    async fn streams_stored_and_deflated_entries() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mixed.zip");
        let big: Vec<u8> = (0..300_000u32).map(|i| (i % 251) as u8).collect();
        write_zip(
            &path,
            &[
                ZipSpec::stored("raw.bin", &big),
                ZipSpec::deflated("packed.bin", &big),
                ZipSpec::stored("empty.txt", b""),
            ],
        );

        assert_eq!(read_entry(&path, 0).await.unwrap(), big);
        assert_eq!(read_entry(&path, 1).await.unwrap(), big);
        assert!(read_entry(&path, 2).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn detects_corrupted_stored_data() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bitrot.zip");
        write_zip(&path, &[ZipSpec::stored("p0.jpg", b"page zero bytes")]);

        let mut bytes = std::fs::read(&path).unwrap();
        let at = bytes
            .windows(4)
            .position(|w| w == b"zero")
            .unwrap();
        bytes[at] = b'Z';
        std::fs::write(&path, bytes).unwrap();

        let err = read_entry(&path, 0).await.unwrap_err();
        assert!(matches!(err, ZipError::ChecksumMismatch { .. }), "{err}");
    }

    #[tokio::test]
    async fn reports_stream_length() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("len.zip");
        write_zip(&path, &[ZipSpec::deflated("p.png", &[7u8; 1000])]);

        let parser = ZipParser::new(Arc::new(LocalFileReader::open(&path).unwrap()));
        let entries = parser.entries().await.unwrap();
        let stream = parser.open_entry(&entries[0]).await.unwrap();
        assert_eq!(stream.len(), 1000);
        assert_eq!(stream.entry().file_name, "p.png");
    }
}
