use super::ReadAt;
use async_trait::async_trait;
use std::fs::File;
use std::io;
use std::path::Path;
use std::sync::Arc;

/// Local file reader with random access support.
///
/// Every instance owns its own file handle and reads run on tokio's
/// blocking pool, so a slow disk never stalls the worker threads that
/// drive connections. On unix and windows positional reads never touch a
/// shared cursor, so one reader can serve concurrent reads and two readers
/// on the same file never interfere.
pub struct LocalFileReader {
    file: Arc<File>,
    size: u64,
}

impl LocalFileReader {
    pub fn open(path: &Path) -> io::Result<Self> {
        let file = File::open(path)?;
        let size = file.metadata()?.len();
        Ok(Self {
            file: Arc::new(file),
            size,
        })
    }
}

#[async_trait]
impl ReadAt for LocalFileReader {
    async fn read_at(&self, offset: u64, buf: &mut [u8]) -> io::Result<usize> {
        if offset >= self.size || buf.is_empty() {
            return Ok(0);
        }

        let file = Arc::clone(&self.file);
        let len = buf.len();
        let (data, n) = tokio::task::spawn_blocking(move || {
            let mut data = vec![0u8; len];
            let n = pread(&file, &mut data, offset)?;
            Ok::<_, io::Error>((data, n))
        })
        .await
        .map_err(io::Error::other)??;

        buf[..n].copy_from_slice(&data[..n]);
        Ok(n)
    }

    fn size(&self) -> u64 {
        self.size
    }
}

fn pread(file: &File, buf: &mut [u8], offset: u64) -> io::Result<usize> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::FileExt;
        file.read_at(buf, offset)
    }

    #[cfg(windows)]
    {
        use std::os::windows::fs::FileExt;
        file.seek_read(buf, offset)
    }

    #[cfg(not(any(unix, windows)))]
    {
        // Shares the handle's cursor: reads through one reader must not overlap.
        use std::io::{Read, Seek, SeekFrom};
        let mut file = file;
        file.seek(SeekFrom::Start(offset))?;
        file.read(buf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn sample_file(contents: &[u8]) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(contents).unwrap();
        file.flush().unwrap();
        file
    }

    #[tokio::test]
    async fn reads_at_offset() {
        let file = sample_file(b"0123456789");
        let reader = LocalFileReader::open(file.path()).unwrap();
        assert_eq!(reader.size(), 10);

        let mut buf = [0u8; 4];
        reader.read_exact_at(3, &mut buf).await.unwrap();
        assert_eq!(&buf, b"3456");
    }

    #[tokio::test]
    async fn read_past_end_returns_zero() {
        let file = sample_file(b"abc");
        let reader = LocalFileReader::open(file.path()).unwrap();

        let mut buf = [0u8; 4];
        assert_eq!(reader.read_at(3, &mut buf).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn read_exact_reports_truncation() {
        let file = sample_file(b"abc");
        let reader = LocalFileReader::open(file.path()).unwrap();

        let mut buf = [0u8; 4];
        let err = reader.read_exact_at(1, &mut buf).await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_reads_share_one_reader() {
        let contents: Vec<u8> = (0..=255u8).cycle().take(64 * 1024).collect();
        let file = sample_file(&contents);
        let reader = Arc::new(LocalFileReader::open(file.path()).unwrap());

        let mut tasks = tokio::task::JoinSet::new();
        for i in 0..32u64 {
            let reader = Arc::clone(&reader);
            tasks.spawn(async move {
                let offset = i * 1024 + i;
                let mut buf = vec![0u8; 512];
                reader.read_exact_at(offset, &mut buf).await.unwrap();
                (offset, buf)
            });
        }

        while let Some(joined) = tasks.join_next().await {
            let (offset, buf) = joined.unwrap();
            let start = offset as usize;
            assert_eq!(buf, &contents[start..start + 512], "offset {offset}");
        }
    }

    #[test]
    fn open_missing_file_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let err = LocalFileReader::open(&dir.path().join("nope.zip"))
            .err()
            .unwrap();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }
}
