//! Chunk reading and keyed fingerprints.

use std::fs;
use std::io::Read;

use crate::error::{DupError, Result};
use crate::FileRecord;

/// Default number of leading bytes read from each file.
pub const DEFAULT_CHUNK_SIZE: usize = 400;

/// Leading bytes fingerprinted per file by a search unless configured otherwise.
pub const HASH_CHUNK_SIZE: usize = 1024;

/// 32-byte keyed BLAKE3 digest, compared by exact equality.
pub type Fingerprint = blake3::Hash;

/// Reads a bounded prefix of a file without loading the whole file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkReader {
    max_bytes: usize,
}

impl ChunkReader {
    /// A `max_bytes` of zero reads the whole file.
    pub fn new(max_bytes: usize) -> Self {
        Self { max_bytes }
    }

    pub fn whole_file() -> Self {
        Self::new(0)
    }

    pub fn max_bytes(&self) -> usize {
        self.max_bytes
    }

    /// Read up to `max_bytes` from the start of the record's file.
    ///
    /// Shorter files yield fewer bytes and zero-byte files an empty chunk.
    pub fn read(&self, record: &FileRecord) -> Result<Vec<u8>> {
        let path = record.path();
        let file = fs::File::open(path).map_err(|e| DupError::io(path, e))?;

        let mut chunk = Vec::with_capacity(self.max_bytes.min(record.size() as usize));
        let read = if self.max_bytes == 0 {
            let mut file = file;
            file.read_to_end(&mut chunk)
        } else {
            file.take(self.max_bytes as u64).read_to_end(&mut chunk)
        };
        read.map_err(|e| DupError::io(path, e))?;

        Ok(chunk)
    }
}

impl Default for ChunkReader {
    fn default() -> Self {
        Self::new(DEFAULT_CHUNK_SIZE)
    }
}

/// Keyed BLAKE3 of `chunk`, keyed by the file size.
///
/// The size key only shapes collisions so that equal prefixes of files with
/// different lengths never produce the same digest. It is not a secret.
pub fn fingerprint(chunk: &[u8], key: u64) -> Fingerprint {
    let mut hash_key = [0u8; blake3::KEY_LEN];
    hash_key[..8].copy_from_slice(&key.to_le_bytes());
    blake3::keyed_hash(&hash_key, chunk)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Write;
    use tempfile::tempdir;

    fn record_with(dir: &std::path::Path, name: &str, content: &[u8]) -> FileRecord {
        let path = dir.join(name);
        File::create(&path).unwrap().write_all(content).unwrap();
        FileRecord::new(path, content.len() as u64, 0)
    }

    #[test]
    fn test_read_returns_bounded_prefix() {
        let dir = tempdir().unwrap();
        let record = record_with(dir.path(), "big.bin", &[7u8; 1000]);

        let chunk = ChunkReader::default().read(&record).unwrap();
        assert_eq!(chunk.len(), DEFAULT_CHUNK_SIZE);
        assert!(chunk.iter().all(|&b| b == 7));
    }

    #[test]
    fn test_read_short_and_empty_files() {
        let dir = tempdir().unwrap();
        let short = record_with(dir.path(), "short.txt", b"hello");
        let empty = record_with(dir.path(), "empty.txt", b"");

        let reader = ChunkReader::default();
        assert_eq!(reader.read(&short).unwrap(), b"hello");
        assert!(reader.read(&empty).unwrap().is_empty());
    }

    #[test]
    fn test_whole_file_reader() {
        let dir = tempdir().unwrap();
        let record = record_with(dir.path(), "big.bin", &[1u8; 5000]);

        let chunk = ChunkReader::whole_file().read(&record).unwrap();
        assert_eq!(chunk.len(), 5000);
    }

    #[test]
    fn test_read_missing_file_is_io_error() {
        let dir = tempdir().unwrap();
        let record = FileRecord::new(dir.path().join("nope"), 10, 0);

        match ChunkReader::default().read(&record) {
            Err(DupError::Io { path, .. }) => assert_eq!(path, record.path()),
            other => panic!("expected Io error, got {:?}", other),
        }
    }

    #[test]
    fn test_fingerprint_is_deterministic() {
        assert_eq!(fingerprint(b"hello", 5), fingerprint(b"hello", 5));
        assert_ne!(fingerprint(b"hello", 5), fingerprint(b"world", 5));
    }

    #[test]
    fn test_fingerprint_key_separates_sizes() {
        // same chunk, different file length
        assert_ne!(fingerprint(&[0u8; 400], 400), fingerprint(&[0u8; 400], 800));
    }
}
