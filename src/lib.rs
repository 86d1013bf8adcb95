pub mod dedup;
pub mod error;
pub mod hasher;
pub mod index;
pub mod logging;
pub mod scanner;
pub mod session;
pub mod utils;

use std::path::{Path, PathBuf};

use serde::{Serialize, Serializer};

pub use dedup::{analyse, resolve, Analysis, DuplicateGroup, JunkFile, MostFrequent};
pub use error::{DupError, Result};
pub use hasher::{fingerprint, ChunkReader, Fingerprint, DEFAULT_CHUNK_SIZE, HASH_CHUNK_SIZE};
pub use index::{Bucket, HashIndex, SizeIndex};
pub use scanner::{Scanner, SearchConfig, SearchMode};
pub use session::{DuplicateFinder, Enumerated, HashIndexed, Resolved, SizeIndexed, SkippedFile};

/// A file discovered during enumeration.
///
/// The size is captured once and never changes; a new scan produces new
/// records. The fingerprint is only present after the hash stage ran.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileRecord {
    path: PathBuf,
    size: u64,
    ordinal: usize,
    #[serde(serialize_with = "serialize_fingerprint")]
    fingerprint: Option<Fingerprint>,
}

impl FileRecord {
    /// `ordinal` is the record's position in discovery order and decides
    /// which member of a duplicate group is kept.
    pub fn new(path: impl Into<PathBuf>, size: u64, ordinal: usize) -> Self {
        Self {
            path: path.into(),
            size,
            ordinal,
            fingerprint: None,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn ordinal(&self) -> usize {
        self.ordinal
    }

    pub fn fingerprint(&self) -> Option<&Fingerprint> {
        self.fingerprint.as_ref()
    }

    pub(crate) fn with_fingerprint(mut self, fingerprint: Fingerprint) -> Self {
        self.fingerprint = Some(fingerprint);
        self
    }
}

fn serialize_fingerprint<S>(fingerprint: &Option<Fingerprint>, serializer: S) -> std::result::Result<S::Ok, S::Error>
where
    S: Serializer,
{
    fingerprint
        .as_ref()
        .map(|hash| hash.to_hex().to_string())
        .serialize(serializer)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_record_has_no_fingerprint() {
        let record = FileRecord::new("a.txt", 5, 0);
        assert_eq!(record.path(), Path::new("a.txt"));
        assert_eq!(record.size(), 5);
        assert!(record.fingerprint().is_none());
    }

    #[test]
    fn test_with_fingerprint_keeps_size_and_ordinal() {
        let hash = fingerprint(b"hello", 5);
        let record = FileRecord::new("a.txt", 5, 3).with_fingerprint(hash);
        assert_eq!(record.fingerprint(), Some(&hash));
        assert_eq!(record.size(), 5);
        assert_eq!(record.ordinal(), 3);
    }

    #[test]
    fn test_record_serializes_fingerprint_as_hex() {
        let hash = fingerprint(b"hello", 5);
        let record = FileRecord::new("a.txt", 5, 0).with_fingerprint(hash);
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["size"], 5);
        assert_eq!(json["fingerprint"], hash.to_hex().to_string());

        let bare = serde_json::to_value(FileRecord::new("b.txt", 1, 1)).unwrap();
        assert!(bare["fingerprint"].is_null());
    }
}
