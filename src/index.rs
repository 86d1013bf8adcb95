//! Ordered size and fingerprint indexes.
//!
//! Buckets keep the order in which their keys were first seen and records keep
//! their insertion order inside a bucket, so iterating an index is
//! deterministic for a given enumeration order.

use std::collections::HashMap;
use std::hash::Hash;

use crate::hasher::Fingerprint;
use crate::FileRecord;

/// Records sharing one index key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bucket<K> {
    key: K,
    files: Vec<FileRecord>,
}

impl<K: Copy> Bucket<K> {
    pub fn key(&self) -> K {
        self.key
    }

    pub fn files(&self) -> &[FileRecord] {
        &self.files
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Only buckets with two or more members can hold duplicates.
    pub fn has_duplicates(&self) -> bool {
        self.files.len() > 1
    }
}

/// Insertion-ordered multimap from a key to the records sharing it.
#[derive(Debug, Clone)]
pub struct OrderedIndex<K> {
    slots: HashMap<K, usize>,
    buckets: Vec<Bucket<K>>,
}

/// Files grouped by byte size.
pub type SizeIndex = OrderedIndex<u64>;

/// Files grouped by fingerprint.
pub type HashIndex = OrderedIndex<Fingerprint>;

impl<K: Copy + Eq + Hash> OrderedIndex<K> {
    pub fn new() -> Self {
        Self {
            slots: HashMap::new(),
            buckets: Vec::new(),
        }
    }

    fn push(&mut self, key: K, record: FileRecord) {
        let slot = *self.slots.entry(key).or_insert_with(|| {
            self.buckets.push(Bucket {
                key,
                files: Vec::new(),
            });
            self.buckets.len() - 1
        });
        self.buckets[slot].files.push(record);
    }

    pub fn get(&self, key: &K) -> Option<&Bucket<K>> {
        self.slots.get(key).map(|&slot| &self.buckets[slot])
    }

    /// Buckets in first-seen key order.
    pub fn buckets(&self) -> &[Bucket<K>] {
        &self.buckets
    }

    /// Buckets holding two or more records.
    pub fn candidates(&self) -> impl Iterator<Item = &Bucket<K>> + '_ {
        self.buckets.iter().filter(|bucket| bucket.has_duplicates())
    }

    /// Number of buckets.
    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    /// Number of records over all buckets.
    pub fn record_count(&self) -> usize {
        self.buckets.iter().map(Bucket::len).sum()
    }
}

impl<K: Copy + Eq + Hash> Default for OrderedIndex<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl SizeIndex {
    /// Bucket every record by its size. No path deduplication happens here.
    pub fn build(records: impl IntoIterator<Item = FileRecord>) -> Self {
        let mut index = Self::new();
        for record in records {
            index.add(record);
        }
        index
    }

    pub fn add(&mut self, record: FileRecord) {
        let size = record.size();
        self.push(size, record);
    }

    /// Sum of the sizes of every indexed record.
    pub fn total_bytes(&self) -> u64 {
        self.buckets
            .iter()
            .map(|bucket| bucket.key * bucket.files.len() as u64)
            .sum()
    }
}

impl HashIndex {
    /// Insert a record under its freshly computed fingerprint.
    pub fn add(&mut self, fingerprint: Fingerprint, record: FileRecord) {
        self.push(fingerprint, record.with_fingerprint(fingerprint));
    }
}
