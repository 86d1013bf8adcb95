//! Duplicate resolution and analysis.
//!
//! Resolution never touches the file system: it only decides, per bucket,
//! which copy is kept and which copies are junk.

use std::path::PathBuf;

use serde::Serialize;

use crate::index::Bucket;
use crate::FileRecord;

/// A bucket with two or more members, split into the kept copy and the rest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DuplicateGroup {
    keeper: FileRecord,
    junk: Vec<FileRecord>,
}

impl DuplicateGroup {
    pub fn keeper(&self) -> &FileRecord {
        &self.keeper
    }

    pub fn junk(&self) -> &[FileRecord] {
        &self.junk
    }

    /// Keeper plus junk.
    pub fn member_count(&self) -> usize {
        self.junk.len() + 1
    }

    /// Bytes freed if every junk copy were removed.
    pub fn reclaimable_bytes(&self) -> u64 {
        self.junk.iter().map(FileRecord::size).sum()
    }
}

/// A deletion candidate and the copy it duplicates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JunkFile {
    pub record: FileRecord,
    pub keeper: PathBuf,
    /// Position of the owning group in resolution order.
    pub group: usize,
}

/// Split every multi-member bucket into keeper and junk.
///
/// Members are ordered by discovery ordinal (stable) and the first one is the
/// keeper. Single-member buckets contribute nothing. Groups come out in bucket
/// iteration order.
pub fn resolve<'a, K>(buckets: impl IntoIterator<Item = &'a Bucket<K>>) -> Vec<DuplicateGroup>
where
    K: Copy + 'a,
{
    buckets
        .into_iter()
        .filter(|bucket| bucket.has_duplicates())
        .filter_map(|bucket| {
            let mut members = bucket.files().to_vec();
            members.sort_by_key(FileRecord::ordinal);

            let mut members = members.into_iter();
            let keeper = members.next()?;
            Some(DuplicateGroup {
                keeper,
                junk: members.collect(),
            })
        })
        .collect()
}

/// Flatten groups into the ordered list of deletion candidates.
pub fn junk_files(groups: &[DuplicateGroup]) -> Vec<JunkFile> {
    groups
        .iter()
        .enumerate()
        .flat_map(|(group, dupes)| {
            dupes.junk.iter().map(move |record| JunkFile {
                record: record.clone(),
                keeper: dupes.keeper.path().to_path_buf(),
                group,
            })
        })
        .collect()
}

/// The keeper of the largest duplicate group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MostFrequent {
    pub keeper: FileRecord,
    /// Keeper plus junk.
    pub group_len: usize,
}

/// Aggregate statistics over resolved duplicate groups.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct Analysis {
    /// Number of junk files over all groups.
    pub total_duplicate_count: usize,
    /// Sum of junk file sizes in bytes.
    pub total_size: u64,
    /// `None` when nothing was duplicated.
    pub most_frequent: Option<MostFrequent>,
}

/// Analyse resolved groups. No groups yields an all-zero analysis.
pub fn analyse(groups: &[DuplicateGroup]) -> Analysis {
    let mut analysis = Analysis::default();

    for group in groups {
        analysis.total_duplicate_count += group.junk.len();
        analysis.total_size += group.reclaimable_bytes();

        // strictly greater: ties keep the earlier group
        let larger = analysis
            .most_frequent
            .as_ref()
            .map_or(true, |current| group.member_count() > current.group_len);
        if larger {
            analysis.most_frequent = Some(MostFrequent {
                keeper: group.keeper.clone(),
                group_len: group.member_count(),
            });
        }
    }

    analysis
}
