//! A search session as a chain of stage values.
//!
//! `Enumerated -> SizeIndexed -> [HashIndexed] -> Resolved`, each stage consumed
//! by value to produce the next. A stage can only be reached once its
//! predecessor completed, so ordering is enforced by the types.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use indicatif::{ProgressBar, ProgressStyle};
use log::{debug, info, warn};
use rayon::prelude::*;
use serde::Serialize;

use crate::dedup::{self, Analysis, DuplicateGroup, JunkFile};
use crate::error::{DupError, Result};
use crate::hasher::{fingerprint, ChunkReader, Fingerprint};
use crate::index::{HashIndex, SizeIndex};
use crate::scanner::{Scanner, SearchConfig, SearchMode};
use crate::FileRecord;

/// A file left out of the hash index because it could not be read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedFile {
    pub path: PathBuf,
    pub reason: String,
}

/// Files listed by enumeration, in discovery order.
#[derive(Debug, Clone)]
pub struct Enumerated {
    config: SearchConfig,
    files: Vec<FileRecord>,
}

impl Enumerated {
    /// Validate the configuration and enumerate its root.
    pub fn scan(config: SearchConfig) -> Result<Self> {
        let files = Scanner::new(config.clone()).collect_files()?;
        Ok(Self { config, files })
    }

    /// Start from records supplied by another enumerator.
    pub fn from_records(config: SearchConfig, files: Vec<FileRecord>) -> Self {
        Self { config, files }
    }

    pub fn files(&self) -> &[FileRecord] {
        &self.files
    }

    pub fn index_sizes(self) -> SizeIndexed {
        let file_count = self.files.len();
        let size_index = SizeIndex::build(self.files);
        debug!(
            "Size index: {} files in {} buckets, {} buckets with collisions",
            file_count,
            size_index.len(),
            size_index.candidates().count()
        );
        SizeIndexed {
            config: self.config,
            size_index,
        }
    }
}

/// Every enumerated file bucketed by size.
#[derive(Debug, Clone)]
pub struct SizeIndexed {
    config: SearchConfig,
    size_index: SizeIndex,
}

impl SizeIndexed {
    pub fn size_index(&self) -> &SizeIndex {
        &self.size_index
    }

    /// Fingerprint the files selected by the configured mode and bucket them.
    ///
    /// `SizeOnly` is treated like `HashCandidates` here; callers that want
    /// size-only grouping use [`SizeIndexed::resolve_by_size`]. Unreadable files
    /// end up in the skip list. A raised `cancel` flag is checked before each
    /// read and aborts with [`DupError::Cancelled`].
    pub fn index_hashes(self, cancel: Option<&AtomicBool>) -> Result<HashIndexed> {
        let reader = ChunkReader::new(self.config.chunk_size);
        let hash_all = self.config.mode() == SearchMode::HashAll;

        let candidates: Vec<&FileRecord> = self
            .size_index
            .buckets()
            .iter()
            .filter(|bucket| hash_all || bucket.has_duplicates())
            .flat_map(|bucket| bucket.files())
            .collect();

        debug!(
            "Fingerprinting {} files ({} bytes per file)",
            candidates.len(),
            if reader.max_bytes() == 0 {
                "all".to_string()
            } else {
                reader.max_bytes().to_string()
            }
        );

        let progress = hash_progress(candidates.len() as u64, self.config.show_progress);

        // collect keeps candidate order, so bucket order stays deterministic
        let outcomes: Vec<Result<Fingerprint>> = candidates
            .par_iter()
            .map(|record| {
                if cancel.is_some_and(|flag| flag.load(Ordering::SeqCst)) {
                    return Err(DupError::Cancelled);
                }
                let outcome = reader
                    .read(record)
                    .map(|chunk| fingerprint(&chunk, record.size()));
                progress.inc(1);
                outcome
            })
            .collect();

        progress.finish_and_clear();

        let mut hash_index = HashIndex::new();
        let mut skipped = Vec::new();
        for (record, outcome) in candidates.into_iter().zip(outcomes) {
            match outcome {
                Ok(hash) => hash_index.add(hash, record.clone()),
                Err(DupError::Cancelled) => return Err(DupError::Cancelled),
                Err(err) => {
                    warn!("Skipping {}", err);
                    skipped.push(SkippedFile {
                        path: record.path().to_path_buf(),
                        reason: err.to_string(),
                    });
                }
            }
        }

        debug!(
            "Hash index: {} files in {} buckets, {} skipped",
            hash_index.record_count(),
            hash_index.len(),
            skipped.len()
        );

        Ok(HashIndexed {
            config: self.config,
            size_index: self.size_index,
            hash_index,
            skipped,
        })
    }

    /// Resolve straight from size buckets.
    ///
    /// Best effort only: distinct files that share a size are reported as
    /// duplicates.
    pub fn resolve_by_size(self) -> Resolved {
        let groups = dedup::resolve(self.size_index.buckets());
        Resolved {
            mode: SearchMode::SizeOnly,
            size_index: self.size_index,
            hash_index: None,
            groups,
            skipped: Vec::new(),
        }
    }

    /// Run the remaining stages the configured mode calls for.
    pub fn resolve(self, cancel: Option<&AtomicBool>) -> Result<Resolved> {
        match self.config.mode() {
            SearchMode::SizeOnly => Ok(self.resolve_by_size()),
            SearchMode::HashCandidates | SearchMode::HashAll => {
                Ok(self.index_hashes(cancel)?.resolve())
            }
        }
    }
}

fn hash_progress(len: u64, visible: bool) -> ProgressBar {
    if !visible {
        return ProgressBar::hidden();
    }

    let progress = ProgressBar::new(len);
    progress.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("##-"),
    );
    progress
}

/// Size buckets plus fingerprint buckets for the hashed files.
#[derive(Debug, Clone)]
pub struct HashIndexed {
    config: SearchConfig,
    size_index: SizeIndex,
    hash_index: HashIndex,
    skipped: Vec<SkippedFile>,
}

impl HashIndexed {
    pub fn size_index(&self) -> &SizeIndex {
        &self.size_index
    }

    pub fn hash_index(&self) -> &HashIndex {
        &self.hash_index
    }

    pub fn skipped(&self) -> &[SkippedFile] {
        &self.skipped
    }

    pub fn resolve(self) -> Resolved {
        let groups = dedup::resolve(self.hash_index.buckets());
        let mode = match self.config.mode() {
            SearchMode::HashAll => SearchMode::HashAll,
            _ => SearchMode::HashCandidates,
        };
        Resolved {
            mode,
            size_index: self.size_index,
            hash_index: Some(self.hash_index),
            groups,
            skipped: self.skipped,
        }
    }
}

/// Final state of a search: duplicate groups and everything that led to them.
#[derive(Debug, Clone)]
pub struct Resolved {
    mode: SearchMode,
    size_index: SizeIndex,
    hash_index: Option<HashIndex>,
    groups: Vec<DuplicateGroup>,
    skipped: Vec<SkippedFile>,
}

impl Resolved {
    pub fn mode(&self) -> SearchMode {
        self.mode
    }

    pub fn size_index(&self) -> &SizeIndex {
        &self.size_index
    }

    /// `None` for size-only searches.
    pub fn hash_index(&self) -> Option<&HashIndex> {
        self.hash_index.as_ref()
    }

    pub fn groups(&self) -> &[DuplicateGroup] {
        &self.groups
    }

    pub fn junk_files(&self) -> Vec<JunkFile> {
        dedup::junk_files(&self.groups)
    }

    pub fn skipped(&self) -> &[SkippedFile] {
        &self.skipped
    }

    /// Number of enumerated files.
    pub fn file_count(&self) -> usize {
        self.size_index.record_count()
    }

    pub fn analyse(&self) -> Analysis {
        dedup::analyse(&self.groups)
    }
}

/// Run a full search for `config`.
pub fn search(config: SearchConfig, cancel: Option<&AtomicBool>) -> Result<Resolved> {
    let resolved = Enumerated::scan(config)?.index_sizes().resolve(cancel)?;
    info!(
        "Scanned {} files: {} duplicate groups, {} skipped",
        resolved.file_count(),
        resolved.groups().len(),
        resolved.skipped().len()
    );
    Ok(resolved)
}

/// Re-runnable search over one configuration.
///
/// Each [`DuplicateFinder::search`] starts over from enumeration and replaces
/// the previous result.
#[derive(Debug)]
pub struct DuplicateFinder {
    config: SearchConfig,
    cancel_flag: Option<Arc<AtomicBool>>,
    last: Option<Resolved>,
}

impl DuplicateFinder {
    pub fn new(config: SearchConfig) -> Self {
        Self {
            config,
            cancel_flag: None,
            last: None,
        }
    }

    pub fn with_cancel_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel_flag = Some(flag);
        self
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    pub fn search(&mut self) -> Result<&Resolved> {
        self.last = None;
        let resolved = search(self.config.clone(), self.cancel_flag.as_deref())?;
        Ok(&*self.last.insert(resolved))
    }

    /// Result of the last successful search.
    pub fn resolved(&self) -> Result<&Resolved> {
        self.last
            .as_ref()
            .ok_or_else(|| DupError::State("no search has been run".to_string()))
    }

    pub fn junk_files(&self) -> Result<Vec<JunkFile>> {
        Ok(self.resolved()?.junk_files())
    }

    pub fn analysis(&self) -> Result<Analysis> {
        Ok(self.resolved()?.analyse())
    }
}
