use std::collections::HashSet;
use std::path::{Path, PathBuf};

use log::{debug, warn};
use walkdir::WalkDir;

use crate::error::{DupError, Result};
use crate::hasher::HASH_CHUNK_SIZE;
use crate::FileRecord;

/// How a search groups files once they are indexed by size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchMode {
    /// Group by size only. Fast, but distinct files of equal size are reported
    /// as duplicates.
    SizeOnly,
    /// Fingerprint only the members of size buckets with two or more files.
    HashCandidates,
    /// Fingerprint every enumerated file.
    HashAll,
}

/// Configuration for a duplicate search
#[derive(Debug, Clone)]
pub struct SearchConfig {
    pub path: PathBuf,
    pub recurse: bool,
    pub use_hash: bool,
    pub from_size: bool,
    /// Leading bytes fingerprinted per file, 0 reads whole files.
    pub chunk_size: usize,
    pub min_size: u64,
    pub max_size: Option<u64>,
    pub include_extensions: HashSet<String>,
    pub exclude_extensions: HashSet<String>,
    pub show_progress: bool,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("."),
            recurse: false,
            use_hash: true,
            from_size: true,
            chunk_size: HASH_CHUNK_SIZE,
            min_size: 0,
            max_size: None,
            include_extensions: HashSet::new(),
            exclude_extensions: HashSet::new(),
            show_progress: false,
        }
    }
}

impl SearchConfig {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            ..Self::default()
        }
    }

    pub fn recurse(mut self, recurse: bool) -> Self {
        self.recurse = recurse;
        self
    }

    pub fn use_hash(mut self, use_hash: bool) -> Self {
        self.use_hash = use_hash;
        self
    }

    pub fn from_size(mut self, from_size: bool) -> Self {
        self.from_size = from_size;
        self
    }

    pub fn chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    pub fn min_size(mut self, size: u64) -> Self {
        self.min_size = size;
        self
    }

    pub fn max_size(mut self, size: u64) -> Self {
        self.max_size = Some(size);
        self
    }

    pub fn include_extensions(mut self, extensions: Vec<String>) -> Self {
        self.include_extensions = extensions.into_iter()
            .map(|ext| ext.to_lowercase())
            .collect();
        self
    }

    pub fn exclude_extensions(mut self, extensions: Vec<String>) -> Self {
        self.exclude_extensions = extensions.into_iter()
            .map(|ext| ext.to_lowercase())
            .collect();
        self
    }

    pub fn show_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    pub fn mode(&self) -> SearchMode {
        match (self.use_hash, self.from_size) {
            (false, _) => SearchMode::SizeOnly,
            (true, true) => SearchMode::HashCandidates,
            (true, false) => SearchMode::HashAll,
        }
    }

    /// The root must exist and be a directory.
    pub fn validate(&self) -> Result<()> {
        if !self.path.exists() {
            return Err(DupError::Config(format!(
                "path {} does not exist",
                self.path.display()
            )));
        }

        if !self.path.is_dir() {
            return Err(DupError::Config(format!(
                "path {} is not a directory",
                self.path.display()
            )));
        }

        Ok(())
    }
}

/// Lists the files under the search root.
pub struct Scanner {
    config: SearchConfig,
}

impl Scanner {
    pub fn new(config: SearchConfig) -> Self {
        Self { config }
    }

    /// Enumerate regular files under the root, in file-name order per
    /// directory, numbering them in discovery order.
    ///
    /// Only the root's immediate children are listed unless `recurse` is set.
    /// Symlinks are never listed or followed.
    pub fn collect_files(&self) -> Result<Vec<FileRecord>> {
        self.config.validate()?;

        let mut walker = WalkDir::new(&self.config.path)
            .min_depth(1)
            .follow_links(false)
            .sort_by_file_name();
        if !self.config.recurse {
            walker = walker.max_depth(1);
        }

        let mut files = Vec::new();
        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    warn!("Skipping unreadable entry: {}", err);
                    continue;
                }
            };
            if entry.path_is_symlink() {
                // a link and its target would otherwise report as duplicates
                debug!("Not following symlink {}", entry.path().display());
                continue;
            }
            if !entry.file_type().is_file() {
                continue;
            }

            let size = match entry.metadata() {
                Ok(metadata) => metadata.len(),
                Err(err) => {
                    warn!("Failed to get metadata for {}: {}", entry.path().display(), err);
                    continue;
                }
            };

            if self.should_include_file(entry.path(), size) {
                let ordinal = files.len();
                files.push(FileRecord::new(entry.into_path(), size, ordinal));
            }
        }

        debug!(
            "{} files found matching criteria under {}",
            files.len(),
            self.config.path.display()
        );

        Ok(files)
    }

    /// Check if a file should be included based on filters
    fn should_include_file(&self, path: &Path, size: u64) -> bool {
        if size < self.config.min_size {
            return false;
        }

        if let Some(max_size) = self.config.max_size {
            if size > max_size {
                return false;
            }
        }

        match path.extension() {
            Some(ext) => {
                let ext = ext.to_string_lossy().to_lowercase();

                if !self.config.include_extensions.is_empty()
                    && !self.config.include_extensions.contains(&ext)
                {
                    return false;
                }

                !self.config.exclude_extensions.contains(&ext)
            }
            // No extension, but include list is specified
            None => self.config.include_extensions.is_empty(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::{self, File};
    use std::io::Write;
    use tempfile::tempdir;

    fn write(path: &Path, content: &[u8]) {
        File::create(path).unwrap().write_all(content).unwrap();
    }

    #[test]
    fn test_defaults() {
        let config = SearchConfig::default();
        assert_eq!(config.path, PathBuf::from("."));
        assert!(!config.recurse);
        assert!(config.use_hash);
        assert!(config.from_size);
        assert_eq!(config.chunk_size, HASH_CHUNK_SIZE);
        assert_eq!(config.mode(), SearchMode::HashCandidates);
    }

    #[test]
    fn test_mode_selection() {
        assert_eq!(SearchConfig::default().use_hash(false).mode(), SearchMode::SizeOnly);
        assert_eq!(SearchConfig::default().use_hash(false).from_size(false).mode(), SearchMode::SizeOnly);
        assert_eq!(SearchConfig::default().from_size(false).mode(), SearchMode::HashAll);
    }

    #[test]
    fn test_validate_rejects_missing_and_file_paths() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("plain.txt");
        write(&file, b"x");

        assert!(SearchConfig::new(dir.path()).validate().is_ok());
        assert!(matches!(
            SearchConfig::new(dir.path().join("missing")).validate(),
            Err(DupError::Config(_))
        ));
        assert!(matches!(SearchConfig::new(&file).validate(), Err(DupError::Config(_))));
    }

    #[test]
    fn test_collect_non_recursive_ignores_subdirectories() {
        let dir = tempdir().unwrap();
        write(&dir.path().join("b.txt"), b"bb");
        write(&dir.path().join("a.txt"), b"a");
        fs::create_dir(dir.path().join("sub")).unwrap();
        write(&dir.path().join("sub").join("c.txt"), b"ccc");

        let files = Scanner::new(SearchConfig::new(dir.path())).collect_files().unwrap();
        let names: Vec<_> = files.iter().map(|f| f.path().file_name().unwrap().to_string_lossy().into_owned()).collect();
        assert_eq!(names, vec!["a.txt", "b.txt"]);
        assert_eq!(files[0].size(), 1);
        assert_eq!(files[1].ordinal(), 1);
    }

    #[test]
    fn test_collect_recursive() {
        let dir = tempdir().unwrap();
        write(&dir.path().join("a.txt"), b"a");
        fs::create_dir(dir.path().join("sub")).unwrap();
        write(&dir.path().join("sub").join("c.txt"), b"ccc");

        let config = SearchConfig::new(dir.path()).recurse(true);
        let files = Scanner::new(config).collect_files().unwrap();
        assert_eq!(files.len(), 2);
        assert!(files.iter().any(|f| f.path().ends_with("sub/c.txt")));
    }

    #[test]
    fn test_size_and_extension_filters() {
        let dir = tempdir().unwrap();
        write(&dir.path().join("empty.txt"), b"");
        write(&dir.path().join("keep.txt"), b"data");
        write(&dir.path().join("skip.log"), b"data");
        write(&dir.path().join("noext"), b"data");

        let config = SearchConfig::new(dir.path())
            .min_size(1)
            .exclude_extensions(vec!["LOG".to_string()]);
        let files = Scanner::new(config).collect_files().unwrap();
        let names: Vec<_> = files.iter().map(|f| f.path().file_name().unwrap().to_string_lossy().into_owned()).collect();
        assert_eq!(names, vec!["keep.txt", "noext"]);

        let config = SearchConfig::new(dir.path()).include_extensions(vec!["txt".to_string()]);
        let files = Scanner::new(config).collect_files().unwrap();
        assert_eq!(files.len(), 2);
    }
}
