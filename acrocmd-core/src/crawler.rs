//! File discovery for the check queue

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use regex::Regex;
use walkdir::WalkDir;

use crate::error::{CommanderError, Result};

/// Matches against the whole path the server's pattern was written for
/// when the capabilities call is unavailable.
pub const DEFAULT_REFERENCE_PATTERN: &str =
    r"\.(xml|xhtml|html|htm|md|markdown|txt|dita|ditamap|json|yaml|yml|properties|docx)$";

/// Regex deciding which files the checking service accepts
#[derive(Clone)]
pub struct ReferencePattern {
    regex: Regex,
}

impl ReferencePattern {
    pub fn new(pattern: &str) -> Result<Self> {
        let regex = Regex::new(pattern).map_err(|source| CommanderError::InvalidPattern {
            pattern: pattern.to_string(),
            source,
        })?;
        Ok(Self { regex })
    }

    pub fn as_str(&self) -> &str {
        self.regex.as_str()
    }

    pub fn matches(&self, path: &Path) -> bool {
        self.regex.is_match(&path.to_string_lossy())
    }
}

impl Default for ReferencePattern {
    fn default() -> Self {
        Self {
            regex: Regex::new(DEFAULT_REFERENCE_PATTERN).expect("default pattern is valid"),
        }
    }
}

impl fmt::Debug for ReferencePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ReferencePattern").field(&self.as_str()).finish()
    }
}

/// Discovers files to queue
///
/// Crawls run on a blocking thread; `found` is called once per file.
/// Long crawls must return early once `cancel` is set.
pub trait Crawler: Send {
    /// Path the crawl starts from
    fn root(&self) -> &Path;

    fn crawl(&mut self, cancel: &AtomicBool, found: &mut dyn FnMut(PathBuf)) -> Result<()>;
}

/// Yields exactly one file
#[derive(Debug, Clone)]
pub struct FileCrawler {
    path: PathBuf,
}

impl FileCrawler {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl Crawler for FileCrawler {
    fn root(&self) -> &Path {
        &self.path
    }

    fn crawl(&mut self, _cancel: &AtomicBool, found: &mut dyn FnMut(PathBuf)) -> Result<()> {
        if !self.path.is_file() {
            return Err(CommanderError::path_not_found(&self.path));
        }
        found(self.path.clone());
        Ok(())
    }
}

/// Walks a directory and yields files matching the reference pattern
#[derive(Debug, Clone)]
pub struct DirectoryCrawler {
    root: PathBuf,
    recursive: bool,
    pattern: Option<ReferencePattern>,
}

impl DirectoryCrawler {
    pub fn new(root: impl Into<PathBuf>, recursive: bool) -> Self {
        Self {
            root: root.into(),
            recursive,
            pattern: None,
        }
    }

    pub fn with_pattern(mut self, pattern: ReferencePattern) -> Self {
        self.pattern = Some(pattern);
        self
    }
}

fn is_hidden(entry: &walkdir::DirEntry) -> bool {
    entry.depth() > 0
        && entry
            .file_name()
            .to_str()
            .map(|name| name.starts_with('.'))
            .unwrap_or(false)
}

impl Crawler for DirectoryCrawler {
    fn root(&self) -> &Path {
        &self.root
    }

    fn crawl(&mut self, cancel: &AtomicBool, found: &mut dyn FnMut(PathBuf)) -> Result<()> {
        if !self.root.is_dir() {
            return Err(CommanderError::path_not_found(&self.root));
        }

        let max_depth = if self.recursive { usize::MAX } else { 1 };
        let walker = WalkDir::new(&self.root)
            .max_depth(max_depth)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| !is_hidden(entry));

        let mut count = 0;
        for entry in walker {
            if cancel.load(Ordering::Relaxed) {
                tracing::debug!(root = %self.root.display(), files = count, "crawl cancelled");
                return Ok(());
            }
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    // Unreadable subdirectories are skipped, not fatal
                    tracing::debug!(error = %err, "skipping unreadable entry");
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }
            if let Some(pattern) = &self.pattern {
                if !pattern.matches(entry.path()) {
                    continue;
                }
            }

            found(entry.into_path());
            count += 1;
        }

        tracing::debug!(root = %self.root.display(), files = count, "crawl finished");
        Ok(())
    }
}
