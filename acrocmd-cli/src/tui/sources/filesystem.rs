//! Filesystem source for the left pane

use std::path::{Path, PathBuf};

use acrocmd_core::WindowedList;
use anyhow::{Context, Result};

/// What a browser row points at
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    Parent,
    Directory,
    File,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrowserEntry {
    pub name: String,
    pub path: PathBuf,
    pub kind: EntryKind,
}

impl BrowserEntry {
    pub fn is_dir(&self) -> bool {
        matches!(self.kind, EntryKind::Parent | EntryKind::Directory)
    }

    /// Row text; directories get a trailing slash
    pub fn display_name(&self) -> String {
        match self.kind {
            EntryKind::Parent => "..".to_string(),
            EntryKind::Directory => format!("{}/", self.name),
            EntryKind::File => self.name.clone(),
        }
    }
}

/// Directory listing navigated with a windowed list
#[derive(Debug)]
pub struct FileBrowser {
    current: PathBuf,
    entries: Vec<BrowserEntry>,
    pub list: WindowedList,
}

impl FileBrowser {
    /// Open a browser on `start`
    pub fn new(start: impl Into<PathBuf>) -> Result<Self> {
        let current = start.into();
        let entries = list_dir(&current)?;
        Ok(Self {
            current,
            entries,
            list: WindowedList::default(),
        })
    }

    pub fn current_dir(&self) -> &Path {
        &self.current
    }

    pub fn entries(&self) -> &[BrowserEntry] {
        &self.entries
    }

    pub fn selected(&self) -> Option<&BrowserEntry> {
        self.list
            .selected(self.entries.len())
            .and_then(|index| self.entries.get(index))
    }

    pub fn down(&mut self) {
        self.list.down(self.entries.len());
    }

    pub fn up(&mut self) {
        self.list.up();
    }

    pub fn resize(&mut self, visible_height: usize) {
        self.list.resize(visible_height, self.entries.len());
    }

    pub fn select_row(&mut self, row: usize) {
        self.list.select_row(row, self.entries.len());
    }

    /// Enter the selected entry if it is a directory; `Ok(false)` for files
    pub fn enter(&mut self) -> Result<bool> {
        match self.selected() {
            Some(entry) if entry.is_dir() => {
                let target = entry.path.clone();
                self.navigate_to(target)?;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    /// Go up one directory; `Ok(false)` at the filesystem root
    pub fn go_up(&mut self) -> Result<bool> {
        match self.current.parent() {
            Some(parent) => {
                let parent = parent.to_path_buf();
                self.navigate_to(parent)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Switch to `path`; on failure the previous listing stays
    pub fn navigate_to(&mut self, path: impl Into<PathBuf>) -> Result<()> {
        let path = path.into();
        let entries = list_dir(&path)?;
        self.current = path;
        self.entries = entries;
        self.list.reset();
        self.list.clamp(self.entries.len());
        Ok(())
    }
}

fn list_dir(path: &Path) -> Result<Vec<BrowserEntry>> {
    let reader = std::fs::read_dir(path)
        .with_context(|| format!("Cannot read directory {}", path.display()))?;

    let mut dirs = Vec::new();
    let mut files = Vec::new();
    for entry in reader.filter_map(|e| e.ok()) {
        let name = entry.file_name().to_string_lossy().to_string();
        if name.starts_with('.') {
            continue;
        }
        let path = entry.path();
        if path.is_dir() {
            dirs.push(BrowserEntry {
                name,
                path,
                kind: EntryKind::Directory,
            });
        } else {
            files.push(BrowserEntry {
                name,
                path,
                kind: EntryKind::File,
            });
        }
    }

    dirs.sort_by_key(|entry| entry.name.to_lowercase());
    files.sort_by_key(|entry| entry.name.to_lowercase());

    let mut entries = Vec::with_capacity(dirs.len() + files.len() + 1);
    if let Some(parent) = path.parent() {
        entries.push(BrowserEntry {
            name: "..".to_string(),
            path: parent.to_path_buf(),
            kind: EntryKind::Parent,
        });
    }
    entries.extend(dirs);
    entries.extend(files);
    Ok(entries)
}
