//! Data sources for the TUI panes

pub mod filesystem;

pub use filesystem::{BrowserEntry, EntryKind, FileBrowser};
