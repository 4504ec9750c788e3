//! Acro Commander TUI
//!
//! Two panes and a menu bar:
//! - Left: file browser for picking files and directories to add
//! - Right: documents queued for checking, with score and status
//! - Bottom: F-key menu, clickable

pub mod app;
pub mod components;
pub mod event;
pub mod menu;
pub mod opener;
pub mod sources;
pub mod terminal;
pub mod timer;
pub mod ui;

pub use app::App;
pub use terminal::{run, ReportFetcher};
