//! Event handling for the TUI

use std::time::{Duration, Instant};

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, MouseButton, MouseEvent, MouseEventKind};
use ratatui::layout::{Position, Rect};

use super::app::{App, FocusedPane};
use super::menu::Dispatch;
use super::ui::ScreenLayout;

/// Poll for events with timeout
pub fn poll_event(timeout: Duration) -> std::io::Result<Option<Event>> {
    if event::poll(timeout)? {
        Ok(Some(event::read()?))
    } else {
        Ok(None)
    }
}

/// Result of handling an input event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandleResult {
    /// Continue running
    Continue,
    /// Quit the application
    Quit,
    /// Open a link in the system browser
    OpenUrl(String),
    /// Fetch the aggregated report link for a batch
    FetchReport(String),
}

/// Handle a key event
pub fn handle_key(app: &mut App, key: KeyEvent, now: Instant) -> HandleResult {
    if key.kind == KeyEventKind::Release {
        return HandleResult::Continue;
    }

    match app.menu.resolve(&key, app) {
        Dispatch::Invoke(action) => app.execute(action, now),
        Dispatch::Disabled(action) => {
            app.show_unavailable(action, now);
            HandleResult::Continue
        }
        Dispatch::Unbound => handle_navigation(app, key, now),
    }
}

/// Keys that are not menu shortcuts
fn handle_navigation(app: &mut App, key: KeyEvent, now: Instant) -> HandleResult {
    match key.code {
        KeyCode::Char('j') | KeyCode::Down => app.select_next(),
        KeyCode::Char('k') | KeyCode::Up => app.select_prev(),
        KeyCode::Tab | KeyCode::BackTab => app.toggle_focus(),
        KeyCode::Enter => app.activate_selection(now),
        KeyCode::Backspace if app.focused_pane == FocusedPane::FileBrowser => {
            app.browse_parent(now)
        }
        _ => {}
    }
    HandleResult::Continue
}

/// Row inside a bordered pane, if `position` hits its content area
fn inner_row(area: Rect, position: Position) -> Option<usize> {
    let inner = Rect {
        x: area.x + 1,
        y: area.y + 1,
        width: area.width.saturating_sub(2),
        height: area.height.saturating_sub(2),
    };
    inner
        .contains(position)
        .then(|| (position.y - inner.y) as usize)
}

/// Handle a mouse event against the last drawn layout
pub fn handle_mouse(
    app: &mut App,
    mouse: MouseEvent,
    layout: &ScreenLayout,
    now: Instant,
) -> HandleResult {
    let position = Position::new(mouse.column, mouse.row);

    match mouse.kind {
        MouseEventKind::Down(MouseButton::Left) => {
            if layout.menu_bar.contains(position) {
                let column = mouse.column - layout.menu_bar.x;
                return match app.menu.resolve_click(column, layout.menu_bar.width, app) {
                    Dispatch::Invoke(action) => app.execute(action, now),
                    Dispatch::Disabled(action) => {
                        app.show_unavailable(action, now);
                        HandleResult::Continue
                    }
                    Dispatch::Unbound => HandleResult::Continue,
                };
            }
            if let Some(row) = inner_row(layout.browser, position) {
                app.focused_pane = FocusedPane::FileBrowser;
                app.browser.select_row(row);
            } else if let Some(row) = inner_row(layout.check_list, position) {
                if app.has_check_items() {
                    app.focused_pane = FocusedPane::CheckList;
                    app.check_list.select_row(row, app.check_items.len());
                }
            }
        }
        MouseEventKind::ScrollDown => {
            if layout.browser.contains(position) {
                app.browser.down();
            } else if layout.check_list.contains(position) {
                app.check_list.down(app.check_items.len());
            }
        }
        MouseEventKind::ScrollUp => {
            if layout.browser.contains(position) {
                app.browser.up();
            } else if layout.check_list.contains(position) {
                app.check_list.up();
            }
        }
        _ => {}
    }
    HandleResult::Continue
}
