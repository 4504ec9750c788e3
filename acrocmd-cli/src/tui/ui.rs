//! UI rendering using ratatui

use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
    Frame,
};

use acrocmd_core::{CheckItem, CheckItemState, QualityStatus};

use super::app::{App, FocusedPane};
use super::components::{menu_bar, FastList};
use super::sources::{BrowserEntry, EntryKind};

/// Primary accent color
const ACCENT: Color = Color::Cyan;
/// Secondary color for less important elements
const SECONDARY: Color = Color::DarkGray;
/// Directory entries
const DIRECTORY: Color = Color::Blue;
/// Failed checks
const ERROR: Color = Color::Red;

/// Screen areas of the last frame; mouse handling uses them too
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScreenLayout {
    pub browser: Rect,
    pub check_list: Rect,
    pub menu_bar: Rect,
}

impl ScreenLayout {
    /// Rows available to each list inside its border
    pub fn list_heights(&self) -> (usize, usize) {
        (
            self.browser.height.saturating_sub(2) as usize,
            self.check_list.height.saturating_sub(2) as usize,
        )
    }
}

/// Two side-by-side panes over a one-row menu bar
pub fn screen_layout(area: Rect) -> ScreenLayout {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(3), Constraint::Length(1)])
        .split(area);
    let panes = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(rows[0]);

    ScreenLayout {
        browser: panes[0],
        check_list: panes[1],
        menu_bar: rows[1],
    }
}

/// Render the entire UI
pub fn render(frame: &mut Frame, app: &App) {
    let layout = screen_layout(frame.area());

    render_browser(frame, app, layout.browser);
    render_check_list(frame, app, layout.check_list);
    menu_bar::render(frame, layout.menu_bar, app);

    if let Some(message) = app.message() {
        render_message(frame, message);
    }
}

fn pane_block(title: String, focused: bool) -> Block<'static> {
    let (border, title_style) = if focused {
        (
            Style::default().fg(ACCENT),
            Style::default().fg(ACCENT).add_modifier(Modifier::BOLD),
        )
    } else {
        (Style::default().fg(SECONDARY), Style::default().fg(SECONDARY))
    };
    Block::default()
        .title(format!(" {} ", title))
        .title_style(title_style)
        .borders(Borders::ALL)
        .border_style(border)
}

fn highlight_style(focused: bool) -> Style {
    if focused {
        Style::default()
            .bg(ACCENT)
            .fg(Color::Black)
            .add_modifier(Modifier::BOLD)
    } else {
        Style::default().add_modifier(Modifier::REVERSED)
    }
}

fn browser_row(entry: &BrowserEntry) -> Line<'static> {
    let style = match entry.kind {
        EntryKind::Parent | EntryKind::Directory => Style::default().fg(DIRECTORY),
        EntryKind::File => Style::default(),
    };
    Line::from(Span::styled(entry.display_name(), style))
}

fn render_browser(frame: &mut Frame, app: &App, area: Rect) {
    let focused = app.focused_pane == FocusedPane::FileBrowser;
    let title = app.browser.current_dir().display().to_string();
    let rows = app.browser.list.render(app.browser.entries(), browser_row);
    let cursor = (!app.browser.entries().is_empty()).then(|| app.browser.list.cursor());

    let list = FastList::new(rows)
        .block(pane_block(title, focused))
        .cursor(cursor)
        .highlight_style(highlight_style(focused));
    frame.render_widget(list, area);
}

fn status_color(status: QualityStatus) -> Color {
    match status {
        QualityStatus::Green => Color::Green,
        QualityStatus::Yellow => Color::Yellow,
        QualityStatus::Red => Color::Red,
        QualityStatus::Unknown => SECONDARY,
    }
}

/// `score  file`, `ERR  file` or just `file` while pending
pub fn check_item_row(item: &CheckItem) -> Line<'static> {
    let file = item.file.display().to_string();
    match &item.state {
        CheckItemState::Pending => Line::from(format!("     {}", file)),
        CheckItemState::Checked { score, status, .. } => Line::from(vec![
            Span::styled(format!("{:>3}", score), Style::default().fg(status_color(*status))),
            Span::raw(format!("  {}", file)),
        ]),
        CheckItemState::Failed { .. } => Line::from(vec![
            Span::styled("ERR", Style::default().fg(ERROR)),
            Span::raw(format!("  {}", file)),
        ]),
    }
}

fn render_check_list(frame: &mut Frame, app: &App, area: Rect) {
    let focused = app.focused_pane == FocusedPane::CheckList;
    let rows = app.check_list.render(&app.check_items, check_item_row);
    let cursor = app.has_check_items().then(|| app.check_list.cursor());

    let list = FastList::new(rows)
        .block(pane_block(app.check_list_title(), focused))
        .cursor(cursor)
        .highlight_style(highlight_style(focused));
    frame.render_widget(list, area);
}

/// Rows `text` needs when word-wrapped into `width` columns
fn wrapped_line_count(text: &str, width: u16) -> u16 {
    let width = usize::from(width.max(1));
    let mut lines = 0usize;
    for line in text.lines() {
        lines += 1;
        let mut used = 0;
        for word in line.split_whitespace() {
            let len = word.chars().count();
            if used > 0 && used + 1 + len <= width {
                used += 1 + len;
                continue;
            }
            if used > 0 {
                lines += 1;
            }
            // words wider than the box are split across rows
            let extra = (len - 1) / width;
            lines += extra;
            used = len - extra * width;
        }
    }
    lines.max(1).min(usize::from(u16::MAX)) as u16
}

/// Centered message box, tall enough for the wrapped text
fn render_message(frame: &mut Frame, message: &str) {
    let area = frame.area();
    let width = (message.chars().count() as u16 + 4)
        .max(20)
        .min(area.width.saturating_sub(4).max(1));
    let text_rows = wrapped_line_count(message, width.saturating_sub(2));
    let height = text_rows.saturating_add(2).min(area.height);
    let popup = Rect {
        x: area.x + (area.width.saturating_sub(width)) / 2,
        y: area.y + (area.height.saturating_sub(height)) / 2,
        width,
        height,
    };

    frame.render_widget(Clear, popup);
    let paragraph = Paragraph::new(message.to_string())
        .wrap(Wrap { trim: true })
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(ACCENT)),
        );
    frame.render_widget(paragraph, popup);
}
