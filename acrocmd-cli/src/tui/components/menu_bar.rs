//! Bottom menu bar: one equal-width button per menu action

use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};

use crate::tui::app::App;

const KEY_STYLE: Style = Style::new().fg(Color::White).bg(Color::Black);
const ENABLED_STYLE: Style = Style::new().fg(Color::Black).bg(Color::Cyan);
const DISABLED_STYLE: Style = Style::new().fg(Color::DarkGray).bg(Color::Cyan);

/// Render the menu bar
pub fn render(frame: &mut Frame, area: Rect, app: &App) {
    let button_width = app.menu.button_width(area.width) as usize;
    if button_width == 0 {
        return;
    }

    let mut spans = Vec::with_capacity(app.menu.items().len() * 2);
    for item in app.menu.items() {
        let key = item
            .keys
            .first()
            .map(|binding| binding.label())
            .unwrap_or_default();
        let label_style = if (item.is_enabled)(app) {
            ENABLED_STYLE
        } else {
            DISABLED_STYLE
        };

        let key_text: String = format!(" {}", key).chars().take(button_width).collect();
        let label_width = button_width.saturating_sub(key_text.chars().count());
        let label: String = item.label.chars().take(label_width).collect();

        spans.push(Span::styled(key_text, KEY_STYLE.add_modifier(Modifier::BOLD)));
        spans.push(Span::styled(
            format!("{:<width$}", label, width = label_width),
            label_style,
        ));
    }

    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}
