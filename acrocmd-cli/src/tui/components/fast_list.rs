//! List widget that only draws the rows it is given
//!
//! Pair it with [`WindowedList::render`](acrocmd_core::WindowedList::render):
//! the caller formats just the visible slice and the widget paints it, so
//! drawing cost does not grow with the length of the list.

use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::Style,
    text::Line,
    widgets::{Block, Widget},
};

pub struct FastList<'a> {
    rows: Vec<Line<'a>>,
    cursor: Option<usize>,
    block: Option<Block<'a>>,
    highlight_style: Style,
}

impl<'a> FastList<'a> {
    pub fn new(rows: Vec<Line<'a>>) -> Self {
        Self {
            rows,
            cursor: None,
            block: None,
            highlight_style: Style::default(),
        }
    }

    /// Row to highlight, relative to the first row given
    pub fn cursor(mut self, cursor: Option<usize>) -> Self {
        self.cursor = cursor;
        self
    }

    pub fn block(mut self, block: Block<'a>) -> Self {
        self.block = Some(block);
        self
    }

    pub fn highlight_style(mut self, style: Style) -> Self {
        self.highlight_style = style;
        self
    }
}

impl Widget for FastList<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let inner = match self.block {
            Some(block) => {
                let inner = block.inner(area);
                block.render(area, buf);
                inner
            }
            None => area,
        };
        if inner.is_empty() {
            return;
        }

        for (row, line) in self.rows.iter().enumerate().take(inner.height as usize) {
            let y = inner.y + row as u16;
            let row_area = Rect::new(inner.x, y, inner.width, 1);
            if self.cursor == Some(row) {
                buf.set_style(row_area, self.highlight_style);
            }
            buf.set_line(inner.x, y, line, inner.width);
        }
    }
}
