//! Scroll window over a long list
//!
//! Only `visible_height + 1` items are ever handed to the renderer. The
//! window moves one item at a time when the cursor pushes against its top or
//! bottom edge, so the item under the cursor stays put at the boundary.
//!
//! Invariant: `offset <= item_count.saturating_sub(visible_height)` after
//! every operation that is given the current item count.

use std::ops::Range;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WindowedList {
    offset: usize,
    cursor: usize,
    visible_height: usize,
}

impl WindowedList {
    pub fn new(visible_height: usize) -> Self {
        Self {
            offset: 0,
            cursor: 0,
            visible_height,
        }
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Row of the cursor inside the window
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn visible_height(&self) -> usize {
        self.visible_height
    }

    /// `cursor + offset`; meaningless for an empty list
    pub fn selected_index(&self) -> usize {
        self.cursor + self.offset
    }

    /// Selected index, or `None` when there is nothing to select
    pub fn selected(&self, item_count: usize) -> Option<usize> {
        let index = self.selected_index();
        (index < item_count).then_some(index)
    }

    fn max_offset(&self, item_count: usize) -> usize {
        item_count.saturating_sub(self.visible_height)
    }

    /// Last row that actually shows an item
    fn last_row(&self, item_count: usize) -> usize {
        let populated = item_count.saturating_sub(self.offset);
        populated.min(self.visible_height).saturating_sub(1)
    }

    pub fn down(&mut self, item_count: usize) {
        if item_count == 0 || self.visible_height == 0 {
            return;
        }
        let bottom = self.visible_height - 1;
        if self.cursor == bottom && self.offset < self.max_offset(item_count) {
            self.offset += 1;
            self.cursor = bottom;
        } else {
            self.cursor = (self.cursor + 1).min(self.last_row(item_count));
        }
    }

    pub fn up(&mut self) {
        if self.cursor == 0 && self.offset > 0 {
            self.offset -= 1;
        } else {
            self.cursor = self.cursor.saturating_sub(1);
        }
    }

    /// New viewport height; clamps offset and cursor
    pub fn resize(&mut self, visible_height: usize, item_count: usize) {
        self.visible_height = visible_height;
        self.clamp(item_count);
    }

    /// Re-establish the invariant after the item count changed
    pub fn clamp(&mut self, item_count: usize) {
        self.offset = self.offset.min(self.max_offset(item_count));
        self.cursor = self.cursor.min(self.last_row(item_count));
    }

    /// Put the cursor on a visible row (mouse click); ignored past the end
    pub fn select_row(&mut self, row: usize, item_count: usize) {
        if row < self.visible_height && self.offset + row < item_count {
            self.cursor = row;
        }
    }

    /// Jump back to the first item
    pub fn reset(&mut self) {
        self.offset = 0;
        self.cursor = 0;
    }

    /// Indices to render: `visible_height + 1` items from `offset`
    pub fn visible_range(&self, item_count: usize) -> Range<usize> {
        let start = self.offset.min(item_count);
        let end = (self.offset + self.visible_height + 1).min(item_count);
        start..end
    }

    /// Render the visible slice with `format`
    pub fn render<T, R>(&self, items: &[T], format: impl FnMut(&T) -> R) -> Vec<R> {
        items[self.visible_range(items.len())]
            .iter()
            .map(format)
            .collect()
    }
}
