//! Menu bar actions, their key bindings and when they are available
//!
//! Keyboard and mouse activation both go through [`Menu::resolve`], so a
//! disabled action can never be triggered by a click either.

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use super::app::{App, FocusedPane};

/// Things the menu bar can do
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuAction {
    Add,
    Check,
    Scorecard,
    Clear,
    Remove,
    Report,
    Quit,
}

/// A key plus the modifiers that must be held
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyBinding {
    pub code: KeyCode,
    pub modifiers: KeyModifiers,
}

impl KeyBinding {
    pub const fn plain(code: KeyCode) -> Self {
        Self {
            code,
            modifiers: KeyModifiers::NONE,
        }
    }

    pub const fn ctrl(c: char) -> Self {
        Self {
            code: KeyCode::Char(c),
            modifiers: KeyModifiers::CONTROL,
        }
    }

    pub fn matches(&self, key: &KeyEvent) -> bool {
        // Shift is ignored so function keys still fire with caps-lock style input
        let held = key.modifiers - KeyModifiers::SHIFT;
        key.code == self.code && held == self.modifiers
    }

    /// Short label for the menu bar, e.g. `F1`, `ESC`, `C-C`
    pub fn label(&self) -> String {
        let key = match self.code {
            KeyCode::F(n) => format!("F{}", n),
            KeyCode::Esc => "ESC".to_string(),
            KeyCode::Char(c) => c.to_ascii_uppercase().to_string(),
            other => format!("{:?}", other).to_uppercase(),
        };
        if self.modifiers.contains(KeyModifiers::CONTROL) {
            format!("C-{}", key)
        } else {
            key
        }
    }
}

/// One entry of the menu bar
#[derive(Debug, Clone)]
pub struct MenuItem {
    pub action: MenuAction,
    pub label: &'static str,
    pub keys: Vec<KeyBinding>,
    pub is_enabled: fn(&App) -> bool,
}

/// Outcome of looking up a key press or click
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    /// Run the action
    Invoke(MenuAction),
    /// Bound, but currently unavailable
    Disabled(MenuAction),
    /// Not a menu key / not on a button
    Unbound,
}

fn always(_: &App) -> bool {
    true
}

fn can_check(app: &App) -> bool {
    app.has_check_items() && !app.is_checking()
}

fn has_check_items(app: &App) -> bool {
    app.has_check_items()
}

fn can_act_on_selection(app: &App) -> bool {
    app.has_check_items() && app.focused_pane == FocusedPane::CheckList
}

fn can_open_report(app: &App) -> bool {
    app.last_batch_id().is_some() && !app.is_checking()
}

#[derive(Debug, Clone)]
pub struct Menu {
    items: Vec<MenuItem>,
}

impl Default for Menu {
    fn default() -> Self {
        Self::standard()
    }
}

impl Menu {
    pub fn new(items: Vec<MenuItem>) -> Self {
        Self { items }
    }

    /// The commander's menu: F1-F6 plus the quit keys
    pub fn standard() -> Self {
        use KeyCode::*;
        Self::new(vec![
            MenuItem {
                action: MenuAction::Add,
                label: "Add",
                keys: vec![KeyBinding::plain(F(1))],
                is_enabled: always,
            },
            MenuItem {
                action: MenuAction::Check,
                label: "Check",
                keys: vec![KeyBinding::plain(F(2))],
                is_enabled: can_check,
            },
            MenuItem {
                action: MenuAction::Scorecard,
                label: "Scorecard",
                keys: vec![KeyBinding::plain(F(3))],
                is_enabled: can_act_on_selection,
            },
            MenuItem {
                action: MenuAction::Clear,
                label: "Clear",
                keys: vec![KeyBinding::plain(F(4))],
                is_enabled: has_check_items,
            },
            MenuItem {
                action: MenuAction::Remove,
                label: "Remove",
                keys: vec![KeyBinding::plain(F(5))],
                is_enabled: can_act_on_selection,
            },
            MenuItem {
                action: MenuAction::Report,
                label: "Report",
                keys: vec![KeyBinding::plain(F(6))],
                is_enabled: can_open_report,
            },
            MenuItem {
                action: MenuAction::Quit,
                label: "Quit",
                keys: vec![
                    KeyBinding::plain(F(10)),
                    KeyBinding::plain(Esc),
                    KeyBinding::plain(Char('q')),
                    KeyBinding::ctrl('c'),
                ],
                is_enabled: always,
            },
        ])
    }

    pub fn items(&self) -> &[MenuItem] {
        &self.items
    }

    pub fn item(&self, action: MenuAction) -> Option<&MenuItem> {
        self.items.iter().find(|item| item.action == action)
    }

    fn gate(item: &MenuItem, app: &App) -> Dispatch {
        if (item.is_enabled)(app) {
            Dispatch::Invoke(item.action)
        } else {
            Dispatch::Disabled(item.action)
        }
    }

    /// Look up a key press
    pub fn resolve(&self, key: &KeyEvent, app: &App) -> Dispatch {
        self.items
            .iter()
            .find(|item| item.keys.iter().any(|binding| binding.matches(key)))
            .map(|item| Self::gate(item, app))
            .unwrap_or(Dispatch::Unbound)
    }

    /// Width of each button for a bar `width` columns wide
    pub fn button_width(&self, width: u16) -> u16 {
        if self.items.is_empty() {
            return 0;
        }
        width / self.items.len() as u16
    }

    /// Look up a click at `column` on a bar `width` columns wide
    pub fn resolve_click(&self, column: u16, width: u16, app: &App) -> Dispatch {
        let button_width = self.button_width(width);
        if button_width == 0 {
            return Dispatch::Unbound;
        }
        self.items
            .get((column / button_width) as usize)
            .map(|item| Self::gate(item, app))
            .unwrap_or(Dispatch::Unbound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tui::app::tests::{app_with_items, test_app};
    use crossterm::event::KeyEventKind;

    fn key(code: KeyCode, modifiers: KeyModifiers) -> KeyEvent {
        KeyEvent::new(code, modifiers)
    }

    #[test]
    fn test_quit_bindings() {
        let (app, _checker) = test_app();
        let menu = Menu::standard();

        for event in [
            key(KeyCode::F(10), KeyModifiers::NONE),
            key(KeyCode::Esc, KeyModifiers::NONE),
            key(KeyCode::Char('q'), KeyModifiers::NONE),
            key(KeyCode::Char('c'), KeyModifiers::CONTROL),
        ] {
            assert_eq!(menu.resolve(&event, &app), Dispatch::Invoke(MenuAction::Quit));
        }
        assert_eq!(
            menu.resolve(&key(KeyCode::Char('c'), KeyModifiers::NONE), &app),
            Dispatch::Unbound
        );
    }

    #[test]
    fn test_disabled_actions_are_gated() {
        let (app, _checker) = test_app();
        let menu = Menu::standard();

        assert_eq!(
            menu.resolve(&key(KeyCode::F(2), KeyModifiers::NONE), &app),
            Dispatch::Disabled(MenuAction::Check)
        );
        assert_eq!(
            menu.resolve(&key(KeyCode::F(1), KeyModifiers::NONE), &app),
            Dispatch::Invoke(MenuAction::Add)
        );
    }

    #[test]
    fn test_selection_actions_need_list_focus() {
        let (mut app, _checker) = app_with_items(3);
        let menu = Menu::standard();
        let f5 = key(KeyCode::F(5), KeyModifiers::NONE);

        app.focused_pane = FocusedPane::FileBrowser;
        assert_eq!(menu.resolve(&f5, &app), Dispatch::Disabled(MenuAction::Remove));

        app.focused_pane = FocusedPane::CheckList;
        assert_eq!(menu.resolve(&f5, &app), Dispatch::Invoke(MenuAction::Remove));
    }

    #[test]
    fn test_click_uses_same_gate_as_keys() {
        let (app, _checker) = test_app();
        let menu = Menu::standard();
        let width = 70;
        assert_eq!(menu.button_width(width), 10);

        assert_eq!(menu.resolve_click(3, width, &app), Dispatch::Invoke(MenuAction::Add));
        assert_eq!(
            menu.resolve_click(15, width, &app),
            Dispatch::Disabled(MenuAction::Check)
        );
        assert_eq!(menu.resolve_click(65, width, &app), Dispatch::Invoke(MenuAction::Quit));
        assert_eq!(menu.resolve_click(70, width, &app), Dispatch::Unbound);
    }

    #[test]
    fn test_predicates_are_stable() {
        let (app, _checker) = app_with_items(2);
        let menu = Menu::standard();
        for item in menu.items() {
            assert_eq!((item.is_enabled)(&app), (item.is_enabled)(&app));
        }
    }

    #[test]
    fn test_binding_labels() {
        assert_eq!(KeyBinding::plain(KeyCode::F(10)).label(), "F10");
        assert_eq!(KeyBinding::plain(KeyCode::Esc).label(), "ESC");
        assert_eq!(KeyBinding::ctrl('c').label(), "C-C");
    }

    #[test]
    fn test_shift_is_ignored() {
        let binding = KeyBinding::plain(KeyCode::F(1));
        let mut event = key(KeyCode::F(1), KeyModifiers::SHIFT);
        event.kind = KeyEventKind::Press;
        assert!(binding.matches(&event));
    }
}
