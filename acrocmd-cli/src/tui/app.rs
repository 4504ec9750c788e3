//! Application state and the controller driving it

use std::sync::Arc;
use std::time::{Duration, Instant};

use acrocmd_core::{
    CheckItem, CheckItemState, CheckOptions, Checker, CheckerEvent, DirectoryCrawler,
    FileCrawler, ReferencePattern, Subscription, WindowedList,
};

use super::event::HandleResult;
use super::menu::{Menu, MenuAction};
use super::sources::{EntryKind, FileBrowser};
use super::timer::{Deadline, Interval};

/// Animation period for the working indicator
pub const SPINNER_PERIOD: Duration = Duration::from_millis(200);
/// How long a transient message stays on screen
pub const MESSAGE_DURATION: Duration = Duration::from_secs(1);

const SPINNER_FRAMES: [char; 4] = ['|', '/', '-', '\\'];

/// Which pane is currently focused
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FocusedPane {
    /// Left pane, the directory listing
    #[default]
    FileBrowser,
    /// Right pane, the documents to check
    CheckList,
}

/// What the checker is busy with, as seen by the UI
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Activity {
    Idle,
    Crawling,
    Checking,
}

/// Main application state
pub struct App {
    /// Which pane is focused
    pub focused_pane: FocusedPane,
    /// Left pane
    pub browser: FileBrowser,
    /// Snapshot of the checker's items, refreshed on checker events
    pub check_items: Vec<CheckItem>,
    /// Scroll window over `check_items`
    pub check_list: WindowedList,
    /// Menu bar actions
    pub menu: Menu,
    /// Whether the app should quit
    pub should_quit: bool,
    checker: Arc<dyn Checker>,
    subscription: Option<Subscription>,
    crawl_timer: Option<Interval>,
    check_timer: Option<Interval>,
    spinner_frame: usize,
    message: Option<(String, Deadline)>,
    last_batch_id: Option<String>,
    reference_pattern: ReferencePattern,
    guidance_profile: Option<String>,
}

impl App {
    pub fn new(
        checker: Arc<dyn Checker>,
        browser: FileBrowser,
        reference_pattern: ReferencePattern,
        guidance_profile: Option<String>,
    ) -> Self {
        let subscription = checker.subscribe();
        let check_items = checker.check_items();
        Self {
            focused_pane: FocusedPane::FileBrowser,
            browser,
            check_items,
            check_list: WindowedList::default(),
            menu: Menu::standard(),
            should_quit: false,
            checker,
            subscription: Some(subscription),
            crawl_timer: None,
            check_timer: None,
            spinner_frame: 0,
            message: None,
            last_batch_id: None,
            reference_pattern,
            guidance_profile,
        }
    }

    pub fn has_check_items(&self) -> bool {
        !self.check_items.is_empty()
    }

    pub fn is_checking(&self) -> bool {
        self.check_timer.is_some()
    }

    pub fn last_batch_id(&self) -> Option<&str> {
        self.last_batch_id.as_deref()
    }

    pub fn activity(&self) -> Activity {
        if self.check_timer.is_some() {
            Activity::Checking
        } else if self.crawl_timer.is_some() {
            Activity::Crawling
        } else {
            Activity::Idle
        }
    }

    /// Current frame of the working indicator, `None` when idle
    pub fn spinner(&self) -> Option<char> {
        match self.activity() {
            Activity::Idle => None,
            _ => Some(SPINNER_FRAMES[self.spinner_frame % SPINNER_FRAMES.len()]),
        }
    }

    pub fn check_list_title(&self) -> String {
        let mut title = format!("Documents to Check ({})", self.check_items.len());
        if let Some(frame) = self.spinner() {
            title.push(' ');
            title.push(frame);
        }
        title
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_ref().map(|(text, _)| text.as_str())
    }

    /// Show a transient message, replacing any earlier one
    pub fn show_message(&mut self, text: impl Into<String>, now: Instant) {
        let text = text.into();
        tracing::debug!(message = %text, "showing message");
        self.message = Some((text, Deadline::after(MESSAGE_DURATION, now)));
    }

    pub fn show_unavailable(&mut self, action: MenuAction, now: Instant) {
        let label = self
            .menu
            .item(action)
            .map(|item| item.label)
            .unwrap_or("Action");
        self.show_message(format!("{} is not available", label), now);
    }

    pub fn selected_check_item(&self) -> Option<&CheckItem> {
        self.check_list
            .selected(self.check_items.len())
            .and_then(|index| self.check_items.get(index))
    }

    /// Drain pending checker events; item changes are applied once per drain
    pub fn pump_events(&mut self, now: Instant) {
        let events = match self.subscription.as_mut() {
            Some(subscription) => subscription.drain(),
            None => return,
        };

        let mut items_changed = false;
        for event in events {
            match event {
                CheckerEvent::CrawlingStarted => {
                    self.crawl_timer = Some(Interval::new(SPINNER_PERIOD, now));
                }
                CheckerEvent::CrawlingDone => {
                    self.crawl_timer = None;
                }
                CheckerEvent::CrawlFailed { root, error } => {
                    self.show_message(format!("Crawling {} failed: {}", root.display(), error), now);
                }
                CheckerEvent::CheckingStarted { batch_id } => {
                    tracing::info!(%batch_id, "checking started");
                    self.check_timer = Some(Interval::new(SPINNER_PERIOD, now));
                }
                CheckerEvent::Done { batch_id } => {
                    tracing::info!(%batch_id, "checking done");
                    self.check_timer = None;
                    self.last_batch_id = Some(batch_id);
                    items_changed = true;
                }
                CheckerEvent::AddedCheckItem(_)
                | CheckerEvent::RemovedCheckItem(_)
                | CheckerEvent::CheckResult { .. } => {
                    items_changed = true;
                }
            }
        }

        if items_changed {
            self.refresh_items();
        }
    }

    fn refresh_items(&mut self) {
        self.check_items = self.checker.check_items();
        self.check_list.clamp(self.check_items.len());
        if self.check_items.is_empty() {
            self.focused_pane = FocusedPane::FileBrowser;
        }
    }

    /// Advance timers: spinner frames and message expiry
    pub fn tick(&mut self, now: Instant) {
        let crawl_ticks = self.crawl_timer.as_mut().map_or(0, |timer| timer.poll(now));
        let check_ticks = self.check_timer.as_mut().map_or(0, |timer| timer.poll(now));
        let ticks = crawl_ticks.max(check_ticks) as usize;
        self.spinner_frame = (self.spinner_frame + ticks) % SPINNER_FRAMES.len();

        if matches!(&self.message, Some((_, deadline)) if deadline.expired(now)) {
            self.message = None;
        }
    }

    /// Viewport heights for both panes, from the last layout
    pub fn resize(&mut self, browser_height: usize, check_list_height: usize) {
        self.browser.resize(browser_height);
        self.check_list.resize(check_list_height, self.check_items.len());
    }

    pub fn toggle_focus(&mut self) {
        self.focused_pane = match self.focused_pane {
            FocusedPane::FileBrowser if self.has_check_items() => FocusedPane::CheckList,
            _ => FocusedPane::FileBrowser,
        };
    }

    pub fn select_next(&mut self) {
        match self.focused_pane {
            FocusedPane::FileBrowser => self.browser.down(),
            FocusedPane::CheckList => self.check_list.down(self.check_items.len()),
        }
    }

    pub fn select_prev(&mut self) {
        match self.focused_pane {
            FocusedPane::FileBrowser => self.browser.up(),
            FocusedPane::CheckList => self.check_list.up(),
        }
    }

    /// Enter in the focused pane
    pub fn activate_selection(&mut self, now: Instant) {
        match self.focused_pane {
            FocusedPane::FileBrowser => {
                if let Err(err) = self.browser.enter() {
                    self.show_message(format!("{:#}", err), now);
                }
            }
            FocusedPane::CheckList => {
                if let Some(details) = self.selected_check_item().map(describe_item) {
                    self.show_message(details, now);
                }
            }
        }
    }

    pub fn browse_parent(&mut self, now: Instant) {
        if let Err(err) = self.browser.go_up() {
            self.show_message(format!("{:#}", err), now);
        }
    }

    /// Run a menu action; callers have already checked it is enabled
    pub fn execute(&mut self, action: MenuAction, now: Instant) -> HandleResult {
        tracing::debug!(?action, "menu action");
        match action {
            MenuAction::Add => {
                self.add_selected(now);
                HandleResult::Continue
            }
            MenuAction::Check => {
                let options = CheckOptions::batch(self.guidance_profile.clone());
                tracing::info!(batch_id = %options.batch_id, items = self.check_items.len(), "starting check");
                self.checker.set_check_options(options);
                self.checker.select_all();
                self.checker.start();
                HandleResult::Continue
            }
            MenuAction::Scorecard => self.open_scorecard(now),
            MenuAction::Clear => {
                self.check_items.clear();
                self.check_list.reset();
                self.checker.stop();
                self.checker.reset_check_items();
                self.focused_pane = FocusedPane::FileBrowser;
                HandleResult::Continue
            }
            MenuAction::Remove => {
                if let Some(id) = self.selected_check_item().map(|item| item.id) {
                    self.checker.remove_check_item(id);
                }
                HandleResult::Continue
            }
            MenuAction::Report => match self.last_batch_id.clone() {
                Some(batch_id) => HandleResult::FetchReport(batch_id),
                None => HandleResult::Continue,
            },
            MenuAction::Quit => {
                self.should_quit = true;
                HandleResult::Quit
            }
        }
    }

    fn add_selected(&mut self, now: Instant) {
        let Some(entry) = self.browser.selected().cloned() else {
            self.show_message("Nothing selected", now);
            return;
        };
        if entry.kind == EntryKind::Parent {
            self.show_message("Select a file or directory to add", now);
            return;
        }

        let metadata = match std::fs::metadata(&entry.path) {
            Ok(metadata) => metadata,
            Err(err) => {
                tracing::warn!(path = %entry.path.display(), error = %err, "cannot stat selection");
                self.show_message(format!("Cannot access {}: {}", entry.path.display(), err), now);
                return;
            }
        };

        if metadata.is_dir() {
            tracing::info!(root = %entry.path.display(), "adding directory");
            let crawler =
                DirectoryCrawler::new(entry.path, true).with_pattern(self.reference_pattern.clone());
            self.checker.add_crawler(Box::new(crawler));
        } else if self.reference_pattern.matches(&entry.path) {
            tracing::info!(file = %entry.path.display(), "adding file");
            self.checker.add_crawler(Box::new(FileCrawler::new(entry.path)));
        } else {
            self.show_message("Unsupported file type", now);
        }
    }

    fn open_scorecard(&mut self, now: Instant) -> HandleResult {
        let Some(item) = self.selected_check_item() else {
            return HandleResult::Continue;
        };
        match item.scorecard() {
            Some(report) => HandleResult::OpenUrl(report.best_link().to_string()),
            None => {
                let text = format!("No scorecard for {}", file_name(item));
                self.show_message(text, now);
                HandleResult::Continue
            }
        }
    }

    /// Result of an aggregated report fetch started by [`MenuAction::Report`]
    pub fn on_report_fetched(
        &mut self,
        result: Result<Option<String>, String>,
        now: Instant,
    ) -> HandleResult {
        match result {
            Ok(Some(url)) => HandleResult::OpenUrl(url),
            Ok(None) => {
                self.show_message("No aggregated report available", now);
                HandleResult::Continue
            }
            Err(error) => {
                tracing::warn!(%error, "aggregated report fetch failed");
                self.show_message(format!("Report failed: {}", error), now);
                HandleResult::Continue
            }
        }
    }

    /// Stop listening to the checker and halt any running batch
    pub fn shutdown(&mut self) {
        if let Some(subscription) = self.subscription.take() {
            self.checker.unsubscribe(subscription.id());
        }
        self.checker.stop();
    }
}

fn file_name(item: &CheckItem) -> String {
    item.file
        .file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_else(|| item.file.display().to_string())
}

fn describe_item(item: &CheckItem) -> String {
    let name = file_name(item);
    match &item.state {
        CheckItemState::Pending => format!("{}: not checked yet", name),
        CheckItemState::Checked { score, status, .. } => {
            format!("{}: score {} ({})", name, score, status.as_str())
        }
        CheckItemState::Failed { error } => format!("{}: {}", name, error),
    }
}
