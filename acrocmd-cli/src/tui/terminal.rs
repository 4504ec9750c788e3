//! Terminal management and main run loop

use std::io::{self, Stdout};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use std::time::{Duration, Instant};

use acrocmd_core::CheckingEndpoint;
use anyhow::{Context, Result};
use crossterm::{
    event::{DisableMouseCapture, EnableMouseCapture, Event},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, layout::Rect, Terminal};
use tokio::runtime::Handle;

use super::app::App;
use super::event::{handle_key, handle_mouse, poll_event, HandleResult};
use super::opener::open_url;
use super::ui;

/// Input poll timeout; also bounds how late a timer tick can be drawn
const POLL_INTERVAL: Duration = Duration::from_millis(50);

type ReportResult = std::result::Result<Option<String>, String>;

/// Fetches aggregated report links off the UI thread
pub struct ReportFetcher {
    endpoint: Arc<dyn CheckingEndpoint>,
    access_token: String,
    runtime: Handle,
    sender: Sender<ReportResult>,
    receiver: Receiver<ReportResult>,
}

impl ReportFetcher {
    pub fn new(endpoint: Arc<dyn CheckingEndpoint>, access_token: String, runtime: Handle) -> Self {
        let (sender, receiver) = mpsc::channel();
        Self {
            endpoint,
            access_token,
            runtime,
            sender,
            receiver,
        }
    }

    fn fetch(&self, batch_id: String) {
        let endpoint = self.endpoint.clone();
        let access_token = self.access_token.clone();
        let sender = self.sender.clone();
        self.runtime.spawn(async move {
            let result = endpoint
                .aggregated_report_url(&access_token, &batch_id)
                .await
                .map_err(|err| err.to_string());
            // receiver is gone once the UI has exited
            let _ = sender.send(result);
        });
    }

    fn try_recv(&self) -> Option<ReportResult> {
        self.receiver.try_recv().ok()
    }
}

/// Initialize the terminal for TUI mode
fn init_terminal() -> Result<Terminal<CrosstermBackend<Stdout>>> {
    enable_raw_mode().context("Failed to enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)
        .context("Failed to enter alternate screen")?;
    let backend = CrosstermBackend::new(stdout);
    let terminal = Terminal::new(backend).context("Failed to create terminal")?;
    Ok(terminal)
}

/// Restore the terminal to normal mode
fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
    disable_raw_mode().context("Failed to disable raw mode")?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen, DisableMouseCapture)
        .context("Failed to leave alternate screen")?;
    terminal.show_cursor().context("Failed to show cursor")?;
    Ok(())
}

/// Run the TUI until the user quits
pub fn run(app: &mut App, reports: &ReportFetcher) -> Result<()> {
    let mut terminal = init_terminal()?;

    let result = run_loop(&mut terminal, app, reports);

    // Restore terminal (even if loop failed)
    app.shutdown();
    restore_terminal(&mut terminal)?;

    result
}

/// Main event loop
fn run_loop(
    terminal: &mut Terminal<CrosstermBackend<Stdout>>,
    app: &mut App,
    reports: &ReportFetcher,
) -> Result<()> {
    loop {
        let now = Instant::now();
        app.pump_events(now);
        app.tick(now);
        while let Some(fetched) = reports.try_recv() {
            let result = app.on_report_fetched(fetched, now);
            apply(app, result, reports, now);
        }

        let size = terminal.size().context("Failed to read terminal size")?;
        let layout = ui::screen_layout(Rect::new(0, 0, size.width, size.height));
        let (browser_height, check_list_height) = layout.list_heights();
        app.resize(browser_height, check_list_height);

        terminal.draw(|frame| ui::render(frame, app))?;

        if let Some(event) = poll_event(POLL_INTERVAL)? {
            let now = Instant::now();
            let result = match event {
                Event::Key(key) => handle_key(app, key, now),
                Event::Mouse(mouse) => handle_mouse(app, mouse, &layout, now),
                // Terminal resized, will be handled on next draw
                _ => HandleResult::Continue,
            };
            apply(app, result, reports, now);
        }

        if app.should_quit {
            break;
        }
    }

    Ok(())
}

/// Carry out what an input handler asked for
fn apply(app: &mut App, result: HandleResult, reports: &ReportFetcher, now: Instant) {
    match result {
        HandleResult::Continue => {}
        HandleResult::Quit => app.should_quit = true,
        HandleResult::OpenUrl(url) => {
            if let Err(err) = open_url(&url) {
                tracing::warn!(%url, error = %err, "failed to open link");
                app.show_message(format!("{:#}", err), now);
            }
        }
        HandleResult::FetchReport(batch_id) => {
            tracing::info!(%batch_id, "fetching aggregated report");
            reports.fetch(batch_id);
        }
    }
}
