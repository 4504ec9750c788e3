//! acro-commander - batch check documents against an Acrolinx server
//!
//! A two-pane terminal UI: browse the filesystem on the left, queue files and
//! directories for checking on the right, then run the batch and open the
//! scorecards or the aggregated report in the browser.
//!
//! Reads `~/.config/acro-commander.config.json` at startup.

use std::sync::Arc;
use std::time::{Duration, Instant};

use acrocmd_core::{
    AcrolinxEndpoint, BatchChecker, CheckingEndpoint, ClientInfo, Config, ReferencePattern,
};
use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};

mod tracing_setup;
mod tui;

/// How long blocking crawl threads get to notice cancellation on exit
const SHUTDOWN_GRACE: Duration = Duration::from_millis(500);

#[derive(Parser, Debug)]
#[command(
    name = "acro-commander",
    author,
    version,
    about = "Terminal file commander for batch checking documents with Acrolinx",
    long_about = "Browse the filesystem, queue files and directories, check them against the \
                  Acrolinx server from ~/.config/acro-commander.config.json and open the \
                  resulting scorecards. Quit with F10, Escape, q or Ctrl-C."
)]
struct Cli {}

/// Reference pattern from the server, or the built-in one and a reason
async fn reference_pattern(
    endpoint: &dyn CheckingEndpoint,
    access_token: &str,
) -> (ReferencePattern, Option<String>) {
    let capabilities = match endpoint.checking_capabilities(access_token).await {
        Ok(capabilities) => capabilities,
        Err(err) => {
            warn!(error = %err, "capabilities unavailable, using default reference pattern");
            return (
                ReferencePattern::default(),
                Some(format!("Server unavailable: {}", err)),
            );
        }
    };

    match ReferencePattern::new(&capabilities.reference_pattern) {
        Ok(pattern) => {
            info!(pattern = pattern.as_str(), "reference pattern from server");
            (pattern, None)
        }
        Err(err) => {
            warn!(error = %err, "server pattern rejected, using default");
            (ReferencePattern::default(), Some(err.to_string()))
        }
    }
}

fn main() -> Result<()> {
    let _cli = Cli::parse();
    let log_path = tracing_setup::init().ok();

    let config = Config::load()?;
    info!(
        server = %config.server_address,
        log = ?log_path,
        "acro-commander starting"
    );

    let endpoint: Arc<dyn CheckingEndpoint> = Arc::new(AcrolinxEndpoint::new(
        config.server_address.clone(),
        ClientInfo::default(),
    ));
    // Built by hand so exit does not wait on a crawl stuck in a slow directory
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to start async runtime")?;
    let (pattern, warning) =
        runtime.block_on(reference_pattern(endpoint.as_ref(), &config.access_token));

    let handle = runtime.handle().clone();
    let checker = Arc::new(BatchChecker::new(
        endpoint.clone(),
        config.access_token.clone(),
        handle.clone(),
    ));

    let start_dir = std::env::current_dir().context("Cannot determine current directory")?;
    let browser = tui::sources::FileBrowser::new(start_dir)?;
    let mut app = tui::App::new(checker, browser, pattern, config.guidance_profile.clone());
    if let Some(warning) = warning {
        app.show_message(warning, Instant::now());
    }

    let reports = tui::ReportFetcher::new(endpoint, config.access_token.clone(), handle);
    let result = tui::run(&mut app, &reports);

    info!("acro-commander exiting");
    runtime.shutdown_timeout(SHUTDOWN_GRACE);
    result
}
