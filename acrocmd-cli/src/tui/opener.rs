//! Opening links in the system browser

use std::ffi::OsString;
use std::io;
use std::process::{Command, ExitStatus, Stdio};
use std::thread::{self, JoinHandle};

use anyhow::{bail, Context, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
struct UrlOpenCommand {
    program: &'static str,
    prefix_args: Vec<OsString>,
}

fn command_for_os(target_os: &str) -> Result<UrlOpenCommand> {
    match target_os {
        "macos" => Ok(UrlOpenCommand {
            program: "open",
            prefix_args: Vec::new(),
        }),
        "windows" => Ok(UrlOpenCommand {
            program: "cmd",
            prefix_args: vec!["/C".into(), "start".into(), "".into()],
        }),
        "linux" | "freebsd" | "openbsd" | "netbsd" => Ok(UrlOpenCommand {
            program: "xdg-open",
            prefix_args: Vec::new(),
        }),
        other => bail!("Opening links is not supported on {}", other),
    }
}

/// Start `command` detached from the terminal and reap it on a
/// background thread once it exits
fn spawn_detached(mut command: Command) -> io::Result<JoinHandle<io::Result<ExitStatus>>> {
    let mut child = command
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()?;
    Ok(thread::spawn(move || child.wait()))
}

/// Hand `url` to the platform opener without waiting for it
pub fn open_url(url: &str) -> Result<()> {
    let command = command_for_os(std::env::consts::OS)?;
    let mut args = command.prefix_args;
    args.push(url.into());

    tracing::info!(%url, opener = command.program, "opening link");
    let mut opener = Command::new(command.program);
    opener.args(&args);
    spawn_detached(opener).with_context(|| format!("Failed to run {}", command.program))?;
    Ok(())
}
