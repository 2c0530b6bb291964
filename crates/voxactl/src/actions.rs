//! Client-side handling of follow-on actions.
//!
//! URLs are opened only when the user asked for it with --open-urls. Local
//! program actions are never executed, only reported.

use std::process::{Command, Stdio};
use tracing::{debug, warn};
use voxa_shared::Action;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionOutcome {
    /// URL handed to the platform opener
    Opened(String),
    /// URL printed only
    Shown(String),
    /// Local program the daemon would like to run
    WouldRunLocally(String),
    /// Opener could not be started
    Failed(String),
}

impl ActionOutcome {
    pub fn describe(&self) -> String {
        match self {
            Self::Opened(url) => format!("Opened {}", url),
            Self::Shown(url) => format!("Link: {}", url),
            Self::WouldRunLocally(description) => format!("Would run locally: {}", description),
            Self::Failed(reason) => format!("Could not open link: {}", reason),
        }
    }
}

/// Act on `action`
pub fn perform(action: &Action, open_urls: bool) -> ActionOutcome {
    match action {
        Action::OpenUrl { url } if open_urls => match open_url(url) {
            Ok(()) => ActionOutcome::Opened(url.clone()),
            Err(e) => {
                warn!("Opener failed for {}: {}", url, e);
                ActionOutcome::Failed(e.to_string())
            }
        },
        Action::OpenUrl { url } => ActionOutcome::Shown(url.clone()),
        Action::ExecuteLocal { description } => ActionOutcome::WouldRunLocally(description.clone()),
    }
}

fn opener() -> (&'static str, Vec<&'static str>) {
    if cfg!(target_os = "macos") {
        ("open", Vec::new())
    } else if cfg!(windows) {
        ("cmd", vec!["/C", "start", ""])
    } else {
        ("xdg-open", Vec::new())
    }
}

fn open_url(url: &str) -> std::io::Result<()> {
    let (program, args) = opener();
    debug!("Opening {} with {}", url, program);
    Command::new(program)
        .args(args)
        .arg(url)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .map(|_| ())
}
