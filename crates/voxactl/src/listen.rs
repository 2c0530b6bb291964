//! Interactive listen loop.
//!
//! Reads transcripts one at a time, sends each to the daemon and waits for
//! the reply before reading the next. Replies flagged for vocalization are
//! spoken unless they repeat the previous spoken text.

use crate::actions::perform;
use crate::client::Assistant;
use crate::speech::{Speaker, Transcriber};
use owo_colors::OwoColorize;
use std::io::Write;
use tracing::warn;
use voxa_shared::response::GENERIC_APOLOGY;
use voxa_shared::rpc::DEFAULT_SUGGESTIONS;
use voxa_shared::VoxaError;

pub const WELCOME: &str = "Welcome to Voxa! Say a command (one per line), or \"quit\" to leave.";

#[derive(Debug, Clone, Copy, Default)]
pub struct ListenOptions {
    pub open_urls: bool,
}

/// Counters reported when the loop ends
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ListenSummary {
    pub commands: usize,
    pub spoken: usize,
    pub failures: usize,
}

pub struct ListenSession<'a, A, T, S: ?Sized, W> {
    assistant: &'a A,
    transcriber: &'a mut T,
    speaker: &'a S,
    out: W,
    options: ListenOptions,
    last_spoken: Option<String>,
    summary: ListenSummary,
}

impl<'a, A, T, S, W> ListenSession<'a, A, T, S, W>
where
    A: Assistant,
    T: Transcriber,
    S: Speaker + ?Sized,
    W: Write,
{
    pub fn new(assistant: &'a A, transcriber: &'a mut T, speaker: &'a S, out: W, options: ListenOptions) -> Self {
        Self {
            assistant,
            transcriber,
            speaker,
            out,
            options,
            last_spoken: None,
            summary: ListenSummary::default(),
        }
    }

    /// Run until the transcript source ends or the user says quit
    pub async fn run(mut self) -> Result<ListenSummary, VoxaError> {
        writeln!(self.out, "{}", WELCOME.bold())?;
        self.show_suggestions().await?;

        self.transcriber.start()?;
        let result = self.listen().await;
        self.transcriber.stop();
        self.speaker.cancel();
        result?;

        Ok(self.summary)
    }

    async fn listen(&mut self) -> Result<(), VoxaError> {
        while let Some(transcript) = self.transcriber.next_transcript().await? {
            let command = transcript.trim();
            if command.is_empty() {
                continue;
            }
            if matches!(command.to_lowercase().as_str(), "quit" | "exit") {
                writeln!(self.out, "{}", "Goodbye!".dimmed())?;
                break;
            }

            writeln!(self.out, "{} {}", ">".cyan(), command)?;
            self.handle(command).await?;
            self.show_suggestions().await?;
        }
        Ok(())
    }

    async fn handle(&mut self, command: &str) -> Result<(), VoxaError> {
        self.summary.commands += 1;

        let response = match self.assistant.command(command).await {
            Ok(response) => response,
            Err(e) => {
                self.summary.failures += 1;
                writeln!(self.out, "{}", GENERIC_APOLOGY.red())?;
                writeln!(self.out, "  {}", e.to_string().dimmed())?;
                self.say(GENERIC_APOLOGY).await;
                return Ok(());
            }
        };

        writeln!(self.out, "{}", response.text.green())?;
        if let Some(action) = &response.action {
            let outcome = perform(action, self.options.open_urls);
            writeln!(self.out, "  {}", outcome.describe().yellow())?;
        }
        if response.vocalize {
            self.say(&response.text).await;
        }
        Ok(())
    }

    async fn say(&mut self, text: &str) {
        if self.last_spoken.as_deref() == Some(text) {
            return;
        }
        match self.speaker.speak(text).await {
            Ok(()) => {
                self.summary.spoken += 1;
                self.last_spoken = Some(text.to_string());
            }
            Err(e) => warn!("Speech output failed: {}", e),
        }
    }

    async fn show_suggestions(&mut self) -> Result<(), VoxaError> {
        match self.assistant.suggestions(DEFAULT_SUGGESTIONS).await {
            Ok(suggestions) if !suggestions.is_empty() => {
                writeln!(self.out, "{} {}", "Try:".dimmed(), suggestions.join(" | "))?;
            }
            Ok(_) => {}
            Err(e) => warn!("Suggestions unavailable: {}", e),
        }
        Ok(())
    }
}
