//! CLI - Command-line argument parsing
//!
//! Keeps argument parsing separate from execution logic.

use clap::{Parser, Subcommand};
use voxa_shared::DEFAULT_SERVER_URL;

/// Environment variable consulted when --server is absent
pub const SERVER_ENV: &str = "VOXA_SERVER";

/// Voxa voice assistant CLI
#[derive(Parser, Debug)]
#[command(name = "voxactl")]
#[command(about = "Voxa - talk to the voice assistant daemon", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Daemon base URL (overrides $VOXA_SERVER)
    #[arg(long, global = true)]
    pub server: Option<String>,

    /// Text-to-speech program, called with the reply as its last argument
    /// (e.g. "espeak-ng" or "say")
    #[arg(long, global = true)]
    pub voice_cmd: Option<String>,

    /// Open URLs from replies with the platform opener
    #[arg(long, global = true)]
    pub open_urls: bool,

    /// Verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Send a single command and print the reply
    Ask {
        /// The command, e.g. `voxactl ask what time is it`
        #[arg(required = true, trailing_var_arg = true)]
        words: Vec<String>,
    },

    /// Interactive session: one transcript per line on stdin
    Listen,

    /// Show your most frequent commands
    Suggest {
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Short confirmation summary of a command
    Summarize {
        #[arg(required = true, trailing_var_arg = true)]
        words: Vec<String>,
    },

    /// Check that the daemon is up
    Health,
}

impl Cli {
    /// --server, then $VOXA_SERVER, then the default
    pub fn server_url(&self) -> String {
        resolve_server(self.server.as_deref(), std::env::var(SERVER_ENV).ok())
    }
}

fn resolve_server(flag: Option<&str>, env: Option<String>) -> String {
    flag.map(str::to_string)
        .or(env)
        .map(|url| url.trim().trim_end_matches('/').to_string())
        .filter(|url| !url.is_empty())
        .unwrap_or_else(|| DEFAULT_SERVER_URL.to_string())
}

/// Join CLI words back into one utterance
pub fn join_words(words: &[String]) -> String {
    words.join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_ask() {
        let cli = Cli::try_parse_from(["voxactl", "ask", "weather", "in", "Paris"]).unwrap();
        match cli.command {
            Commands::Ask { words } => assert_eq!(join_words(&words), "weather in Paris"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "voxactl",
            "listen",
            "--voice-cmd",
            "espeak-ng",
            "--open-urls",
            "-v",
        ])
        .unwrap();
        assert!(matches!(cli.command, Commands::Listen));
        assert_eq!(cli.voice_cmd.as_deref(), Some("espeak-ng"));
        assert!(cli.open_urls);
        assert!(cli.verbose);
    }

    #[test]
    fn test_ask_requires_words() {
        assert!(Cli::try_parse_from(["voxactl", "ask"]).is_err());
    }

    #[test]
    fn test_server_resolution_order() {
        assert_eq!(
            resolve_server(Some("http://10.0.0.2:7878/"), Some("http://env:1".to_string())),
            "http://10.0.0.2:7878"
        );
        assert_eq!(resolve_server(None, Some("http://env:1".to_string())), "http://env:1");
        assert_eq!(resolve_server(None, Some("  ".to_string())), DEFAULT_SERVER_URL);
        assert_eq!(resolve_server(None, None), DEFAULT_SERVER_URL);
    }
}
