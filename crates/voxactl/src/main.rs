//! Voxa Control - CLI client for the Voxa voice assistant
//!
//! Sends commands to voxad, prints replies, and optionally speaks them.

use anyhow::Result;
use clap::Parser;
use owo_colors::OwoColorize;
use std::sync::Arc;
use tracing::debug;
use tracing_subscriber::EnvFilter;
use voxa_shared::rpc::DEFAULT_SUGGESTIONS;
use voxa_shared::VoxaError;
use voxactl::actions::perform;
use voxactl::cli::{join_words, Cli, Commands};
use voxactl::client::{Assistant, VoxadClient};
use voxactl::listen::{ListenOptions, ListenSession};
use voxactl::speech::{speech_events, CommandSpeaker, SilentSpeaker, Speaker, SpeechEvent, StdinTranscriber};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let level = if cli.verbose { "voxactl=debug" } else { "voxactl=warn" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(level))
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(cli).await {
        eprintln!("{} {:#}", "error:".red().bold(), e);
        let code = e
            .downcast_ref::<VoxaError>()
            .map(VoxaError::exit_code)
            .unwrap_or(1);
        std::process::exit(code);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let client = VoxadClient::new(cli.server_url());
    debug!("Using daemon at {}", client.base_url());

    match &cli.command {
        Commands::Ask { words } => {
            let response = client.command(&join_words(words)).await?;
            println!("{}", response.text);
            if let Some(action) = &response.action {
                println!("  {}", perform(action, cli.open_urls).describe().yellow());
            }
            if response.vocalize {
                if let Some(voice_cmd) = &cli.voice_cmd {
                    speak_to_end(voice_cmd, &response.text).await?;
                }
            }
        }
        Commands::Listen => {
            let speaker = build_speaker(cli.voice_cmd.as_deref())?;
            let mut transcriber = StdinTranscriber::stdin();
            let options = ListenOptions {
                open_urls: cli.open_urls,
            };
            let summary = ListenSession::new(&client, &mut transcriber, speaker.as_ref(), std::io::stdout(), options)
                .run()
                .await?;
            debug!("Listen session ended: {:?}", summary);
        }
        Commands::Suggest { limit } => {
            let suggestions = client.suggestions(limit.unwrap_or(DEFAULT_SUGGESTIONS)).await?;
            if suggestions.is_empty() {
                println!("{}", "No commands yet.".dimmed());
            }
            for (i, suggestion) in suggestions.iter().enumerate() {
                println!("{}. {}", i + 1, suggestion);
            }
        }
        Commands::Summarize { words } => {
            println!("{}", client.summarize(&join_words(words)).await?);
        }
        Commands::Health => {
            let health = client.health().await?;
            println!(
                "{} voxad {} ({}), up {}s",
                "●".green(),
                health.version,
                health.status,
                health.uptime_secs
            );
        }
    }
    Ok(())
}

fn build_speaker(voice_cmd: Option<&str>) -> Result<Arc<dyn Speaker>, VoxaError> {
    let (tx, mut rx) = speech_events();
    tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            if let SpeechEvent::Error(message) = &event {
                eprintln!("{} {}", "speech:".yellow(), message);
            }
            debug!("Speech event: {:?}", event);
        }
    });

    Ok(match voice_cmd {
        Some(cmd) => Arc::new(CommandSpeaker::new(cmd, tx)?),
        None => Arc::new(SilentSpeaker::new(tx)),
    })
}

/// One-shot speech: wait for the program to finish before exiting
async fn speak_to_end(voice_cmd: &str, text: &str) -> Result<()> {
    let (tx, mut rx) = speech_events();
    let speaker = CommandSpeaker::new(voice_cmd, tx)?;
    speaker.speak(text).await?;
    while let Some(event) = rx.recv().await {
        match event {
            SpeechEvent::End | SpeechEvent::Cancelled => break,
            SpeechEvent::Error(message) => return Err(VoxaError::Speech(message).into()),
            SpeechEvent::Start => {}
        }
    }
    Ok(())
}
