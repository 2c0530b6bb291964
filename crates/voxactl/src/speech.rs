//! Voice input and output collaborators.
//!
//! Input is a stream of transcripts. The built-in transcriber reads one
//! utterance per line, so any speech-to-text tool that prints lines can be
//! piped in. Output is a text-to-speech program; starting a new utterance
//! cancels whatever is still playing.

use async_trait::async_trait;
use std::process::Stdio;
use std::sync::Mutex;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader, Stdin};
use tokio::process::Command;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, warn};
use voxa_shared::VoxaError;

/// Source of user utterances
#[async_trait]
pub trait Transcriber: Send {
    fn start(&mut self) -> Result<(), VoxaError>;

    fn stop(&mut self);

    /// Next utterance, None once the source is exhausted
    async fn next_transcript(&mut self) -> Result<Option<String>, VoxaError>;
}

/// One transcript per line of an async reader
pub struct LineTranscriber<R> {
    reader: R,
    listening: bool,
}

pub type StdinTranscriber = LineTranscriber<BufReader<Stdin>>;

impl<R> LineTranscriber<R>
where
    R: AsyncBufRead + Unpin + Send,
{
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            listening: false,
        }
    }
}

impl StdinTranscriber {
    pub fn stdin() -> Self {
        Self::new(BufReader::new(tokio::io::stdin()))
    }
}

#[async_trait]
impl<R> Transcriber for LineTranscriber<R>
where
    R: AsyncBufRead + Unpin + Send,
{
    fn start(&mut self) -> Result<(), VoxaError> {
        self.listening = true;
        Ok(())
    }

    fn stop(&mut self) {
        self.listening = false;
    }

    async fn next_transcript(&mut self) -> Result<Option<String>, VoxaError> {
        if !self.listening {
            return Err(VoxaError::Capture("capture has not been started".to_string()));
        }
        let mut line = String::new();
        let read = self
            .reader
            .read_line(&mut line)
            .await
            .map_err(|e| VoxaError::Capture(e.to_string()))?;
        if read == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim_end_matches(['\r', '\n']).to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpeechEvent {
    Start,
    End,
    /// Interrupted by a newer utterance or an explicit cancel
    Cancelled,
    Error(String),
}

/// Channel pair for speech lifecycle events
pub fn speech_events() -> (
    mpsc::UnboundedSender<SpeechEvent>,
    mpsc::UnboundedReceiver<SpeechEvent>,
) {
    mpsc::unbounded_channel()
}

/// Text-to-speech output
#[async_trait]
pub trait Speaker: Send + Sync {
    /// Start speaking `text`, cancelling anything still in progress
    async fn speak(&self, text: &str) -> Result<(), VoxaError>;

    /// Stop the current utterance, if any
    fn cancel(&self);
}

/// Speaks by running an external program with the text as last argument
pub struct CommandSpeaker {
    program: String,
    args: Vec<String>,
    events: mpsc::UnboundedSender<SpeechEvent>,
    current: Mutex<Option<oneshot::Sender<()>>>,
}

impl CommandSpeaker {
    /// `command_line` is split on whitespace: "espeak-ng -s 150"
    pub fn new(command_line: &str, events: mpsc::UnboundedSender<SpeechEvent>) -> Result<Self, VoxaError> {
        let mut parts = command_line.split_whitespace().map(str::to_string);
        let program = parts
            .next()
            .ok_or_else(|| VoxaError::Speech("empty voice command".to_string()))?;
        Ok(Self {
            program,
            args: parts.collect(),
            events,
            current: Mutex::new(None),
        })
    }

    pub fn with_args(mut self, args: &[&str]) -> Self {
        self.args = args.iter().map(|a| a.to_string()).collect();
        self
    }

    fn emit(&self, event: SpeechEvent) {
        let _ = self.events.send(event);
    }
}

#[async_trait]
impl Speaker for CommandSpeaker {
    async fn speak(&self, text: &str) -> Result<(), VoxaError> {
        self.cancel();

        let mut child = Command::new(&self.program)
            .args(&self.args)
            .arg(text)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                let message = format!("cannot run {}: {}", self.program, e);
                self.emit(SpeechEvent::Error(message.clone()));
                VoxaError::Speech(message)
            })?;

        let (cancel_tx, cancel_rx) = oneshot::channel();
        *self.current.lock().unwrap_or_else(|e| e.into_inner()) = Some(cancel_tx);
        self.emit(SpeechEvent::Start);

        let events = self.events.clone();
        tokio::spawn(async move {
            let event = tokio::select! {
                status = child.wait() => match status {
                    Ok(status) if status.success() => SpeechEvent::End,
                    Ok(status) => SpeechEvent::Error(format!("voice command exited with {}", status)),
                    Err(e) => SpeechEvent::Error(e.to_string()),
                },
                _ = cancel_rx => {
                    if let Err(e) = child.kill().await {
                        warn!("Could not stop voice command: {}", e);
                    }
                    SpeechEvent::Cancelled
                }
            };
            debug!("Speech finished: {:?}", event);
            let _ = events.send(event);
        });
        Ok(())
    }

    fn cancel(&self) {
        if let Some(previous) = self.current.lock().unwrap_or_else(|e| e.into_inner()).take() {
            // already finished if the receiver is gone
            let _ = previous.send(());
        }
    }
}

/// Emits events without producing sound
pub struct SilentSpeaker {
    events: mpsc::UnboundedSender<SpeechEvent>,
}

impl SilentSpeaker {
    pub fn new(events: mpsc::UnboundedSender<SpeechEvent>) -> Self {
        Self { events }
    }
}

#[async_trait]
impl Speaker for SilentSpeaker {
    async fn speak(&self, _text: &str) -> Result<(), VoxaError> {
        let _ = self.events.send(SpeechEvent::Start);
        let _ = self.events.send(SpeechEvent::End);
        Ok(())
    }

    fn cancel(&self) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::time::timeout;

    async fn next_event(rx: &mut mpsc::UnboundedReceiver<SpeechEvent>) -> SpeechEvent {
        timeout(Duration::from_secs(5), rx.recv())
            .await
            .expect("event within 5s")
            .expect("channel open")
    }

    #[tokio::test]
    async fn test_line_transcriber() {
        let mut t = LineTranscriber::new(&b"hello\r\nweather in Paris\n"[..]);
        assert!(matches!(t.next_transcript().await, Err(VoxaError::Capture(_))));

        t.start().unwrap();
        assert_eq!(t.next_transcript().await.unwrap().as_deref(), Some("hello"));
        assert_eq!(t.next_transcript().await.unwrap().as_deref(), Some("weather in Paris"));
        assert_eq!(t.next_transcript().await.unwrap(), None);

        t.stop();
        assert!(t.next_transcript().await.is_err());
    }

    #[tokio::test]
    async fn test_silent_speaker_events() {
        let (tx, mut rx) = speech_events();
        let speaker = SilentSpeaker::new(tx);
        speaker.speak("hi").await.unwrap();
        assert_eq!(next_event(&mut rx).await, SpeechEvent::Start);
        assert_eq!(next_event(&mut rx).await, SpeechEvent::End);
    }

    #[test]
    fn test_empty_voice_command_rejected() {
        let (tx, _rx) = speech_events();
        assert!(matches!(CommandSpeaker::new("   ", tx), Err(VoxaError::Speech(_))));
    }

    #[tokio::test]
    async fn test_missing_program_reports_error() {
        let (tx, mut rx) = speech_events();
        let speaker = CommandSpeaker::new("voxa-no-such-tts-program", tx).unwrap();
        assert!(matches!(speaker.speak("hi").await, Err(VoxaError::Speech(_))));
        assert!(matches!(next_event(&mut rx).await, SpeechEvent::Error(_)));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_program_runs_to_completion() {
        let (tx, mut rx) = speech_events();
        let speaker = CommandSpeaker::new("true", tx).unwrap();
        speaker.speak("done").await.unwrap();
        assert_eq!(next_event(&mut rx).await, SpeechEvent::Start);
        assert_eq!(next_event(&mut rx).await, SpeechEvent::End);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_new_utterance_cancels_previous() {
        let (tx, mut rx) = speech_events();
        // the text lands in $0 and is ignored
        let speaker = CommandSpeaker::new("sh", tx)
            .unwrap()
            .with_args(&["-c", "sleep 5"]);

        speaker.speak("first").await.unwrap();
        speaker.speak("second").await.unwrap();

        let mut seen = Vec::new();
        while !seen.contains(&SpeechEvent::Cancelled) {
            seen.push(next_event(&mut rx).await);
        }
        assert_eq!(seen.iter().filter(|e| **e == SpeechEvent::Start).count(), 2);

        speaker.cancel();
        assert_eq!(next_event(&mut rx).await, SpeechEvent::Cancelled);
    }
}
