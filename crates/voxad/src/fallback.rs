//! Fallback classifier.
//!
//! Handles utterances no rule matched by asking a generative model for an
//! actionable reply. The model sees a fixed instruction template with the
//! command substituted in and answers `{"interpretedCommand": "..."}`.
//! Failures are reported, never retried.

use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::time::timeout;
use tracing::{debug, warn};

/// Placeholder replaced with the user's command
pub const COMMAND_PLACEHOLDER: &str = "{{command}}";

pub const DEFAULT_FALLBACK_TIMEOUT: Duration = Duration::from_secs(20);

/// Persona and behaviour rules for free-form replies
pub const INTERPRET_TEMPLATE: &str = r#"You are a friendly desktop voice assistant. Answer conversationally, like a helpful person, never like a dictionary.

GUIDELINES:
1. Give a direct, actionable reply to what the user wants done.
2. Use metric units everywhere (Celsius, kilometres, km/h).
3. Keep it short. Your reply will be read aloud.
4. When asked to do something, confirm you are on it instead of explaining how it works.
5. For look-ups and searches, offer to find the information instead of listing limitations.

WEATHER:
- If the user asks about the weather without naming a place, ask which city they mean.
- Present weather data in a short structured form, metric units only.

APPLICATIONS:
- When asked to open an application, reply as if you can help open it.
- If the application name is unclear, ask the user which application they mean.

GENERAL:
- For time, date or arithmetic questions, give the answer itself.
- For facts, people or concepts, give a brief accurate answer.
- When asked what you can do, talk about what you CAN do.

Respond with JSON only, no other text:
{"interpretedCommand": "<your reply to the user>"}

User Command: {{command}}"#;

/// Short confirmation summary of a command
pub const SUMMARIZE_TEMPLATE: &str = r#"Summarize the following command in a few words so the user can confirm it.

Respond with JSON only, no other text:
{"summary": "<short summary>"}

Command: {{command}}"#;

#[derive(Debug, Error)]
pub enum FallbackError {
    #[error("language model timed out after {0:?}")]
    Timeout(Duration),

    #[error("language model request failed: {0}")]
    Provider(String),

    #[error("language model returned an unusable reply: {0}")]
    Malformed(String),
}

/// Text in, text out
#[async_trait]
pub trait TextCompletion: Send + Sync {
    async fn complete(&self, prompt: &str) -> anyhow::Result<String>;

    /// Name used in logs
    fn name(&self) -> &str {
        "model"
    }
}

pub struct FallbackClassifier {
    backend: Arc<dyn TextCompletion>,
    interpret_template: String,
    summarize_template: String,
    timeout: Duration,
}

impl FallbackClassifier {
    pub fn new(backend: Arc<dyn TextCompletion>) -> Self {
        Self {
            backend,
            interpret_template: INTERPRET_TEMPLATE.to_string(),
            summarize_template: SUMMARIZE_TEMPLATE.to_string(),
            timeout: DEFAULT_FALLBACK_TIMEOUT,
        }
    }

    /// Replace the interpretation template. Templates without the
    /// placeholder get the command appended on its own line.
    pub fn with_template(mut self, template: impl Into<String>) -> Self {
        self.interpret_template = template.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Actionable reply for a free-form command
    pub async fn interpret(&self, command: &str) -> Result<String, FallbackError> {
        let prompt = render(&self.interpret_template, command);
        let reply = self.call(&prompt).await?;
        extract_field(&reply, "interpretedCommand")
    }

    /// Short confirmation summary of a command
    pub async fn summarize(&self, command: &str) -> Result<String, FallbackError> {
        let prompt = render(&self.summarize_template, command);
        let reply = self.call(&prompt).await?;
        extract_field(&reply, "summary")
    }

    async fn call(&self, prompt: &str) -> Result<String, FallbackError> {
        debug!("Fallback prompt via {} ({} chars)", self.backend.name(), prompt.len());
        match timeout(self.timeout, self.backend.complete(prompt)).await {
            Err(_) => {
                warn!("Model {} timed out after {:?}", self.backend.name(), self.timeout);
                Err(FallbackError::Timeout(self.timeout))
            }
            Ok(Err(e)) => {
                warn!("Model {} failed: {:#}", self.backend.name(), e);
                Err(FallbackError::Provider(e.to_string()))
            }
            Ok(Ok(reply)) => Ok(reply),
        }
    }
}

/// Fill the template's placeholder with the command
pub fn render(template: &str, command: &str) -> String {
    if template.contains(COMMAND_PLACEHOLDER) {
        template.replace(COMMAND_PLACEHOLDER, command)
    } else {
        format!("{}\n\n{}", template.trim_end(), command)
    }
}

/// Extract JSON object from a model reply (handles surrounding text and fences)
fn extract_json(reply: &str) -> Option<&str> {
    let start = reply.find('{')?;
    let end = reply.rfind('}')?;
    (end > start).then(|| &reply[start..=end])
}

/// Pull a string field out of the reply. Replies that do not carry a JSON
/// object, including prose with stray braces, are taken verbatim.
pub fn extract_field(reply: &str, field: &str) -> Result<String, FallbackError> {
    let trimmed = reply.trim();
    if trimmed.is_empty() {
        return Err(FallbackError::Malformed("empty reply".to_string()));
    }

    let object = extract_json(trimmed)
        .and_then(|json| serde_json::from_str::<Value>(json).ok())
        .filter(Value::is_object);
    let Some(value) = object else {
        debug!("Model reply is not a JSON object, using it verbatim");
        return Ok(trimmed.to_string());
    };

    value
        .get(field)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .ok_or_else(|| FallbackError::Malformed(format!("missing `{}`", field)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Returns a canned reply and remembers the prompts it saw
    struct CannedModel {
        reply: String,
        prompts: Mutex<Vec<String>>,
    }

    impl CannedModel {
        fn new(reply: &str) -> Arc<Self> {
            Arc::new(Self {
                reply: reply.to_string(),
                prompts: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl TextCompletion for CannedModel {
        async fn complete(&self, prompt: &str) -> anyhow::Result<String> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            Ok(self.reply.clone())
        }
    }

    #[derive(Default)]
    struct FailingModel {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl TextCompletion for FailingModel {
        async fn complete(&self, _prompt: &str) -> anyhow::Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            anyhow::bail!("quota exceeded")
        }
    }

    struct SlowModel;

    #[async_trait]
    impl TextCompletion for SlowModel {
        async fn complete(&self, _prompt: &str) -> anyhow::Result<String> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(r#"{"interpretedCommand":"too late"}"#.to_string())
        }
    }

    #[test]
    fn test_render_substitutes_command() {
        let prompt = render(INTERPRET_TEMPLATE, "who painted the mona lisa");
        assert!(prompt.ends_with("User Command: who painted the mona lisa"));
        assert!(!prompt.contains(COMMAND_PLACEHOLDER));
        assert_eq!(render("Answer this:", "hi"), "Answer this:\n\nhi");
    }

    #[test]
    fn test_extract_field_with_surrounding_text() {
        let reply = "Sure thing!\n```json\n{\"interpretedCommand\": \"Leonardo da Vinci painted it.\"}\n```";
        assert_eq!(
            extract_field(reply, "interpretedCommand").unwrap(),
            "Leonardo da Vinci painted it."
        );
    }

    #[test]
    fn test_extract_field_plain_text_is_verbatim() {
        assert_eq!(
            extract_field("  It is 12 degrees.  ", "interpretedCommand").unwrap(),
            "It is 12 degrees."
        );
    }

    #[test]
    fn test_prose_with_braces_is_verbatim() {
        assert_eq!(
            extract_field("Use {name} as a placeholder in format strings.", "interpretedCommand").unwrap(),
            "Use {name} as a placeholder in format strings."
        );
        assert_eq!(
            extract_field(" Sets are written like {1, 2, 3} in maths. ", "interpretedCommand").unwrap(),
            "Sets are written like {1, 2, 3} in maths."
        );
        assert_eq!(extract_field(r#"{"summary": }"#, "summary").unwrap(), r#"{"summary": }"#);
    }

    #[test]
    fn test_extract_field_malformed() {
        assert!(matches!(extract_field("", "summary"), Err(FallbackError::Malformed(_))));
        assert!(matches!(
            extract_field(r#"{"other": "x"}"#, "summary"),
            Err(FallbackError::Malformed(_))
        ));
        assert!(matches!(
            extract_field(r#"{"summary": "  "}"#, "summary"),
            Err(FallbackError::Malformed(_))
        ));
    }

    #[tokio::test]
    async fn test_interpret_uses_template() {
        let model = CannedModel::new(r#"{"interpretedCommand": "Which city do you mean?"}"#);
        let classifier = FallbackClassifier::new(model.clone());
        let reply = classifier.interpret("how hot is it").await.unwrap();
        assert_eq!(reply, "Which city do you mean?");

        let prompts = model.prompts.lock().unwrap();
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].contains("metric units"));
        assert!(prompts[0].ends_with("User Command: how hot is it"));
    }

    #[tokio::test]
    async fn test_custom_template() {
        let model = CannedModel::new("ok");
        let classifier = FallbackClassifier::new(model.clone()).with_template("Q: {{command}}");
        classifier.interpret("ping").await.unwrap();
        assert_eq!(model.prompts.lock().unwrap()[0], "Q: ping");
    }

    #[tokio::test]
    async fn test_summarize() {
        let model = CannedModel::new(r#"{"summary": "Open Notepad"}"#);
        let classifier = FallbackClassifier::new(model);
        assert_eq!(classifier.summarize("please open notepad for me").await.unwrap(), "Open Notepad");
    }

    #[tokio::test]
    async fn test_provider_failure_is_not_retried() {
        let model = Arc::new(FailingModel::default());
        let classifier = FallbackClassifier::new(model.clone());
        let err = classifier.interpret("anything").await.unwrap_err();
        assert!(matches!(err, FallbackError::Provider(ref m) if m.contains("quota")));
        assert_eq!(model.calls.load(Ordering::SeqCst), 1);

        assert!(classifier.summarize("anything").await.is_err());
        assert_eq!(model.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_timeout() {
        let classifier = FallbackClassifier::new(Arc::new(SlowModel))
            .with_timeout(Duration::from_millis(50));
        let err = classifier.interpret("anything").await.unwrap_err();
        assert!(matches!(err, FallbackError::Timeout(_)));
    }
}
