//! Assistant responses and the follow-on actions they can carry.

use serde::{Deserialize, Serialize};

/// Used whenever a handler would otherwise produce empty text
pub const GENERIC_APOLOGY: &str = "Sorry, I encountered an error processing your command.";

/// Follow-on action attached to a response. The caller decides how to act on it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Action {
    /// Caller should navigate to / open the URL
    OpenUrl { url: String },
    /// Would run a program on the user's machine. Informational only,
    /// nothing is ever spawned on the daemon side.
    ExecuteLocal {
        #[serde(rename = "command_description")]
        description: String,
    },
}

/// Structured reply to a single command
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandResponse {
    /// Human-readable reply, never empty
    pub text: String,
    /// Whether the client should read the reply aloud
    pub vocalize: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<Action>,
}

impl CommandResponse {
    /// Response that should be read aloud
    pub fn spoken(text: impl Into<String>) -> Self {
        Self::build(text.into(), true)
    }

    /// Response that is shown but not vocalized
    pub fn silent(text: impl Into<String>) -> Self {
        Self::build(text.into(), false)
    }

    fn build(text: String, vocalize: bool) -> Self {
        let text = if text.trim().is_empty() {
            GENERIC_APOLOGY.to_string()
        } else {
            text
        };
        Self {
            text,
            vocalize,
            action: None,
        }
    }

    pub fn with_action(mut self, action: Action) -> Self {
        self.action = Some(action);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_text_replaced() {
        let response = CommandResponse::spoken("   ");
        assert_eq!(response.text, GENERIC_APOLOGY);
        assert!(response.vocalize);
    }

    #[test]
    fn test_open_url_wire_format() {
        let response = CommandResponse::spoken("Opening YouTube.").with_action(Action::OpenUrl {
            url: "https://www.youtube.com".to_string(),
        });
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["action"]["type"], "open_url");
        assert_eq!(json["action"]["url"], "https://www.youtube.com");
        assert_eq!(json["vocalize"], true);
    }

    #[test]
    fn test_execute_local_wire_format() {
        let action = Action::ExecuteLocal {
            description: "open notepad".to_string(),
        };
        let json = serde_json::to_string(&action).unwrap();
        assert_eq!(
            json,
            r#"{"type":"execute_local","command_description":"open notepad"}"#
        );
        let back: Action = serde_json::from_str(&json).unwrap();
        assert_eq!(back, action);
    }

    #[test]
    fn test_action_omitted_when_absent() {
        let json = serde_json::to_string(&CommandResponse::silent("ok")).unwrap();
        assert!(!json.contains("action"));
    }
}
