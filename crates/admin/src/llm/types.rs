//! Request and response types for OpenAI-compatible chat completions.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Message author role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// A single chat message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    /// A user-role message.
    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

/// Chat completion request body.
#[derive(Debug, Clone, Serialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
}

/// Chat completion response.
///
/// Kept as raw JSON so that a structurally unexpected reply still
/// deserializes; [`ChatResponse::content`] then yields an empty string.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(transparent)]
pub struct ChatResponse(Value);

/// Token accounting reported by the endpoint.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct Usage {
    #[serde(default)]
    pub prompt_tokens: u64,
    #[serde(default)]
    pub completion_tokens: u64,
}

impl ChatResponse {
    /// The first choice's message content, or `""` when absent or not a string.
    #[must_use]
    pub fn content(&self) -> &str {
        self.0
            .pointer("/choices/0/message/content")
            .and_then(Value::as_str)
            .unwrap_or_default()
    }

    /// Token usage, when reported in the expected shape.
    #[must_use]
    pub fn usage(&self) -> Option<Usage> {
        self.0
            .get("usage")
            .and_then(|usage| Usage::deserialize(usage).ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_serializes_user_message() {
        let request = ChatRequest {
            model: "llama3-70b-8192".to_string(),
            messages: vec![ChatMessage::user("hello")],
        };
        let json = serde_json::to_value(&request).expect("serialize");
        assert_eq!(json["model"], "llama3-70b-8192");
        assert_eq!(json["messages"][0]["role"], "user");
        assert_eq!(json["messages"][0]["content"], "hello");
    }

    #[test]
    fn test_content_extracts_first_choice() {
        let json = r#"{
            "id": "chatcmpl-1",
            "choices": [
                {"index": 0, "message": {"role": "assistant", "content": "1. כותרת: Blue"}},
                {"index": 1, "message": {"role": "assistant", "content": "ignored"}}
            ],
            "usage": {"prompt_tokens": 10, "completion_tokens": 5}
        }"#;
        let response: ChatResponse = serde_json::from_str(json).expect("deserialize");
        assert_eq!(response.content(), "1. כותרת: Blue");
        assert_eq!(response.usage().map(|u| u.completion_tokens), Some(5));
    }

    #[test]
    fn test_content_defaults_to_empty_on_mismatch() {
        for json in [
            "{}",
            r#"{"choices": []}"#,
            r#"{"choices": [{}]}"#,
            r#"{"choices": [{"message": {}}]}"#,
            r#"{"choices": [{"message": {"content": null}}]}"#,
            r#"{"choices": null}"#,
            r#"{"choices": {}}"#,
            r#"{"choices": "none"}"#,
            r#"{"choices": [null]}"#,
            r#"{"choices": [{"message": "text"}]}"#,
            r#"{"choices": [{"message": {"content": 42}}]}"#,
            r#"{"choices": [{"message": {"content": ["a"]}}]}"#,
            r#"{"choices": [], "usage": "n/a"}"#,
            "[]",
            "null",
        ] {
            let response: ChatResponse = serde_json::from_str(json).expect("deserialize");
            assert_eq!(response.content(), "", "input: {json}");
        }
    }

    #[test]
    fn test_malformed_usage_is_ignored() {
        let response: ChatResponse =
            serde_json::from_str(r#"{"choices": [{"message": {"content": "ok"}}], "usage": 7}"#)
                .expect("deserialize");
        assert_eq!(response.content(), "ok");
        assert!(response.usage().is_none());
    }
}
