//! Request and response payloads for the chat-completions endpoint.
//!
//! Only the fields this bridge needs are modelled. Responses are parsed
//! leniently: anything that does not carry a well-formed `choices` array is
//! reported as having no choices, which callers treat as a degraded result.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Message author role
#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
}

/// Body of a chat-completions request
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct ChatRequest {
    /// Model identifier (e.g. `gpt-4o`)
    pub model: String,

    /// Conversation messages; this bridge always sends a single user message
    pub messages: Vec<ChatMessage>,

    /// Cap on generated tokens
    pub max_tokens: u32,
}

impl ChatRequest {
    /// Create a request with one plain-text user message
    pub fn user_text(model: impl Into<String>, text: impl Into<String>, max_tokens: u32) -> Self {
        Self {
            model: model.into(),
            messages: vec![ChatMessage::user(MessageContent::Text(text.into()))],
            max_tokens,
        }
    }

    /// Create a request with one user message carrying text plus an inline JPEG
    pub fn user_text_with_jpeg(
        model: impl Into<String>,
        text: impl Into<String>,
        jpeg: &[u8],
        max_tokens: u32,
    ) -> Self {
        let parts = vec![
            ContentPart::Text { text: text.into() },
            ContentPart::ImageUrl {
                image_url: ImageUrl::jpeg(jpeg),
            },
        ];
        Self {
            model: model.into(),
            messages: vec![ChatMessage::user(MessageContent::Parts(parts))],
            max_tokens,
        }
    }

    /// Inline image URLs carried by this request, in message order
    pub fn image_urls(&self) -> impl Iterator<Item = &str> {
        self.messages.iter().flat_map(|m| m.content.image_urls())
    }
}

/// A single chat message
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct ChatMessage {
    pub role: Role,
    pub content: MessageContent,
}

impl ChatMessage {
    pub fn user(content: MessageContent) -> Self {
        Self {
            role: Role::User,
            content,
        }
    }
}

/// Message content: either a bare string or a list of typed parts
#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

impl MessageContent {
    /// Concatenated text of this content
    pub fn text(&self) -> String {
        match self {
            Self::Text(text) => text.clone(),
            Self::Parts(parts) => parts
                .iter()
                .filter_map(|part| match part {
                    ContentPart::Text { text } => Some(text.as_str()),
                    ContentPart::ImageUrl { .. } => None,
                })
                .collect(),
        }
    }

    fn image_urls(&self) -> Vec<&str> {
        match self {
            Self::Text(_) => Vec::new(),
            Self::Parts(parts) => parts
                .iter()
                .filter_map(|part| match part {
                    ContentPart::ImageUrl { image_url } => Some(image_url.url.as_str()),
                    ContentPart::Text { .. } => None,
                })
                .collect(),
        }
    }
}

/// One part of a multi-part message
#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    Text { text: String },
    ImageUrl { image_url: ImageUrl },
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct ImageUrl {
    pub url: String,
}

impl ImageUrl {
    /// Build a `data:image/jpeg;base64,...` URL from raw JPEG bytes
    pub fn jpeg(bytes: &[u8]) -> Self {
        Self {
            url: format!("data:image/jpeg;base64,{}", BASE64.encode(bytes)),
        }
    }
}

/// One entry of the response `choices` array
#[derive(Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct Choice {
    #[serde(default)]
    pub message: ChoiceMessage,
}

#[derive(Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct ChoiceMessage {
    #[serde(default)]
    pub content: Option<String>,
}

#[derive(Deserialize)]
struct CompletionBody {
    #[serde(default)]
    choices: Vec<Choice>,
}

/// Outcome of a chat-completions call that reached the service
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionResponse {
    /// HTTP status returned by the service
    pub status: u16,

    /// Parsed choices; empty when the body was absent, malformed or an error
    pub choices: Vec<Choice>,
}

impl CompletionResponse {
    /// Parse a raw response body
    pub fn from_body(status: u16, body: &[u8]) -> Self {
        let choices = match serde_json::from_slice::<CompletionBody>(body) {
            Ok(parsed) => parsed.choices,
            Err(e) => {
                debug!(status, error = %e, "Response body has no usable choices");
                Vec::new()
            }
        };
        Self { status, choices }
    }

    /// Build a successful response with a single choice
    pub fn with_text(text: impl Into<String>) -> Self {
        Self {
            status: 200,
            choices: vec![Choice {
                message: ChoiceMessage {
                    content: Some(text.into()),
                },
            }],
        }
    }

    /// Text content of the first choice.
    ///
    /// Returns `None` when there are no choices. A choice without content
    /// yields an empty string.
    pub fn first_choice_text(&self) -> Option<String> {
        self.choices
            .first()
            .map(|choice| choice.message.content.clone().unwrap_or_default())
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_text_request_shape() {
        let request = ChatRequest::user_text("gpt-4o", "hello", 300);
        let value = serde_json::to_value(&request).unwrap();

        assert_eq!(
            value,
            json!({
                "model": "gpt-4o",
                "messages": [{ "role": "user", "content": "hello" }],
                "max_tokens": 300
            })
        );
    }

    #[test]
    fn test_image_request_shape() {
        let request = ChatRequest::user_text_with_jpeg("gpt-4o", "what is this", &[0xFF, 0xD8], 50);
        let value = serde_json::to_value(&request).unwrap();
        let content = &value["messages"][0]["content"];

        assert_eq!(content[0]["type"], "text");
        assert_eq!(content[0]["text"], "what is this");
        assert_eq!(content[1]["type"], "image_url");
        assert_eq!(content[1]["image_url"]["url"], "data:image/jpeg;base64,/9g=");
        assert_eq!(request.image_urls().count(), 1);
    }

    #[test]
    fn test_first_choice_text() {
        let body =
            br#"{"choices":[{"message":{"content":"first"}},{"message":{"content":"second"}}]}"#;
        let response = CompletionResponse::from_body(200, body);
        assert_eq!(response.first_choice_text(), Some("first".to_string()));
        assert!(response.is_success());
    }

    #[test]
    fn test_missing_choices() {
        let body = br#"{"error":{"message":"Incorrect API key provided"}}"#;
        let response = CompletionResponse::from_body(401, body);
        assert_eq!(response.first_choice_text(), None);
        assert!(!response.is_success());
    }

    #[test]
    fn test_empty_choices() {
        let response = CompletionResponse::from_body(200, br#"{"choices":[]}"#);
        assert_eq!(response.first_choice_text(), None);
    }

    #[test]
    fn test_malformed_choices() {
        let response = CompletionResponse::from_body(200, br#"{"choices":"nope"}"#);
        assert_eq!(response.first_choice_text(), None);

        let response = CompletionResponse::from_body(502, b"<html>Bad Gateway</html>");
        assert_eq!(response.first_choice_text(), None);
    }

    #[test]
    fn test_choice_without_content_is_empty() {
        let response = CompletionResponse::from_body(200, br#"{"choices":[{"index":0}]}"#);
        assert_eq!(response.first_choice_text(), Some(String::new()));
    }

    #[test]
    fn test_message_content_text() {
        let content = MessageContent::Parts(vec![
            ContentPart::Text { text: "a".into() },
            ContentPart::ImageUrl {
                image_url: ImageUrl::jpeg(b"x"),
            },
            ContentPart::Text { text: "b".into() },
        ]);
        assert_eq!(content.text(), "ab");
    }
}
