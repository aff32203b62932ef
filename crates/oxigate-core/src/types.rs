//! Chat completion types used for captioning requests and responses.
//!
//! Captioning talks to chat-style endpoints: the request is a message list
//! with one multipart user turn (text + image), and the caption comes back
//! inside the provider's response envelope. Two envelope dialects exist:
//! OpenAI-style `choices[0].message.content` and Cohere v2 `message.content[0].text`.

use serde::{Deserialize, Serialize};

// ─────────────────────────────────────────────
// Messages (OpenAI chat completions format)
// ─────────────────────────────────────────────

/// A chat message in the OpenAI format.
///
/// Each variant maps to a `role` field value.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(tag = "role")]
pub enum Message {
    #[serde(rename = "system")]
    System { content: String },

    #[serde(rename = "user")]
    User { content: MessageContent },
}

impl Message {
    /// Create a system message.
    pub fn system(content: impl Into<String>) -> Self {
        Message::System {
            content: content.into(),
        }
    }

    /// Create a user message with multipart content (text + images).
    pub fn user_parts(parts: Vec<ContentPart>) -> Self {
        Message::User {
            content: MessageContent::Parts(parts),
        }
    }

    /// The single user turn of a captioning request: prompt text, then the image.
    pub fn caption_turn(prompt: impl Into<String>, image_url: impl Into<String>) -> Self {
        Message::user_parts(vec![
            ContentPart::Text {
                text: prompt.into(),
            },
            ContentPart::ImageUrl {
                image_url: ImageUrl {
                    url: image_url.into(),
                    detail: None,
                },
            },
        ])
    }
}

// ─────────────────────────────────────────────
// Message Content (text or multipart/vision)
// ─────────────────────────────────────────────

/// User message content: either plain text or multipart (for vision/images).
///
/// When serialized: text becomes a plain string, parts become an array of objects.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum MessageContent {
    /// Simple text content.
    Text(String),
    /// Multipart content with text and/or images.
    Parts(Vec<ContentPart>),
}

/// A single part of a multipart message.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum ContentPart {
    #[serde(rename = "text")]
    Text { text: String },
    /// Image URL part (can be a URL or base64 data URI).
    #[serde(rename = "image_url")]
    ImageUrl { image_url: ImageUrl },
}

/// Image URL payload.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ImageUrl {
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

// ─────────────────────────────────────────────
// Chat completion request (for building API calls)
// ─────────────────────────────────────────────

/// Base request body for a chat-style captioning call.
#[derive(Debug, Serialize)]
pub struct ChatCompletionRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    pub messages: Vec<Message>,
}

// ─────────────────────────────────────────────
// Response envelopes
// ─────────────────────────────────────────────

/// OpenAI-compatible chat completion response (only the parts we read).
#[derive(Debug, Deserialize)]
pub struct ChatCompletionResponse {
    #[serde(default)]
    pub choices: Vec<ChatChoice>,
}

/// A single choice in a chat completion response.
#[derive(Debug, Deserialize)]
pub struct ChatChoice {
    pub message: AssistantMessage,
}

/// The assistant message within a chat completion choice.
#[derive(Debug, Deserialize)]
pub struct AssistantMessage {
    #[serde(default)]
    pub content: Option<String>,
}

impl ChatCompletionResponse {
    /// Text of the first choice, if it is non-empty.
    pub fn first_text(self) -> Option<String> {
        self.choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|text| !text.is_empty())
    }
}

/// Cohere v2 `/chat` response (only the parts we read).
#[derive(Debug, Deserialize)]
pub struct CohereChatResponse {
    pub message: CohereMessage,
}

#[derive(Debug, Deserialize)]
pub struct CohereMessage {
    #[serde(default)]
    pub content: Vec<CohereContent>,
}

#[derive(Debug, Deserialize)]
pub struct CohereContent {
    #[serde(default)]
    pub text: Option<String>,
}

impl CohereChatResponse {
    /// Text of the first content block, if it is non-empty.
    pub fn first_text(self) -> Option<String> {
        self.message
            .content
            .into_iter()
            .next()
            .and_then(|c| c.text)
            .filter(|text| !text.is_empty())
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
