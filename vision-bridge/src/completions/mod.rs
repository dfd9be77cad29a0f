//! Chat-completions transport
//!
//! `types` models the subset of the chat-completions schema this bridge sends
//! and reads; `client` holds the [`InferenceService`] trait and the HTTP
//! implementation with timeout and retry handling.

mod client;
mod types;

pub use client::{
    ClientConfig, InferenceError, InferenceService, OpenAiClient, RetryPolicy, DEFAULT_API_BASE,
};
pub use types::{
    ChatMessage, ChatRequest, Choice, ChoiceMessage, CompletionResponse, ContentPart, ImageUrl,
    MessageContent, Role,
};
