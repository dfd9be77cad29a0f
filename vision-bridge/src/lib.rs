//! Vision Bridge - chat-completions client for buoy sensor inference
//!
//! This crate owns everything that crosses the boundary to the external
//! multimodal inference service:
//! - Request/response types for the chat-completions endpoint
//! - Prompt templates for camera frames and tilt readings
//! - The [`InferenceService`] seam and its `reqwest`-backed [`OpenAiClient`]
//!
//! # Architecture
//!
//! Callers never see HTTP. They build a [`ChatRequest`], hand it to an
//! [`InferenceService`], and read the first choice from the returned
//! [`CompletionResponse`]. The client applies an explicit request timeout and a
//! bounded retry policy so a slow or flaky backend cannot wedge the caller.
//!
//! # Example
//!
//! ```ignore
//! use vision_bridge::{prompts, ChatRequest, ClientConfig, InferenceService, OpenAiClient};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let client = OpenAiClient::new(ClientConfig::new("sk-..."))?;
//!
//!     let prompt = prompts::wave_direction(0.1, -0.2, 3.0);
//!     let request = ChatRequest::user_text("gpt-4o", prompt, 300);
//!     let response = client.complete(&request).await?;
//!
//!     println!("Result: {:?}", response.first_choice_text());
//!     Ok(())
//! }
//! ```

pub mod completions;
pub mod prompts;

// Re-export main types for convenience
pub use completions::{
    ChatMessage, ChatRequest, Choice, ChoiceMessage, ClientConfig, CompletionResponse,
    ContentPart, ImageUrl, InferenceError, InferenceService, MessageContent, OpenAiClient,
    RetryPolicy, Role, DEFAULT_API_BASE,
};
pub use prompts::WaveDirection;
