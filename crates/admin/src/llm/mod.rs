//! LLM completion client for product optimizations.
//!
//! Talks to an OpenAI-compatible chat completions endpoint (Groq by default).
//! Each optimization is a single user-role message; the reply is the first
//! choice's message content.
//!
//! # Example
//!
//! ```rust,ignore
//! use product_optimizer_admin::llm::LlmClient;
//!
//! let client = LlmClient::new(&config.llm)?;
//! let reply = client.complete(&prompt).await?;
//! ```

mod client;
mod error;
pub mod types;

pub use client::LlmClient;
pub use error::LlmError;
pub use types::{ChatMessage, ChatRequest, ChatResponse, Role};
