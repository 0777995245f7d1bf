//! Chat-completion abstraction for finsight
//!
//! This crate provides provider-agnostic types for talking to hosted
//! large language models over a chat-completion API:
//!
//! - Message types for the conversation
//! - Completion request/response types
//! - The [`LLMProvider`] trait
//! - An OpenAI-compatible provider (OpenAI, Groq, local servers)

pub mod completion;
pub mod error;
pub mod messages;
pub mod provider;
pub mod providers;

// Re-export main types
pub use completion::{CompletionRequest, CompletionResponse, StopReason, TokenUsage};
pub use error::{LLMError, Result};
pub use messages::{Message, Role};
pub use provider::LLMProvider;
