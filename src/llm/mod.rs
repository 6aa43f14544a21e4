//! LLM integration: the chat client, wire types, and the extraction and
//! mapping steps built on top of them.

pub mod client;
pub mod extractor;
pub mod mapper;
pub mod types;

pub use client::LlmClient;
pub use types::{
    AssistantMessage, ChatMessage, ChatRequest, ChatResponse, Role, ToolCall, ToolDefinition,
    Usage,
};
