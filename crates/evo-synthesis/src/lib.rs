#![deny(unsafe_code)]
//! # evo-synthesis
//!
//! The LLM-facing half of the evolution loop: prompt assembly, the chat
//! transport, and the proposer that turns one target plus its latest
//! benchmarks into a [`evo_core::Proposal`].
//!
//! The budget gate runs before any network traffic; an exhausted budget
//! means the LLM is never called.

pub mod chat;
pub mod error;
pub mod parse;
pub mod prompt;
pub mod proposer;

pub use chat::{AnthropicClient, ChatModel, ChatReply, ChatRequest, FailingChatModel, SimulatedChatModel, TokenUsage};
pub use error::SynthesisError;
pub use prompt::{token_estimate, PromptBuilder};
pub use proposer::Proposer;
