//! Generation-service boundary for Parley.
//!
//! Defines the contract the conversation core consumes: a sanitized
//! ordered history plus new input goes in, a lazy finite stream of text
//! chunks comes out, terminated by stream end or an error item. The
//! stream is not restartable. Ships a Gemini-style SSE client and a
//! scripted in-memory service for tests.

pub mod error;
pub mod gemini;
pub mod scripted;
pub mod service;

pub use error::GenError;
pub use gemini::GeminiClient;
pub use scripted::ScriptedService;
pub use service::{ChunkStream, GenerationService, PromptInput, PromptTurn};
