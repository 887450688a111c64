//! Conversation core: session control, streamed answer assembly, and
//! history reconciliation over the chat store.

pub mod assembler;
pub mod controller;
pub mod error;
pub mod reconciler;
pub mod state;

pub use assembler::{sanitize_history, AnswerAssembler, Submission};
pub use controller::ChatController;
pub use error::ChatError;
pub use reconciler::{ChatListView, ChatView};
pub use state::{CycleMachine, CycleState};
