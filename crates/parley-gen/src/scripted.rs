//! Scripted generation service for tests.
//!
//! Replays a fixed list of chunks, optionally failing after a chosen
//! number of them, and records every call so tests can assert how the
//! core seeded and guarded its cycles.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use futures::stream;

use crate::error::GenError;
use crate::service::{ChunkStream, GenerationService, PromptInput, PromptTurn};

/// A recorded call: the history and input a cycle was seeded with.
#[derive(Clone, Debug)]
pub struct RecordedCall {
    pub history: Vec<PromptTurn>,
    pub input: PromptInput,
}

/// Test double replaying scripted chunks.
pub struct ScriptedService {
    chunks: Vec<String>,
    fail_after: Option<usize>,
    calls: AtomicUsize,
    recorded: Mutex<Vec<RecordedCall>>,
}

impl ScriptedService {
    /// A service that streams the given chunks and then ends cleanly.
    pub fn replying(chunks: &[&str]) -> Self {
        Self {
            chunks: chunks.iter().map(|c| c.to_string()).collect(),
            fail_after: None,
            calls: AtomicUsize::new(0),
            recorded: Mutex::new(Vec::new()),
        }
    }

    /// A service that streams `chunks` and then yields an error item.
    pub fn failing_after(chunks: &[&str]) -> Self {
        Self {
            fail_after: Some(chunks.len()),
            ..Self::replying(chunks)
        }
    }

    /// Number of streams opened so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Every call's seeding history and input, in call order.
    pub fn recorded(&self) -> Vec<RecordedCall> {
        self.recorded.lock().expect("recorded mutex poisoned").clone()
    }
}

#[async_trait]
impl GenerationService for ScriptedService {
    async fn stream(
        &self,
        history: Vec<PromptTurn>,
        input: PromptInput,
    ) -> Result<ChunkStream, GenError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.recorded
            .lock()
            .expect("recorded mutex poisoned")
            .push(RecordedCall { history, input });

        let mut items: Vec<Result<String, GenError>> =
            self.chunks.iter().cloned().map(Ok).collect();
        if self.fail_after.is_some() {
            items.push(Err(GenError::Service("scripted failure".to_string())));
        }

        Ok(Box::pin(stream::iter(items)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;

    #[tokio::test]
    async fn test_replying_streams_all_chunks() {
        let service = ScriptedService::replying(&["Hello", " world"]);
        let mut stream = service
            .stream(
                vec![],
                PromptInput {
                    text: "hi".to_string(),
                    image: None,
                },
            )
            .await
            .unwrap();

        let mut collected = String::new();
        while let Some(chunk) = stream.next().await {
            collected.push_str(&chunk.unwrap());
        }
        assert_eq!(collected, "Hello world");
        assert_eq!(service.calls(), 1);
    }

    #[tokio::test]
    async fn test_failing_after_yields_error_item() {
        let service = ScriptedService::failing_after(&["partial"]);
        let mut stream = service
            .stream(
                vec![],
                PromptInput {
                    text: "hi".to_string(),
                    image: None,
                },
            )
            .await
            .unwrap();

        assert_eq!(stream.next().await.unwrap().unwrap(), "partial");
        assert!(stream.next().await.unwrap().is_err());
        assert!(stream.next().await.is_none());
    }

    #[tokio::test]
    async fn test_records_history_and_input() {
        let service = ScriptedService::replying(&["ok"]);
        let history = vec![PromptTurn {
            role: parley_core::types::Role::User,
            text: "earlier".to_string(),
        }];
        let _ = service
            .stream(
                history.clone(),
                PromptInput {
                    text: "now".to_string(),
                    image: Some("uploads/x.png".to_string()),
                },
            )
            .await
            .unwrap();

        let recorded = service.recorded();
        assert_eq!(recorded.len(), 1);
        assert_eq!(recorded[0].history, history);
        assert_eq!(recorded[0].input.text, "now");
        assert_eq!(recorded[0].input.image.as_deref(), Some("uploads/x.png"));
    }
}
