//! Streaming answer assembler.
//!
//! Drives one generation cycle end to end: sanitize the persisted
//! history, open a chunk stream, accumulate the answer while publishing
//! every growth step to watchers, then persist the exchange as exactly
//! one append. A failed cycle discards the partial answer and persists
//! nothing.

use std::sync::Arc;

use futures::StreamExt;
use tokio::sync::watch;

use parley_core::types::{ChatId, Turn};
use parley_gen::service::{GenerationService, PromptInput, PromptTurn};

use crate::controller::ChatController;
use crate::error::ChatError;
use crate::state::{CycleMachine, CycleState};

/// One submission seeding a generation cycle.
#[derive(Clone, Debug)]
pub struct Submission {
    text: String,
    image: Option<String>,
    /// True when replaying a chat's seeding turn: the turn is already
    /// persisted, so the commit appends only the model answer.
    is_initial: bool,
}

impl Submission {
    /// A fresh question; the commit appends it together with the answer.
    pub fn question(text: impl Into<String>, image: Option<String>) -> Self {
        Self {
            text: text.into(),
            image,
            is_initial: false,
        }
    }

    /// Replay of the seeding turn of a newly created chat.
    pub fn initial(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            image: None,
            is_initial: true,
        }
    }
}

/// Assembles one streamed answer per cycle and commits it atomically.
pub struct AnswerAssembler {
    controller: Arc<ChatController>,
    service: Arc<dyn GenerationService>,
    state: CycleMachine,
    answer_tx: watch::Sender<String>,
}

impl AnswerAssembler {
    pub fn new(controller: Arc<ChatController>, service: Arc<dyn GenerationService>) -> Self {
        let (answer_tx, _) = watch::channel(String::new());
        Self {
            controller,
            service,
            state: CycleMachine::new(),
            answer_tx,
        }
    }

    /// Current cycle state.
    pub fn state(&self) -> CycleState {
        self.state.current()
    }

    /// Watch the in-progress answer.
    ///
    /// Each received value is the full accumulated text so far, not a
    /// delta; it resets to empty once the cycle commits or fails.
    pub fn subscribe(&self) -> watch::Receiver<String> {
        self.answer_tx.subscribe()
    }

    /// Run one full generation cycle for `chat_id`.
    ///
    /// Exactly one of two outcomes: the exchange is persisted as a
    /// single append and the machine returns to Idle, or nothing is
    /// persisted and the machine lands in Failed. Rejects concurrent
    /// cycles with `CycleBusy`.
    pub async fn run_cycle(
        &self,
        chat_id: ChatId,
        user_id: &str,
        submission: Submission,
    ) -> Result<(), ChatError> {
        if submission.text.trim().is_empty() {
            return Err(ChatError::EmptyText);
        }
        self.state.begin()?;

        match self.drive(chat_id, user_id, &submission).await {
            Ok(()) => {
                self.state.transition(CycleState::Idle)?;
                let _ = self.answer_tx.send(String::new());
                Ok(())
            }
            Err(e) => {
                tracing::warn!(chat_id = %chat_id, error = %e, "Generation cycle failed");
                // Discard the partial answer; nothing was persisted.
                let _ = self.answer_tx.send(String::new());
                if self.state.transition(CycleState::Failed).is_err() {
                    self.state.reset();
                }
                Err(e)
            }
        }
    }

    async fn drive(
        &self,
        chat_id: ChatId,
        user_id: &str,
        submission: &Submission,
    ) -> Result<(), ChatError> {
        let chat = self.controller.get_chat(chat_id, user_id)?;
        let history = sanitize_history(&chat.history);
        let input = PromptInput {
            text: submission.text.clone(),
            image: submission.image.clone(),
        };

        let mut stream = self.service.stream(history, input).await?;
        let mut answer = String::new();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            if chunk.is_empty() {
                continue;
            }
            answer.push_str(&chunk);
            let _ = self.answer_tx.send(answer.clone());
        }

        self.state.transition(CycleState::Committing)?;
        let mut turns = Vec::with_capacity(2);
        if !submission.is_initial {
            turns.push(Turn::user(&submission.text, submission.image.clone()));
        }
        turns.push(Turn::model(answer));
        self.controller.append_turns(chat_id, user_id, turns)?;
        Ok(())
    }
}

/// Project persisted history into prompt turns.
///
/// Turns with empty text are dropped and image references are stripped;
/// only role and text ever reach the generation service.
pub fn sanitize_history(history: &[Turn]) -> Vec<PromptTurn> {
    history
        .iter()
        .filter(|turn| !turn.text.is_empty())
        .map(|turn| PromptTurn {
            role: turn.role,
            text: turn.text.clone(),
        })
        .collect()
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use parley_core::types::Role;
    use parley_gen::scripted::ScriptedService;
    use parley_storage::db::Database;
    use parley_storage::repository::ChatRepository;

    fn make_assembler(service: Arc<ScriptedService>) -> (Arc<ChatController>, AnswerAssembler) {
        let db = Arc::new(Database::in_memory().unwrap());
        let controller = Arc::new(ChatController::new(Arc::new(ChatRepository::new(db))));
        let assembler = AnswerAssembler::new(controller.clone(), service);
        (controller, assembler)
    }

    #[test]
    fn test_sanitize_drops_empty_and_strips_images() {
        let history = vec![
            Turn::user("what is this", Some("uploads/cat.png".to_string())),
            Turn::model(""),
            Turn::model("a cat"),
        ];

        let sanitized = sanitize_history(&history);
        assert_eq!(sanitized.len(), 2);
        assert_eq!(sanitized[0].role, Role::User);
        assert_eq!(sanitized[0].text, "what is this");
        assert_eq!(sanitized[1].role, Role::Model);
    }

    #[tokio::test]
    async fn test_cycle_commits_question_and_answer() {
        let service = Arc::new(ScriptedService::replying(&["Rust is ", "a language."]));
        let (controller, assembler) = make_assembler(service.clone());
        let id = controller.create_chat("alice", "seed").unwrap();
        controller
            .append_turns(id, "alice", vec![Turn::model("seed answer")])
            .unwrap();

        assembler
            .run_cycle(id, "alice", Submission::question("What is Rust?", None))
            .await
            .unwrap();

        let chat = controller.get_chat(id, "alice").unwrap();
        assert_eq!(chat.history.len(), 4);
        assert_eq!(chat.history[2].role, Role::User);
        assert_eq!(chat.history[2].text, "What is Rust?");
        assert_eq!(chat.history[3].role, Role::Model);
        assert_eq!(chat.history[3].text, "Rust is a language.");
        assert_eq!(assembler.state(), CycleState::Idle);
    }

    #[tokio::test]
    async fn test_initial_cycle_appends_answer_only() {
        let service = Arc::new(ScriptedService::replying(&["42"]));
        let (controller, assembler) = make_assembler(service.clone());
        let id = controller.create_chat("alice", "meaning of life?").unwrap();

        assembler
            .run_cycle(id, "alice", Submission::initial("meaning of life?"))
            .await
            .unwrap();

        let chat = controller.get_chat(id, "alice").unwrap();
        assert_eq!(chat.history.len(), 2);
        assert_eq!(chat.history[0].role, Role::User);
        assert_eq!(chat.history[1].role, Role::Model);
        assert_eq!(chat.history[1].text, "42");
    }

    #[tokio::test]
    async fn test_failed_cycle_persists_nothing() {
        let service = Arc::new(ScriptedService::failing_after(&["partial "]));
        let (controller, assembler) = make_assembler(service.clone());
        let id = controller.create_chat("alice", "q").unwrap();

        let result = assembler
            .run_cycle(id, "alice", Submission::question("next", None))
            .await;
        assert!(matches!(result, Err(ChatError::Generation(_))));
        assert_eq!(assembler.state(), CycleState::Failed);

        // Neither the question nor the partial answer was persisted.
        let chat = controller.get_chat(id, "alice").unwrap();
        assert_eq!(chat.history.len(), 1);

        // The published answer was discarded too.
        assert_eq!(*assembler.subscribe().borrow(), "");
    }

    #[tokio::test]
    async fn test_cycle_recovers_after_failure() {
        let service = Arc::new(ScriptedService::failing_after(&[]));
        let (controller, assembler) = make_assembler(service);
        let id = controller.create_chat("alice", "q").unwrap();

        assert!(assembler
            .run_cycle(id, "alice", Submission::question("next", None))
            .await
            .is_err());

        // Swap in a healthy service through a fresh assembler sharing
        // the same store, then resubmit.
        let healthy: Arc<dyn GenerationService> = Arc::new(ScriptedService::replying(&["ok"]));
        let retry = AnswerAssembler::new(controller.clone(), healthy);
        retry
            .run_cycle(id, "alice", Submission::question("next", None))
            .await
            .unwrap();
        assert_eq!(controller.get_chat(id, "alice").unwrap().history.len(), 3);
    }

    #[tokio::test]
    async fn test_watch_publishes_accumulated_text() {
        let service = Arc::new(ScriptedService::replying(&["a", "", "b"]));
        let (controller, assembler) = make_assembler(service);
        let id = controller.create_chat("alice", "q").unwrap();

        let rx = assembler.subscribe();
        assembler
            .run_cycle(id, "alice", Submission::question("go", None))
            .await
            .unwrap();

        // After commit the published answer resets; during the cycle it
        // grew through "a" then "ab" (the empty chunk was a no-op).
        assert_eq!(*rx.borrow(), "");
        let chat = controller.get_chat(id, "alice").unwrap();
        assert_eq!(chat.history.last().unwrap().text, "ab");
    }

    #[tokio::test]
    async fn test_empty_submission_rejected_before_streaming() {
        let service = Arc::new(ScriptedService::replying(&["never"]));
        let (controller, assembler) = make_assembler(service.clone());
        let id = controller.create_chat("alice", "q").unwrap();

        let result = assembler
            .run_cycle(id, "alice", Submission::question("  ", None))
            .await;
        assert!(matches!(result, Err(ChatError::EmptyText)));
        assert_eq!(service.calls(), 0);
        assert_eq!(assembler.state(), CycleState::Idle);
        assert_eq!(controller.get_chat(id, "alice").unwrap().history.len(), 1);
    }

    #[tokio::test]
    async fn test_cycle_on_foreign_chat_streams_nothing() {
        let service = Arc::new(ScriptedService::replying(&["never"]));
        let (controller, assembler) = make_assembler(service.clone());
        let id = controller.create_chat("alice", "q").unwrap();

        let result = assembler
            .run_cycle(id, "bob", Submission::question("steal", None))
            .await;
        assert!(matches!(result, Err(ChatError::ChatNotFound(_))));
        assert_eq!(service.calls(), 0);
    }

    #[tokio::test]
    async fn test_history_sent_to_service_is_sanitized() {
        let service = Arc::new(ScriptedService::replying(&["ok"]));
        let (controller, assembler) = make_assembler(service.clone());
        let id = controller
            .create_chat("alice", "look at this")
            .unwrap();
        controller
            .append_turns(
                id,
                "alice",
                vec![
                    Turn::user("with image", Some("uploads/x.png".to_string())),
                    Turn::model("seen"),
                ],
            )
            .unwrap();

        assembler
            .run_cycle(id, "alice", Submission::question("and now?", None))
            .await
            .unwrap();

        let recorded = service.recorded();
        assert_eq!(recorded.len(), 1);
        assert_eq!(recorded[0].history.len(), 3);
        assert_eq!(recorded[0].input.text, "and now?");
        assert!(recorded[0].input.image.is_none());
    }
}
