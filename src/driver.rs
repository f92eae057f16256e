//! Conversation orchestration
//!
//! Drives turn-taking over the bounded memory store: each user message is
//! recorded, the current context is rendered into the prompt, the inference
//! client is invoked once, and the reply is recorded back. Upstream failures
//! are recoverable per turn; only an explicit exit (or a failed initial image
//! analysis) ends the session.

use crate::error::{ChatError, Result};
use crate::inference::InferenceClient;
use crate::memory::MemoryStore;
use crate::metrics::METRICS;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

const USER_PREFIX: &str = "You: ";
const MODEL_PREFIX: &str = "Model: ";
const EXIT_COMMAND: &str = "exit";

/// Instruction sent with the uploaded images to seed the data-story anchor
const IMAGE_ANALYSIS_INSTRUCTION: &str = r#"Analyze the uploaded images and provide an overview of the content.
Ignore metadata and make sure the content is always in JSON format.
The JSON should include the following fields:
{
    "num_images": <number of images analyzed>,
    "overall_description": <a brief overall description of all images>,
    "images": [
        {
            "main_subject": <main subject of the image>,
            "colors": <dominant colors in the image>,
            "setting": <setting or background of the image>,
            "notable_elements": <list of notable elements or objects in the image>
        },
        ...
    ]
}"#;

/// Session lifecycle states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverState {
    /// Images supplied but not yet analyzed into an anchor
    AwaitingAnchor,
    /// Ready for the first user message
    Ready,
    /// At least one turn has run
    Turn,
    /// Session over; no further turns accepted
    Ended,
}

/// Speaker of a transcript turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Model,
}

/// One recorded exchange half in the session transcript
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptTurn {
    pub role: Role,
    pub content: String,
    pub at: DateTime<Utc>,
}

/// Result of a single driver turn
#[derive(Debug, Clone)]
pub enum TurnOutcome {
    /// The model answered; the reply has been recorded in memory
    Reply(String),
    /// The user asked to end the session
    Ended,
}

/// Turn-taking orchestrator over one memory store and one inference client.
///
/// Methods take `&mut self`, so exactly one turn is in flight at a time; a
/// host serving many sessions creates one driver (and one store) per session.
pub struct ConversationDriver {
    memory: MemoryStore,
    client: Arc<dyn InferenceClient>,
    images: Vec<String>,
    state: DriverState,
    transcript: Vec<TranscriptTurn>,
    session_id: Uuid,
}

impl ConversationDriver {
    /// Create a text-only session, ready for the first message
    pub fn new(memory: MemoryStore, client: Arc<dyn InferenceClient>) -> Self {
        Self::with_images(memory, client, Vec::new())
    }

    /// Create a session with base64 image payloads.
    ///
    /// The images ride along on every inference call for the lifetime of the
    /// session. With a non-empty list the session starts in `AwaitingAnchor`
    /// and [`describe_images`](Self::describe_images) must run first.
    pub fn with_images(
        memory: MemoryStore,
        client: Arc<dyn InferenceClient>,
        images: Vec<String>,
    ) -> Self {
        let state = if images.is_empty() {
            DriverState::Ready
        } else {
            DriverState::AwaitingAnchor
        };

        let session_id = Uuid::new_v4();
        info!(session = %session_id, images = images.len(), "conversation session started");

        Self {
            memory,
            client,
            images,
            state,
            transcript: Vec::new(),
            session_id,
        }
    }

    /// Analyze the uploaded images and install the overview as the anchor.
    ///
    /// Returns the raw overview text. A failed analysis ends the session:
    /// without the data story there is nothing to ground the conversation on.
    pub async fn describe_images(&mut self) -> Result<String> {
        if self.state != DriverState::AwaitingAnchor {
            return Err(ChatError::Session(
                "no image analysis pending for this session".to_string(),
            ));
        }

        match self
            .client
            .generate(IMAGE_ANALYSIS_INSTRUCTION, &self.images)
            .await
        {
            Ok(response) => {
                let overview = response.response;
                self.memory.set_anchor(&overview);
                self.state = DriverState::Ready;
                info!(session = %self.session_id, "initial image analysis stored as anchor");
                Ok(overview)
            }
            Err(e) => {
                self.state = DriverState::Ended;
                warn!(session = %self.session_id, error = %e, "image analysis failed; ending session");
                Err(ChatError::Inference(e))
            }
        }
    }

    /// Run one conversation turn.
    ///
    /// The user entry is recorded before the inference call, so on upstream
    /// failure the turn's question survives in memory while no model entry is
    /// added; the error is returned for this turn only and the session stays
    /// open.
    pub async fn run_turn(&mut self, input: &str) -> Result<TurnOutcome> {
        match self.state {
            DriverState::Ended => {
                return Err(ChatError::Session("session has ended".to_string()));
            }
            DriverState::AwaitingAnchor => {
                return Err(ChatError::Session(
                    "image analysis has not completed".to_string(),
                ));
            }
            DriverState::Ready | DriverState::Turn => {}
        }

        if input.trim().eq_ignore_ascii_case(EXIT_COMMAND) {
            self.state = DriverState::Ended;
            info!(session = %self.session_id, "conversation ended by the user");
            return Ok(TurnOutcome::Ended);
        }

        self.state = DriverState::Turn;

        self.memory.add_entry(format!("{}{}", USER_PREFIX, input));
        self.transcript.push(TranscriptTurn {
            role: Role::User,
            content: input.to_string(),
            at: Utc::now(),
        });

        let context = self.memory.render();
        let prompt = format!(
            "User asked: {}. Based on the uploaded images and the current conversation: {}, provide a detailed response.",
            input, context
        );

        match self.client.generate(&prompt, &self.images).await {
            Ok(response) => {
                let reply = response.response;
                if reply.is_empty() {
                    warn!(session = %self.session_id, "received empty response from the model");
                }

                self.memory.add_entry(format!("{}{}", MODEL_PREFIX, reply));
                self.transcript.push(TranscriptTurn {
                    role: Role::Model,
                    content: reply.clone(),
                    at: Utc::now(),
                });

                METRICS.turns_total.inc();
                Ok(TurnOutcome::Reply(reply))
            }
            Err(e) => {
                // Recoverable: the session stays open for the next input
                warn!(session = %self.session_id, error = %e, "model failed to generate a response");
                Err(ChatError::Inference(e))
            }
        }
    }

    pub fn state(&self) -> DriverState {
        self.state
    }

    pub fn memory(&self) -> &MemoryStore {
        &self.memory
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    /// Exchanges recorded so far, in order
    pub fn transcript(&self) -> &[TranscriptTurn] {
        &self.transcript
    }

    /// Transcript as pretty-printed JSON
    pub fn transcript_json(&self) -> Result<String> {
        serde_json::to_string_pretty(&self.transcript)
            .map_err(|e| ChatError::Session(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inference::{GenerateResponse, InferenceError};
    use async_trait::async_trait;
    use std::result::Result;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Replays a fixed script of outcomes and records every prompt it sees
    struct ScriptedClient {
        script: Mutex<VecDeque<Result<String, InferenceError>>>,
        prompts: Mutex<Vec<String>>,
    }

    impl ScriptedClient {
        fn new(script: Vec<Result<String, InferenceError>>) -> Arc<Self> {
            Arc::new(Self {
                script: Mutex::new(script.into_iter().collect()),
                prompts: Mutex::new(Vec::new()),
            })
        }

        fn prompts(&self) -> Vec<String> {
            self.prompts.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl InferenceClient for ScriptedClient {
        async fn generate(
            &self,
            prompt: &str,
            _images: &[String],
        ) -> Result<GenerateResponse, InferenceError> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            let next = self
                .script
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(InferenceError::RequestFailed("script exhausted".into())));
            next.map(|text| GenerateResponse {
                model: "scripted".to_string(),
                response: text,
                done: true,
            })
        }
    }

    #[tokio::test]
    async fn test_turn_records_both_sides() {
        let client = ScriptedClient::new(vec![Ok("hello back".to_string())]);
        let mut driver = ConversationDriver::new(MemoryStore::new(100), client.clone());

        let outcome = driver.run_turn("hello").await.unwrap();
        assert!(matches!(outcome, TurnOutcome::Reply(ref r) if r == "hello back"));
        assert_eq!(
            driver.memory().render(),
            "You: hello\nModel: hello back"
        );
        assert_eq!(driver.transcript().len(), 2);
        assert_eq!(driver.state(), DriverState::Turn);
    }

    #[tokio::test]
    async fn test_prompt_embeds_rendered_context() {
        let client = ScriptedClient::new(vec![Ok("fine".to_string())]);
        let mut driver = ConversationDriver::new(MemoryStore::new(100), client.clone());

        driver.run_turn("how are you").await.unwrap();

        let prompts = client.prompts();
        assert_eq!(prompts.len(), 1);
        assert_eq!(
            prompts[0],
            "User asked: how are you. Based on the uploaded images and the current conversation: You: how are you, provide a detailed response."
        );
    }

    #[tokio::test]
    async fn test_exit_ends_session_without_recording() {
        let client = ScriptedClient::new(vec![]);
        let mut driver = ConversationDriver::new(MemoryStore::new(100), client);

        let outcome = driver.run_turn("  EXIT  ").await.unwrap();
        assert!(matches!(outcome, TurnOutcome::Ended));
        assert_eq!(driver.state(), DriverState::Ended);
        assert!(driver.memory().is_empty());
        assert!(driver.transcript().is_empty());

        assert!(driver.run_turn("hello").await.is_err());
    }

    #[tokio::test]
    async fn test_upstream_failure_is_recoverable_per_turn() {
        let client = ScriptedClient::new(vec![
            Err(InferenceError::UpstreamError("Status 500: boom".into())),
            Ok("recovered".to_string()),
        ]);
        let mut driver = ConversationDriver::new(MemoryStore::new(100), client);

        // Failed turn: user entry kept, no model entry, session still open
        assert!(driver.run_turn("first question").await.is_err());
        assert_eq!(driver.state(), DriverState::Turn);
        assert_eq!(driver.memory().render(), "You: first question");
        assert_eq!(driver.transcript().len(), 1);

        // Next turn proceeds normally
        let outcome = driver.run_turn("second question").await.unwrap();
        assert!(matches!(outcome, TurnOutcome::Reply(ref r) if r == "recovered"));
        assert_eq!(
            driver.memory().render(),
            "You: first question\nYou: second question\nModel: recovered"
        );
    }

    #[tokio::test]
    async fn test_empty_reply_is_stored_as_is() {
        let client = ScriptedClient::new(vec![Ok(String::new())]);
        let mut driver = ConversationDriver::new(MemoryStore::new(100), client);

        let outcome = driver.run_turn("say nothing").await.unwrap();
        assert!(matches!(outcome, TurnOutcome::Reply(ref r) if r.is_empty()));
        assert_eq!(driver.memory().render(), "You: say nothing\nModel: ");
    }

    #[tokio::test]
    async fn test_describe_images_sets_anchor_and_readies_session() {
        let client = ScriptedClient::new(vec![
            Ok(r#"{"num_images": 1, "overall_description": "a cat"}"#.to_string()),
            Ok("it is a cat".to_string()),
        ]);
        let mut driver = ConversationDriver::with_images(
            MemoryStore::new(100),
            client.clone(),
            vec!["aGVsbG8=".to_string()],
        );
        assert_eq!(driver.state(), DriverState::AwaitingAnchor);

        // Turns are rejected until the analysis completes
        assert!(driver.run_turn("what is it").await.is_err());

        let overview = driver.describe_images().await.unwrap();
        assert!(overview.contains("a cat"));
        assert_eq!(driver.state(), DriverState::Ready);
        assert!(driver
            .memory()
            .render()
            .starts_with("Initial Image Data Story: "));

        driver.run_turn("what is it").await.unwrap();
        let prompts = client.prompts();
        // Anchor text grounds the turn prompt
        assert!(prompts[1].contains("Initial Image Data Story: "));
    }

    #[tokio::test]
    async fn test_failed_image_analysis_ends_session() {
        let client = ScriptedClient::new(vec![Err(InferenceError::RequestFailed(
            "connection refused".into(),
        ))]);
        let mut driver = ConversationDriver::with_images(
            MemoryStore::new(100),
            client,
            vec!["aGVsbG8=".to_string()],
        );

        assert!(driver.describe_images().await.is_err());
        assert_eq!(driver.state(), DriverState::Ended);
        assert!(driver.run_turn("hello").await.is_err());
    }

    #[tokio::test]
    async fn test_describe_images_rejected_for_text_sessions() {
        let client = ScriptedClient::new(vec![]);
        let mut driver = ConversationDriver::new(MemoryStore::new(100), client);
        assert!(driver.describe_images().await.is_err());
    }

    #[tokio::test]
    async fn test_transcript_json_roundtrip() {
        let client = ScriptedClient::new(vec![Ok("pong".to_string())]);
        let mut driver = ConversationDriver::new(MemoryStore::new(100), client);

        driver.run_turn("ping").await.unwrap();

        let json = driver.transcript_json().unwrap();
        let parsed: Vec<TranscriptTurn> = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[0].role, Role::User);
        assert_eq!(parsed[0].content, "ping");
        assert_eq!(parsed[1].role, Role::Model);
        assert_eq!(parsed[1].content, "pong");
    }
}
