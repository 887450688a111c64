//! Gemini-style streaming client.
//!
//! Speaks the `streamGenerateContent?alt=sse` protocol: the sanitized
//! history plus new input is posted as a `contents` array and the answer
//! arrives as SSE events, each carrying a JSON fragment with candidate
//! text parts.

use async_stream::stream;
use async_trait::async_trait;
use futures::StreamExt;
use reqwest_eventsource::{Event, EventSource};
use serde::{Deserialize, Serialize};

use parley_core::config::GenerationConfig;
use parley_core::types::Role;

use crate::error::GenError;
use crate::service::{ChunkStream, GenerationService, PromptInput, PromptTurn};

/// HTTP client for a Gemini-style generation endpoint.
pub struct GeminiClient {
    client: reqwest::Client,
    base_url: String,
    model: String,
    api_key: String,
}

impl GeminiClient {
    pub fn new(
        base_url: impl Into<String>,
        model: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
            model: model.into(),
            api_key: api_key.into(),
        }
    }

    /// Build a client from configuration, reading the API key from the
    /// configured environment variable.
    pub fn from_config(config: &GenerationConfig) -> Result<Self, GenError> {
        let api_key = std::env::var(&config.api_key_env)
            .map_err(|_| GenError::MissingKey(config.api_key_env.clone()))?;
        Ok(Self::new(&config.base_url, &config.model, api_key))
    }

    fn build_request(&self, history: &[PromptTurn], input: &PromptInput) -> GeminiRequest {
        let mut contents: Vec<GeminiContent> = history
            .iter()
            .map(|turn| GeminiContent {
                role: role_name(turn.role).to_string(),
                parts: vec![GeminiPart::Text {
                    text: turn.text.clone(),
                }],
            })
            .collect();

        // The new input goes last; it is the only content allowed to
        // carry an image reference.
        let mut parts = Vec::new();
        if let Some(ref image) = input.image {
            parts.push(GeminiPart::FileData {
                file_data: GeminiFileData {
                    file_uri: image.clone(),
                },
            });
        }
        parts.push(GeminiPart::Text {
            text: input.text.clone(),
        });
        contents.push(GeminiContent {
            role: role_name(Role::User).to_string(),
            parts,
        });

        GeminiRequest { contents }
    }
}

#[async_trait]
impl GenerationService for GeminiClient {
    async fn stream(
        &self,
        history: Vec<PromptTurn>,
        input: PromptInput,
    ) -> Result<ChunkStream, GenError> {
        let request = self.build_request(&history, &input);
        let url = format!(
            "{}/models/{}:streamGenerateContent?alt=sse&key={}",
            self.base_url, self.model, self.api_key
        );

        let builder = self.client.post(&url).json(&request);
        let source = EventSource::new(builder)
            .map_err(|e| GenError::Sse(format!("Failed to open event source: {}", e)))?;

        Ok(Box::pin(chunk_stream(source)))
    }
}

/// Convert SSE events into text chunks.
///
/// A malformed or empty fragment yields an empty chunk (a no-op for the
/// consumer), never an error; only transport failures terminate the
/// stream with an error item.
fn chunk_stream(mut source: EventSource) -> impl futures::Stream<Item = Result<String, GenError>> {
    stream! {
        while let Some(event) = source.next().await {
            match event {
                Ok(Event::Open) => {}
                Ok(Event::Message(message)) => {
                    match serde_json::from_str::<GeminiResponse>(&message.data) {
                        Ok(response) => yield Ok(response.text()),
                        Err(e) => {
                            tracing::debug!(error = %e, "Skipping malformed SSE fragment");
                            yield Ok(String::new());
                        }
                    }
                }
                Err(reqwest_eventsource::Error::StreamEnded) => break,
                Err(e) => {
                    yield Err(GenError::Sse(e.to_string()));
                    break;
                }
            }
        }
    }
}

fn role_name(role: Role) -> &'static str {
    match role {
        Role::User => "user",
        Role::Model => "model",
    }
}

// =============================================================================
// Wire types
// =============================================================================

#[derive(Debug, Serialize)]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
}

#[derive(Debug, Serialize)]
struct GeminiContent {
    role: String,
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum GeminiPart {
    Text {
        text: String,
    },
    FileData {
        #[serde(rename = "fileData")]
        file_data: GeminiFileData,
    },
}

#[derive(Debug, Serialize)]
struct GeminiFileData {
    #[serde(rename = "fileUri")]
    file_uri: String,
}

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
}

impl GeminiResponse {
    /// Concatenate all text parts of the first candidate.
    fn text(&self) -> String {
        self.candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .map(|content| {
                content
                    .parts
                    .iter()
                    .filter_map(|p| p.text.as_deref())
                    .collect::<String>()
            })
            .unwrap_or_default()
    }
}

#[derive(Debug, Deserialize)]
struct GeminiCandidate {
    content: Option<GeminiCandidateContent>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidateContent {
    #[serde(default)]
    parts: Vec<GeminiResponsePart>,
}

#[derive(Debug, Deserialize)]
struct GeminiResponsePart {
    text: Option<String>,
}
