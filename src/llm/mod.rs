//! OpenAI-compatible chat-completion transport.
//!
//! Works against any endpoint speaking the `/chat/completions` contract:
//! OpenAI, OpenRouter, local servers (Ollama, LM Studio), and the rest.
//! [`LlmClient::chat`] returns one completion string; [`chat_stream`]
//! delivers incremental deltas until the `[DONE]` sentinel or stream end.

pub mod extract;

pub use extract::MemoryExtractor;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::ProviderConfig;
use crate::prompt::LlmOptions;

/// Errors surfaced by the LLM transport.
#[derive(Debug, Error)]
pub enum LlmError {
    /// Non-2xx response. Carries the status and the raw body text so the
    /// provider's own error message is never lost.
    #[error("LLM API error: {status} - {body}")]
    Api { status: u16, body: String },

    #[error("LLM request failed: {0}")]
    Transport(#[from] reqwest::Error),
}

/// Message role on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

/// One message in the completion request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    stream: bool,
    temperature: f64,
    top_p: f64,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct StreamChunk {
    choices: Vec<StreamChoice>,
}

#[derive(Deserialize)]
struct StreamChoice {
    delta: StreamDelta,
}

#[derive(Deserialize, Default)]
struct StreamDelta {
    content: Option<String>,
}

/// Chat-completion client for one provider endpoint.
pub struct LlmClient {
    http: reqwest::Client,
    config: ProviderConfig,
}

impl LlmClient {
    pub fn new(config: ProviderConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
        }
    }

    async fn send(
        &self,
        messages: &[ChatMessage],
        options: &LlmOptions,
        stream: bool,
    ) -> Result<reqwest::Response, LlmError> {
        let request = ChatRequest {
            model: &self.config.model,
            messages,
            stream,
            temperature: options.temperature,
            top_p: options.top_p,
        };

        let response = self
            .http
            .post(format!("{}/chat/completions", self.config.base_url))
            .bearer_auth(&self.config.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::Api {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }

    /// Non-streaming completion. Returns the first choice's content, or an
    /// empty string when the provider omits it.
    pub async fn chat(
        &self,
        messages: &[ChatMessage],
        options: &LlmOptions,
    ) -> Result<String, LlmError> {
        let response = self.send(messages, options, false).await?;
        let parsed: ChatResponse = response.json().await?;
        Ok(parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .unwrap_or_default())
    }

    /// Streaming completion. `on_delta` is invoked for every non-empty
    /// content delta; the accumulated full text is returned.
    ///
    /// The stream is consumed until the `data: [DONE]` sentinel or the
    /// transport closes. The response (and with it the connection) is
    /// released on every exit path — normal completion, early `?` return,
    /// or caller drop of the future.
    pub async fn chat_stream(
        &self,
        messages: &[ChatMessage],
        options: &LlmOptions,
        mut on_delta: impl FnMut(&str),
    ) -> Result<String, LlmError> {
        let mut response = self.send(messages, options, true).await?;

        let mut lines = SseLineBuffer::new();
        let mut full = String::new();

        while let Some(chunk) = response.chunk().await? {
            for line in lines.push(&chunk) {
                match parse_sse_line(&line) {
                    Some(SseEvent::Done) => return Ok(full),
                    Some(SseEvent::Delta(delta)) => {
                        full.push_str(&delta);
                        on_delta(&delta);
                    }
                    None => {}
                }
            }
        }

        // Transport closed without a sentinel; flush whatever is buffered.
        if let Some(SseEvent::Delta(delta)) = parse_sse_line(&lines.remainder()) {
            full.push_str(&delta);
            on_delta(&delta);
        }
        Ok(full)
    }
}

/// One parsed server-sent event from the completion stream.
#[derive(Debug, PartialEq)]
enum SseEvent {
    /// The literal `data: [DONE]` end-of-stream sentinel.
    Done,
    /// An incremental content delta.
    Delta(String),
}

/// Parse one SSE line. Non-`data:` lines and unparseable payloads are
/// skipped (keep-alives, malformed fragments).
fn parse_sse_line(line: &str) -> Option<SseEvent> {
    let payload = line.strip_prefix("data: ")?.trim();
    if payload == "[DONE]" {
        return Some(SseEvent::Done);
    }

    let chunk: StreamChunk = serde_json::from_str(payload).ok()?;
    let delta = chunk
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.delta.content)
        .filter(|c| !c.is_empty())?;
    Some(SseEvent::Delta(delta))
}

/// Reassembles complete lines from network chunks. SSE lines routinely
/// split across chunk boundaries; bytes after the last newline stay
/// buffered until the next chunk arrives.
///
/// Buffers raw bytes and decodes only complete lines, so a multi-byte
/// UTF-8 character split across a chunk boundary is reassembled intact
/// instead of decoding to replacement characters.
struct SseLineBuffer {
    buffer: Vec<u8>,
}

impl SseLineBuffer {
    fn new() -> Self {
        Self { buffer: Vec::new() }
    }

    fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buffer.extend_from_slice(chunk);
        let mut lines = Vec::new();
        while let Some(pos) = self.buffer.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=pos).collect();
            let text = String::from_utf8_lossy(&line);
            lines.push(text.trim_end_matches(['\n', '\r']).to_string());
        }
        lines
    }

    fn remainder(&self) -> String {
        String::from_utf8_lossy(&self.buffer).into_owned()
    }
}
