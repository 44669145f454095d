use async_trait::async_trait;
use futures::StreamExt;
use log::{ debug, warn };
use reqwest::{ Client as HttpClient, header::{ HeaderMap, HeaderValue, CONTENT_TYPE, AUTHORIZATION } };
use serde::{ Deserialize, Serialize };
use std::error::Error as StdError;
use std::time::Duration;

use super::{ create_streaming_response, interrupted, ChatClient, ChunkStream };
use crate::error::{ RelayError, Result };
use crate::llm::LlmConfig;
use crate::models::chat::Message;

const COMPLETIONS_ROUTE: &str = "/chat/completions";
/// Longest stream line held while waiting for its newline.
const MAX_LINE_BYTES: usize = 1024 * 1024;
/// How much of a rejected response's body is read for its reason.
const MAX_REJECTION_BYTES: usize = 4 * 1024;

/// Client for any provider speaking the OpenAI chat-completions protocol.
pub struct OpenAIChatClient {
    http: HttpClient,
    model: String,
    base_url: String,
    url: String,
}

#[derive(Serialize)]
struct OpenAIChatRequest<'a> {
    model: &'a str,
    messages: &'a [Message],
    stream: bool,
}

#[derive(Deserialize)]
struct OpenAIStreamResponse {
    #[serde(default)]
    choices: Vec<OpenAIStreamChoice>,
    error: Option<OpenAIErrorDetail>,
}

#[derive(Deserialize)]
struct OpenAIStreamChoice {
    #[serde(default)]
    delta: OpenAIDelta,
    finish_reason: Option<String>,
}

#[derive(Deserialize, Default)]
struct OpenAIDelta {
    content: Option<String>,
}

#[derive(Deserialize)]
struct OpenAIErrorResponse {
    error: OpenAIErrorDetail,
}

#[derive(Deserialize)]
struct OpenAIErrorDetail {
    message: String,
}

impl OpenAIChatClient {
    pub fn new(
        api_key: String,
        model: String,
        base_url: String,
        connect_timeout: Duration
    ) -> std::result::Result<Self, Box<dyn StdError + Send + Sync>> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let mut auth = HeaderValue::from_str(&format!("Bearer {}", api_key)).map_err(|e|
            format!("Invalid API key format: {}", e)
        )?;
        auth.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth);

        let http = HttpClient::builder()
            .default_headers(headers)
            .connect_timeout(connect_timeout)
            .build()
            .map_err(|e| Box::new(e) as Box<dyn StdError + Send + Sync>)?;

        let trimmed = base_url.trim_end_matches('/');
        let url = if trimmed.ends_with(COMPLETIONS_ROUTE) {
            trimmed.to_string()
        } else {
            format!("{}{}", trimmed, COMPLETIONS_ROUTE)
        };

        Ok(Self { http, model, base_url, url })
    }

    pub fn from_config(config: &LlmConfig) -> std::result::Result<Self, Box<dyn StdError + Send + Sync>> {
        let api_key = config.api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| format!("{} API key is required", config.llm_type))?;

        Self::new(
            api_key,
            config.completion_model
                .clone()
                .unwrap_or_else(|| config.llm_type.default_model().to_string()),
            config.base_url.clone().unwrap_or_else(|| config.llm_type.default_base_url().to_string()),
            config.connect_timeout
        )
    }

    pub fn completions_url(&self) -> &str {
        &self.url
    }
}

fn send_error(e: reqwest::Error) -> RelayError {
    if e.is_timeout() {
        RelayError::UpstreamTimeout(e.to_string())
    } else {
        RelayError::UpstreamUnavailable(e.to_string())
    }
}

/// Pulls the provider's reason out of an error body, falling back to the raw text.
fn rejection_message(body: &str) -> String {
    match serde_json::from_str::<OpenAIErrorResponse>(body) {
        Ok(parsed) => parsed.error.message,
        Err(_) if body.trim().is_empty() => "no reason given".to_string(),
        Err(_) => body.trim().to_string(),
    }
}

/// Reads at most `MAX_REJECTION_BYTES` of an error body and extracts its reason.
async fn read_rejection(mut resp: reqwest::Response) -> String {
    let mut body = Vec::new();
    while body.len() < MAX_REJECTION_BYTES {
        match resp.chunk().await {
            Ok(Some(chunk)) => {
                let room = MAX_REJECTION_BYTES - body.len();
                body.extend_from_slice(&chunk[..chunk.len().min(room)]);
            }
            Ok(None) => break,
            Err(e) if body.is_empty() => {
                return format!("failed to read error body: {}", e);
            }
            Err(e) => {
                let partial = rejection_message(&String::from_utf8_lossy(&body));
                return format!("{} (failed to read rest of error body: {})", partial, e);
            }
        }
    }
    rejection_message(&String::from_utf8_lossy(&body))
}

#[derive(Debug, PartialEq, Eq)]
enum SseEvent {
    Delta(String),
    Failed(String),
}

/// Incremental decoder for the `text/event-stream` completions body.
///
/// Network chunks can cut a line anywhere, including inside a UTF-8
/// sequence, so bytes are held until a full line is available.
#[derive(Default)]
struct SseDecoder {
    buf: Vec<u8>,
    finished: bool,
    done: bool,
}

impl SseDecoder {
    fn push(&mut self, bytes: &[u8]) -> Vec<SseEvent> {
        self.buf.extend_from_slice(bytes);
        let mut events = Vec::new();

        while let Some(pos) = self.buf.iter().position(|b| *b == b'\n') {
            if self.done {
                break;
            }
            let line: Vec<u8> = self.buf.drain(..=pos).collect();
            let line = String::from_utf8_lossy(&line);
            if let Some(event) = self.decode_line(line.trim_end_matches(['\n', '\r'])) {
                let failed = matches!(event, SseEvent::Failed(_));
                events.push(event);
                if failed {
                    break;
                }
            }
        }

        let failed = matches!(events.last(), Some(SseEvent::Failed(_)));
        if !self.done && !failed && self.buf.len() > MAX_LINE_BYTES {
            self.buf.clear();
            self.done = true;
            events.push(
                SseEvent::Failed(format!("stream line exceeded {} bytes without a newline", MAX_LINE_BYTES))
            );
        }

        events
    }

    fn decode_line(&mut self, line: &str) -> Option<SseEvent> {
        if line.is_empty() || line.starts_with(':') {
            return None;
        }
        let data = line.strip_prefix("data:")?.trim_start();

        if data == "[DONE]" {
            self.done = true;
            self.finished = true;
            return None;
        }

        match serde_json::from_str::<OpenAIStreamResponse>(data) {
            Ok(resp) => {
                if let Some(error) = resp.error {
                    return Some(SseEvent::Failed(error.message));
                }
                let mut text = String::new();
                for choice in resp.choices {
                    if let Some(content) = choice.delta.content {
                        text.push_str(&content);
                    }
                    if choice.finish_reason.is_some() {
                        self.finished = true;
                    }
                }
                if text.is_empty() { None } else { Some(SseEvent::Delta(text)) }
            }
            Err(e) => {
                warn!("Skipping unparseable stream event: {} for data: {}", e, data);
                None
            }
        }
    }

    /// True once `[DONE]` was seen; no further bytes are wanted.
    fn is_done(&self) -> bool {
        self.done
    }

    /// True once the provider signalled a normal end of the completion.
    fn is_finished(&self) -> bool {
        self.finished
    }
}

#[async_trait]
impl ChatClient for OpenAIChatClient {
    async fn stream_chat(&self, messages: &[Message]) -> Result<ChunkStream> {
        let req = OpenAIChatRequest {
            model: &self.model,
            messages,
            stream: true,
        };

        let resp = self.http.post(&self.url).json(&req).send().await.map_err(send_error)?;

        let status = resp.status();
        if !status.is_success() {
            return Err(RelayError::UpstreamRejected {
                status: status.as_u16(),
                message: read_rejection(resp).await,
            });
        }
        debug!("Upstream accepted completion request ({}) for model {}", status, self.model);

        Ok(
            create_streaming_response(move |tx| async move {
                let mut bytes = resp.bytes_stream();
                let mut decoder = SseDecoder::default();

                while let Some(chunk_result) = bytes.next().await {
                    match chunk_result {
                        Ok(chunk) => {
                            for event in decoder.push(&chunk) {
                                let item = match event {
                                    SseEvent::Delta(text) => Ok(text),
                                    SseEvent::Failed(message) => Err(interrupted(message)),
                                };
                                let failed = item.is_err();
                                if tx.send(item).await.is_err() || failed {
                                    return;
                                }
                            }
                            if decoder.is_done() {
                                return;
                            }
                        }
                        Err(e) => {
                            let _ = tx.send(Err(interrupted(e.to_string()))).await;
                            return;
                        }
                    }
                }

                if !decoder.is_finished() {
                    let _ = tx.send(
                        Err(interrupted("upstream closed the stream before its end marker"))
                    ).await;
                }
            })
        )
    }

    fn get_model(&self) -> String {
        self.model.clone()
    }

    fn get_base_url(&self) -> Option<String> {
        Some(self.base_url.clone())
    }
}
