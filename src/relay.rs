//! The chat relay: validates a conversation, prepends the assistant persona,
//! opens one streaming completion upstream and hands its chunks back as they
//! arrive.

use futures::{ stream, Stream, StreamExt };
use log::{ debug, info, warn };
use std::pin::Pin;
use std::sync::Arc;
use std::task::{ Context, Poll };
use std::time::{ Duration, Instant };
use tokio::time::timeout_at;

use crate::config::RelayConfig;
use crate::error::{ RelayError, Result };
use crate::llm::chat::{ ChatClient, ChunkStream };
use crate::models::chat::{ ChatRequest, Message };

#[derive(Clone)]
pub struct Relay {
    client: Arc<dyn ChatClient>,
    system_prompt: Arc<str>,
    first_chunk_timeout: Duration,
    max_messages: Option<usize>,
}

impl Relay {
    pub fn new(client: Arc<dyn ChatClient>, config: &RelayConfig) -> Self {
        Self {
            client,
            system_prompt: Arc::from(config.system_prompt.as_str()),
            first_chunk_timeout: config.first_chunk_timeout,
            max_messages: config.max_messages,
        }
    }

    /// `[system] ++ messages`, caller order untouched.
    pub fn augment(&self, messages: Vec<Message>) -> Vec<Message> {
        let mut conversation = Vec::with_capacity(messages.len() + 1);
        conversation.push(Message::system(self.system_prompt.as_ref()));
        conversation.extend(messages);
        conversation
    }

    /// Parses `body` and opens the upstream completion.
    ///
    /// Returns only after the first chunk is in hand (or the upstream ended
    /// without producing one), so every failure up to that point is still a
    /// clean error. Failures after that arrive as an `Err` item in the stream.
    pub async fn open(&self, request_id: &str, body: &[u8]) -> Result<ChunkStream> {
        let request = ChatRequest::from_slice(body)?;
        if let Some(limit) = self.max_messages {
            if request.messages.len() > limit {
                return Err(RelayError::ConversationTooLong {
                    count: request.messages.len(),
                    limit,
                });
            }
        }

        let conversation = self.augment(request.messages);
        info!(
            "[{}] Relaying {} messages to model {}",
            request_id,
            conversation.len(),
            self.client.get_model()
        );

        let started = Instant::now();
        let deadline = tokio::time::Instant::now() + self.first_chunk_timeout;
        let timed_out = || {
            RelayError::UpstreamTimeout(
                format!("no response within {}s", self.first_chunk_timeout.as_secs_f32())
            )
        };

        let mut upstream = timeout_at(deadline, self.client.stream_chat(&conversation)).await.map_err(
            |_| timed_out()
        )??;

        let first = match timeout_at(deadline, upstream.next()).await.map_err(|_| timed_out())? {
            None => {
                info!("[{}] Upstream finished without any content", request_id);
                None
            }
            Some(Err(e)) => {
                return Err(e);
            }
            Some(Ok(chunk)) => Some(chunk),
        };
        debug!("[{}] First chunk after {:?}", request_id, started.elapsed());

        let chunks: ChunkStream = match first {
            Some(chunk) => Box::pin(stream::once(async move { Ok(chunk) }).chain(upstream)),
            None => Box::pin(stream::empty()),
        };

        Ok(Box::pin(Forwarded::new(request_id.to_string(), chunks, started)))
    }
}

/// Pass-through that logs how a relayed stream ended.
struct Forwarded {
    request_id: String,
    inner: ChunkStream,
    started: Instant,
    chunks: usize,
    ended: bool,
}

impl Forwarded {
    fn new(request_id: String, inner: ChunkStream, started: Instant) -> Self {
        Self { request_id, inner, started, chunks: 0, ended: false }
    }
}

impl Stream for Forwarded {
    type Item = Result<String>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        if this.ended {
            return Poll::Ready(None);
        }

        let item = match this.inner.as_mut().poll_next(cx) {
            Poll::Pending => return Poll::Pending,
            Poll::Ready(item) => item,
        };

        match &item {
            Some(Ok(_)) => {
                this.chunks += 1;
            }
            Some(Err(e)) => {
                this.ended = true;
                warn!(
                    "[{}] {} after {} chunks, terminating response",
                    this.request_id,
                    e,
                    this.chunks
                );
            }
            None => {
                this.ended = true;
                info!(
                    "[{}] Completed: {} chunks in {:?}",
                    this.request_id,
                    this.chunks,
                    this.started.elapsed()
                );
            }
        }
        Poll::Ready(item)
    }
}

impl Drop for Forwarded {
    fn drop(&mut self) {
        if !self.ended {
            info!(
                "[{}] Caller went away after {} chunks, upstream cancelled",
                self.request_id,
                self.chunks
            );
        }
    }
}
