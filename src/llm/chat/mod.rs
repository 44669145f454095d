pub mod openai;

use async_trait::async_trait;
use futures::{ Future, Stream };
use log::debug;
use std::error::Error as StdError;
use std::pin::Pin;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

use super::{ LlmConfig, LlmType };
use self::openai::OpenAIChatClient;
use crate::error::{ RelayError, Result };
use crate::models::chat::Message;

/// Lazy, finite, non-restartable sequence of text fragments from a provider.
pub type ChunkStream = Pin<Box<dyn Stream<Item = Result<String>> + Send>>;

/// Chunks the reader task may hold before the consumer takes them.
const STREAM_BUFFER: usize = 1;

#[async_trait]
pub trait ChatClient: Send + Sync {
    /// Opens one streaming completion for `messages`.
    ///
    /// Resolves once the provider has accepted the request, so a rejection
    /// surfaces here rather than inside the stream.
    async fn stream_chat(&self, messages: &[Message]) -> Result<ChunkStream>;

    fn get_model(&self) -> String;
    fn get_base_url(&self) -> Option<String>;
}

/// Runs `response_fn` on its own task and exposes what it sends as a stream.
///
/// The producer is dropped as soon as the stream is, even while it is parked
/// waiting on the network.
pub fn create_streaming_response<F, Fut>(response_fn: F) -> ChunkStream
    where
        F: FnOnce(mpsc::Sender<Result<String>>) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static
{
    let (tx, rx) = mpsc::channel(STREAM_BUFFER);
    let watch = tx.clone();

    tokio::spawn(async move {
        tokio::select! {
            _ = watch.closed() => {
                debug!("Stream consumer dropped, abandoning upstream read");
            }
            _ = response_fn(tx) => {}
        }
    });

    Box::pin(ReceiverStream::new(rx))
}

pub fn new_client(
    config: &LlmConfig
) -> std::result::Result<Arc<dyn ChatClient>, Box<dyn StdError + Send + Sync>> {
    let client: Arc<dyn ChatClient> = match config.llm_type {
        LlmType::OpenAI | LlmType::Groq | LlmType::XAI | LlmType::DeepSeek => {
            let specific_client = OpenAIChatClient::from_config(config)?;
            Arc::new(specific_client)
        }
    };
    Ok(client)
}

pub(crate) fn interrupted(reason: impl Into<String>) -> RelayError {
    RelayError::UpstreamInterrupted(reason.into())
}
