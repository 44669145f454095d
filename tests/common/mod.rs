#![allow(dead_code)]

use async_trait::async_trait;
use axum::{ body::Body, http::Request, Router };
use futures::stream;
use healthconnect_relay::config::RelayConfig;
use healthconnect_relay::error::{ RelayError, Result };
use healthconnect_relay::llm::chat::{ ChatClient, ChunkStream };
use healthconnect_relay::models::chat::Message;
use healthconnect_relay::relay::Relay;
use healthconnect_relay::server::api::router;
use std::collections::VecDeque;
use std::sync::atomic::{ AtomicBool, AtomicUsize, Ordering };
use std::sync::{ Arc, Mutex };
use std::time::Duration;

#[derive(Clone, Debug)]
pub enum Step {
    Chunk(&'static str),
    Delay(Duration),
    /// Connection drops with the given reason.
    Fail(&'static str),
    /// Never produces anything again.
    Hang,
}

struct SetOnDrop(Arc<AtomicBool>);

impl Drop for SetOnDrop {
    fn drop(&mut self) {
        self.0.store(true, Ordering::SeqCst);
    }
}

/// Stand-in provider that plays back a fixed script and records what it saw.
#[derive(Default)]
pub struct ScriptedClient {
    script: Vec<Step>,
    reject: Option<(u16, &'static str)>,
    open_delay: Option<Duration>,
    pub calls: AtomicUsize,
    pub pulls: Arc<AtomicUsize>,
    pub stream_dropped: Arc<AtomicBool>,
    pub received: Mutex<Vec<Vec<Message>>>,
}

impl ScriptedClient {
    pub fn new(script: Vec<Step>) -> Self {
        Self { script, ..Self::default() }
    }

    pub fn rejecting(status: u16, message: &'static str) -> Self {
        Self { reject: Some((status, message)), ..Self::default() }
    }

    pub fn with_open_delay(mut self, delay: Duration) -> Self {
        self.open_delay = Some(delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn pulls(&self) -> usize {
        self.pulls.load(Ordering::SeqCst)
    }

    pub fn last_conversation(&self) -> Vec<Message> {
        self.received.lock().unwrap().last().cloned().expect("no upstream call recorded")
    }
}

struct Playback {
    steps: VecDeque<Step>,
    pulls: Arc<AtomicUsize>,
    _guard: SetOnDrop,
}

#[async_trait]
impl ChatClient for ScriptedClient {
    async fn stream_chat(&self, messages: &[Message]) -> Result<ChunkStream> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.received.lock().unwrap().push(messages.to_vec());

        if let Some(delay) = self.open_delay {
            tokio::time::sleep(delay).await;
        }
        if let Some((status, message)) = self.reject {
            return Err(RelayError::UpstreamRejected { status, message: message.to_string() });
        }

        let playback = Playback {
            steps: self.script.iter().cloned().collect(),
            pulls: self.pulls.clone(),
            _guard: SetOnDrop(self.stream_dropped.clone()),
        };

        Ok(
            Box::pin(
                stream::unfold(playback, |mut playback| async move {
                    loop {
                        match playback.steps.pop_front()? {
                            Step::Delay(d) => tokio::time::sleep(d).await,
                            Step::Chunk(text) => {
                                playback.pulls.fetch_add(1, Ordering::SeqCst);
                                return Some((Ok(text.to_string()), playback));
                            }
                            Step::Fail(reason) => {
                                playback.steps.clear();
                                return Some((
                                    Err(RelayError::UpstreamInterrupted(reason.to_string())),
                                    playback,
                                ));
                            }
                            Step::Hang => std::future::pending::<()>().await,
                        }
                    }
                })
            )
        )
    }

    fn get_model(&self) -> String {
        "scripted".to_string()
    }

    fn get_base_url(&self) -> Option<String> {
        None
    }
}

pub fn app(client: Arc<ScriptedClient>, config: RelayConfig) -> Router {
    router(Relay::new(client, &config), 1024 * 1024)
}

pub fn chat_request(body: impl Into<Body>) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/chat")
        .header("content-type", "application/json")
        .body(body.into())
        .unwrap()
}

pub fn conversation_body(messages: &[Message]) -> String {
    serde_json::json!({ "messages": messages }).to_string()
}
