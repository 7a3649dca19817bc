pub mod http;
pub mod terminal;

use async_trait::async_trait;
use std::sync::atomic::{ AtomicBool, Ordering };
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex;
use log::{ info, warn, error };

use crate::history::{ ConversationStore, StorageError };
use crate::models::chat::Message;

pub use self::http::HttpRelayTransport;

/// Appended in place of the reply when a turn fails for any reason.
pub const FALLBACK_REPLY: &str = "Sorry, something went wrong. Please try again.";

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("relay request failed: {0}")]
    Network(#[from] reqwest::Error),
    #[error("relay responded with status {0}")]
    Status(u16),
    #[error("invalid relay URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SubmitError {
    #[error("message is empty")]
    EmptyInput,
    #[error("a reply is still pending")]
    Busy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientPhase {
    Idle,
    AwaitingReply,
}

/// Carries a full conversation to the relay and returns the reply text.
#[async_trait]
pub trait RelayTransport: Send + Sync {
    async fn generate(&self, conversation: &[Message]) -> Result<String, TransportError>;
}

/// Marks a session as awaiting a reply for as long as it lives.
struct InFlight<'a>(&'a AtomicBool);

impl<'a> InFlight<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| InFlight(flag))
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// One user's chat session: the local history plus the relay it talks to.
/// At most one turn is in flight; a second submission is refused, not queued.
pub struct ChatSession {
    store: Mutex<ConversationStore>,
    transport: Arc<dyn RelayTransport>,
    awaiting: AtomicBool,
}

impl ChatSession {
    pub fn new(store: ConversationStore, transport: Arc<dyn RelayTransport>) -> Self {
        Self {
            store: Mutex::new(store),
            transport,
            awaiting: AtomicBool::new(false),
        }
    }

    pub fn phase(&self) -> ClientPhase {
        if self.awaiting.load(Ordering::Acquire) {
            ClientPhase::AwaitingReply
        } else {
            ClientPhase::Idle
        }
    }

    pub async fn history(&self) -> Vec<Message> {
        self.store.lock().await.messages().to_vec()
    }

    pub async fn clear(&self) -> Result<(), StorageError> {
        info!("Clearing chat history");
        self.store.lock().await.clear()
    }

    /// Runs one turn. The user message is appended before the request goes
    /// out; the reply, or [`FALLBACK_REPLY`] on failure, is appended after.
    /// Returns the appended reply.
    pub async fn submit(&self, input: &str) -> Result<Message, SubmitError> {
        if input.trim().is_empty() {
            return Err(SubmitError::EmptyInput);
        }
        let _in_flight = InFlight::acquire(&self.awaiting).ok_or(SubmitError::Busy)?;

        let history = {
            let mut store = self.store.lock().await;
            if let Err(e) = store.append(Message::user(input)) {
                warn!("Failed to persist user message: {}", e);
            }
            store.messages().to_vec()
        };

        let reply = match self.transport.generate(&history).await {
            Ok(text) => Message::model(text),
            Err(e) => {
                error!("Turn failed, substituting fallback reply: {}", e);
                Message::model(FALLBACK_REPLY)
            }
        };

        let mut store = self.store.lock().await;
        if let Err(e) = store.append(reply.clone()) {
            warn!("Failed to persist model reply: {}", e);
        }
        Ok(reply)
    }
}
