use super::super::conversation::{ActionStatus, Message, MessageId};
use crate::desktop::RemoteSession;
use crate::scaling::ScaleError;
use std::sync::{Arc, OnceLock};
use thiserror::Error;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Sending,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelReason {
    UserStop,
    TimedOut,
}

/// How one send ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendOutcome {
    Completed,
    Failed(String),
    /// The body ended without a terminal event.
    Ended,
    Cancelled(CancelReason),
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("a request is already in flight for this session")]
    Busy,
    #[error("invalid session configuration: {0}")]
    Config(#[from] ScaleError),
}

/// Conversation changes pushed to the renderer, in the order they happened.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionUpdate {
    Appended(Message),
    ContentChanged { id: MessageId, content: String },
    StatusChanged { id: MessageId, status: ActionStatus },
    SessionReady(RemoteSession),
    Idle(SendOutcome),
}

/// The in-flight request: its generation, abort signal, and eventual outcome.
#[derive(Debug, Clone)]
pub struct SendTicket {
    pub generation: u64,
    pub cancel: CancellationToken,
    pub(super) outcome: Arc<OnceLock<SendOutcome>>,
}

impl SendTicket {
    pub(super) fn new(generation: u64) -> Self {
        Self {
            generation,
            cancel: CancellationToken::new(),
            outcome: Arc::new(OnceLock::new()),
        }
    }

    pub fn outcome(&self) -> Option<SendOutcome> {
        self.outcome.get().cloned()
    }
}
