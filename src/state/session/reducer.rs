use super::super::conversation::{ActionStatus, Conversation, Message, MessageBody};
use super::state::{CancelReason, SendOutcome, SendTicket, SessionError, SessionState, SessionUpdate};
use crate::desktop::RemoteSession;
use crate::types::{ComputerModel, StreamEvent};
use tracing::{debug, info, warn};

const TASK_STARTED: &str = "Task started";
const TASK_COMPLETED: &str = "Task completed";
const TIME_BUDGET_EXHAUSTED: &str = "Session time budget exhausted; task stopped";

/// Single owner of the visible conversation and the one in-flight request.
#[derive(Debug)]
pub struct SessionReducer {
    conversation: Conversation,
    model: ComputerModel,
    state: SessionState,
    active: Option<SendTicket>,
    generation: u64,
    open_assistant: Option<usize>,
    remote: Option<RemoteSession>,
    last_error: Option<String>,
}

impl SessionReducer {
    pub fn new(model: ComputerModel) -> Self {
        Self {
            conversation: Conversation::new(),
            model,
            state: SessionState::Idle,
            active: None,
            generation: 0,
            open_assistant: None,
            remote: None,
            last_error: None,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    pub fn messages(&self) -> &[Message] {
        self.conversation.messages()
    }

    pub fn remote_session(&self) -> Option<&RemoteSession> {
        self.remote.as_ref()
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn model(&self) -> ComputerModel {
        self.model
    }

    /// Starts a send. Rejected outright while another send is in flight.
    pub fn begin_send(
        &mut self,
        content: String,
    ) -> Result<(SendTicket, Vec<SessionUpdate>), SessionError> {
        if self.state == SessionState::Sending {
            return Err(SessionError::Busy);
        }

        self.generation += 1;
        let ticket = SendTicket::new(self.generation);
        self.active = Some(ticket.clone());
        self.state = SessionState::Sending;
        self.last_error = None;

        let updates = vec![self.append(MessageBody::User { content })];
        debug!(generation = ticket.generation, "send started");
        Ok((ticket, updates))
    }

    /// True while `generation` is the live request and has not been aborted.
    pub fn is_current(&self, generation: u64) -> bool {
        self.active
            .as_ref()
            .is_some_and(|ticket| ticket.generation == generation && !ticket.cancel.is_cancelled())
    }

    pub fn stream_opened(&mut self, generation: u64) -> Vec<SessionUpdate> {
        if !self.is_current(generation) {
            return Vec::new();
        }
        vec![self.append(MessageBody::System {
            content: TASK_STARTED.to_string(),
            is_error: false,
        })]
    }

    /// Folds one decoded event into the conversation. Events for a request
    /// that is no longer current are discarded.
    pub fn apply(&mut self, generation: u64, event: StreamEvent) -> Vec<SessionUpdate> {
        if !self.is_current(generation) {
            debug!(generation, kind = event.kind().as_str(), "discarding event for stale request");
            return Vec::new();
        }

        match event {
            StreamEvent::Reasoning { content } => vec![self.merge_reasoning(content)],
            StreamEvent::Action { action } => {
                self.open_assistant = None;
                vec![self.append(MessageBody::Action {
                    action,
                    status: ActionStatus::Pending,
                    model: self.model,
                })]
            }
            StreamEvent::ActionCompleted => {
                self.open_assistant = None;
                self.set_last_action_status(ActionStatus::Completed)
                    .into_iter()
                    .collect()
            }
            StreamEvent::Error { content } => self.fail_current(content),
            StreamEvent::Done { content } => {
                self.open_assistant = None;
                let mut updates = vec![self.append(MessageBody::System {
                    content: content.unwrap_or_else(|| TASK_COMPLETED.to_string()),
                    is_error: false,
                })];
                updates.extend(self.finish(SendOutcome::Completed));
                updates
            }
            StreamEvent::SessionReady {
                session_id,
                view_url,
            } => {
                self.open_assistant = None;
                let session = RemoteSession {
                    session_id,
                    view_url,
                };
                info!(session_id = %session.session_id, view_url = %session.view_url, "remote desktop ready");
                self.remote = Some(session.clone());
                vec![SessionUpdate::SessionReady(session)]
            }
        }
    }

    /// Transport failure for `generation`: a flagged system message, then Idle.
    pub fn fail(&mut self, generation: u64, error: String) -> Vec<SessionUpdate> {
        if !self.is_current(generation) {
            return Vec::new();
        }
        warn!(generation, %error, "agent stream failed");
        self.fail_current(error)
    }

    /// The body ended. Returns to Idle if no terminal event arrived.
    pub fn stream_ended(&mut self, generation: u64) -> Vec<SessionUpdate> {
        if !self.is_current(generation) {
            return Vec::new();
        }
        debug!(generation, "agent stream ended without a terminal event");
        self.finish(SendOutcome::Ended).into_iter().collect()
    }

    /// Aborts the in-flight request. Idempotent; a no-op while Idle.
    pub fn stop(&mut self, reason: CancelReason) -> Vec<SessionUpdate> {
        let Some(ticket) = self.active.as_ref() else {
            return Vec::new();
        };
        ticket.cancel.cancel();
        info!(generation = ticket.generation, ?reason, "send cancelled");

        let mut updates = Vec::new();
        if reason == CancelReason::TimedOut {
            updates.push(self.append(MessageBody::System {
                content: TIME_BUDGET_EXHAUSTED.to_string(),
                is_error: false,
            }));
        }
        updates.extend(self.finish(SendOutcome::Cancelled(reason)));
        updates
    }

    pub fn clear_messages(&mut self) -> Result<(), SessionError> {
        if self.state == SessionState::Sending {
            return Err(SessionError::Busy);
        }
        self.conversation.clear();
        self.open_assistant = None;
        self.last_error = None;
        Ok(())
    }

    fn merge_reasoning(&mut self, text: String) -> SessionUpdate {
        let open = self
            .open_assistant
            .filter(|&position| position + 1 == self.conversation.len());

        if let Some(position) = open {
            if let Some(message) = self.conversation.get_mut(position) {
                if let MessageBody::Assistant { content, .. } = &mut message.body {
                    content.push('\n');
                    content.push_str(&text);
                    return SessionUpdate::ContentChanged {
                        id: message.id.clone(),
                        content: content.clone(),
                    };
                }
            }
        }

        let update = self.append(MessageBody::Assistant {
            content: text,
            model: self.model,
        });
        self.open_assistant = Some(self.conversation.len() - 1);
        update
    }

    fn fail_current(&mut self, error: String) -> Vec<SessionUpdate> {
        self.open_assistant = None;
        let mut updates = Vec::new();
        if self
            .conversation
            .last_action()
            .and_then(Message::action_status)
            == Some(ActionStatus::Pending)
        {
            updates.extend(self.set_last_action_status(ActionStatus::Failed));
        }
        updates.push(self.append(MessageBody::System {
            content: error.clone(),
            is_error: true,
        }));
        self.last_error = Some(error.clone());
        updates.extend(self.finish(SendOutcome::Failed(error)));
        updates
    }

    fn set_last_action_status(&mut self, status: ActionStatus) -> Option<SessionUpdate> {
        self.conversation
            .set_last_action_status(status)
            .map(|message| SessionUpdate::StatusChanged {
                id: message.id.clone(),
                status,
            })
    }

    fn append(&mut self, body: MessageBody) -> SessionUpdate {
        if !matches!(body, MessageBody::Assistant { .. }) {
            self.open_assistant = None;
        }
        SessionUpdate::Appended(self.conversation.push(body).clone())
    }

    fn finish(&mut self, outcome: SendOutcome) -> Option<SessionUpdate> {
        let ticket = self.active.take()?;
        self.state = SessionState::Idle;
        self.open_assistant = None;
        let _ = ticket.outcome.set(outcome.clone());
        Some(SessionUpdate::Idle(outcome))
    }
}
