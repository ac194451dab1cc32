use super::reducer::SessionReducer;
use super::state::{CancelReason, SendOutcome, SendTicket, SessionError, SessionState, SessionUpdate};
use super::super::conversation::{Message, MessageId};
use crate::api::{decode_frame, AgentClient, EventFramer};
use crate::config::Config;
use crate::desktop::{DesktopView, RemoteSession};
use crate::scaling::ScaleTransform;
use crate::types::ChatRequest;
use futures::StreamExt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{sleep_until, Instant};

/// Drives one conversation against the agent endpoint.
///
/// Clones share the same state, so a clone held by the UI can `stop()` a send
/// that another task is driving.
#[derive(Clone)]
pub struct Session {
    client: AgentClient,
    reducer: Arc<Mutex<SessionReducer>>,
    transform: ScaleTransform,
    environment: Option<String>,
    budget: Duration,
    updates: Option<mpsc::UnboundedSender<SessionUpdate>>,
    desktop_view: Option<Arc<dyn DesktopView>>,
}

impl Session {
    pub fn new(client: AgentClient, config: &Config) -> Result<Self, SessionError> {
        let transform = config.scale_transform()?;
        Ok(Self {
            client,
            reducer: Arc::new(Mutex::new(SessionReducer::new(config.model))),
            transform,
            environment: config.environment.clone(),
            budget: config.session_budget(),
            updates: None,
            desktop_view: None,
        })
    }

    pub fn with_updates(mut self, updates: mpsc::UnboundedSender<SessionUpdate>) -> Self {
        self.updates = Some(updates);
        self
    }

    pub fn with_desktop_view(mut self, view: Arc<dyn DesktopView>) -> Self {
        self.desktop_view = Some(view);
        self
    }

    pub fn transform(&self) -> &ScaleTransform {
        &self.transform
    }

    pub fn state(&self) -> SessionState {
        self.reducer().state()
    }

    pub fn messages(&self) -> Vec<Message> {
        self.reducer().messages().to_vec()
    }

    pub fn last_error(&self) -> Option<String> {
        self.reducer().last_error().map(str::to_string)
    }

    pub fn remote_session(&self) -> Option<RemoteSession> {
        self.reducer().remote_session().cloned()
    }

    pub fn clear_messages(&self) -> Result<(), SessionError> {
        self.reducer().clear_messages()
    }

    /// Snapshot of one message, e.g. to render a status change.
    pub fn message(&self, id: &MessageId) -> Option<Message> {
        self.reducer().conversation().get(id).cloned()
    }

    /// Aborts the in-flight send. Returns false if nothing was in flight.
    pub fn stop(&self) -> bool {
        let mut reducer = self.reducer();
        let updates = reducer.stop(CancelReason::UserStop);
        let stopped = !updates.is_empty();
        self.publish(reducer, updates);
        stopped
    }

    /// Sends `content` and folds the streamed events into the conversation
    /// until the stream terminates, fails, times out, or is stopped.
    pub async fn send_message(&self, content: String) -> Result<SendOutcome, SessionError> {
        let (ticket, request) = {
            let mut reducer = self.reducer();
            let (ticket, started) = reducer.begin_send(content)?;
            let mut request = ChatRequest::new(
                reducer.conversation().api_messages(),
                self.transform.original(),
                reducer.model(),
            );
            request.session_id = reducer
                .remote_session()
                .map(|session| session.session_id.clone());
            request.environment = self.environment.clone();
            self.publish(reducer, started);
            (ticket, request)
        };

        let deadline = Instant::now() + self.budget;
        self.drive(&ticket, &request, deadline).await;
        Ok(ticket.outcome().unwrap_or(SendOutcome::Ended))
    }

    async fn drive(&self, ticket: &SendTicket, request: &ChatRequest, deadline: Instant) {
        let generation = ticket.generation;

        let opened = tokio::select! {
            biased;
            _ = ticket.cancel.cancelled() => return,
            _ = sleep_until(deadline) => return self.time_out(generation),
            opened = self.client.create_stream(request) => opened,
        };

        let mut stream = match opened {
            Ok(stream) => stream,
            Err(error) => return self.fail(generation, error.to_string()),
        };

        {
            let mut reducer = self.reducer();
            let updates = reducer.stream_opened(generation);
            self.publish(reducer, updates);
        }

        let mut framer = EventFramer::new();
        loop {
            // Dropping `stream` on return aborts the connection.
            let next = tokio::select! {
                biased;
                _ = ticket.cancel.cancelled() => return,
                _ = sleep_until(deadline) => return self.time_out(generation),
                next = stream.next() => next,
            };

            match next {
                Some(Ok(chunk)) => {
                    for frame in framer.push(&chunk) {
                        if !self.apply_frame(generation, &frame) {
                            return;
                        }
                    }
                }
                Some(Err(error)) => return self.fail(generation, error.to_string()),
                None => {
                    if let Some(frame) = framer.finish() {
                        if !self.apply_frame(generation, &frame) {
                            return;
                        }
                    }
                    let mut reducer = self.reducer();
                    let updates = reducer.stream_ended(generation);
                    return self.publish(reducer, updates);
                }
            }
        }
    }

    /// Returns false once the send is no longer current.
    fn apply_frame(&self, generation: u64, frame: &str) -> bool {
        let Some(event) = decode_frame(frame) else {
            return self.reducer().is_current(generation);
        };
        let mut reducer = self.reducer();
        let updates = reducer.apply(generation, event);
        let current = reducer.is_current(generation);
        self.publish(reducer, updates);
        current
    }

    fn fail(&self, generation: u64, error: String) {
        let mut reducer = self.reducer();
        let updates = reducer.fail(generation, error);
        self.publish(reducer, updates);
    }

    fn time_out(&self, generation: u64) {
        let mut reducer = self.reducer();
        if !reducer.is_current(generation) {
            return;
        }
        let updates = reducer.stop(CancelReason::TimedOut);
        self.publish(reducer, updates);
    }

    /// Sends `updates` to the channel while the reducer is still locked, so
    /// channel order is transition order; the desktop view is told afterwards.
    fn publish(&self, reducer: MutexGuard<'_, SessionReducer>, updates: Vec<SessionUpdate>) {
        if let Some(tx) = &self.updates {
            for update in &updates {
                let _ = tx.send(update.clone());
            }
        }
        drop(reducer);

        let Some(view) = &self.desktop_view else {
            return;
        };
        for update in &updates {
            if let SessionUpdate::SessionReady(session) = update {
                view.session_ready(session);
            }
        }
    }

    // Reducer state is consistent between event applications, so a panic
    // elsewhere never leaves it half-updated.
    fn reducer(&self) -> MutexGuard<'_, SessionReducer> {
        self.reducer.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
