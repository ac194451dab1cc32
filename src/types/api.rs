use crate::scaling::Resolution;
use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;
use std::fmt;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComputerModel {
    #[default]
    Openai,
    Anthropic,
}

impl ComputerModel {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "openai" => Some(Self::Openai),
            "anthropic" => Some(Self::Anthropic),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Openai => "openai",
            Self::Anthropic => "anthropic",
        }
    }
}

impl fmt::Display for ComputerModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApiRole {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiMessage {
    pub role: ApiRole,
    pub content: String,
}

/// Body POSTed to the upstream agent endpoint.
#[derive(Debug, Clone)]
pub struct ChatRequest {
    pub messages: Vec<ApiMessage>,
    /// Sent as both `sessionId` and `sandboxId`; agent backends read either.
    pub session_id: Option<String>,
    pub resolution: [u32; 2],
    pub model: ComputerModel,
    pub environment: Option<String>,
}

impl Serialize for ChatRequest {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("ChatRequest", 6)?;
        state.serialize_field("messages", &self.messages)?;
        match &self.session_id {
            Some(session_id) => {
                state.serialize_field("sessionId", session_id)?;
                state.serialize_field("sandboxId", session_id)?;
            }
            None => {
                state.skip_field("sessionId")?;
                state.skip_field("sandboxId")?;
            }
        }
        state.serialize_field("resolution", &self.resolution)?;
        state.serialize_field("model", &self.model)?;
        match &self.environment {
            Some(environment) => state.serialize_field("environment", environment)?,
            None => state.skip_field("environment")?,
        }
        state.end()
    }
}

impl ChatRequest {
    pub fn new(messages: Vec<ApiMessage>, resolution: Resolution, model: ComputerModel) -> Self {
        Self {
            messages,
            session_id: None,
            resolution: [resolution.width, resolution.height],
            model,
            environment: None,
        }
    }
}

/// Wire names of the event kinds the agent endpoint emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    Action,
    Reasoning,
    Done,
    Error,
    SessionReady,
    ActionCompleted,
}

impl EventKind {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim() {
            "action" => Some(Self::Action),
            "reasoning" => Some(Self::Reasoning),
            "done" => Some(Self::Done),
            "error" => Some(Self::Error),
            "sandbox_created" => Some(Self::SessionReady),
            "action_completed" => Some(Self::ActionCompleted),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Action => "action",
            Self::Reasoning => "reasoning",
            Self::Done => "done",
            Self::Error => "error",
            Self::SessionReady => "sandbox_created",
            Self::ActionCompleted => "action_completed",
        }
    }
}

/// One decoded event of the agent stream.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    /// The agent is about to perform `action` on the desktop.
    Action { action: Value },
    Reasoning { content: String },
    Done { content: Option<String> },
    Error { content: String },
    /// A remote desktop session is available for viewing.
    SessionReady { session_id: String, view_url: String },
    ActionCompleted,
}

impl StreamEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            Self::Action { .. } => EventKind::Action,
            Self::Reasoning { .. } => EventKind::Reasoning,
            Self::Done { .. } => EventKind::Done,
            Self::Error { .. } => EventKind::Error,
            Self::SessionReady { .. } => EventKind::SessionReady,
            Self::ActionCompleted => EventKind::ActionCompleted,
        }
    }
}
