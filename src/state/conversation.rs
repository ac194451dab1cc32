use crate::types::{ApiMessage, ApiRole, ComputerModel};
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct MessageId(String);

impl MessageId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
    System,
    Action,
}

impl Role {
    fn id_prefix(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
            Self::System => "system",
            Self::Action => "action",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionStatus {
    Pending,
    Completed,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "role", rename_all = "snake_case")]
pub enum MessageBody {
    User {
        content: String,
    },
    /// Agent reasoning; consecutive reasoning events accumulate here.
    Assistant {
        content: String,
        model: ComputerModel,
    },
    System {
        content: String,
        is_error: bool,
    },
    Action {
        action: Value,
        status: ActionStatus,
        model: ComputerModel,
    },
}

impl MessageBody {
    pub fn role(&self) -> Role {
        match self {
            Self::User { .. } => Role::User,
            Self::Assistant { .. } => Role::Assistant,
            Self::System { .. } => Role::System,
            Self::Action { .. } => Role::Action,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Message {
    pub id: MessageId,
    #[serde(flatten)]
    pub body: MessageBody,
}

impl Message {
    pub fn role(&self) -> Role {
        self.body.role()
    }

    pub fn content(&self) -> Option<&str> {
        match &self.body {
            MessageBody::User { content }
            | MessageBody::Assistant { content, .. }
            | MessageBody::System { content, .. } => Some(content),
            MessageBody::Action { .. } => None,
        }
    }

    pub fn action_status(&self) -> Option<ActionStatus> {
        match &self.body {
            MessageBody::Action { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self.body, MessageBody::System { is_error: true, .. })
    }
}

/// Millisecond timestamp plus a counter, unique even within one clock tick.
#[derive(Debug, Default)]
struct IdGenerator {
    counter: u64,
}

impl IdGenerator {
    fn next(&mut self, role: Role) -> MessageId {
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| elapsed.as_millis())
            .unwrap_or_default();
        let id = MessageId(format!("{}-{millis}-{}", role.id_prefix(), self.counter));
        self.counter += 1;
        id
    }
}

/// Ordered message log with an id index and a cursor on the latest action.
#[derive(Debug, Default)]
pub struct Conversation {
    messages: Vec<Message>,
    index: HashMap<MessageId, usize>,
    last_action: Option<usize>,
    ids: IdGenerator,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    pub fn get(&self, id: &MessageId) -> Option<&Message> {
        self.index.get(id).and_then(|&position| self.messages.get(position))
    }

    pub fn push(&mut self, body: MessageBody) -> &Message {
        let id = self.ids.next(body.role());
        let position = self.messages.len();
        if matches!(body, MessageBody::Action { .. }) {
            self.last_action = Some(position);
        }
        self.index.insert(id.clone(), position);
        self.messages.push(Message { id, body });
        &self.messages[position]
    }

    pub(crate) fn get_mut(&mut self, position: usize) -> Option<&mut Message> {
        self.messages.get_mut(position)
    }

    /// Sets the status of the most recent action message, if any.
    pub fn set_last_action_status(&mut self, new_status: ActionStatus) -> Option<&Message> {
        let position = self.last_action?;
        let message = self.messages.get_mut(position)?;
        if let MessageBody::Action { status, .. } = &mut message.body {
            *status = new_status;
        }
        Some(&self.messages[position])
    }

    pub fn last_action(&self) -> Option<&Message> {
        self.last_action.and_then(|position| self.messages.get(position))
    }

    /// User and assistant turns, in order, as sent upstream.
    pub fn api_messages(&self) -> Vec<ApiMessage> {
        self.messages
            .iter()
            .filter_map(|message| match &message.body {
                MessageBody::User { content } => Some(ApiMessage {
                    role: ApiRole::User,
                    content: content.clone(),
                }),
                MessageBody::Assistant { content, .. } => Some(ApiMessage {
                    role: ApiRole::Assistant,
                    content: content.clone(),
                }),
                _ => None,
            })
            .collect()
    }

    pub fn clear(&mut self) {
        self.messages.clear();
        self.index.clear();
        self.last_action = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn action(name: &str) -> MessageBody {
        MessageBody::Action {
            action: json!({ "type": name }),
            status: ActionStatus::Pending,
            model: ComputerModel::Openai,
        }
    }

    #[test]
    fn test_ids_are_unique_within_one_tick() {
        let mut conversation = Conversation::new();
        let ids: Vec<MessageId> = (0..50)
            .map(|_| conversation.push(action("click")).id.clone())
            .collect();
        let unique: std::collections::HashSet<_> = ids.iter().collect();
        assert_eq!(unique.len(), ids.len());
        assert!(ids[0].as_str().starts_with("action-"));
        assert_eq!(conversation.get(&ids[7]).map(|m| m.id.clone()), Some(ids[7].clone()));
    }

    #[test]
    fn test_last_action_status_only_touches_latest_action() {
        let mut conversation = Conversation::new();
        conversation.push(action("click"));
        conversation.push(MessageBody::System {
            content: "note".to_string(),
            is_error: false,
        });
        conversation.push(action("type"));

        conversation.set_last_action_status(ActionStatus::Completed);

        let statuses: Vec<_> = conversation
            .messages()
            .iter()
            .filter_map(Message::action_status)
            .collect();
        assert_eq!(statuses, vec![ActionStatus::Pending, ActionStatus::Completed]);
    }

    #[test]
    fn test_set_status_without_actions_is_noop() {
        let mut conversation = Conversation::new();
        conversation.push(MessageBody::User {
            content: "hi".to_string(),
        });
        assert!(conversation
            .set_last_action_status(ActionStatus::Completed)
            .is_none());
    }

    #[test]
    fn test_api_messages_keep_only_user_and_assistant() {
        let mut conversation = Conversation::new();
        conversation.push(MessageBody::User {
            content: "open firefox".to_string(),
        });
        conversation.push(action("click"));
        conversation.push(MessageBody::Assistant {
            content: "done clicking".to_string(),
            model: ComputerModel::Openai,
        });
        conversation.push(MessageBody::System {
            content: "Task completed".to_string(),
            is_error: false,
        });

        let api = conversation.api_messages();
        assert_eq!(api.len(), 2);
        assert_eq!(api[0].role, ApiRole::User);
        assert_eq!(api[1].content, "done clicking");
    }

    #[test]
    fn test_message_serializes_with_role_tag() {
        let mut conversation = Conversation::new();
        let message = conversation.push(MessageBody::System {
            content: "boom".to_string(),
            is_error: true,
        });
        let value = serde_json::to_value(message).unwrap();
        assert_eq!(value["role"], "system");
        assert_eq!(value["is_error"], true);
        assert!(value["id"].as_str().unwrap().starts_with("system-"));
    }
}
