use super::logging::emit_frame_decode_error;
use crate::types::{EventKind, StreamEvent};
use serde::Deserialize;
use serde_json::{Map, Value};

const DEFAULT_ERROR_TEXT: &str = "The agent reported an error";

#[derive(Debug, Default)]
struct FrameFields<'a> {
    kind: Option<&'a str>,
    data: Option<String>,
}

#[derive(Deserialize)]
struct ContentPayload {
    content: Option<Value>,
    message: Option<String>,
}

#[derive(Deserialize)]
struct SessionReadyPayload {
    #[serde(rename = "sandboxId", alias = "sessionId")]
    session_id: String,
    #[serde(rename = "vncUrl", alias = "viewUrl")]
    view_url: String,
}

/// Decodes one raw frame. Frames that carry nothing usable yield `None`;
/// decoding never fails the stream.
pub fn decode_frame(frame: &str) -> Option<StreamEvent> {
    if frame.trim().is_empty() {
        return None;
    }

    let fields = split_fields(frame);
    let declared = match fields.kind {
        Some(name) => match EventKind::parse(name) {
            Some(kind) => Some(kind),
            None => {
                emit_frame_decode_error(frame, "unknown event kind");
                return None;
            }
        },
        None => None,
    };

    let payload = fields.data.filter(|data| !data.is_empty());
    let Some(payload) = payload else {
        return declared.and_then(event_without_payload);
    };

    match serde_json::from_str::<Value>(&payload) {
        Ok(Value::Object(map)) => decode_structured(frame, declared, map),
        Ok(Value::String(text)) => decode_text(declared.unwrap_or(EventKind::Reasoning), text),
        _ => decode_text(declared.unwrap_or(EventKind::Reasoning), payload),
    }
}

fn split_fields(frame: &str) -> FrameFields<'_> {
    let mut fields = FrameFields::default();
    let mut saw_field = false;

    for line in frame.lines() {
        if let Some(rest) = line.strip_prefix("event:") {
            fields.kind = Some(rest.trim());
            saw_field = true;
        } else if let Some(rest) = line.strip_prefix("data:") {
            let rest = rest.trim();
            match fields.data.as_mut() {
                Some(data) => {
                    data.push('\n');
                    data.push_str(rest);
                }
                None => fields.data = Some(rest.to_string()),
            }
            saw_field = true;
        } else if line.starts_with(':') || line.starts_with("id:") || line.starts_with("retry:") {
            saw_field = true;
        }
    }

    // Bare text without any field prefix is taken as the payload itself.
    if !saw_field {
        fields.data = Some(frame.trim().to_string());
    }

    fields
}

fn event_without_payload(kind: EventKind) -> Option<StreamEvent> {
    match kind {
        EventKind::ActionCompleted => Some(StreamEvent::ActionCompleted),
        EventKind::Done => Some(StreamEvent::Done { content: None }),
        _ => None,
    }
}

fn decode_structured(
    frame: &str,
    declared: Option<EventKind>,
    mut map: Map<String, Value>,
) -> Option<StreamEvent> {
    let kind = match declared {
        Some(kind) => kind,
        None => match map.get("type").and_then(Value::as_str).and_then(EventKind::parse) {
            Some(kind) => kind,
            None => {
                emit_frame_decode_error(frame, "structured payload has no known type");
                return None;
            }
        },
    };

    let event = match kind {
        EventKind::Action => map
            .remove("action")
            .map(|action| StreamEvent::Action { action }),
        EventKind::Reasoning => content_text(&map).map(|content| StreamEvent::Reasoning { content }),
        EventKind::Done => Some(StreamEvent::Done {
            content: content_text(&map).filter(|content| !content.is_empty()),
        }),
        EventKind::Error => Some(StreamEvent::Error {
            content: content_text(&map).unwrap_or_else(|| DEFAULT_ERROR_TEXT.to_string()),
        }),
        EventKind::SessionReady => serde_json::from_value::<SessionReadyPayload>(Value::Object(map))
            .ok()
            .map(|payload| StreamEvent::SessionReady {
                session_id: payload.session_id,
                view_url: payload.view_url,
            }),
        EventKind::ActionCompleted => Some(StreamEvent::ActionCompleted),
    };

    if event.is_none() {
        emit_frame_decode_error(frame, "payload is missing fields required by its kind");
    }
    event
}

fn content_text(map: &Map<String, Value>) -> Option<String> {
    let payload: ContentPayload = serde_json::from_value(Value::Object(map.clone())).ok()?;
    match payload.content {
        Some(Value::String(text)) => Some(text),
        Some(Value::Null) | None => payload.message,
        Some(other) => Some(other.to_string()),
    }
}

fn decode_text(kind: EventKind, text: String) -> Option<StreamEvent> {
    match kind {
        EventKind::Action => Some(StreamEvent::Action {
            action: Value::String(text),
        }),
        EventKind::Reasoning => Some(StreamEvent::Reasoning { content: text }),
        EventKind::Done => Some(StreamEvent::Done {
            content: Some(text),
        }),
        EventKind::Error => Some(StreamEvent::Error { content: text }),
        EventKind::SessionReady => None,
        EventKind::ActionCompleted => Some(StreamEvent::ActionCompleted),
    }
}
