use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use strum_macros::{Display, EnumString};

use super::tool::ToolCall;

/// Kinds of progress events published by a streaming agent turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum EventType {
    ToolCall,
    ToolResult,
    TextDelta,
    Text,
    Done,
    Error,
}

/// A progress event sent from the agent worker to the consumer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamEvent {
    #[serde(rename = "type")]
    pub kind: EventType,
    #[serde(default)]
    pub data: Map<String, Value>,
}

impl StreamEvent {
    fn with_data(kind: EventType, data: Value) -> Self {
        let data = match data {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        Self { kind, data }
    }

    pub fn tool_call(call: &ToolCall) -> Self {
        Self::with_data(
            EventType::ToolCall,
            json!({"id": call.id, "name": call.name, "input": call.input}),
        )
    }

    pub fn tool_result(call: &ToolCall, result: &str, success: bool) -> Self {
        Self::with_data(
            EventType::ToolResult,
            json!({"id": call.id, "name": call.name, "result": result, "success": success}),
        )
    }

    pub fn text_delta<S: Into<String>>(text: S) -> Self {
        Self::with_data(EventType::TextDelta, json!({"text": text.into()}))
    }

    pub fn text<S: Into<String>>(text: S) -> Self {
        Self::with_data(EventType::Text, json!({"text": text.into()}))
    }

    pub fn done() -> Self {
        Self::with_data(EventType::Done, json!({}))
    }

    pub fn error<S: Into<String>>(message: S) -> Self {
        Self::with_data(EventType::Error, json!({"message": message.into()}))
    }

    /// Done and Error close a turn; nothing follows them.
    pub fn is_terminal(&self) -> bool {
        matches!(self.kind, EventType::Done | EventType::Error)
    }

    pub fn text_payload(&self) -> Option<&str> {
        self.data.get("text").and_then(Value::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_event_serialization_shape() {
        let event = StreamEvent::text_delta("Hel");
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value, json!({"type": "text_delta", "data": {"text": "Hel"}}));
        assert_eq!(event.text_payload(), Some("Hel"));
    }

    #[test]
    fn test_tool_result_event() {
        let call = ToolCall::from_value("call_0", "get_page", json!({"path": "A"}));
        let event = StreamEvent::tool_result(&call, "Error: boom", false);
        assert_eq!(event.kind, EventType::ToolResult);
        assert_eq!(event.data["success"], json!(false));
        assert_eq!(event.data["name"], json!("get_page"));
        assert!(!event.is_terminal());
        assert!(StreamEvent::error("x").is_terminal());
        assert!(StreamEvent::done().is_terminal());
    }

    #[test]
    fn test_event_type_strings() {
        assert_eq!(EventType::ToolCall.to_string(), "tool_call");
        assert_eq!(EventType::from_str("text_delta").unwrap(), EventType::TextDelta);
    }
}
