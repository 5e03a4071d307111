use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A tool that can be used by a model, in the provider-agnostic shape.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Tool {
    /// The name of the tool
    pub name: String,
    /// A description of what the tool does
    pub description: String,
    /// A JSON Schema object (`type`, `properties`, `required`) describing the input
    pub input_schema: Value,
}

impl Tool {
    /// Create a new tool with the given name and description
    pub fn new<N, D>(name: N, description: D, input_schema: Value) -> Self
    where
        N: Into<String>,
        D: Into<String>,
    {
        Tool {
            name: name.into(),
            description: description.into(),
            input_schema,
        }
    }
}

/// A tool call requested by a model, normalized from any provider response
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolCall {
    /// Provider issued id, or a synthesized `call_N` when the provider has none
    pub id: String,
    /// The name of the tool to execute
    pub name: String,
    /// The arguments for the execution
    pub input: Map<String, Value>,
}

impl ToolCall {
    pub fn new<I: Into<String>, S: Into<String>>(id: I, name: S, input: Map<String, Value>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            input,
        }
    }

    /// Build a call from any JSON value; non-objects become an empty argument map.
    pub fn from_value<I: Into<String>, S: Into<String>>(id: I, name: S, input: Value) -> Self {
        let input = match input {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        Self::new(id, name, input)
    }

    pub fn str_arg(&self, key: &str) -> Option<&str> {
        self.input.get(key).and_then(Value::as_str)
    }

    pub fn int_arg(&self, key: &str) -> Option<i64> {
        self.input.get(key).and_then(Value::as_i64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_tool_serializes_with_input_schema() {
        let tool = Tool::new("get_page", "Get a page", json!({"type": "object"}));
        let value = serde_json::to_value(&tool).unwrap();
        assert_eq!(value["input_schema"]["type"], "object");
        assert_eq!(value["name"], "get_page");
    }

    #[test]
    fn test_tool_call_from_non_object() {
        let call = ToolCall::from_value("call_0", "get_account_info", json!("oops"));
        assert!(call.input.is_empty());

        let call = ToolCall::from_value("call_1", "get_views", json!({"path": "A-01", "year": 2024}));
        assert_eq!(call.str_arg("path"), Some("A-01"));
        assert_eq!(call.int_arg("year"), Some(2024));
        assert_eq!(call.str_arg("year"), None);
    }
}
