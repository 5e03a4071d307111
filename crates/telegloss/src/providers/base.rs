use anyhow::Result;
use async_trait::async_trait;
use futures::stream::BoxStream;
use serde_json::Value;

use super::factory::ProviderType;
use crate::models::message::{ChatMessage, Role};
use crate::models::tool::{Tool, ToolCall};

/// Incremental text of a streamed model response
pub type TextStream = BoxStream<'static, Result<String>>;

/// Base trait for AI providers (Anthropic, OpenAI, Gemini)
///
/// Messages are kept in the vendor's own JSON shape for the length of a turn;
/// the conversion methods below are the only places that know those shapes.
#[async_trait]
pub trait Provider: Send + Sync {
    fn kind(&self) -> ProviderType;

    /// Generate the next response for the given history
    async fn complete(&self, system: &str, messages: &[Value], tools: &[Tool]) -> Result<Value>;

    /// Same request as `complete`, yielding text deltas as they arrive
    async fn stream(&self, system: &str, messages: &[Value], tools: &[Tool])
        -> Result<TextStream>;

    /// Tool definitions in the vendor format
    fn tools_to_spec(&self, tools: &[Tool]) -> Value;

    /// Tool calls requested by a response, `None` when it requests none
    fn extract_tool_calls(&self, response: &Value) -> Option<Vec<ToolCall>>;

    /// History entry carrying the result of one tool call
    fn tool_result_message(&self, call: &ToolCall, result: &str) -> Value;

    /// The model's own turn from a response, to be replayed before tool results
    fn assistant_message(&self, response: &Value) -> Option<Value>;

    /// Text of a response, `None` when it has no text
    fn extract_text(&self, response: &Value) -> Option<String>;

    /// A plain text turn of the conversation
    fn text_message(&self, role: Role, text: &str) -> Value;

    fn user_message(&self, text: &str) -> Value {
        self.text_message(Role::User, text)
    }

    fn history(&self, messages: &[ChatMessage]) -> Vec<Value> {
        messages
            .iter()
            .map(|m| self.text_message(m.role, &m.content))
            .collect()
    }

    /// History entries for a whole batch of results, in call order
    fn tool_result_messages(&self, results: &[(ToolCall, String)]) -> Vec<Value> {
        results
            .iter()
            .map(|(call, result)| self.tool_result_message(call, result))
            .collect()
    }
}
