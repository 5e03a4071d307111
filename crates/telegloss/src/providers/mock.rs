use anyhow::{anyhow, Result};
use async_trait::async_trait;
use futures::StreamExt;
use serde_json::Value;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use super::anthropic::{
    anthropic_assistant_message, anthropic_text, anthropic_text_message, anthropic_tool_calls,
    anthropic_tool_result, anthropic_tool_results, tools_to_anthropic_spec,
};
use super::base::{Provider, TextStream};
use super::factory::ProviderType;
use crate::models::message::Role;
use crate::models::tool::{Tool, ToolCall};

/// A mock provider that returns pre-configured Anthropic-shaped responses for testing.
///
/// A response of the form `{"error": "..."}` is returned as a request failure.
#[derive(Clone, Default)]
pub struct MockProvider {
    responses: Arc<Mutex<Vec<Value>>>,
    requests: Arc<Mutex<Vec<Vec<Value>>>>,
    delay: Option<Duration>,
}

impl MockProvider {
    /// Create a new mock provider with a sequence of responses
    pub fn new(responses: Vec<Value>) -> Self {
        Self {
            responses: Arc::new(Mutex::new(responses)),
            ..Default::default()
        }
    }

    /// Wait this long before answering each request
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// The message histories received so far, one per request
    pub fn requests(&self) -> Vec<Vec<Value>> {
        self.requests.lock().unwrap().clone()
    }

    async fn next(&self, messages: &[Value]) -> Result<Value> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.requests.lock().unwrap().push(messages.to_vec());
        let mut responses = self.responses.lock().unwrap();
        if responses.is_empty() {
            // Return empty response if no more pre-configured responses
            return Ok(serde_json::json!({"content": [], "stop_reason": "end_turn"}));
        }
        let response = responses.remove(0);
        match response.get("error").and_then(Value::as_str) {
            Some(message) => Err(anyhow!("{}", message)),
            None => Ok(response),
        }
    }
}

#[async_trait]
impl Provider for MockProvider {
    fn kind(&self) -> ProviderType {
        ProviderType::Anthropic
    }

    async fn complete(&self, _system: &str, messages: &[Value], _tools: &[Tool]) -> Result<Value> {
        self.next(messages).await
    }

    /// Streams the text of the next response one word at a time
    async fn stream(
        &self,
        _system: &str,
        messages: &[Value],
        _tools: &[Tool],
    ) -> Result<TextStream> {
        let response = self.next(messages).await?;
        let text = anthropic_text(&response).unwrap_or_default();
        let words: Vec<Result<String>> = text
            .split_inclusive(' ')
            .map(|word| Ok(word.to_string()))
            .collect();
        Ok(futures::stream::iter(words).boxed())
    }

    fn tools_to_spec(&self, tools: &[Tool]) -> Value {
        tools_to_anthropic_spec(tools)
    }

    fn extract_tool_calls(&self, response: &Value) -> Option<Vec<ToolCall>> {
        anthropic_tool_calls(response)
    }

    fn tool_result_message(&self, call: &ToolCall, result: &str) -> Value {
        anthropic_tool_result(call, result)
    }

    fn assistant_message(&self, response: &Value) -> Option<Value> {
        anthropic_assistant_message(response)
    }

    fn extract_text(&self, response: &Value) -> Option<String> {
        anthropic_text(response)
    }

    fn text_message(&self, role: Role, text: &str) -> Value {
        anthropic_text_message(role, text)
    }

    fn tool_result_messages(&self, results: &[(ToolCall, String)]) -> Vec<Value> {
        anthropic_tool_results(results)
    }
}
