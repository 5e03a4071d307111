use anyhow::Result;
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde_json::{json, Map, Value};
use std::time::Duration;

use super::base::{Provider, TextStream};
use super::configs::AnthropicProviderConfig;
use super::factory::ProviderType;
use super::utils::{join_text, post_json, send, sse_text};
use crate::models::message::Role;
use crate::models::tool::{Tool, ToolCall};

const API_VERSION: &str = "2023-06-01";

/// Anthropic takes the canonical tool shape as is
pub fn tools_to_anthropic_spec(tools: &[Tool]) -> Value {
    json!(tools
        .iter()
        .map(|tool| json!({
            "name": tool.name,
            "description": tool.description,
            "input_schema": tool.input_schema,
        }))
        .collect::<Vec<_>>())
}

/// Tool calls are only honoured when the model stopped to use them
pub fn anthropic_tool_calls(response: &Value) -> Option<Vec<ToolCall>> {
    if response.get("stop_reason").and_then(Value::as_str) != Some("tool_use") {
        return None;
    }
    let calls: Vec<ToolCall> = response
        .get("content")?
        .as_array()?
        .iter()
        .filter(|block| block.get("type").and_then(Value::as_str) == Some("tool_use"))
        .map(|block| {
            ToolCall::from_value(
                block["id"].as_str().unwrap_or_default(),
                block["name"].as_str().unwrap_or_default(),
                block.get("input").cloned().unwrap_or_else(|| json!({})),
            )
        })
        .collect();
    (!calls.is_empty()).then_some(calls)
}

pub fn anthropic_tool_result(call: &ToolCall, result: &str) -> Value {
    json!({
        "role": "user",
        "content": [{
            "type": "tool_result",
            "tool_use_id": call.id,
            "content": result,
        }]
    })
}

/// All results of a batch go back in one user turn, one block per call
pub fn anthropic_tool_results(results: &[(ToolCall, String)]) -> Vec<Value> {
    let blocks: Vec<Value> = results
        .iter()
        .flat_map(|(call, result)| {
            anthropic_tool_result(call, result)["content"]
                .as_array()
                .cloned()
                .unwrap_or_default()
        })
        .collect();
    if blocks.is_empty() {
        return Vec::new();
    }
    vec![json!({"role": "user", "content": blocks})]
}

pub fn anthropic_text(response: &Value) -> Option<String> {
    match response.get("content")? {
        Value::String(text) if !text.trim().is_empty() => Some(text.clone()),
        Value::Array(blocks) => join_text(
            blocks
                .iter()
                .filter(|b| b.get("type").and_then(Value::as_str) == Some("text")),
            "\n",
        ),
        _ => None,
    }
}

pub fn anthropic_assistant_message(response: &Value) -> Option<Value> {
    let content = response.get("content")?;
    Some(json!({"role": "assistant", "content": content}))
}

pub fn anthropic_text_message(role: Role, text: &str) -> Value {
    json!({"role": role.to_string(), "content": text})
}

fn anthropic_delta(event: &Value) -> Option<String> {
    if event.get("type").and_then(Value::as_str) != Some("content_block_delta") {
        return None;
    }
    event["delta"]["text"].as_str().map(str::to_string)
}

pub struct AnthropicProvider {
    client: Client,
    config: AnthropicProviderConfig,
}

impl AnthropicProvider {
    pub fn new(config: AnthropicProviderConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(600)) // 10 minutes timeout
            .build()?;

        Ok(Self { client, config })
    }

    fn payload(&self, system: &str, messages: &[Value], tools: &[Tool]) -> Value {
        let mut payload = Map::new();
        payload.insert("model".to_string(), json!(self.config.model));
        payload.insert("max_tokens".to_string(), json!(self.config.max_tokens));
        payload.insert("messages".to_string(), json!(messages));
        if !system.is_empty() {
            payload.insert("system".to_string(), json!(system));
        }
        if !tools.is_empty() {
            payload.insert("tools".to_string(), tools_to_anthropic_spec(tools));
        }
        if let Some(temp) = self.config.temperature {
            payload.insert("temperature".to_string(), json!(temp));
        }
        Value::Object(payload)
    }

    fn request(&self, payload: &Value) -> RequestBuilder {
        let url = format!("{}/v1/messages", self.config.host.trim_end_matches('/'));
        self.client
            .post(url)
            .header("x-api-key", &self.config.api_key)
            .header("anthropic-version", API_VERSION)
            .json(payload)
    }
}

#[async_trait]
impl Provider for AnthropicProvider {
    fn kind(&self) -> ProviderType {
        ProviderType::Anthropic
    }

    async fn complete(&self, system: &str, messages: &[Value], tools: &[Tool]) -> Result<Value> {
        let payload = self.payload(system, messages, tools);
        post_json(self.request(&payload)).await
    }

    async fn stream(
        &self,
        system: &str,
        messages: &[Value],
        tools: &[Tool],
    ) -> Result<TextStream> {
        let mut payload = self.payload(system, messages, tools);
        payload["stream"] = json!(true);
        let response = send(self.request(&payload)).await?;
        Ok(sse_text(response, anthropic_delta))
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
