use anyhow::{anyhow, Result};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde_json::{json, Map, Value};
use std::time::Duration;

use super::base::{Provider, TextStream};
use super::configs::OpenAiProviderConfig;
use super::factory::ProviderType;
use super::utils::{post_json, send, sse_text};
use crate::models::message::Role;
use crate::models::tool::{Tool, ToolCall};

/// Convert canonical tools to OpenAI's function tool specification
pub fn tools_to_openai_spec(tools: &[Tool]) -> Value {
    json!(tools
        .iter()
        .map(|tool| json!({
            "type": "function",
            "function": {
                "name": tool.name,
                "description": tool.description,
                "parameters": tool.input_schema,
            }
        }))
        .collect::<Vec<_>>())
}

/// Tool calls of the first choice.
///
/// `arguments` arrives as JSON text; text that does not parse yields empty arguments.
pub fn openai_tool_calls(response: &Value) -> Option<Vec<ToolCall>> {
    let tool_calls = response["choices"][0]["message"]
        .get("tool_calls")?
        .as_array()?;
    let calls: Vec<ToolCall> = tool_calls
        .iter()
        .map(|tool_call| {
            let arguments = tool_call["function"]["arguments"]
                .as_str()
                .unwrap_or_default();
            let input = serde_json::from_str::<Value>(arguments).unwrap_or_else(|e| {
                tracing::debug!("discarding unparseable tool arguments: {}", e);
                json!({})
            });
            ToolCall::from_value(
                tool_call["id"].as_str().unwrap_or_default(),
                tool_call["function"]["name"].as_str().unwrap_or_default(),
                input,
            )
        })
        .collect();
    (!calls.is_empty()).then_some(calls)
}

pub fn openai_tool_result(call: &ToolCall, result: &str) -> Value {
    json!({
        "role": "tool",
        "tool_call_id": call.id,
        "content": result,
    })
}

pub fn openai_text(response: &Value) -> Option<String> {
    response["choices"][0]["message"]["content"]
        .as_str()
        .filter(|text| !text.trim().is_empty())
        .map(str::to_string)
}

pub fn openai_assistant_message(response: &Value) -> Option<Value> {
    let message = response["choices"][0].get("message")?;
    let mut turn = json!({"role": "assistant", "content": message.get("content").cloned().unwrap_or(Value::Null)});
    if let Some(tool_calls) = message.get("tool_calls").filter(|t| t.is_array()) {
        turn["tool_calls"] = tool_calls.clone();
    }
    Some(turn)
}

fn openai_delta(event: &Value) -> Option<String> {
    event["choices"][0]["delta"]["content"]
        .as_str()
        .map(str::to_string)
}

pub struct OpenAiProvider {
    client: Client,
    config: OpenAiProviderConfig,
}

impl OpenAiProvider {
    pub fn new(config: OpenAiProviderConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(600)) // 10 minutes timeout
            .build()?;

        Ok(Self { client, config })
    }

    fn payload(&self, system: &str, messages: &[Value], tools: &[Tool]) -> Value {
        // create messages array with system message first
        let mut messages_array = Vec::with_capacity(messages.len() + 1);
        if !system.is_empty() {
            messages_array.push(json!({"role": "system", "content": system}));
        }
        messages_array.extend(messages.iter().cloned());

        let mut payload = Map::new();
        payload.insert("model".to_string(), json!(self.config.model));
        payload.insert("messages".to_string(), json!(messages_array));
        if !tools.is_empty() {
            payload.insert("tools".to_string(), tools_to_openai_spec(tools));
        }
        if let Some(temp) = self.config.temperature {
            payload.insert("temperature".to_string(), json!(temp));
        }
        if let Some(tokens) = self.config.max_tokens {
            payload.insert("max_tokens".to_string(), json!(tokens));
        }
        Value::Object(payload)
    }

    fn request(&self, payload: &Value) -> RequestBuilder {
        let url = format!(
            "{}/v1/chat/completions",
            self.config.host.trim_end_matches('/')
        );
        self.client
            .post(url)
            .header("Authorization", format!("Bearer {}", self.config.api_key))
            .json(payload)
    }
}

#[async_trait]
impl Provider for OpenAiProvider {
    fn kind(&self) -> ProviderType {
        ProviderType::OpenAi
    }

    async fn complete(&self, system: &str, messages: &[Value], tools: &[Tool]) -> Result<Value> {
        let payload = self.payload(system, messages, tools);
        let response = post_json(self.request(&payload)).await?;

        if let Some(error) = response.get("error").filter(|e| !e.is_null()) {
            return Err(anyhow!("OpenAI API error: {}", error));
        }
        Ok(response)
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
        Ok(sse_text(response, openai_delta))
    }

    fn tools_to_spec(&self, tools: &[Tool]) -> Value {
        tools_to_openai_spec(tools)
    }

    fn extract_tool_calls(&self, response: &Value) -> Option<Vec<ToolCall>> {
        openai_tool_calls(response)
    }

    fn tool_result_message(&self, call: &ToolCall, result: &str) -> Value {
        openai_tool_result(call, result)
    }

    fn assistant_message(&self, response: &Value) -> Option<Value> {
        openai_assistant_message(response)
    }

    fn extract_text(&self, response: &Value) -> Option<String> {
        openai_text(response)
    }

    fn text_message(&self, role: Role, text: &str) -> Value {
        json!({"role": role.to_string(), "content": text})
    }
}
