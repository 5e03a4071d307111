use anyhow::Result;
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde_json::{json, Map, Value};
use std::time::Duration;

use super::base::{Provider, TextStream};
use super::configs::GeminiProviderConfig;
use super::factory::ProviderType;
use super::utils::{join_text, post_json, send, sse_text};
use crate::models::message::Role;
use crate::models::tool::{Tool, ToolCall};

/// Gemini wraps every declaration in a single tool object
pub fn tools_to_gemini_spec(tools: &[Tool]) -> Value {
    let declarations: Vec<Value> = tools
        .iter()
        .map(|tool| {
            json!({
                "name": tool.name,
                "description": tool.description,
                "parameters": tool.input_schema,
            })
        })
        .collect();
    json!([{"functionDeclarations": declarations}])
}

fn first_candidate_parts(response: &Value) -> Option<&Vec<Value>> {
    response["candidates"][0]["content"]["parts"].as_array()
}

/// Gemini issues no call ids, so they are numbered `call_0`, `call_1`, ... in response order
pub fn gemini_tool_calls(response: &Value) -> Option<Vec<ToolCall>> {
    let calls: Vec<ToolCall> = first_candidate_parts(response)?
        .iter()
        .filter_map(|part| part.get("functionCall"))
        .enumerate()
        .map(|(index, call)| {
            ToolCall::from_value(
                format!("call_{}", index),
                call["name"].as_str().unwrap_or_default(),
                call.get("args").cloned().unwrap_or_else(|| json!({})),
            )
        })
        .collect();
    (!calls.is_empty()).then_some(calls)
}

pub fn gemini_tool_result(call: &ToolCall, result: &str) -> Value {
    json!({
        "role": "user",
        "parts": [{
            "functionResponse": {
                "name": call.name,
                "response": {"result": result},
            }
        }]
    })
}

pub fn gemini_text(response: &Value) -> Option<String> {
    join_text(first_candidate_parts(response)?.iter(), "")
}

pub fn gemini_assistant_message(response: &Value) -> Option<Value> {
    let parts = first_candidate_parts(response)?;
    Some(json!({"role": "model", "parts": parts}))
}

fn gemini_delta(event: &Value) -> Option<String> {
    gemini_text(event)
}

pub struct GeminiProvider {
    client: Client,
    config: GeminiProviderConfig,
}

impl GeminiProvider {
    pub fn new(config: GeminiProviderConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(600)) // 10 minutes timeout
            .build()?;

        Ok(Self { client, config })
    }

    fn payload(&self, system: &str, messages: &[Value], tools: &[Tool]) -> Value {
        let mut payload = Map::new();
        payload.insert("contents".to_string(), json!(messages));
        if !system.is_empty() {
            payload.insert(
                "systemInstruction".to_string(),
                json!({"parts": [{"text": system}]}),
            );
        }
        if !tools.is_empty() {
            payload.insert("tools".to_string(), tools_to_gemini_spec(tools));
        }
        if let Some(temp) = self.config.temperature {
            payload.insert("generationConfig".to_string(), json!({"temperature": temp}));
        }
        Value::Object(payload)
    }

    fn request(&self, method: &str, payload: &Value) -> RequestBuilder {
        let url = format!(
            "{}/v1beta/models/{}:{}",
            self.config.host.trim_end_matches('/'),
            self.config.model,
            method
        );
        self.client
            .post(url)
            .header("x-goog-api-key", &self.config.api_key)
            .json(payload)
    }
}

#[async_trait]
impl Provider for GeminiProvider {
    fn kind(&self) -> ProviderType {
        ProviderType::Gemini
    }

    async fn complete(&self, system: &str, messages: &[Value], tools: &[Tool]) -> Result<Value> {
        let payload = self.payload(system, messages, tools);
        post_json(self.request("generateContent", &payload)).await
    }

    async fn stream(
        &self,
        system: &str,
        messages: &[Value],
        tools: &[Tool],
    ) -> Result<TextStream> {
        let payload = self.payload(system, messages, tools);
        let response = send(self.request("streamGenerateContent?alt=sse", &payload)).await?;
        Ok(sse_text(response, gemini_delta))
    }

    fn tools_to_spec(&self, tools: &[Tool]) -> Value {
        tools_to_gemini_spec(tools)
    }

    fn extract_tool_calls(&self, response: &Value) -> Option<Vec<ToolCall>> {
        gemini_tool_calls(response)
    }

    fn tool_result_message(&self, call: &ToolCall, result: &str) -> Value {
        gemini_tool_result(call, result)
    }

    fn assistant_message(&self, response: &Value) -> Option<Value> {
        gemini_assistant_message(response)
    }

    fn extract_text(&self, response: &Value) -> Option<String> {
        gemini_text(response)
    }

    fn text_message(&self, role: Role, text: &str) -> Value {
        let role = match role {
            Role::User => "user",
            Role::Assistant => "model",
        };
        json!({"role": role, "parts": [{"text": text}]})
    }
}
