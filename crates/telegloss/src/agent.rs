use anyhow::Result;
use futures::{Stream, StreamExt};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::Instant;

use crate::models::glossary::Glossary;
use crate::models::message::ChatMessage;
use crate::models::stream::StreamEvent;
use crate::models::tool::ToolCall;
use crate::prompt_template::GlossaryPrompt;
use crate::providers::base::Provider;
use crate::systems::System;

/// Text returned when the model answers with neither text nor tool calls
pub const NO_RESPONSE: &str = "No response generated.";

/// Capacity of the event channel between the worker and the consumer
pub const EVENT_BUFFER: usize = 100;

/// Ceiling used by consumers draining a streamed turn
pub const DEFAULT_STREAM_TIMEOUT: Duration = Duration::from_secs(120);

/// Agent pairs a model provider with the tool system it may call.
///
/// A turn makes at most two model requests: the first may ask for tools, and
/// the second answers with their results in the history.
#[derive(Clone)]
pub struct Agent {
    provider: Arc<dyn Provider>,
    system: Arc<dyn System>,
}

impl Agent {
    pub fn new(provider: Arc<dyn Provider>, system: Arc<dyn System>) -> Self {
        Self { provider, system }
    }

    pub fn provider(&self) -> &dyn Provider {
        self.provider.as_ref()
    }

    pub fn system_prompt(&self, glossary: &Glossary) -> Result<String> {
        Ok(GlossaryPrompt::new(glossary, &[self.system.as_ref()]).render()?)
    }

    fn conversation(&self, history: &[ChatMessage], prompt: &str) -> Vec<Value> {
        let mut messages = self.provider.history(history);
        messages.push(self.provider.user_message(prompt));
        messages
    }

    /// Run every call in order; a failing call becomes an `Error: ...` result
    async fn run_tools(
        &self,
        calls: &[ToolCall],
        events: Option<&mpsc::Sender<StreamEvent>>,
    ) -> Vec<(ToolCall, String)> {
        let mut results = Vec::with_capacity(calls.len());
        for call in calls {
            if let Some(tx) = events {
                let _ = tx.send(StreamEvent::tool_call(call)).await;
            }

            let (result, success) = match self.system.call(call).await {
                Ok(output) => (output, true),
                Err(e) => {
                    tracing::warn!(tool = %call.name, "tool call failed: {}", e);
                    (format!("Error: {}", e), false)
                }
            };

            if let Some(tx) = events {
                let _ = tx
                    .send(StreamEvent::tool_result(call, &result, success))
                    .await;
            }
            results.push((call.clone(), result));
        }
        results
    }

    /// Append the assistant turn and the tool results, in that order
    fn extend_with_results(
        &self,
        messages: &mut Vec<Value>,
        response: &Value,
        results: &[(ToolCall, String)],
    ) {
        if let Some(turn) = self.provider.assistant_message(response) {
            messages.push(turn);
        }
        messages.extend(self.provider.tool_result_messages(results));
    }

    /// Answer one user prompt, running any requested tools
    pub async fn reply(
        &self,
        glossary: &Glossary,
        history: &[ChatMessage],
        prompt: &str,
    ) -> Result<String> {
        let system_prompt = self.system_prompt(glossary)?;
        let tools = self.system.tools();
        let mut messages = self.conversation(history, prompt);

        let response = self
            .provider
            .complete(&system_prompt, &messages, tools)
            .await?;

        let Some(calls) = self.provider.extract_tool_calls(&response) else {
            return Ok(self
                .provider
                .extract_text(&response)
                .unwrap_or_else(|| NO_RESPONSE.to_string()));
        };

        tracing::info!(count = calls.len(), "executing tool calls");
        let results = self.run_tools(&calls, None).await;
        self.extend_with_results(&mut messages, &response, &results);

        let follow_up = self
            .provider
            .complete(&system_prompt, &messages, tools)
            .await?;
        Ok(self
            .provider
            .extract_text(&follow_up)
            .unwrap_or_else(|| NO_RESPONSE.to_string()))
    }

    /// Run the same turn on a spawned worker, publishing progress events.
    ///
    /// The receiver sees tool calls and results as they happen, text deltas of
    /// the follow-up answer, the final text, and then `Done` or `Error`.
    pub fn reply_streaming(
        &self,
        glossary: &Glossary,
        history: &[ChatMessage],
        prompt: &str,
    ) -> mpsc::Receiver<StreamEvent> {
        let (tx, rx) = mpsc::channel(EVENT_BUFFER);
        let agent = self.clone();
        let system_prompt = self.system_prompt(glossary);
        let messages = self.conversation(history, prompt);

        tokio::spawn(async move {
            let outcome = match system_prompt {
                Ok(system_prompt) => agent.stream_turn(&system_prompt, messages, &tx).await,
                Err(e) => Err(e),
            };
            let last = match outcome {
                Ok(()) => StreamEvent::done(),
                Err(e) => {
                    tracing::error!("streamed turn failed: {}", e);
                    StreamEvent::error(e.to_string())
                }
            };
            let _ = tx.send(last).await;
        });

        rx
    }

    async fn stream_turn(
        &self,
        system_prompt: &str,
        mut messages: Vec<Value>,
        tx: &mpsc::Sender<StreamEvent>,
    ) -> Result<()> {
        let tools = self.system.tools();
        let response = self
            .provider
            .complete(system_prompt, &messages, tools)
            .await?;

        let Some(calls) = self.provider.extract_tool_calls(&response) else {
            let text = self
                .provider
                .extract_text(&response)
                .unwrap_or_else(|| NO_RESPONSE.to_string());
            let _ = tx.send(StreamEvent::text(text)).await;
            return Ok(());
        };

        let results = self.run_tools(&calls, Some(tx)).await;
        self.extend_with_results(&mut messages, &response, &results);

        let mut deltas = self.provider.stream(system_prompt, &messages, tools).await?;
        let mut text = String::new();
        while let Some(delta) = deltas.next().await {
            let delta = delta?;
            if delta.is_empty() {
                continue;
            }
            text.push_str(&delta);
            if tx.send(StreamEvent::text_delta(delta)).await.is_err() {
                // receiver is gone
                return Ok(());
            }
        }

        if text.trim().is_empty() {
            text = NO_RESPONSE.to_string();
        }
        let _ = tx.send(StreamEvent::text(text)).await;
        Ok(())
    }
}

/// Next event before `deadline`. A timeout yields an error event; a closed channel yields `None`.
async fn recv_until(
    rx: &mut mpsc::Receiver<StreamEvent>,
    deadline: Instant,
    timeout: Duration,
) -> Option<StreamEvent> {
    match tokio::time::timeout_at(deadline, rx.recv()).await {
        Ok(event) => event,
        Err(_) => {
            tracing::warn!("streamed turn timed out after {:?}", timeout);
            Some(StreamEvent::error(format!(
                "Response timed out after {} seconds",
                timeout.as_secs()
            )))
        }
    }
}

/// Collect events until `Done`, `Error`, or the channel closes.
///
/// When `timeout` elapses first, an error event is appended and draining
/// stops; the worker itself keeps running.
pub async fn drain_events(
    rx: &mut mpsc::Receiver<StreamEvent>,
    timeout: Duration,
) -> Vec<StreamEvent> {
    let deadline = Instant::now() + timeout;
    let mut events = Vec::new();
    while let Some(event) = recv_until(rx, deadline, timeout).await {
        let terminal = event.is_terminal();
        events.push(event);
        if terminal {
            break;
        }
    }
    events
}

/// Same as [`drain_events`], yielding each event as it arrives
pub fn event_stream(
    mut rx: mpsc::Receiver<StreamEvent>,
    timeout: Duration,
) -> impl Stream<Item = StreamEvent> + Send + 'static {
    async_stream::stream! {
        let deadline = Instant::now() + timeout;
        while let Some(event) = recv_until(&mut rx, deadline, timeout).await {
            let terminal = event.is_terminal();
            yield event;
            if terminal {
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::{AgentError, AgentResult};
    use crate::models::stream::EventType;
    use crate::models::tool::Tool;
    use crate::providers::mock::MockProvider;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Mutex;

    /// Records calls and fails any tool named `broken`
    struct RecordingSystem {
        tools: Vec<Tool>,
        calls: Mutex<Vec<String>>,
    }

    impl RecordingSystem {
        fn new() -> Self {
            Self {
                tools: vec![
                    Tool::new("get_page", "Get a page", json!({"type": "object"})),
                    Tool::new("broken", "Always fails", json!({"type": "object"})),
                ],
                calls: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl System for RecordingSystem {
        fn name(&self) -> &str {
            "Recording"
        }

        fn description(&self) -> &str {
            "Test tools"
        }

        fn instructions(&self) -> &str {
            "Call them"
        }

        fn tools(&self) -> &[Tool] {
            &self.tools
        }

        async fn call(&self, tool_call: &ToolCall) -> AgentResult<String> {
            self.calls.lock().unwrap().push(tool_call.name.clone());
            match tool_call.name.as_str() {
                "get_page" => Ok(json!({"success": true, "title": "API"}).to_string()),
                "broken" => Err(AgentError::ExecutionError("boom".to_string())),
                _ => Err(AgentError::ToolNotFound(tool_call.name.clone())),
            }
        }
    }

    fn text_response(text: &str) -> Value {
        json!({"content": [{"type": "text", "text": text}], "stop_reason": "end_turn"})
    }

    fn tool_response(calls: &[(&str, &str)]) -> Value {
        let blocks: Vec<Value> = calls
            .iter()
            .map(|(id, name)| json!({"type": "tool_use", "id": id, "name": name, "input": {}}))
            .collect();
        json!({"content": blocks, "stop_reason": "tool_use"})
    }

    fn agent(provider: &MockProvider, system: Arc<RecordingSystem>) -> Agent {
        Agent::new(Arc::new(provider.clone()), system)
    }

    #[tokio::test]
    async fn test_reply_without_tools() -> Result<()> {
        let provider = MockProvider::new(vec![text_response("Hello there")]);
        let system = Arc::new(RecordingSystem::new());
        let agent = agent(&provider, system.clone());

        let history = vec![ChatMessage::user("hi"), ChatMessage::assistant("hey")];
        let reply = agent.reply(&Glossary::new(), &history, "Hello").await?;

        assert_eq!(reply, "Hello there");
        assert!(system.calls.lock().unwrap().is_empty());
        let requests = provider.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].len(), 3);
        assert_eq!(requests[0][2], json!({"role": "user", "content": "Hello"}));
        Ok(())
    }

    #[tokio::test]
    async fn test_failing_call_does_not_abort_batch() -> Result<()> {
        let provider = MockProvider::new(vec![
            tool_response(&[("t1", "broken"), ("t2", "get_page"), ("t3", "missing")]),
            text_response("Done."),
        ]);
        let system = Arc::new(RecordingSystem::new());
        let agent = agent(&provider, system.clone());

        let reply = agent.reply(&Glossary::new(), &[], "Fix it").await?;
        assert_eq!(reply, "Done.");
        assert_eq!(
            *system.calls.lock().unwrap(),
            vec!["broken", "get_page", "missing"]
        );

        // user prompt, assistant turn, one batched tool result turn
        let follow_up = &provider.requests()[1];
        assert_eq!(follow_up.len(), 3);
        assert_eq!(follow_up[1]["role"], "assistant");
        let results = follow_up[2]["content"].as_array().unwrap();
        assert_eq!(results[0]["content"], "Error: Tool execution failed: boom");
        assert_eq!(results[1]["tool_use_id"], "t2");
        assert_eq!(results[2]["content"], "Error: Tool not found: missing");
        Ok(())
    }

    #[tokio::test]
    async fn test_fallback_text() -> Result<()> {
        let provider = MockProvider::new(vec![tool_response(&[("t1", "get_page")])]);
        let agent = agent(&provider, Arc::new(RecordingSystem::new()));
        // the follow-up finds the queue empty and answers with no content
        let reply = agent.reply(&Glossary::new(), &[], "Show").await?;
        assert_eq!(reply, NO_RESPONSE);
        Ok(())
    }

    #[tokio::test]
    async fn test_provider_error_propagates() {
        let provider = MockProvider::new(vec![json!({"error": "Server error: 503"})]);
        let agent = agent(&provider, Arc::new(RecordingSystem::new()));
        let error = agent
            .reply(&Glossary::new(), &[], "Hello")
            .await
            .unwrap_err();
        assert_eq!(error.to_string(), "Server error: 503");
    }

    #[tokio::test]
    async fn test_streaming_event_order() {
        let provider = MockProvider::new(vec![
            tool_response(&[("t1", "get_page"), ("t2", "broken")]),
            text_response("Page updated"),
        ]);
        let agent = agent(&provider, Arc::new(RecordingSystem::new()));

        let mut rx = agent.reply_streaming(&Glossary::new(), &[], "Update API");
        let events = drain_events(&mut rx, DEFAULT_STREAM_TIMEOUT).await;
        let kinds: Vec<EventType> = events.iter().map(|e| e.kind).collect();
        assert_eq!(
            kinds,
            vec![
                EventType::ToolCall,
                EventType::ToolResult,
                EventType::ToolCall,
                EventType::ToolResult,
                EventType::TextDelta,
                EventType::TextDelta,
                EventType::Text,
                EventType::Done,
            ]
        );
        assert_eq!(events[1].data["success"], json!(true));
        assert_eq!(events[3].data["success"], json!(false));
        assert_eq!(events[6].text_payload(), Some("Page updated"));
    }

    #[tokio::test]
    async fn test_streaming_without_tools_and_with_error() {
        let provider = MockProvider::new(vec![text_response("Just text")]);
        let agent = agent(&provider, Arc::new(RecordingSystem::new()));
        let mut rx = agent.reply_streaming(&Glossary::new(), &[], "Hi");
        let events = drain_events(&mut rx, DEFAULT_STREAM_TIMEOUT).await;
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].text_payload(), Some("Just text"));
        assert_eq!(events[1].kind, EventType::Done);

        let provider = MockProvider::new(vec![json!({"error": "Request failed: 401"})]);
        let agent = self::agent(&provider, Arc::new(RecordingSystem::new()));
        let mut rx = agent.reply_streaming(&Glossary::new(), &[], "Hi");
        let events = drain_events(&mut rx, DEFAULT_STREAM_TIMEOUT).await;
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind, EventType::Error);
        assert_eq!(events[0].data["message"], json!("Request failed: 401"));
    }

    #[tokio::test]
    async fn test_event_stream_matches_drain() {
        let provider = MockProvider::new(vec![text_response("Streamed reply")]);
        let agent = agent(&provider, Arc::new(RecordingSystem::new()));
        let rx = agent.reply_streaming(&Glossary::new(), &[], "Hi");
        let events: Vec<StreamEvent> = event_stream(rx, DEFAULT_STREAM_TIMEOUT).collect().await;
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].text_payload(), Some("Streamed reply"));
        assert!(events[1].is_terminal());
    }

    #[tokio::test]
    async fn test_drain_timeout_leaves_worker_running() {
        let provider = MockProvider::new(vec![text_response("late")])
            .with_delay(Duration::from_millis(300));
        let agent = agent(&provider, Arc::new(RecordingSystem::new()));

        let mut rx = agent.reply_streaming(&Glossary::new(), &[], "Hi");
        let events = drain_events(&mut rx, Duration::from_millis(50)).await;
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind, EventType::Error);
        assert!(events[0].data["message"]
            .as_str()
            .unwrap()
            .contains("timed out"));

        // the worker was not cancelled and still finishes the turn
        let rest = drain_events(&mut rx, Duration::from_secs(5)).await;
        assert_eq!(rest.last().map(|e| e.kind), Some(EventType::Done));
        assert_eq!(rest[0].text_payload(), Some("late"));
    }
}
