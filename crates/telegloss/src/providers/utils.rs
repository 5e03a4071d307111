use anyhow::{anyhow, Result};
use async_stream::try_stream;
use futures::StreamExt;
use reqwest::{RequestBuilder, Response, StatusCode};
use serde_json::Value;

use super::base::TextStream;

/// Send a request and turn any non-success status into an error carrying the body
pub async fn send(request: RequestBuilder) -> Result<Response> {
    let response = request.send().await?;
    match response.status() {
        status if status.is_success() => Ok(response),
        status if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() => {
            Err(anyhow!("Server error: {}", status))
        }
        status => {
            let body = response.text().await.unwrap_or_default();
            Err(anyhow!("Request failed: {}\n{}", status, body))
        }
    }
}

pub async fn post_json(request: RequestBuilder) -> Result<Value> {
    let response = send(request).await?;
    Ok(response.json().await?)
}

/// Errors reported inside an otherwise successful body, as every vendor does for streams
fn body_error(event: &Value) -> Option<String> {
    let error = event.get("error").filter(|e| !e.is_null())?;
    let message = error
        .get("message")
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| error.to_string());
    Some(message)
}

/// Extract the JSON payload of each `data:` line of a server-sent-event body.
///
/// Stops at the `[DONE]` sentinel or the end of the body.
pub fn sse_events(response: Response) -> impl futures::Stream<Item = Result<Value>> {
    sse_chunks(response.bytes_stream())
}

/// Same as [`sse_events`] over raw body chunks.
///
/// Lines are decoded only once complete, so a multi-byte character split
/// across two chunks is reassembled before decoding.
pub fn sse_chunks<S, B, E>(chunks: S) -> impl futures::Stream<Item = Result<Value>>
where
    S: futures::Stream<Item = std::result::Result<B, E>> + Unpin,
    B: AsRef<[u8]>,
    E: std::error::Error + Send + Sync + 'static,
{
    try_stream! {
        let mut chunks = chunks;
        let mut buffer: Vec<u8> = Vec::new();
        'outer: while let Some(chunk) = chunks.next().await {
            buffer.extend_from_slice(chunk?.as_ref());
            while let Some(newline) = buffer.iter().position(|&b| b == b'\n') {
                let raw: Vec<u8> = buffer.drain(..=newline).collect();
                let line = String::from_utf8(raw)?;
                let Some(data) = line.trim().strip_prefix("data:") else {
                    continue;
                };
                let data = data.trim();
                if data == "[DONE]" {
                    break 'outer;
                }
                if data.is_empty() {
                    continue;
                }
                let event: Value = serde_json::from_str(data)?;
                if let Some(message) = body_error(&event) {
                    Err::<(), _>(anyhow!("Stream error: {}", message))?;
                }
                yield event;
            }
        }
    }
}

/// Map server-sent events to text deltas with a vendor specific extractor
pub fn sse_text(response: Response, delta: fn(&Value) -> Option<String>) -> TextStream {
    sse_events(response)
        .filter_map(move |event| async move {
            match event {
                Ok(event) => delta(&event).filter(|text| !text.is_empty()).map(Ok),
                Err(e) => Some(Err(e)),
            }
        })
        .boxed()
}

/// Concatenate the `text` fields of the blocks that have one
pub fn join_text<'a>(blocks: impl Iterator<Item = &'a Value>, separator: &str) -> Option<String> {
    let texts: Vec<&str> = blocks
        .filter_map(|block| block.get("text").and_then(Value::as_str))
        .collect();
    let joined = texts.join(separator);
    if joined.trim().is_empty() {
        None
    } else {
        Some(joined)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn sse_response(body: &str, status: u16) -> (MockServer, Result<Response>) {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(status)
                    .insert_header("content-type", "text/event-stream")
                    .set_body_string(body.to_string()),
            )
            .mount(&server)
            .await;
        let response = send(reqwest::Client::new().post(server.uri())).await;
        (server, response)
    }

    fn delta(event: &Value) -> Option<String> {
        event["d"].as_str().map(str::to_string)
    }

    #[tokio::test]
    async fn test_sse_text_deltas() -> Result<()> {
        let body = "event: x\ndata: {\"d\":\"Hel\"}\n\ndata: {\"other\":1}\n\ndata: {\"d\":\"lo\"}\n\ndata: [DONE]\n\ndata: {\"d\":\"ignored\"}\n";
        let (_server, response) = sse_response(body, 200).await;
        let stream = sse_text(response?, delta);
        let parts: Vec<String> = stream.map(|r| r.unwrap()).collect().await;
        assert_eq!(parts, vec!["Hel", "lo"]);
        Ok(())
    }

    #[tokio::test]
    async fn test_sse_error_event() -> Result<()> {
        let body = "data: {\"d\":\"a\"}\n\ndata: {\"type\":\"error\",\"error\":{\"message\":\"overloaded\"}}\n\n";
        let (_server, response) = sse_response(body, 200).await;
        let results: Vec<Result<String>> = sse_text(response?, delta).collect().await;
        assert_eq!(results.len(), 2);
        assert_eq!(
            results[1].as_ref().unwrap_err().to_string(),
            "Stream error: overloaded"
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_send_reports_status() {
        let (_server, response) = sse_response("bad key", 401).await;
        assert_eq!(
            response.unwrap_err().to_string(),
            "Request failed: 401 Unauthorized\nbad key"
        );
        let (_server, response) = sse_response("", 503).await;
        let err = response.unwrap_err();
        assert_eq!(err.to_string(), "Server error: 503 Service Unavailable");
    }

    #[tokio::test]
    async fn test_sse_chunks_split_inside_character() {
        let body = "data: {\"d\":\"שלום\"}\n\ndata: {\"d\":\" é\"}\n\n".as_bytes();
        // split inside the first Hebrew letter and inside the accented letter
        let first = body.iter().position(|&b| b == 0xD7).unwrap() + 1;
        let second = body.len() - 5;
        let chunks: Vec<std::result::Result<Vec<u8>, std::io::Error>> = vec![
            Ok(body[..first].to_vec()),
            Ok(body[first..second].to_vec()),
            Ok(body[second..].to_vec()),
        ];
        let events: Vec<Value> = sse_chunks(futures::stream::iter(chunks))
            .map(|r| r.unwrap())
            .collect()
            .await;
        let parts: Vec<String> = events.iter().filter_map(delta).collect();
        assert_eq!(parts, vec!["שלום", " é"]);
    }

    #[test]
    fn test_join_text() {
        let blocks = [json!({"text": "a"}), json!({"type": "tool_use"}), json!({"text": "b"})];
        assert_eq!(join_text(blocks.iter(), "\n"), Some("a\nb".to_string()));
        assert_eq!(join_text([json!({"text": " "})].iter(), ""), None);
    }
}
