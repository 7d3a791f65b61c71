//! Gradio apps over the HTTP "call" API.
//!
//! `POST {base}/gradio_api/call/{endpoint}` queues the job and returns an
//! `event_id`; `GET` on the same path plus the id streams server-sent events
//! until `event: complete` (or `event: error`).

use crate::check_status;
use async_trait::async_trait;
use futures_util::StreamExt;
use serde_json::{json, Value};
use sourcewatch_core::errors::TransportError;
use sourcewatch_core::providers::source::SourceAdapter;

pub struct GradioSource {
    pub id: String,
    pub base_url: String,
    pub endpoint: String,
    pub client: reqwest::Client,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SseEvent {
    pub event: Option<String>,
    pub data: String,
}

/// Incremental SSE framing; chunk boundaries may fall anywhere.
#[derive(Debug, Default)]
pub struct SseParser {
    buf: Vec<u8>,
}

impl SseParser {
    pub fn push(&mut self, chunk: &[u8]) -> Vec<SseEvent> {
        self.buf.extend(chunk.iter().filter(|b| **b != b'\r'));
        let mut events = Vec::new();
        while let Some(end) = self.buf.windows(2).position(|w| w == b"\n\n") {
            let block: Vec<u8> = self.buf.drain(..end + 2).collect();
            if let Some(ev) = parse_block(&String::from_utf8_lossy(&block)) {
                events.push(ev);
            }
        }
        events
    }

    /// Whatever is left once the stream closed without a trailing blank line.
    pub fn finish(&mut self) -> Option<SseEvent> {
        let rest = std::mem::take(&mut self.buf);
        parse_block(&String::from_utf8_lossy(&rest))
    }
}

fn parse_block(block: &str) -> Option<SseEvent> {
    let mut event = None;
    let mut data: Vec<&str> = Vec::new();
    for line in block.lines() {
        if let Some(v) = line.strip_prefix("event:") {
            event = Some(v.trim().to_string());
        } else if let Some(v) = line.strip_prefix("data:") {
            data.push(v.strip_prefix(' ').unwrap_or(v));
        }
    }
    if event.is_none() && data.is_empty() {
        return None;
    }
    Some(SseEvent {
        event,
        data: data.join("\n"),
    })
}

/// The completion payload is the endpoint's output list; a chat endpoint has one.
pub fn completion_answer(data: &str) -> Result<String, TransportError> {
    let v: Value = serde_json::from_str(data)
        .map_err(|e| TransportError::Format(format!("gradio completion is not JSON: {}", e)))?;
    match v {
        Value::Array(items) => match items.into_iter().next() {
            Some(Value::String(s)) => Ok(s),
            Some(Value::Null) | None => {
                Err(TransportError::Format("gradio completion is empty".into()))
            }
            Some(other) => Ok(other.to_string()),
        },
        Value::String(s) => Ok(s),
        other => Err(TransportError::Format(format!(
            "unexpected gradio completion: {}",
            other
        ))),
    }
}

impl GradioSource {
    fn call_url(&self) -> String {
        format!("{}/gradio_api/call/{}", self.base_url, self.endpoint)
    }
}

#[async_trait]
impl SourceAdapter for GradioSource {
    fn id(&self) -> &str {
        &self.id
    }

    async fn answer(&self, question: &str) -> Result<String, TransportError> {
        let resp = self
            .client
            .post(self.call_url())
            .json(&json!({ "data": [question] }))
            .send()
            .await?;
        let queued: Value = check_status(resp).await?.json().await?;
        let event_id = queued
            .get("event_id")
            .and_then(|v| v.as_str())
            .ok_or_else(|| TransportError::Format("gradio call returned no event_id".into()))?;

        let resp = self
            .client
            .get(format!("{}/{}", self.call_url(), event_id))
            .send()
            .await?;
        let mut stream = check_status(resp).await?.bytes_stream();

        let mut parser = SseParser::default();
        let mut pending: Vec<SseEvent> = Vec::new();
        loop {
            for ev in pending.drain(..) {
                match ev.event.as_deref() {
                    Some("complete") => return completion_answer(&ev.data),
                    Some("error") => {
                        return Err(TransportError::Format(format!(
                            "gradio reported an error: {}",
                            ev.data
                        )))
                    }
                    _ => {}
                }
            }
            match stream.next().await {
                Some(chunk) => pending = parser.push(&chunk?),
                None => match parser.finish() {
                    Some(ev) if ev.event.as_deref() == Some("complete") => {
                        return completion_answer(&ev.data)
                    }
                    _ => {
                        return Err(TransportError::Format(
                            "gradio stream closed before completion".into(),
                        ))
                    }
                },
            }
        }
    }
}
