//! ICAET knowledge base access
//!
//! This module provides:
//! - A trait for knowledge base backends
//! - The HTTP client for the ICAET query API
//! - Rendering of successful answers

mod http_backend;

pub use http_backend::*;

use crate::config::ResponseFormat;
use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Successful body returned by the knowledge base
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QueryResponse {
    body: Map<String, Value>,
}

impl QueryResponse {
    pub fn new(body: Map<String, Value>) -> Self {
        Self { body }
    }

    /// The `answer` field, when it is a string
    pub fn answer(&self) -> Option<&str> {
        self.body.get("answer").and_then(Value::as_str)
    }

    /// Source references attached to the answer, if any
    pub fn sources(&self) -> Option<&Vec<Value>> {
        self.body.get("sources").and_then(Value::as_array)
    }

    pub fn body(&self) -> &Map<String, Value> {
        &self.body
    }

    pub fn into_body(self) -> Map<String, Value> {
        self.body
    }

    /// Render for display.
    ///
    /// `Answer` yields the `answer` field (non-string answers are serialized),
    /// or the whole body as compact JSON when there is none.
    pub fn render(&self, format: ResponseFormat) -> String {
        match format {
            ResponseFormat::Answer => match self.body.get("answer") {
                Some(Value::String(answer)) => answer.clone(),
                Some(other) => other.to_string(),
                None => Value::Object(self.body.clone()).to_string(),
            },
            ResponseFormat::Json => serde_json::to_string_pretty(&self.body)
                .unwrap_or_else(|_| Value::Object(self.body.clone()).to_string()),
        }
    }
}

/// Trait for knowledge base providers
#[async_trait]
pub trait KnowledgeBase: Send + Sync {
    /// Ask one question; exactly one upstream attempt per call
    async fn ask(&self, question: &str) -> Result<QueryResponse>;

    /// Human-readable backend description for logs and status output
    fn describe(&self) -> String;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn response(value: Value) -> QueryResponse {
        match value {
            Value::Object(map) => QueryResponse::new(map),
            _ => panic!("test bodies must be objects"),
        }
    }

    #[test]
    fn test_render_unwraps_answer() {
        let r = response(json!({"answer": "Test answer", "sources": []}));
        assert_eq!(r.answer(), Some("Test answer"));
        assert_eq!(r.render(ResponseFormat::Answer), "Test answer");
        assert_eq!(r.sources().map(Vec::len), Some(0));
    }

    #[test]
    fn test_render_without_answer_serializes_body() {
        let r = response(json!({"result": "data"}));
        assert_eq!(r.answer(), None);
        assert_eq!(r.render(ResponseFormat::Answer), r#"{"result":"data"}"#);
    }

    #[test]
    fn test_render_non_string_answer() {
        let r = response(json!({"answer": 42}));
        assert_eq!(r.answer(), None);
        assert_eq!(r.render(ResponseFormat::Answer), "42");
    }

    #[test]
    fn test_render_json_keeps_whole_body() {
        let r = response(json!({"answer": "X", "sources": [{"title": "Keynote"}]}));
        let rendered = r.render(ResponseFormat::Json);
        let parsed: Value = serde_json::from_str(&rendered).unwrap();
        assert_eq!(parsed["sources"][0]["title"], "Keynote");
        assert_eq!(parsed["answer"], "X");
    }
}
