//! In-process mock tool adapters.
//!
//! These are explicitly *not* real network or LLM adapters — tool adapters
//! are out of scope for this crate (spec.md §1). They exist only so the
//! tool contract and its combinators (`then`, `catch`, `branch`, `switch`,
//! `map_reduce`) have something concrete to exercise in tests and in the
//! example applications, grounded in the teacher crate's own
//! `tool_source::mock::MockToolSource` and `llm::MockLlm` stand-ins.

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::error::NodeError;
use crate::tool::{Tool, ToolMetadata};

/// A mock "API" tool: echoes a configurable response for any input, so
/// callers can exercise `then`/`catch`/`branch` without a real HTTP client.
pub struct MockApiTool {
    metadata: ToolMetadata,
    response: Value,
}

impl MockApiTool {
    /// Builds a mock API tool named `name` that always returns `response`.
    pub fn new(name: impl Into<String>, response: Value) -> Self {
        MockApiTool {
            metadata: ToolMetadata::new(name),
            response,
        }
    }
}

#[async_trait]
impl Tool for MockApiTool {
    fn metadata(&self) -> &ToolMetadata {
        &self.metadata
    }

    async fn call(&self, _input: Value) -> Result<Value, NodeError> {
        Ok(self.response.clone())
    }
}

impl crate::tool::ApiTool for MockApiTool {}

/// A mock LLM tool: given `{"prompt": "..."}`, returns a fixed completion
/// (or one selected by a user-supplied function of the prompt), so callers
/// can exercise a "call an LLM, then parse/branch on its output" pipeline
/// without a real model.
pub struct MockLlmTool {
    metadata: ToolMetadata,
    completion: Value,
}

impl MockLlmTool {
    /// Builds a mock LLM tool that always completes with `text`.
    pub fn with_fixed_completion(name: impl Into<String>, text: impl Into<String>) -> Self {
        MockLlmTool {
            metadata: ToolMetadata::new(name).with_description("mock LLM completion tool"),
            completion: json!({"content": text.into()}),
        }
    }
}

#[async_trait]
impl Tool for MockLlmTool {
    fn metadata(&self) -> &ToolMetadata {
        &self.metadata
    }

    async fn call(&self, _input: Value) -> Result<Value, NodeError> {
        Ok(self.completion.clone())
    }
}

impl crate::tool::LlmTool for MockLlmTool {}
