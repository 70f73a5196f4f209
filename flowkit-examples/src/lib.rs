//! Example pipelines that exercise `flowkit`'s public API end to end.
//!
//! Nothing in this crate is part of the core contract — it only assembles
//! flows out of `flowkit::tools`' mock adapters to show what a caller-built
//! pipeline looks like. See `examples/article_writer.rs` and
//! `examples/ocr_pipeline.rs`.

use std::sync::Arc;

use flowkit::{Node, NodeOutcome, Tool};

/// Wraps a single tool call as one flow step: calls `tool`, merging its
/// output into the running state under `"default"`.
///
/// Every example pipeline in this crate is a sequence of these, since a bare
/// `Tool` is not itself a `Node` — it only becomes one once something
/// decides how its output should land in state (here: a plain overlay).
pub fn tool_step(name: impl Into<String>, tool: Arc<dyn Tool>) -> Arc<Node> {
    Node::new(name, move |state: flowkit::State| {
        let tool = tool.clone();
        async move {
            let output = tool.call(state.into_value()).await?;
            Ok(NodeOutcome::from(output))
        }
    })
}

/// Like [`tool_step`], but nests the tool's output under `key` instead of
/// overlaying it directly — for steps whose outputs would otherwise collide
/// (e.g. two LLM calls that both answer with `{"content": ...}`).
pub fn tool_step_keyed(name: impl Into<String>, tool: Arc<dyn Tool>, key: &'static str) -> Arc<Node> {
    Node::new(name, move |state: flowkit::State| {
        let tool = tool.clone();
        async move {
            let output = tool.call(state.into_value()).await?;
            Ok(NodeOutcome::from(serde_json::json!({ key: output })))
        }
    })
}
