//! A three-step content pipeline: outline → draft → publish.
//!
//! Each step is a mock LLM/API tool wrapped as one flow step via
//! `flowkit_examples::tool_step`; running the flow merges each step's output
//! into the running state in turn.

use std::sync::Arc;

use flowkit::tools::{MockApiTool, MockLlmTool};
use flowkit::{Flow, State};
use flowkit_examples::{tool_step, tool_step_keyed};
use serde_json::json;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let outline = Arc::new(MockLlmTool::with_fixed_completion(
        "outline",
        "I. Why flows II. Nodes and edges III. Wiring it together",
    ));
    let draft = Arc::new(MockLlmTool::with_fixed_completion(
        "draft",
        "Orchestration doesn't need to be complicated...",
    ));
    let publish = Arc::new(MockApiTool::new(
        "publish",
        json!({"status": "published", "url": "https://example.invalid/articles/42"}),
    ));

    let mut flow = Flow::start(|s: State| async move { Ok(s.into()) });
    flow.next(tool_step_keyed("outline", outline, "outline"));
    flow.next(tool_step_keyed("draft", draft, "draft"));
    flow.next(tool_step("publish", publish));
    flow.debug(true);

    let result = flow
        .run(State::from_value(json!({"topic": "graph-based orchestration in Rust"})))
        .await?;

    println!("{}", serde_json::to_string_pretty(result.as_value())?);
    Ok(())
}
