//! A fan-out OCR pipeline: extract text from each page concurrently, reduce
//! into one document, then run it through a cleanup pass.
//!
//! Demonstrates `flowkit::map_reduce` wired directly as a flow step — its
//! return value already satisfies `Flow::next`'s `IntoTarget` bound, so no
//! wrapping `Node` is needed.

use std::pin::Pin;
use std::sync::Arc;

use flowkit::tools::{MockApiTool, MockLlmTool};
use flowkit::{map_reduce, Flow, NodeError, State};
use flowkit_examples::tool_step_keyed;
use serde_json::{json, Value};

type MapFuture = Pin<Box<dyn std::future::Future<Output = Result<Value, NodeError>> + Send>>;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let ocr = Arc::new(MockApiTool::new("ocr", json!({"text": "lorem ipsum"})));

    let map_fn: Arc<dyn Fn(Value) -> MapFuture + Send + Sync> = Arc::new(move |page: Value| {
        let ocr = ocr.clone();
        Box::pin(async move {
            let extracted = ocr.call(page).await?;
            Ok(extracted.get("text").cloned().unwrap_or(Value::Null))
        })
    });

    let reduce_fn: Arc<dyn Fn(Vec<Value>, State) -> Result<State, NodeError> + Send + Sync> =
        Arc::new(|pages, state: State| {
            let document = pages
                .into_iter()
                .map(|v| v.as_str().unwrap_or_default().to_string())
                .collect::<Vec<_>>()
                .join("\n");
            Ok(state.merge(&State::from_value(json!({"document": document}))))
        });

    let cleanup = Arc::new(MockLlmTool::with_fixed_completion(
        "cleanup",
        "lorem ipsum\nlorem ipsum\nlorem ipsum",
    ));

    let mut flow = Flow::start(|s: State| async move { Ok(s.into()) });
    flow.next(map_reduce(
        vec![json!({"page": 1}), json!({"page": 2}), json!({"page": 3})],
        map_fn,
        Some(reduce_fn),
        Some(2),
    ));
    flow.next(tool_step_keyed("cleanup", cleanup, "cleaned"));

    let result = flow.run(State::new()).await?;
    println!("{}", serde_json::to_string_pretty(result.as_value())?);
    Ok(())
}
