//! Black-box tests for the tool contract and its chaining combinators.

use std::sync::Arc;

use flowkit::tools::{MockApiTool, MockLlmTool};
use flowkit::{ApiKeyGuardedTool, FnTool, State, Tool, ToolErrorHandler, ToolExt, ToolMetadata};
use serde_json::json;

#[tokio::test]
async fn then_chains_a_mock_api_tool_into_a_mock_llm_tool() {
    let lookup = Arc::new(MockApiTool::new("lookup", json!({"city": "nyc", "temp_f": 61})));
    let summarize = Arc::new(MockLlmTool::with_fixed_completion(
        "summarize",
        "It's 61F in NYC.",
    ));

    let node = lookup.then(summarize as Arc<dyn Tool>);
    let outcome = node.run(State::from_value(json!({"query": "nyc weather"}))).await.unwrap();
    let (_, delta) = outcome.into_parts();
    assert_eq!(delta.as_value(), &json!({"content": "It's 61F in NYC."}));
}

#[tokio::test]
async fn catch_recovers_a_failing_tool_call() {
    let failing = Arc::new(FnTool::new(ToolMetadata::new("flaky"), |_v| async move {
        Err::<serde_json::Value, flowkit::NodeError>("upstream unavailable".into())
    }));
    let handler: ToolErrorHandler = Arc::new(|err, _state| {
        Box::pin(async move {
            Ok(State::from_value(json!({"error": err.to_string(), "fallback": true})))
        })
    });
    let node = failing.catch(handler);
    let outcome = node.run(State::new()).await.unwrap();
    let (_, delta) = outcome.into_parts();
    assert_eq!(delta.as_value().get("fallback"), Some(&json!(true)));
}

#[tokio::test]
async fn api_key_guarded_tool_blocks_calls_until_env_var_is_set() {
    let tool = ApiKeyGuardedTool::new(
        MockApiTool::new("secure", json!({"ok": true})),
        "FLOWKIT_TOOL_COMBINATORS_TEST_KEY",
    );

    let blocked = tool.call(json!({})).await;
    assert!(blocked.is_err());

    std::env::set_var("FLOWKIT_TOOL_COMBINATORS_TEST_KEY", "secret");
    let allowed = tool.call(json!({})).await.unwrap();
    assert_eq!(allowed, json!({"ok": true}));
    std::env::remove_var("FLOWKIT_TOOL_COMBINATORS_TEST_KEY");
}

#[tokio::test]
async fn register_tool_preserves_function_identity() {
    async fn passthrough(s: State) -> Result<flowkit::NodeOutcome, flowkit::NodeError> {
        Ok(flowkit::NodeOutcome::from(s))
    }

    let f = flowkit::register_tool(passthrough, ToolMetadata::new("passthrough"));
    let node = flowkit::Node::from_fn(f);
    let outcome = node.run(State::from_value(json!({"x": 1}))).await.unwrap();
    let (_, delta) = outcome.into_parts();
    assert_eq!(delta.as_value(), &json!({"x": 1}));
}
