//! Black-box scenario tests mirroring spec.md §8's end-to-end scenarios.

use std::sync::Arc;

use flowkit::{Flow, Node, NodeOutcome, State};
use serde_json::json;

#[tokio::test]
async fn linear_flow() {
    let mut flow = Flow::start(|s: State| async move {
        Ok(NodeOutcome::from(s.merge(&State::from_value(json!({"a": 1})))))
    });
    flow.next(|s: State| async move {
        Ok(NodeOutcome::from(s.merge(&State::from_value(json!({"b": 2})))))
    });

    let out = flow.run(State::new()).await.unwrap();
    assert_eq!(out.as_value(), &json!({"a": 1, "b": 2}));
}

#[tokio::test]
async fn conditional_flow() {
    let mut flow = Flow::start(|s: State| async move {
        let c = s.as_value().get("c").and_then(|v| v.as_bool()).unwrap_or(false);
        Ok(NodeOutcome::Label(if c { "T".into() } else { "F".into() }))
    });
    flow.on("T", |s: State| async move {
        Ok(NodeOutcome::from(s.merge(&State::from_value(json!({"r": "t"})))))
    });
    flow.on("F", |s: State| async move {
        Ok(NodeOutcome::from(s.merge(&State::from_value(json!({"r": "f"})))))
    });

    let on_true = flow.run(State::from_value(json!({"c": true}))).await.unwrap();
    assert_eq!(on_true.as_value().get("r"), Some(&json!("t")));

    let on_false = flow.run(State::from_value(json!({"c": false}))).await.unwrap();
    assert_eq!(on_false.as_value().get("r"), Some(&json!("f")));
}

#[tokio::test]
async fn run_cap_rejects_third_call() {
    let node = Node::new("x", |s: State| async move { Ok(NodeOutcome::from(s)) });
    node.set_max_runs(2);
    node.run(State::new()).await.unwrap();
    node.run(State::new()).await.unwrap();
    let err = node.run(State::new()).await.unwrap_err();
    assert!(err.to_string().to_lowercase().contains("max runs"));
}

#[tokio::test]
async fn step_cap_resolves_rather_than_hangs() {
    let mut flow = Flow::start(|_s: State| async move { Ok(NodeOutcome::Label("loop".into())) });
    flow.on("loop", |_s: State| async move {
        Ok(NodeOutcome::Label("loop".into()))
    });
    flow.set_max_steps(5);

    let result = tokio::time::timeout(std::time::Duration::from_secs(5), flow.run(State::new())).await;
    assert!(result.is_ok(), "flow.run must resolve, not hang");
    assert!(result.unwrap().is_ok());
}

#[tokio::test]
async fn fan_out_is_positional_regardless_of_completion_order() {
    let slow = Node::from_fn(|s: State| async move {
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        Ok(NodeOutcome::from(s.merge(&State::from_value(json!({"a": 1})))))
    });
    let fast = Node::from_fn(|s: State| async move {
        Ok(NodeOutcome::from(s.merge(&State::from_value(json!({"b": 2})))))
    });

    let mut flow = Flow::start(|_s: State| async move { Ok(NodeOutcome::from(State::new())) });
    flow.all(vec![slow, fast]);
    flow.next(|s: State| async move { Ok(NodeOutcome::from(json!({"merged": s.into_value()}))) });

    let out = flow.run(State::new()).await.unwrap();
    assert_eq!(out.as_value(), &json!({"merged": [{"a": 1}, {"b": 2}]}));
}

type MapFuture = std::pin::Pin<
    Box<dyn std::future::Future<Output = Result<serde_json::Value, flowkit::NodeError>> + Send>,
>;

#[tokio::test]
async fn map_reduce_with_reducer_applies_the_spec_example() {
    use flowkit::map_reduce;

    let items: Vec<serde_json::Value> = (1..=5).map(serde_json::Value::from).collect();
    let doubler: Arc<dyn Fn(serde_json::Value) -> MapFuture + Send + Sync> =
        Arc::new(|v: serde_json::Value| -> MapFuture {
            Box::pin(async move { Ok(json!(v.as_i64().unwrap() * 2)) })
        });
    let reducer: Arc<dyn Fn(Vec<serde_json::Value>, State) -> Result<State, flowkit::NodeError> + Send + Sync> =
        Arc::new(|results, state: State| Ok(state.merge(&State::from_value(json!({"rs": results})))));

    let f = map_reduce(items, doubler, Some(reducer), Some(2));
    let outcome = f(State::from_value(json!({"init": true}))).await.unwrap();
    let (_, delta) = outcome.into_parts();
    assert_eq!(delta.as_value(), &json!({"init": true, "rs": [2, 4, 6, 8, 10]}));
}

#[tokio::test]
async fn goto_round_trips_through_the_registry() {
    let target = Node::from_fn(|s: State| async move {
        Ok(NodeOutcome::from(s.merge(&State::from_value(json!({"via": "registry"})))))
    });
    flowkit::flow_registry().create_segment("scenarios-goto-target", target);

    let flow = Flow::start(|_s: State| async move {
        Ok(NodeOutcome::from(json!({"_goto": "scenarios-goto-target"})))
    });
    let out = flow.run(State::new()).await.unwrap();
    assert_eq!(out.as_value().get("via"), Some(&json!("registry")));
}
