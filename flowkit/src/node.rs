//! `Node`: a named async unit of work plus its outgoing labelled edges.
//!
//! Successor edges are stored as `Weak<Node>`, never an owning `Arc<Node>`
//! (spec.md §9: "represent successors as back-references, weak, by
//! identity... the Flow owns all nodes"). This is what lets a graph contain
//! cycles (self-loops, branch-back edges) without leaking — the owning
//! `Flow` (and the `FlowRegistry`, for cross-flow jumps) hold the only
//! strong references.

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex, RwLock, Weak};

use crate::error::{FlowError, NodeError};
use crate::state::State;

/// The reserved label for a node's unlabelled successor edge.
pub const DEFAULT_OUTCOME: &str = "default";

/// What a node's function produced for one hop, before the scheduler merges
/// it into the running state (spec.md §4.A, rules 1–4).
#[derive(Debug, Clone)]
pub enum NodeOutcome {
    /// Rule 1: a partial (or full) state to shallow-merge; outcome label is
    /// implicitly `"default"`.
    State(State),
    /// Rule 2: a bare outcome label; state is unchanged.
    Label(String),
    /// Rule 3: both an outcome label and a partial state to merge.
    Labeled(String, State),
    /// Rule 4: neither a label nor a state change (`undefined`/`null`).
    None,
}

impl NodeOutcome {
    /// Splits into `(label, delta)`, defaulting the label to `"default"` and
    /// the delta to an empty object when absent — the direct reading of
    /// spec.md §4.A's four merge shapes.
    pub fn into_parts(self) -> (String, State) {
        match self {
            NodeOutcome::State(s) => (DEFAULT_OUTCOME.to_string(), s),
            NodeOutcome::Label(l) => (l, State::new()),
            NodeOutcome::Labeled(l, s) => (l, s),
            NodeOutcome::None => (DEFAULT_OUTCOME.to_string(), State::new()),
        }
    }
}

impl From<State> for NodeOutcome {
    fn from(state: State) -> Self {
        NodeOutcome::State(state)
    }
}

impl From<serde_json::Value> for NodeOutcome {
    fn from(value: serde_json::Value) -> Self {
        NodeOutcome::State(State::from_value(value))
    }
}

impl From<&str> for NodeOutcome {
    fn from(label: &str) -> Self {
        NodeOutcome::Label(label.to_string())
    }
}

impl From<String> for NodeOutcome {
    fn from(label: String) -> Self {
        NodeOutcome::Label(label)
    }
}

impl From<(String, State)> for NodeOutcome {
    fn from((label, state): (String, State)) -> Self {
        NodeOutcome::Labeled(label, state)
    }
}

type BoxFuture<T> = Pin<Box<dyn Future<Output = T> + Send>>;

/// The async unary callable a node wraps: `State -> Result<NodeOutcome, NodeError>`.
pub type NodeFn = Arc<dyn Fn(State) -> BoxFuture<Result<NodeOutcome, NodeError>> + Send + Sync>;

/// A named wrapper over an async unary function plus outcome-labelled
/// successor edges and a run cap.
///
/// Always constructed behind an `Arc` (see module docs on `Weak` successors),
/// so mutation of `outcomes`/`max_runs`/`run_count` happens through interior
/// mutability rather than `&mut self`.
pub struct Node {
    name: String,
    func: NodeFn,
    outcomes: RwLock<HashMap<String, Weak<Node>>>,
    max_runs: RwLock<Option<usize>>,
    run_count: Mutex<usize>,
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("name", &self.name)
            .field("max_runs", &*self.max_runs.read().unwrap())
            .field("run_count", &*self.run_count.lock().unwrap())
            .finish()
    }
}

fn derive_fn_name<F>() -> String {
    let full = std::any::type_name::<F>();
    if full.contains("{{closure}}") {
        return "anonymous".to_string();
    }
    full.rsplit("::").next().unwrap_or("anonymous").to_string()
}

impl Node {
    /// Builds a node from an explicit name and an async unary function.
    pub fn new<F, Fut>(name: impl Into<String>, f: F) -> Arc<Node>
    where
        F: Fn(State) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<NodeOutcome, NodeError>> + Send + 'static,
    {
        Arc::new(Node {
            name: name.into(),
            func: Arc::new(move |s| Box::pin(f(s)) as BoxFuture<Result<NodeOutcome, NodeError>>),
            outcomes: RwLock::new(HashMap::new()),
            max_runs: RwLock::new(None),
            run_count: Mutex::new(0),
        })
    }

    /// Builds a node from a function alone; the node's name defaults to the
    /// function's display name (or `"anonymous"` for a closure, which Rust
    /// gives no stable display name — the spec's own fallback case).
    pub fn from_fn<F, Fut>(f: F) -> Arc<Node>
    where
        F: Fn(State) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<NodeOutcome, NodeError>> + Send + 'static,
    {
        let name = derive_fn_name::<F>();
        Node::new(name, f)
    }

    /// Stable identifier for this node.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Registers that outcome `label` routes to `target`. Re-registering the
    /// same label replaces the prior edge (last-write-wins).
    pub fn on(&self, label: impl Into<String>, target: &Arc<Node>) {
        self.outcomes
            .write()
            .unwrap()
            .insert(label.into(), Arc::downgrade(target));
    }

    /// Equivalent to `on(DEFAULT_OUTCOME, target)`.
    pub fn next(&self, target: &Arc<Node>) {
        self.on(DEFAULT_OUTCOME, target);
    }

    /// Looks up the successor registered for `label`, if its node is still
    /// alive (owned by some `Flow` or the `FlowRegistry`).
    pub fn successor(&self, label: &str) -> Option<Arc<Node>> {
        self.outcomes.read().unwrap().get(label).and_then(Weak::upgrade)
    }

    /// Sets the per-run invocation cap. Non-positive is a programmer error.
    pub fn set_max_runs(&self, n: usize) {
        assert!(n > 0, "max_runs must be positive");
        *self.max_runs.write().unwrap() = Some(n);
    }

    /// Current invocation count for the run in progress.
    pub fn run_count(&self) -> usize {
        *self.run_count.lock().unwrap()
    }

    /// Configured invocation cap, if any.
    pub fn max_runs(&self) -> Option<usize> {
        *self.max_runs.read().unwrap()
    }

    /// Resets `run_count` to zero. Called by the scheduler at the start of
    /// each top-level `Flow::run`/`FlowRegistry::execute`.
    pub fn reset_run_count(&self) {
        *self.run_count.lock().unwrap() = 0;
    }

    /// Invokes the underlying function and increments `run_count`.
    ///
    /// Returns the outcome **unmerged** — merging into the running state is
    /// the scheduler's responsibility, not the node's (spec.md §4.B: "Node.run
    /// is responsible for the cap and counter; it is not responsible for
    /// merging").
    pub async fn run(&self, state: State) -> Result<NodeOutcome, FlowError> {
        {
            let mut count = self.run_count.lock().unwrap();
            if let Some(max) = *self.max_runs.read().unwrap() {
                if *count >= max {
                    return Err(FlowError::MaxRunsExceeded {
                        node: self.name.clone(),
                        max_runs: max,
                    });
                }
            }
            *count += 1;
        }
        (self.func)(state).await.map_err(|source| FlowError::NodeFailure {
            node: self.name.clone(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    async fn named_fn(state: State) -> Result<NodeOutcome, NodeError> {
        Ok(state.into())
    }

    #[test]
    fn from_fn_names_node_after_function() {
        let node = Node::from_fn(named_fn);
        assert_eq!(node.name(), "named_fn");
    }

    #[tokio::test]
    async fn from_fn_closure_is_named_anonymous() {
        let node = Node::from_fn(|s: State| async move { Ok(NodeOutcome::from(s)) });
        assert_eq!(node.name(), "anonymous");
    }

    #[test]
    fn on_registers_successor_and_next_uses_default_label() {
        let a = Node::from_fn(named_fn);
        let b = Node::from_fn(named_fn);
        a.on("ok", &b);
        assert!(Arc::ptr_eq(&a.successor("ok").unwrap(), &b));

        let c = Node::from_fn(named_fn);
        a.next(&c);
        assert!(Arc::ptr_eq(&a.successor(DEFAULT_OUTCOME).unwrap(), &c));
    }

    #[test]
    fn re_registering_a_label_replaces_prior_edge() {
        let a = Node::from_fn(named_fn);
        let b = Node::from_fn(named_fn);
        let c = Node::from_fn(named_fn);
        a.on("x", &b);
        a.on("x", &c);
        assert!(Arc::ptr_eq(&a.successor("x").unwrap(), &c));
    }

    #[tokio::test]
    async fn run_cap_rejects_the_kth_plus_one_call() {
        let node = Node::new("x", |s: State| async move { Ok(NodeOutcome::from(s)) });
        node.set_max_runs(2);
        node.run(State::new()).await.unwrap();
        node.run(State::new()).await.unwrap();
        let err = node.run(State::new()).await.unwrap_err();
        match err {
            FlowError::MaxRunsExceeded { max_runs, .. } => assert_eq!(max_runs, 2),
            other => panic!("expected MaxRunsExceeded, got {other:?}"),
        }
        assert_eq!(node.run_count(), 2, "rejected call must not invoke fn");
    }

    #[tokio::test]
    async fn reset_run_count_allows_further_runs() {
        let node = Node::new("x", |s: State| async move { Ok(NodeOutcome::from(s)) });
        node.set_max_runs(1);
        node.run(State::new()).await.unwrap();
        node.run(State::new()).await.unwrap_err();
        node.reset_run_count();
        node.run(State::new()).await.unwrap();
    }

    #[tokio::test]
    async fn node_failure_wraps_underlying_error() {
        let node = Node::new("boom", |_s: State| async move {
            Err::<NodeOutcome, NodeError>("kaboom".into())
        });
        let err = node.run(State::new()).await.unwrap_err();
        match err {
            FlowError::NodeFailure { node, source } => {
                assert_eq!(node, "boom");
                assert!(source.to_string().contains("kaboom"));
            }
            other => panic!("expected NodeFailure, got {other:?}"),
        }
    }

    #[test]
    fn into_parts_leaves_state_unchanged_for_bare_label_and_none() {
        let base = State::from_value(json!({"a": 1}));

        let (label, delta) = NodeOutcome::Label("x".to_string()).into_parts();
        assert_eq!(label, "x");
        assert_eq!(base.merge(&delta), base, "bare-label outcome must not wipe prior state");

        let (label, delta) = NodeOutcome::None.into_parts();
        assert_eq!(label, DEFAULT_OUTCOME);
        assert_eq!(base.merge(&delta), base, "no-op outcome must not wipe prior state");
    }

    #[tokio::test]
    async fn run_returns_result_unmerged() {
        let node = Node::new("passthrough", |_s: State| async move {
            Ok(NodeOutcome::from(State::from_value(json!({"a": 1}))))
        });
        let outcome = node.run(State::from_value(json!({"b": 2}))).await.unwrap();
        let (label, delta) = outcome.into_parts();
        assert_eq!(label, DEFAULT_OUTCOME);
        assert_eq!(delta.as_value(), &json!({"a": 1}));
    }
}
