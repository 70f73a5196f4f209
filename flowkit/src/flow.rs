//! Fluent flow assembly (spec.md §4.C) and the scheduler that runs a flow
//! from its start node (spec.md §4.D), in one module: the builder's
//! combinators and the scheduler share the same `Node`/outcome-label
//! machinery, so there is no separate type for "compiled" vs. "building" flow.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use serde_json::Value;

use crate::error::{FlowError, NodeError};
use crate::logging::{self, HopRecord};
use crate::node::{Node, NodeOutcome, DEFAULT_OUTCOME};
use crate::state::State;
use crate::tool::Tool;

type BoxFuture<T> = Pin<Box<dyn Future<Output = T> + Send>>;

/// An error handler installed via `Flow::catch`: receives the error and the
/// state at the time of failure, and returns the state execution should
/// resume with.
pub type FlowErrorHandler =
    Arc<dyn Fn(FlowError, State) -> BoxFuture<Result<State, NodeError>> + Send + Sync>;

/// Anything a builder call (`next`, `on`, successor of `branch`/`switch`) can
/// accept as a target, normalized to a single `Arc<Node>` at assembly time
/// (spec.md §9: "normalize at assembly time to a single 'callable Node' shape").
pub trait IntoTarget {
    /// Produces the `Arc<Node>` this target resolves to.
    fn into_target(self) -> Arc<Node>;
}

impl IntoTarget for Arc<Node> {
    fn into_target(self) -> Arc<Node> {
        self
    }
}

impl IntoTarget for &Arc<Node> {
    fn into_target(self) -> Arc<Node> {
        self.clone()
    }
}

impl IntoTarget for Flow {
    fn into_target(self) -> Arc<Node> {
        self.start
            .clone()
            .expect("a Flow used as a successor must have a start node")
    }
}

impl<F, Fut> IntoTarget for F
where
    F: Fn(State) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<NodeOutcome, NodeError>> + Send + 'static,
{
    fn into_target(self) -> Arc<Node> {
        Node::from_fn(self)
    }
}

/// A directed graph of nodes under construction (or already built), plus the
/// scheduler's configuration for running it.
///
/// `Flow` is cheaply `Clone`: cloning duplicates `Arc`/`Vec` pointers, not
/// node state, so two clones share the same underlying nodes — including
/// their `run_count` (spec.md §5: true isolation needs two separately-built
/// flows; the core does not deep-clone).
#[derive(Clone)]
pub struct Flow {
    start: Option<Arc<Node>>,
    cursor: Option<Arc<Node>>,
    nodes: Vec<Arc<Node>>,
    max_steps: usize,
    tool_registry: Vec<Arc<dyn Tool>>,
    debug: bool,
    catch_handler: Option<FlowErrorHandler>,
    no_cursor_error: bool,
}

impl Flow {
    /// Creates an empty flow; the first `next`/`on` call sets its start node.
    pub fn new() -> Self {
        Flow {
            start: None,
            cursor: None,
            nodes: Vec::new(),
            max_steps: 100,
            tool_registry: Vec::new(),
            debug: false,
            catch_handler: None,
            no_cursor_error: false,
        }
    }

    /// Creates a flow whose start (and cursor) is a node wrapping `f`.
    pub fn start<F, Fut>(f: F) -> Self
    where
        F: Fn(State) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<NodeOutcome, NodeError>> + Send + 'static,
    {
        let mut flow = Flow::new();
        let node = Node::from_fn(f);
        flow.attach_existing_as_start(node);
        flow
    }

    /// Attaches an already-built node as this flow's start node and cursor.
    /// Used by `FlowRegistry::execute` to run a bare registered `Node`.
    pub(crate) fn attach_existing_as_start(&mut self, node: Arc<Node>) {
        self.own(&node);
        self.start = Some(node.clone());
        self.cursor = Some(node);
    }

    /// The flow's start node, if it has one.
    pub(crate) fn start_node(&self) -> Option<Arc<Node>> {
        self.start.clone()
    }

    fn own(&mut self, node: &Arc<Node>) {
        if !self.nodes.iter().any(|n| Arc::ptr_eq(n, node)) {
            self.nodes.push(node.clone());
        }
    }

    /// Appends a node and redirects the cursor's `"default"` outcome to it;
    /// the new node becomes the cursor.
    pub fn next(&mut self, target: impl IntoTarget) -> &mut Self {
        let target_node = target.into_target();
        self.own(&target_node);
        if let Some(cursor) = &self.cursor {
            cursor.next(&target_node);
        }
        if self.start.is_none() {
            self.start = Some(target_node.clone());
        }
        self.cursor = Some(target_node);
        self
    }

    /// Adds a labelled outcome edge from the cursor to `target`. Does not
    /// advance the cursor, so subsequent `.on(...)` calls attach more edges
    /// to the same node. Fails (surfaced at `run`) with `NoCursor` if the
    /// flow is still empty.
    pub fn on(&mut self, label: impl Into<String>, target: impl IntoTarget) -> &mut Self {
        let Some(cursor) = self.cursor.clone() else {
            self.no_cursor_error = true;
            return self;
        };
        let target_node = target.into_target();
        self.own(&target_node);
        cursor.on(label, &target_node);
        self
    }

    /// Appends a single synthetic fan-out node that runs `nodes` concurrently
    /// against the current state and returns an array of their individual
    /// (unmerged) results. Joining that array back into state is the
    /// caller's responsibility via a subsequent `.next(...)`.
    pub fn all(&mut self, nodes: Vec<Arc<Node>>) -> &mut Self {
        for n in &nodes {
            self.own(n);
        }
        let fan_out = Node::new("fan_out", move |state: State| {
            let nodes = nodes.clone();
            async move {
                let tasks = nodes.iter().map(|n| {
                    let n = n.clone();
                    let s = state.clone();
                    async move { n.run(s).await }
                });
                let results = futures::future::try_join_all(tasks)
                    .await
                    .map_err(|e| -> NodeError { Box::new(e) })?;
                let values: Vec<Value> = results
                    .into_iter()
                    .map(|outcome| outcome.into_parts().1.into_value())
                    .collect();
                Ok(NodeOutcome::from(Value::Array(values)))
            }
        });
        self.next(fan_out)
    }

    /// Appends a synthetic node that evaluates `predicate(state)` and
    /// forwards to `if_true` or `if_false`.
    pub fn branch(
        &mut self,
        predicate: Arc<dyn Fn(&State) -> bool + Send + Sync>,
        if_true: impl IntoTarget,
        if_false: impl IntoTarget,
    ) -> &mut Self {
        let if_true = if_true.into_target();
        let if_false = if_false.into_target();
        self.own(&if_true);
        self.own(&if_false);
        let branch_node = Node::new("branch", move |state: State| {
            let predicate = predicate.clone();
            async move {
                let label = if predicate(&state) { "true" } else { "false" };
                Ok(NodeOutcome::Label(label.to_string()))
            }
        });
        branch_node.on("true", &if_true);
        branch_node.on("false", &if_false);
        self.next(branch_node)
    }

    /// Appends a synthetic node that reads `state[key]` and selects a
    /// successor from `cases`, falling back to `default` when the value is
    /// missing or matches no case.
    pub fn switch(
        &mut self,
        key: impl Into<String>,
        cases: HashMap<String, Arc<Node>>,
        default: impl IntoTarget,
    ) -> &mut Self {
        let default = default.into_target();
        self.own(&default);
        for target in cases.values() {
            self.own(target);
        }
        let key = key.into();
        let switch_node = Node::new("switch", move |state: State| {
            let key = key.clone();
            async move {
                let label = match state.as_value().get(&key) {
                    Some(Value::String(s)) => s.clone(),
                    Some(v) => v.to_string(),
                    None => String::new(),
                };
                Ok(NodeOutcome::Label(label))
            }
        });
        for (label, target) in cases {
            switch_node.on(label, &target);
        }
        switch_node.on(DEFAULT_OUTCOME, &default);
        self.next(switch_node)
    }

    /// Installs a flow-wide error handler. On any node failure, the handler
    /// receives `(error, stateAtFailure)` and its return value replaces the
    /// state; execution then resumes at the *failing* node's `"default"`
    /// outcome (spec.md §4.D step b — read literally, "current" there is
    /// whichever node just threw, not the node the builder cursor happened
    /// to be on when `.catch` was called; see DESIGN.md).
    pub fn catch(&mut self, handler: FlowErrorHandler) -> &mut Self {
        self.catch_handler = Some(handler);
        self
    }

    /// Extends the flow's tool registry (for discovery by nodes; the core
    /// does not otherwise interpret it).
    pub fn tools(&mut self, list: Vec<Arc<dyn Tool>>) -> &mut Self {
        self.tool_registry.extend(list);
        self
    }

    /// The flow's currently registered tools.
    pub fn tool_registry(&self) -> &[Arc<dyn Tool>] {
        &self.tool_registry
    }

    /// Sets the step cap (default 100).
    pub fn set_max_steps(&mut self, n: usize) -> &mut Self {
        assert!(n > 0, "max_steps must be positive");
        self.max_steps = n;
        self
    }

    /// Enables or disables per-hop debug logging.
    pub fn debug(&mut self, enabled: bool) -> &mut Self {
        self.debug = enabled;
        self
    }

    /// Runs the flow from its start node, per spec.md §4.D.
    ///
    /// Resets every node owned by this flow's own node list before running
    /// (not nodes reached only via a mid-run `_goto`, which belong to
    /// whatever segment registered them and are reset when *that* segment is
    /// run as a top-level entry — see DESIGN.md).
    pub async fn run(&self, initial_state: State) -> Result<State, FlowError> {
        if self.no_cursor_error {
            return Err(FlowError::NoCursor);
        }

        for node in &self.nodes {
            node.reset_run_count();
        }

        if self.debug {
            logging::log_run_start(self.start.as_ref().map(|n| n.name()));
        }

        let mut state = initial_state;
        let mut current = self.start.clone();
        let mut steps = 0usize;

        while let Some(node) = current.clone() {
            if steps >= self.max_steps {
                break;
            }

            let prev_state = state.clone();
            match node.run(prev_state.clone()).await {
                Ok(outcome) => {
                    let (label, delta) = outcome.into_parts();
                    let mut new_state = state.merge(&delta);

                    if let Some(segment) = new_state.take_goto() {
                        let resolved = crate::registry::flow_registry().resolve_start(&segment)?;
                        if self.debug {
                            logging::log_hop(&HopRecord {
                                step: steps,
                                from_node: Some(node.name().to_string()),
                                label: "_goto".to_string(),
                                to_node: Some(resolved.name().to_string()),
                                state_keys_changed: state.changed_keys(&new_state),
                            });
                        }
                        state = new_state;
                        current = Some(resolved);
                        steps += 1;
                        continue;
                    }

                    let next_node = node
                        .successor(&label)
                        .or_else(|| node.successor(DEFAULT_OUTCOME));

                    if self.debug {
                        logging::log_hop(&HopRecord {
                            step: steps,
                            from_node: Some(node.name().to_string()),
                            label: label.clone(),
                            to_node: next_node.as_ref().map(|n| n.name().to_string()),
                            state_keys_changed: state.changed_keys(&new_state),
                        });
                    }

                    state = new_state;
                    current = next_node;
                    steps += 1;
                }
                Err(err) => {
                    let Some(handler) = &self.catch_handler else {
                        if self.debug {
                            logging::log_run_error(&err);
                        }
                        return Err(err);
                    };
                    let recovered = handler(err, prev_state).await.map_err(|source| {
                        FlowError::NodeFailure {
                            node: node.name().to_string(),
                            source,
                        }
                    })?;
                    let next_node = node.successor(DEFAULT_OUTCOME);
                    if self.debug {
                        logging::log_hop(&HopRecord {
                            step: steps,
                            from_node: Some(node.name().to_string()),
                            label: DEFAULT_OUTCOME.to_string(),
                            to_node: next_node.as_ref().map(|n| n.name().to_string()),
                            state_keys_changed: state.changed_keys(&recovered),
                        });
                    }
                    state = recovered;
                    current = next_node;
                    steps += 1;
                }
            }
        }

        if self.debug {
            logging::log_run_complete(steps);
        }

        Ok(state)
    }
}

impl Default for Flow {
    fn default() -> Self {
        Flow::new()
    }
}
