//! Process-wide mapping from segment name to a builder/node, enabling
//! cross-flow jumps via `_goto` (spec.md §4.E).

use std::sync::{Arc, OnceLock};

use dashmap::DashMap;

use crate::error::FlowError;
use crate::flow::Flow;
use crate::node::Node;
use crate::state::State;

/// A registered segment: either a bare node or a whole flow.
#[derive(Clone)]
pub enum Segment {
    /// A single node, run as a one-node flow when executed directly.
    Node(Arc<Node>),
    /// A whole flow; its own start node, successors and tool registry apply.
    Flow(Flow),
}

impl From<Arc<Node>> for Segment {
    fn from(node: Arc<Node>) -> Self {
        Segment::Node(node)
    }
}

impl From<Flow> for Segment {
    fn from(flow: Flow) -> Self {
        Segment::Flow(flow)
    }
}

/// Process-wide, lock-free-read registry of named segments.
///
/// Backed by `dashmap::DashMap` per spec.md §4.E ("implementations should use
/// a lock-free read-heavy structure"). Entries are never evicted; cleanup is
/// the caller's responsibility.
pub struct FlowRegistry {
    segments: DashMap<String, Segment>,
}

impl FlowRegistry {
    fn new() -> Self {
        FlowRegistry {
            segments: DashMap::new(),
        }
    }

    /// Registers `target` under `name`. Overwriting an existing name is
    /// allowed; the last registration wins.
    pub fn create_segment(&self, name: impl Into<String>, target: impl Into<Segment>) {
        self.segments.insert(name.into(), target.into());
    }

    /// Whether `name` is currently registered.
    pub fn has(&self, name: &str) -> bool {
        self.segments.contains_key(name)
    }

    /// All currently registered segment names, in no particular order.
    pub fn list(&self) -> Vec<String> {
        self.segments.iter().map(|e| e.key().clone()).collect()
    }

    /// Looks up `name` and runs it against `state` via the scheduler.
    pub async fn execute(&self, name: &str, state: State) -> Result<State, FlowError> {
        let segment = self
            .segments
            .get(name)
            .map(|e| e.value().clone())
            .ok_or_else(|| FlowError::UnknownSegment(name.to_string()))?;
        match segment {
            Segment::Node(node) => {
                let mut flow = Flow::new();
                flow.attach_existing_as_start(node);
                flow.run(state).await
            }
            Segment::Flow(flow) => flow.run(state).await,
        }
    }

    /// Resolves `name` to the node a `_goto` hop or `execute` call should
    /// continue at. Used internally by the scheduler.
    pub(crate) fn resolve_start(&self, name: &str) -> Result<Arc<Node>, FlowError> {
        let entry = self
            .segments
            .get(name)
            .ok_or_else(|| FlowError::UnknownSegment(name.to_string()))?;
        match entry.value() {
            Segment::Node(node) => Ok(node.clone()),
            Segment::Flow(flow) => flow
                .start_node()
                .ok_or_else(|| FlowError::InvalidSegment(name.to_string())),
        }
    }
}

static REGISTRY: OnceLock<FlowRegistry> = OnceLock::new();

/// The process-wide flow registry singleton.
pub fn flow_registry() -> &'static FlowRegistry {
    REGISTRY.get_or_init(FlowRegistry::new)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::NodeOutcome;
    use serde_json::json;

    fn unique_name(prefix: &str) -> String {
        use std::sync::atomic::{AtomicUsize, Ordering};
        static COUNTER: AtomicUsize = AtomicUsize::new(0);
        format!("{prefix}-{}", COUNTER.fetch_add(1, Ordering::SeqCst))
    }

    #[tokio::test]
    async fn create_segment_and_execute_a_bare_node() {
        let node = Node::new("seg_node", |s: crate::state::State| async move {
            Ok(NodeOutcome::from(s.merge(&crate::state::State::from_value(json!({"hit": true})))))
        });
        let name = unique_name("node-seg");
        flow_registry().create_segment(&name, node);
        let out = flow_registry().execute(&name, State::new()).await.unwrap();
        assert_eq!(out.as_value(), &json!({"hit": true}));
    }

    #[tokio::test]
    async fn execute_unknown_segment_fails() {
        let err = flow_registry()
            .execute("definitely-not-registered", State::new())
            .await
            .unwrap_err();
        assert!(matches!(err, FlowError::UnknownSegment(_)));
    }

    #[tokio::test]
    async fn registry_round_trip_matches_direct_flow_run() {
        let mut flow = Flow::start(|s: State| async move {
            Ok(NodeOutcome::from(s.merge(&State::from_value(json!({"a": 1})))))
        });
        flow.next(|s: State| async move {
            Ok(NodeOutcome::from(s.merge(&State::from_value(json!({"b": 2})))))
        });
        let name = unique_name("roundtrip");
        flow_registry().create_segment(&name, flow.clone());

        let via_registry = flow_registry().execute(&name, State::new()).await.unwrap();
        let via_flow = flow.run(State::new()).await.unwrap();
        assert_eq!(via_registry, via_flow);
    }

    #[test]
    fn has_and_list_reflect_registered_segments() {
        let node = Node::new("listed", |s: crate::state::State| async move { Ok(NodeOutcome::from(s)) });
        let name = unique_name("listed-seg");
        flow_registry().create_segment(&name, node);
        assert!(flow_registry().has(&name));
        assert!(flow_registry().list().contains(&name));
    }
}
