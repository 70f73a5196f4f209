//! The open state record threaded through a flow run.
//!
//! `State` wraps a `serde_json::Value` rather than a hand-rolled enum: the
//! crate has no static schema for flow state (spec: "state is an open
//! record"), and reusing `serde_json::Value` keeps the merge rule a direct
//! reading of the JSON object model instead of a parallel type.

use serde_json::{Map, Value};

/// Reserved state key: a node that sets this requests a jump to a registered
/// segment (see `FlowRegistry`). The scheduler removes the key before
/// resuming at the resolved segment's start node.
pub const GOTO_KEY: &str = "_goto";

/// The state record passed between nodes.
///
/// Usually an object (map), since that is what the shallow-merge rule
/// operates over. The `.all()` fan-out combinator is the one place a `State`
/// legitimately holds a bare JSON array for exactly one hop — callers join
/// it back into an object before continuing (see spec.md §4.C on `.all`).
#[derive(Debug, Clone, PartialEq)]
pub struct State(pub Value);

impl State {
    /// Wraps an empty object.
    pub fn new() -> Self {
        State(Value::Object(Map::new()))
    }

    /// Wraps an arbitrary JSON value as state (used by `.all`'s fan-out array
    /// and by tools that operate on bare values rather than objects).
    pub fn from_value(value: Value) -> Self {
        State(value)
    }

    /// Shallow-merges `delta` over `self`.
    ///
    /// When both sides are objects, this is `{...self, ...delta}`: keys in
    /// `delta` win, keys only in `self` are preserved. When either side is
    /// not an object (e.g. the fan-out array, or a tool operating on a bare
    /// value), the merge cannot be field-wise, so `delta` replaces `self`
    /// wholesale — the Rust-legible reading of the one documented exception.
    pub fn merge(&self, delta: &State) -> State {
        match (&self.0, &delta.0) {
            (Value::Object(base), Value::Object(over)) => {
                let mut merged = base.clone();
                for (k, v) in over {
                    merged.insert(k.clone(), v.clone());
                }
                State(Value::Object(merged))
            }
            _ => delta.clone(),
        }
    }

    /// Removes and returns the `_goto` key if it is a non-empty string.
    pub fn take_goto(&mut self) -> Option<String> {
        let Value::Object(map) = &mut self.0 else {
            return None;
        };
        match map.get(GOTO_KEY) {
            Some(Value::String(s)) if !s.is_empty() => {
                let segment = s.clone();
                map.remove(GOTO_KEY);
                Some(segment)
            }
            _ => None,
        }
    }

    /// Keys present in `self` but absent, or mapped to a different value, in
    /// `other`. Used to populate `HopRecord::state_keys_changed` for debug
    /// logging; order follows JSON object iteration order (insertion order).
    pub fn changed_keys(&self, other: &State) -> Vec<String> {
        match (&self.0, &other.0) {
            (Value::Object(before), Value::Object(after)) => after
                .iter()
                .filter(|(k, v)| before.get(*k) != Some(*v))
                .map(|(k, _)| k.clone())
                .collect(),
            _ => Vec::new(),
        }
    }

    /// Borrows the underlying JSON value.
    pub fn as_value(&self) -> &Value {
        &self.0
    }

    /// Consumes `self`, returning the underlying JSON value.
    pub fn into_value(self) -> Value {
        self.0
    }
}

impl Default for State {
    fn default() -> Self {
        State::new()
    }
}

impl From<Value> for State {
    fn from(value: Value) -> Self {
        State(value)
    }
}

impl From<State> for Value {
    fn from(state: State) -> Self {
        state.0
    }
}
