//! # flowkit
//!
//! A lightweight orchestration core for building AI/LLM pipelines as graphs
//! of composable tools and nodes. `flowkit` provides the graph execution
//! core only: a directed graph of stateful [`Node`]s, dispatched by a
//! label-driven [`Flow`] scheduler over an implicitly-merged [`State`]
//! record, with chainable combinators (`then`, `catch`, `branch`, `switch`,
//! `map_reduce`) and a process-wide [`FlowRegistry`] for cross-flow jumps by
//! label.
//!
//! Tool adapters (real API/LLM callers, parsers, fetchers) and example
//! applications sit outside the core as external collaborators; this crate
//! only specifies the contract a [`Tool`] must present and the contract the
//! core offers back (state flow, chaining, registry lookup). The `tools`
//! module ships two small in-process mocks (`MockApiTool`, `MockLlmTool`)
//! used by the crate's own tests and by the `flowkit-examples` crate — they
//! are not real network adapters.
//!
//! ## Quick start
//!
//! ```
//! use flowkit::{Flow, NodeOutcome, State};
//! use serde_json::json;
//!
//! # #[tokio::main]
//! # async fn main() {
//! let mut flow = Flow::start(|s: State| async move {
//!     Ok(NodeOutcome::from(s.merge(&State::from_value(json!({"a": 1})))))
//! });
//! flow.next(|s: State| async move {
//!     Ok(NodeOutcome::from(s.merge(&State::from_value(json!({"b": 2})))))
//! });
//! let out = flow.run(State::new()).await.unwrap();
//! assert_eq!(out.as_value(), &json!({"a": 1, "b": 2}));
//! # }
//! ```
//!
//! ## Main modules
//!
//! - [`state`]: the open `State` record and its shallow-merge rule.
//! - [`node`]: `Node`, `NodeOutcome` — named units of work and their edges.
//! - [`flow`]: `Flow` — fluent graph assembly plus the scheduler (`run`).
//! - [`registry`]: `FlowRegistry`, `flow_registry()` — named cross-flow jumps.
//! - [`tool`]: `Tool`, `ToolExt`, `FnTool`, `ApiKeyGuardedTool`, `map_reduce`,
//!   `register_tool`.
//! - [`tools`]: `MockApiTool`, `MockLlmTool` — in-process stand-ins, not real
//!   adapters.
//! - [`error`]: `FlowError`, `NodeError`.
//! - [`logging`]: structured per-hop debug records, gated by `Flow::debug`.
//!
//! ## Features
//!
//! - `tracing` (default on): structured logging via the `tracing` crate for
//!   scheduler hop events; falls back to `eprintln!` when disabled.

pub mod error;
pub mod flow;
pub mod logging;
pub mod node;
pub mod registry;
pub mod state;
pub mod tool;
pub mod tools;

pub use error::{FlowError, NodeError};
pub use flow::{Flow, FlowErrorHandler, IntoTarget};
pub use logging::HopRecord;
pub use node::{Node, NodeOutcome, DEFAULT_OUTCOME};
pub use registry::{flow_registry, FlowRegistry, Segment};
pub use state::{State, GOTO_KEY};
pub use tool::{
    map_reduce, register_tool, tool_metadata_for, ApiKeyGuardedTool, ApiTool, Continuation,
    FnTool, LlmTool, Tool, ToolErrorHandler, ToolExt, ToolMetadata,
};
