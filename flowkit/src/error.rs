//! Flow execution error types.
//!
//! One `thiserror`-derived enum covers the taxonomy a flow can fail with:
//! run-cap overruns, malformed builder chains, unresolved goto segments, and
//! node failures. `MaxStepsExhausted` is deliberately *not* a variant here —
//! reaching the step cap is a bounded return, not an error (see `Flow::run`).

use thiserror::Error;

/// Boxed error returned by node and tool bodies.
///
/// Node and tool functions are ordinary fallible async closures; they do not
/// need to know about `FlowError` at all. The scheduler wraps whatever they
/// return into `FlowError::NodeFailure`.
pub type NodeError = Box<dyn std::error::Error + Send + Sync>;

/// Error produced while building or running a flow.
#[derive(Debug, Error)]
pub enum FlowError {
    /// A node's `run_count` had already reached `max_runs` before this call.
    #[error("node {node} exceeded max runs ({max_runs})")]
    MaxRunsExceeded {
        /// Name of the node that was over its cap.
        node: String,
        /// The configured cap.
        max_runs: usize,
    },

    /// A builder method that requires a cursor (`on`, `branch`, `switch`, `catch`)
    /// was called on a flow that has no nodes yet.
    #[error("builder method called on an empty flow with no cursor")]
    NoCursor,

    /// A `_goto` signal (or `FlowRegistry::execute`) named a segment that was
    /// never registered.
    #[error("unknown segment: {0}")]
    UnknownSegment(String),

    /// A registry entry exists for a name but is neither a `Node` nor a `Flow`.
    #[error("invalid segment: {0}")]
    InvalidSegment(String),

    /// A node's function returned an error and no `catch` handler consumed it.
    #[error("node {node} failed: {source}")]
    NodeFailure {
        /// Name of the node whose function raised the error.
        node: String,
        /// The underlying error.
        #[source]
        source: NodeError,
    },
}
