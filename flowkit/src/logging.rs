//! Structured logging for scheduler hops.
//!
//! Mirrors the shape of the teacher crate's `graph/logging.rs`: one function
//! per loggable event, `tracing::debug!`/`info!` when the `tracing` feature
//! is enabled (default), falling back to `eprintln!` otherwise. Nothing here
//! defines a persisted format — observability is in-process only (spec.md §6).

use serde::Serialize;

/// One structured record per scheduler hop, emitted when `Flow::debug(true)`.
///
/// Matches spec.md §6: `{step, fromNode, label, toNode, stateKeysChanged}`.
#[derive(Debug, Clone, Serialize)]
pub struct HopRecord {
    /// Step count at the time of this hop (0-indexed).
    pub step: usize,
    /// Name of the node that just ran, or `None` for the initial hop.
    pub from_node: Option<String>,
    /// Outcome label that selected the next node.
    pub label: String,
    /// Name of the node the scheduler is advancing to, or `None` at termination.
    pub to_node: Option<String>,
    /// State keys whose value changed (or was newly added) at this hop.
    pub state_keys_changed: Vec<String>,
}

/// Emits a `HopRecord` for one scheduler advance.
pub fn log_hop(record: &HopRecord) {
    #[cfg(feature = "tracing")]
    tracing::debug!(
        step = record.step,
        from_node = ?record.from_node,
        label = %record.label,
        to_node = ?record.to_node,
        state_keys_changed = ?record.state_keys_changed,
        "flow hop"
    );

    #[cfg(not(feature = "tracing"))]
    eprintln!(
        "[DEBUG] flow hop {}: {:?} --{}--> {:?} (changed: {:?})",
        record.step, record.from_node, record.label, record.to_node, record.state_keys_changed
    );
}

/// Logs that a flow run started.
pub fn log_run_start(start_node: Option<&str>) {
    #[cfg(feature = "tracing")]
    tracing::info!(start_node = ?start_node, "flow run starting");

    #[cfg(not(feature = "tracing"))]
    eprintln!("[INFO] flow run starting at {:?}", start_node);
}

/// Logs that a flow run finished, with the final step count.
pub fn log_run_complete(steps: usize) {
    #[cfg(feature = "tracing")]
    tracing::info!(steps, "flow run complete");

    #[cfg(not(feature = "tracing"))]
    eprintln!("[INFO] flow run complete after {} steps", steps);
}

/// Logs a run-ending error before it propagates out of `Flow::run`.
pub fn log_run_error(error: &crate::error::FlowError) {
    #[cfg(feature = "tracing")]
    tracing::error!(%error, "flow run failed");

    #[cfg(not(feature = "tracing"))]
    eprintln!("[ERROR] flow run failed: {}", error);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn logging_functions_do_not_panic() {
        log_run_start(Some("start"));
        log_hop(&HopRecord {
            step: 0,
            from_node: Some("a".into()),
            label: "default".into(),
            to_node: Some("b".into()),
            state_keys_changed: vec!["x".into()],
        });
        log_run_complete(1);
        log_run_error(&crate::error::FlowError::NoCursor);
    }

    #[test]
    fn hop_record_serializes_to_json() {
        let record = HopRecord {
            step: 2,
            from_node: None,
            label: "default".into(),
            to_node: Some("n".into()),
            state_keys_changed: vec![],
        };
        let json = serde_json::to_string(&record).unwrap();
        assert!(json.contains("\"step\":2"));
    }
}
