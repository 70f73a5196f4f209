//! The tool contract and the chainable combinators built on top of it.
//!
//! A conforming tool is any type implementing `Tool`: an async `call` plus a
//! metadata record. `then`/`catch`/`branch`/`switch` are capabilities, not
//! contractual requirements — they are provided by the `ToolExt` blanket
//! trait so any `Tool` gets them without subclassing a base type, matching
//! spec.md §4.F ("capabilities not contractual requirements... when absent,
//! the scheduler wraps the tool into a Node to provide them").

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, OnceLock, RwLock};

use async_trait::async_trait;
use serde_json::Value;

use crate::error::NodeError;
use crate::node::{Node, NodeOutcome};
use crate::state::State;

type BoxFuture<T> = Pin<Box<dyn Future<Output = T> + Send>>;

/// Descriptive metadata a tool presents about itself.
#[derive(Debug, Clone, Default)]
pub struct ToolMetadata {
    /// Tool name, used as the node name when a tool is auto-wrapped.
    pub name: String,
    /// Human-readable description.
    pub description: Option<String>,
    /// Parameter descriptors (shape is caller-defined; the core does not
    /// validate against it).
    pub parameters: Option<Value>,
}

impl ToolMetadata {
    /// Builds metadata with just a name.
    pub fn new(name: impl Into<String>) -> Self {
        ToolMetadata {
            name: name.into(),
            description: None,
            parameters: None,
        }
    }

    /// Builder-style setter for the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Builder-style setter for the parameter descriptor.
    pub fn with_parameters(mut self, parameters: Value) -> Self {
        self.parameters = Some(parameters);
        self
    }
}

/// The minimal shape the core requires from a tool: an async unary callable
/// plus metadata (spec.md §4.F).
#[async_trait]
pub trait Tool: Send + Sync {
    /// Descriptive metadata for this tool.
    fn metadata(&self) -> &ToolMetadata;

    /// Invokes the tool on `input`, returning its output.
    async fn call(&self, input: Value) -> Result<Value, NodeError>;
}

/// Marker specialization: the core only cares that it implements `Tool`; its
/// body (actual HTTP calls, auth, retries) is an external concern.
pub trait ApiTool: Tool {}

/// Marker specialization for LLM-calling tools; same relationship to `Tool`
/// as `ApiTool`.
pub trait LlmTool: Tool {}

/// What a combinator's successor may be: another tool, or a whole flow.
pub enum Continuation {
    /// Hand the tool's output to another tool's `call`.
    Tool(Arc<dyn Tool>),
    /// Hand the tool's output to the scheduler as the start state of a flow.
    Flow(crate::flow::Flow),
}

impl From<Arc<dyn Tool>> for Continuation {
    fn from(tool: Arc<dyn Tool>) -> Self {
        Continuation::Tool(tool)
    }
}

impl From<crate::flow::Flow> for Continuation {
    fn from(flow: crate::flow::Flow) -> Self {
        Continuation::Flow(flow)
    }
}

/// An error handler for `ToolExt::catch`: receives the error and the state
/// at the time of failure, and returns the state execution should resume
/// with.
pub type ToolErrorHandler =
    Arc<dyn Fn(NodeError, State) -> BoxFuture<Result<State, NodeError>> + Send + Sync>;

/// Chaining combinators available to any `Tool`, via blanket impl.
///
/// Every combinator normalizes `self` into a `Node` so the scheduler needs
/// no tool-specific code path (spec.md §9: "adapt any object satisfying
/// `{call, metadata}` into a Node lazily").
pub trait ToolExt: Tool + 'static {
    /// Returns a `Node` that calls `self`, then feeds the output into `next`.
    fn then(self: Arc<Self>, next: impl Into<Continuation>) -> Arc<Node> {
        let continuation = next.into();
        let name = format!("{}.then", self.metadata().name);
        Node::new(name, move |state: State| {
            let this = self.clone();
            let continuation = match &continuation {
                Continuation::Tool(t) => Continuation::Tool(t.clone()),
                Continuation::Flow(f) => Continuation::Flow(f.clone()),
            };
            async move {
                let output = this.call(state.into_value()).await?;
                match continuation {
                    Continuation::Tool(next_tool) => {
                        let result = next_tool.call(output).await?;
                        Ok(NodeOutcome::from(result))
                    }
                    Continuation::Flow(flow) => {
                        let result = flow
                            .run(State::from_value(output))
                            .await
                            .map_err(|e| -> NodeError { Box::new(e) })?;
                        Ok(NodeOutcome::from(result))
                    }
                }
            }
        })
    }

    /// Returns a `Node` that calls `self`, routing any error to `handler`.
    fn catch(self: Arc<Self>, handler: ToolErrorHandler) -> Arc<Node> {
        let name = format!("{}.catch", self.metadata().name);
        Node::new(name, move |state: State| {
            let this = self.clone();
            let handler = handler.clone();
            async move {
                match this.call(state.clone().into_value()).await {
                    Ok(output) => Ok(NodeOutcome::from(output)),
                    Err(err) => {
                        let recovered = handler(err, state).await?;
                        Ok(NodeOutcome::from(recovered))
                    }
                }
            }
        })
    }

    /// Returns a `Node` that calls `self`, then forwards to `if_true` or
    /// `if_false` depending on `predicate` applied to the tool's output.
    fn branch(
        self: Arc<Self>,
        predicate: Arc<dyn Fn(&Value) -> bool + Send + Sync>,
        if_true: Arc<Node>,
        if_false: Arc<Node>,
    ) -> Arc<Node> {
        let name = format!("{}.branch", self.metadata().name);
        let node = Node::new(name, move |state: State| {
            let this = self.clone();
            let predicate = predicate.clone();
            async move {
                let output = this.call(state.into_value()).await?;
                let label = if predicate(&output) { "true" } else { "false" };
                Ok(NodeOutcome::Labeled(label.to_string(), State::from_value(output)))
            }
        });
        node.on("true", &if_true);
        node.on("false", &if_false);
        node
    }

    /// Returns a `Node` that calls `self`, then selects a successor by
    /// `key_fn` applied to the tool's output, using `default` when no case
    /// matches.
    fn switch(
        self: Arc<Self>,
        key_fn: Arc<dyn Fn(&Value) -> String + Send + Sync>,
        cases: HashMap<String, Arc<Node>>,
        default: Arc<Node>,
    ) -> Arc<Node> {
        let name = format!("{}.switch", self.metadata().name);
        let node = Node::new(name, move |state: State| {
            let this = self.clone();
            let key_fn = key_fn.clone();
            async move {
                let output = this.call(state.into_value()).await?;
                let label = key_fn(&output);
                Ok(NodeOutcome::Labeled(label, State::from_value(output)))
            }
        });
        for (label, target) in &cases {
            node.on(label.clone(), target);
        }
        node.on(crate::node::DEFAULT_OUTCOME, &default);
        node
    }
}

impl<T: Tool + 'static> ToolExt for T {}

/// An ad-hoc tool built from a metadata record and a boxed async closure —
/// the direct realization of `with_execute`, for building tools without
/// subclassing.
pub struct FnTool {
    metadata: ToolMetadata,
    execute: RwLock<Arc<dyn Fn(Value) -> BoxFuture<Result<Value, NodeError>> + Send + Sync>>,
}

impl FnTool {
    /// Builds a tool from metadata and an execute function.
    pub fn new<F, Fut>(metadata: ToolMetadata, execute: F) -> Self
    where
        F: Fn(Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value, NodeError>> + Send + 'static,
    {
        FnTool {
            metadata,
            execute: RwLock::new(Arc::new(move |v| {
                Box::pin(execute(v)) as BoxFuture<Result<Value, NodeError>>
            })),
        }
    }

    /// Replaces the tool's execute function (`withExecute` in spec.md §4.F).
    pub fn with_execute<F, Fut>(&self, execute: F)
    where
        F: Fn(Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value, NodeError>> + Send + 'static,
    {
        *self.execute.write().unwrap() = Arc::new(move |v| {
            Box::pin(execute(v)) as BoxFuture<Result<Value, NodeError>>
        });
    }
}

#[async_trait]
impl Tool for FnTool {
    fn metadata(&self) -> &ToolMetadata {
        &self.metadata
    }

    async fn call(&self, input: Value) -> Result<Value, NodeError> {
        let execute = self.execute.read().unwrap().clone();
        execute(input).await
    }
}

/// Wraps a tool so its first `call` asserts that `env_var` is set, caching
/// the check so later calls skip re-reading the environment
/// (`withApiKey(envVarName)` in spec.md §4.F).
pub struct ApiKeyGuardedTool<T: Tool> {
    inner: T,
    env_var: String,
    checked: OnceLock<Result<(), String>>,
}

impl<T: Tool> ApiKeyGuardedTool<T> {
    /// Wraps `inner`, guarding its calls on `env_var` being set.
    pub fn new(inner: T, env_var: impl Into<String>) -> Self {
        ApiKeyGuardedTool {
            inner,
            env_var: env_var.into(),
            checked: OnceLock::new(),
        }
    }
}

#[async_trait]
impl<T: Tool> Tool for ApiKeyGuardedTool<T> {
    fn metadata(&self) -> &ToolMetadata {
        self.inner.metadata()
    }

    async fn call(&self, input: Value) -> Result<Value, NodeError> {
        let check = self.checked.get_or_init(|| {
            std::env::var(&self.env_var)
                .map(|_| ())
                .map_err(|_| format!("missing required environment variable: {}", self.env_var))
        });
        if let Err(msg) = check {
            return Err(msg.clone().into());
        }
        self.inner.call(input).await
    }
}

static TOOL_METADATA: OnceLock<RwLock<HashMap<String, ToolMetadata>>> = OnceLock::new();

fn metadata_table() -> &'static RwLock<HashMap<String, ToolMetadata>> {
    TOOL_METADATA.get_or_init(|| RwLock::new(HashMap::new()))
}

/// Attaches a metadata record to a bare function so it satisfies the tool
/// contract, without changing the function itself (identity preserved).
///
/// Rust cannot attach data to an arbitrary value in place, so the metadata
/// is stored in a side table keyed by `std::any::type_name::<F>()` and
/// retrieved with `tool_metadata_for::<F>()` — see DESIGN.md for why this
/// was chosen over, e.g., requiring callers to wrap functions in a struct.
pub fn register_tool<F>(f: F, metadata: ToolMetadata) -> F {
    metadata_table()
        .write()
        .unwrap()
        .insert(std::any::type_name::<F>().to_string(), metadata);
    f
}

/// Retrieves the metadata registered for function type `F` via `register_tool`.
pub fn tool_metadata_for<F>() -> Option<ToolMetadata> {
    metadata_table()
        .read()
        .unwrap()
        .get(std::any::type_name::<F>())
        .cloned()
}

/// Runs `map_fn` over `items` with at most `concurrency` in flight at once
/// (unbounded when `None`), collecting results positionally, and — if
/// `reduce_fn` is supplied — folding them into the outgoing state; otherwise
/// the results array itself becomes the state (spec.md §4.F).
pub fn map_reduce(
    items: Vec<Value>,
    map_fn: Arc<dyn Fn(Value) -> BoxFuture<Result<Value, NodeError>> + Send + Sync>,
    reduce_fn: Option<Arc<dyn Fn(Vec<Value>, State) -> Result<State, NodeError> + Send + Sync>>,
    concurrency: Option<usize>,
) -> impl Fn(State) -> BoxFuture<Result<NodeOutcome, NodeError>> + Send + Sync + 'static {
    move |state: State| {
        let items = items.clone();
        let map_fn = map_fn.clone();
        let reduce_fn = reduce_fn.clone();
        Box::pin(async move {
            use futures::stream::{self, StreamExt, TryStreamExt};
            let bound = concurrency.unwrap_or(items.len().max(1));
            let results: Vec<Value> = stream::iter(items.into_iter().map(|item| {
                let map_fn = map_fn.clone();
                async move { map_fn(item).await }
            }))
            .buffered(bound)
            .try_collect()
            .await?;

            match reduce_fn {
                Some(reduce) => {
                    let new_state = reduce(results, state)?;
                    Ok(NodeOutcome::from(new_state))
                }
                None => Ok(NodeOutcome::from(Value::Array(results))),
            }
        }) as BoxFuture<Result<NodeOutcome, NodeError>>
    }
}
