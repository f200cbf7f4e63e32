//! Interceptor chain around a task or hook body.
//!
//! A call walks the interceptors in order and ends at the body. The chain is
//! resolved per call, so swapping the body never patches a live object.

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use futures::future::BoxFuture;
use serde_json::Value;

use crate::telemetry::{ErrorEntry, RunNodeKind, RunRecord, Telemetry};

/// One call travelling through a pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct Invocation {
    pub node_id: String,
    pub node_kind: RunNodeKind,
    pub input: Value,
    pub correlation_id: Option<String>,
    pub parent_id: Option<String>,
    pub root_id: Option<String>,
}

impl Invocation {
    pub fn new(node_id: impl Into<String>, node_kind: RunNodeKind, input: Value) -> Self {
        Self {
            node_id: node_id.into(),
            node_kind,
            input,
            correlation_id: None,
            parent_id: None,
            root_id: None,
        }
    }

    /// A nested call made while this one runs.
    ///
    /// The child inherits the correlation id; its parent is this node and
    /// its root is this call's root (or this node when it is the root).
    #[must_use]
    pub fn child(&self, node_id: impl Into<String>, node_kind: RunNodeKind, input: Value) -> Self {
        Self {
            correlation_id: self.correlation_id.clone(),
            parent_id: Some(self.node_id.clone()),
            root_id: Some(self.root_id.clone().unwrap_or_else(|| self.node_id.clone())),
            ..Self::new(node_id, node_kind, input)
        }
    }

    #[must_use]
    pub fn with_correlation_id(mut self, id: impl Into<String>) -> Self {
        self.correlation_id = Some(id.into());
        self
    }
}

/// Base implementation of a task or hook.
#[async_trait]
pub trait TaskBody: Send + Sync {
    async fn run(&self, input: Value) -> anyhow::Result<Value>;
}

/// Adapter turning an async closure into a [`TaskBody`].
pub struct FnBody<F>(F);

impl<F> std::fmt::Debug for FnBody<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnBody").finish_non_exhaustive()
    }
}

/// Wrap `f` as a shareable task body.
pub fn body_fn<F, Fut>(f: F) -> Arc<dyn TaskBody>
where
    F: Fn(Value) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<Value>> + Send + 'static,
{
    Arc::new(FnBody(f))
}

#[async_trait]
impl<F, Fut> TaskBody for FnBody<F>
where
    F: Fn(Value) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<Value>> + Send + 'static,
{
    async fn run(&self, input: Value) -> anyhow::Result<Value> {
        (self.0)(input).await
    }
}

/// A wrapper around every call of a pipeline.
#[async_trait]
pub trait Interceptor: Send + Sync {
    /// Name for identification in logs.
    fn name(&self) -> &'static str;

    /// Handle `call`, usually by awaiting `next.run(call)` somewhere inside.
    async fn intercept(&self, call: Invocation, next: Next<'_>) -> anyhow::Result<Value>;
}

/// The rest of the chain after the current interceptor.
pub struct Next<'a> {
    interceptors: &'a [Arc<dyn Interceptor>],
    body: &'a dyn TaskBody,
}

impl std::fmt::Debug for Next<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Next")
            .field("remaining", &self.interceptors.len())
            .finish_non_exhaustive()
    }
}

impl<'a> Next<'a> {
    pub fn run(self, call: Invocation) -> BoxFuture<'a, anyhow::Result<Value>> {
        Box::pin(async move {
            match self.interceptors.split_first() {
                Some((first, rest)) => {
                    let next = Next {
                        interceptors: rest,
                        body: self.body,
                    };
                    first.intercept(call, next).await
                }
                None => self.body.run(call.input).await,
            }
        })
    }
}

/// Ordered interceptors composed around one body.
#[derive(Clone)]
pub struct Pipeline {
    node_id: String,
    node_kind: RunNodeKind,
    interceptors: Vec<Arc<dyn Interceptor>>,
    body: Arc<dyn TaskBody>,
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("node_id", &self.node_id)
            .field("node_kind", &self.node_kind)
            .field("interceptors", &self.interceptor_names())
            .finish_non_exhaustive()
    }
}

impl Pipeline {
    pub fn new(node_id: impl Into<String>, node_kind: RunNodeKind, body: Arc<dyn TaskBody>) -> Self {
        Self {
            node_id: node_id.into(),
            node_kind,
            interceptors: Vec::new(),
            body,
        }
    }

    /// Append an interceptor; the first added is the outermost.
    #[must_use]
    pub fn with_interceptor(mut self, interceptor: Arc<dyn Interceptor>) -> Self {
        self.interceptors.push(interceptor);
        self
    }

    /// Same chain around a different body. `self` is left untouched.
    #[must_use]
    pub fn with_body(&self, body: Arc<dyn TaskBody>) -> Self {
        Self {
            body,
            ..self.clone()
        }
    }

    #[must_use]
    pub fn node_id(&self) -> &str {
        &self.node_id
    }

    #[must_use]
    pub fn interceptor_names(&self) -> Vec<&'static str> {
        self.interceptors.iter().map(|i| i.name()).collect()
    }

    /// Run a top-level call with `input`.
    pub async fn call(&self, input: Value) -> anyhow::Result<Value> {
        self.invoke(Invocation::new(&self.node_id, self.node_kind, input))
            .await
    }

    /// Run a prepared invocation, e.g. one built with [`Invocation::child`].
    pub async fn invoke(&self, call: Invocation) -> anyhow::Result<Value> {
        let next = Next {
            interceptors: &self.interceptors,
            body: self.body.as_ref(),
        };
        next.run(call).await
    }
}

/// Records every call as a run, and failures as errors too.
#[derive(Debug, Clone)]
pub struct RunRecorder {
    telemetry: Arc<Telemetry>,
}

impl RunRecorder {
    pub fn new(telemetry: Arc<Telemetry>) -> Self {
        Self { telemetry }
    }
}

#[async_trait]
impl Interceptor for RunRecorder {
    fn name(&self) -> &'static str {
        "run_recorder"
    }

    async fn intercept(&self, mut call: Invocation, next: Next<'_>) -> anyhow::Result<Value> {
        let correlation_id = call
            .correlation_id
            .get_or_insert_with(|| uuid::Uuid::new_v4().to_string())
            .clone();
        let node_id = call.node_id.clone();
        let node_kind = call.node_kind;
        let parent_id = call.parent_id.clone();
        let root_id = call.root_id.clone();

        let start = Instant::now();
        let result = next.run(call).await;
        let duration_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);

        let mut record = match &result {
            Ok(_) => RunRecord::ok(&node_id, node_kind, duration_ms),
            Err(e) => {
                self.telemetry.record_error(
                    ErrorEntry::new(&node_id, node_kind.into(), e.to_string())
                        .with_stack(format!("{e:?}"))
                        .with_correlation_id(&correlation_id),
                );
                RunRecord::failed(&node_id, node_kind, duration_ms, e.to_string())
            }
        };
        record.parent_id = parent_id;
        record.root_id = root_id;
        self.telemetry
            .record_run(record.with_correlation_id(correlation_id));

        tracing::debug!(
            node_id = %node_id,
            duration_ms,
            ok = result.is_ok(),
            "Run recorded"
        );
        result
    }
}
