//! Durable workflow authoring contract.
//!
//! A workflow body only talks to its runtime through [`DurableContext`]. The
//! live runtime checkpoints each primitive; the recording context used for
//! shape extraction only observes them.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use futures::future::BoxFuture;
use serde_json::Value;
use thiserror::Error;

/// Errors a durable primitive may surface to the workflow body.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DurableError {
    /// The context does not implement this primitive.
    #[error("Durable primitive '{primitive}' is not supported by this context")]
    Unsupported { primitive: String },

    /// A step body failed.
    #[error("Step '{step_id}' failed: {reason}")]
    Step { step_id: String, reason: String },

    /// The workflow was cancelled while suspended.
    #[error("Workflow cancelled")]
    Cancelled,
}

impl DurableError {
    pub fn unsupported(primitive: impl Into<String>) -> Self {
        Self::Unsupported {
            primitive: primitive.into(),
        }
    }
}

/// Future produced by a step body.
pub type StepFuture<'a> = BoxFuture<'a, anyhow::Result<Value>>;

/// Deferred step body. Only a live runtime ever calls it.
pub type StepFn<'a> = Box<dyn FnOnce() -> StepFuture<'a> + Send + 'a>;

fn boxed_step<'a, F, Fut>(run: F) -> StepFn<'a>
where
    F: FnOnce() -> Fut + Send + 'a,
    Fut: Future<Output = anyhow::Result<Value>> + Send + 'a,
{
    Box::new(move || Box::pin(run()))
}

/// A checkpointed unit of work.
pub struct StepSpec<'a> {
    pub id: String,
    pub run: StepFn<'a>,
    pub compensation: Option<StepFn<'a>>,
}

impl<'a> StepSpec<'a> {
    pub fn new<F, Fut>(id: impl Into<String>, run: F) -> Self
    where
        F: FnOnce() -> Fut + Send + 'a,
        Fut: Future<Output = anyhow::Result<Value>> + Send + 'a,
    {
        Self {
            id: id.into(),
            run: boxed_step(run),
            compensation: None,
        }
    }

    /// Attach a compensation that undoes the step on rollback.
    #[must_use]
    pub fn with_compensation<F, Fut>(mut self, compensation: F) -> Self
    where
        F: FnOnce() -> Fut + Send + 'a,
        Fut: Future<Output = anyhow::Result<Value>> + Send + 'a,
    {
        self.compensation = Some(boxed_step(compensation));
        self
    }
}

impl std::fmt::Debug for StepSpec<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StepSpec")
            .field("id", &self.id)
            .field("has_compensation", &self.compensation.is_some())
            .finish_non_exhaustive()
    }
}

/// Predicate selecting a switch branch.
pub type BranchMatcher<'a> = Box<dyn Fn(&Value) -> bool + Send + Sync + 'a>;

/// One arm of a [`SwitchSpec`].
pub struct Branch<'a> {
    pub id: String,
    pub matches: BranchMatcher<'a>,
    pub run: StepFn<'a>,
}

impl<'a> Branch<'a> {
    pub fn new<M, F, Fut>(id: impl Into<String>, matches: M, run: F) -> Self
    where
        M: Fn(&Value) -> bool + Send + Sync + 'a,
        F: FnOnce() -> Fut + Send + 'a,
        Fut: Future<Output = anyhow::Result<Value>> + Send + 'a,
    {
        Self {
            id: id.into(),
            matches: Box::new(matches),
            run: boxed_step(run),
        }
    }
}

impl std::fmt::Debug for Branch<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Branch")
            .field("id", &self.id)
            .finish_non_exhaustive()
    }
}

/// Durable branching: the first matching branch runs, else the default.
pub struct SwitchSpec<'a> {
    pub step_id: String,
    pub value: Value,
    pub branches: Vec<Branch<'a>>,
    pub default: Option<StepFn<'a>>,
}

impl<'a> SwitchSpec<'a> {
    pub fn new(step_id: impl Into<String>, value: Value) -> Self {
        Self {
            step_id: step_id.into(),
            value,
            branches: Vec::new(),
            default: None,
        }
    }

    #[must_use]
    pub fn branch(mut self, branch: Branch<'a>) -> Self {
        self.branches.push(branch);
        self
    }

    #[must_use]
    pub fn otherwise<F, Fut>(mut self, run: F) -> Self
    where
        F: FnOnce() -> Fut + Send + 'a,
        Fut: Future<Output = anyhow::Result<Value>> + Send + 'a,
    {
        self.default = Some(boxed_step(run));
        self
    }
}

impl std::fmt::Debug for SwitchSpec<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SwitchSpec")
            .field("step_id", &self.step_id)
            .field(
                "branches",
                &self.branches.iter().map(|b| b.id.as_str()).collect::<Vec<_>>(),
            )
            .field("has_default", &self.default.is_some())
            .finish_non_exhaustive()
    }
}

/// Options for [`DurableContext::wait_for_signal`].
#[derive(Debug, Clone, Default)]
pub struct SignalOptions {
    pub timeout: Option<Duration>,
    pub step_id: Option<String>,
}

/// Result of waiting on a signal.
#[derive(Debug, Clone, PartialEq)]
pub enum SignalOutcome {
    Received(Value),
    TimedOut,
}

/// Primitives a durable runtime offers to a workflow body.
#[async_trait]
pub trait DurableContext: Send + Sync {
    /// Run (or replay) a checkpointed step.
    async fn step(&self, step: StepSpec<'_>) -> Result<Value, DurableError>;

    /// Suspend durably for `duration`.
    async fn sleep(&self, duration: Duration, step_id: Option<&str>) -> Result<(), DurableError>;

    /// Suspend until `signal_id` is delivered or the timeout elapses.
    async fn wait_for_signal(
        &self,
        signal_id: &str,
        options: SignalOptions,
    ) -> Result<SignalOutcome, DurableError>;

    /// Emit an event exactly once.
    async fn emit(
        &self,
        event_id: &str,
        payload: Value,
        step_id: Option<&str>,
    ) -> Result<(), DurableError>;

    /// Durable branching.
    async fn switch(&self, switch: SwitchSpec<'_>) -> Result<Value, DurableError>;

    /// Attach a note to the execution history.
    async fn note(&self, message: &str) -> Result<(), DurableError>;

    /// Run compensations of completed steps in reverse order.
    async fn rollback(&self) -> Result<(), DurableError>;
}

/// A task body executed under a durable runtime.
#[async_trait]
pub trait DurableWorkflow: Send + Sync {
    async fn run(&self, ctx: &dyn DurableContext, input: Value) -> anyhow::Result<Value>;
}
