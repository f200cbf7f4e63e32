//! Recording stand-in for a durable runtime.
//!
//! Every primitive appends a [`FlowNode`] and resolves immediately. Step
//! bodies, compensations and branch bodies are dropped unexecuted.

use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;

use crate::context::{
    DurableContext, DurableError, SignalOptions, SignalOutcome, StepSpec, SwitchSpec,
};
use crate::{DurableFlowShape, FlowNode};

/// Context that records calls instead of performing them.
#[derive(Debug, Default)]
pub struct RecordingContext {
    nodes: Mutex<Vec<FlowNode>>,
    unsupported: Mutex<Vec<String>>,
}

impl RecordingContext {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn record(&self, node: FlowNode) {
        tracing::trace!(kind = node.kind(), "Recorded durable primitive");
        self.nodes.lock().push(node);
    }

    /// Copy of everything recorded so far.
    #[must_use]
    pub fn shape(&self) -> DurableFlowShape {
        DurableFlowShape {
            nodes: self.nodes.lock().clone(),
        }
    }

    /// Primitives the body called that this context cannot describe.
    #[must_use]
    pub fn unsupported(&self) -> Vec<String> {
        self.unsupported.lock().clone()
    }
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

#[async_trait]
impl DurableContext for RecordingContext {
    async fn step(&self, step: StepSpec<'_>) -> Result<Value, DurableError> {
        self.record(FlowNode::Step {
            step_id: step.id,
            has_compensation: step.compensation.is_some(),
        });
        Ok(Value::Null)
    }

    async fn sleep(&self, duration: Duration, step_id: Option<&str>) -> Result<(), DurableError> {
        self.record(FlowNode::Sleep {
            duration_ms: millis(duration),
            step_id: step_id.map(str::to_string),
        });
        Ok(())
    }

    async fn wait_for_signal(
        &self,
        signal_id: &str,
        options: SignalOptions,
    ) -> Result<SignalOutcome, DurableError> {
        self.record(FlowNode::WaitForSignal {
            signal_id: signal_id.to_string(),
            timeout_ms: options.timeout.map(millis),
            step_id: options.step_id,
        });
        Ok(SignalOutcome::Received(Value::Null))
    }

    async fn emit(
        &self,
        event_id: &str,
        _payload: Value,
        step_id: Option<&str>,
    ) -> Result<(), DurableError> {
        self.record(FlowNode::Emit {
            event_id: event_id.to_string(),
            step_id: step_id.map(str::to_string),
        });
        Ok(())
    }

    async fn switch(&self, switch: SwitchSpec<'_>) -> Result<Value, DurableError> {
        // All declared arms are listed regardless of which one `value` selects.
        self.record(FlowNode::Switch {
            step_id: switch.step_id,
            branch_ids: switch.branches.into_iter().map(|b| b.id).collect(),
            has_default: switch.default.is_some(),
        });
        Ok(Value::Null)
    }

    async fn note(&self, message: &str) -> Result<(), DurableError> {
        self.record(FlowNode::Note {
            message: message.to_string(),
        });
        Ok(())
    }

    async fn rollback(&self) -> Result<(), DurableError> {
        self.unsupported.lock().push("rollback".to_string());
        Err(DurableError::unsupported("rollback"))
    }
}
