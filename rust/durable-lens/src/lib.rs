//! Static shape extraction for durable workflow tasks.
//!
//! This crate provides:
//! - The authoring contract for durable workflows ([`DurableWorkflow`],
//!   [`DurableContext`])
//! - A recording stand-in context that captures every durable primitive a
//!   workflow body calls without performing it
//! - A time-boxed extractor that turns a workflow body into a
//!   [`DurableFlowShape`]
//!
//! # Architecture
//!
//! A durable runtime hands each workflow a context whose `step`, `sleep`,
//! `wait_for_signal`, `emit` and `switch` calls are checkpointed. The extractor
//! runs the same body against [`RecordingContext`], where each of those calls
//! records a [`FlowNode`] and resolves immediately with a placeholder. Step
//! closures, compensations and switch branches are never invoked, so no real
//! side effect happens through the context.
//!
//! # Usage
//!
//! ```rust,ignore
//! use durable_lens::FlowExtractor;
//!
//! let extractor = FlowExtractor::default();
//! let extraction = extractor.extract(workflow, serde_json::Value::Null).await;
//! if let Some(shape) = extraction.shape {
//!     println!("{} nodes", shape.nodes.len());
//! }
//! ```

pub mod context;
pub mod extractor;
pub mod recorder;

// Re-exports
pub use context::{
    Branch, DurableContext, DurableError, DurableWorkflow, SignalOptions, SignalOutcome,
    StepFn, StepSpec, SwitchSpec,
};
pub use extractor::{Extraction, ExtractionFailure, FlowExtractor};
pub use recorder::RecordingContext;

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::context::{
        Branch, DurableContext, DurableError, DurableWorkflow, SignalOptions, SignalOutcome,
        StepSpec, SwitchSpec,
    };
    pub use crate::extractor::{Extraction, ExtractionFailure, FlowExtractor};
    pub use crate::{DurableFlowShape, FlowNode};
}

/// One durable primitive observed while extracting a workflow shape.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum FlowNode {
    /// Checkpointed step.
    Step {
        step_id: String,
        has_compensation: bool,
    },
    /// Durable sleep.
    Sleep {
        duration_ms: u64,
        #[serde(skip_serializing_if = "Option::is_none")]
        step_id: Option<String>,
    },
    /// Suspension until an external signal arrives.
    WaitForSignal {
        signal_id: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        timeout_ms: Option<u64>,
        #[serde(skip_serializing_if = "Option::is_none")]
        step_id: Option<String>,
    },
    /// Durable event emission.
    Emit {
        event_id: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        step_id: Option<String>,
    },
    /// Branching construct; lists every declared branch.
    Switch {
        step_id: String,
        branch_ids: Vec<String>,
        has_default: bool,
    },
    /// Free-form annotation left by the workflow author.
    Note { message: String },
}

impl FlowNode {
    /// Get the node kind as a string.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Step { .. } => "step",
            Self::Sleep { .. } => "sleep",
            Self::WaitForSignal { .. } => "waitForSignal",
            Self::Emit { .. } => "emit",
            Self::Switch { .. } => "switch",
            Self::Note { .. } => "note",
        }
    }

    /// Step id the node is checkpointed under, if any.
    #[must_use]
    pub fn step_id(&self) -> Option<&str> {
        match self {
            Self::Step { step_id, .. } | Self::Switch { step_id, .. } => Some(step_id),
            Self::Sleep { step_id, .. }
            | Self::WaitForSignal { step_id, .. }
            | Self::Emit { step_id, .. } => step_id.as_deref(),
            Self::Note { .. } => None,
        }
    }
}

/// Ordered list of the primitives a durable workflow would perform.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct DurableFlowShape {
    pub nodes: Vec<FlowNode>,
}

impl DurableFlowShape {
    /// Ids of every step-like node, in call order.
    #[must_use]
    pub fn step_ids(&self) -> Vec<&str> {
        self.nodes.iter().filter_map(FlowNode::step_id).collect()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}
