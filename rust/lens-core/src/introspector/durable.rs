//! Durable workflow detection and flow shape extraction.

use std::sync::Arc;

use durable_lens::{DurableFlowShape, FlowExtractor};
use serde::Serialize;
use serde_json::Value;

use super::Introspector;
use crate::logging::OpTimer;
use crate::model::{Diagnostic, Element, NodeKind, Resource, Task};

/// Canonical tag marking a resource as a durable workflow runtime.
pub const DURABLE_WORKFLOW_TAG: &str = "globals.tags.durableWorkflow";

/// Code reported for durable tasks that carry no workflow body.
pub const DURABLE_EXTRACTION_NO_BODY: &str = "DURABLE_EXTRACTION_NO_BODY";

/// Whether a resource is a durable workflow runtime.
#[must_use]
pub fn is_durable_resource(resource: &Resource) -> bool {
    resource.base.id.contains(".durable") || resource.has_tag(DURABLE_WORKFLOW_TAG)
}

/// Flow shape of one durable task, with any extraction diagnostics.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FlowShapeReport {
    pub task_id: String,
    /// Full or partial shape; `None` when nothing could be recorded.
    pub shape: Option<DurableFlowShape>,
    pub diagnostics: Vec<Diagnostic>,
    pub duration_ms: u64,
}

impl FlowShapeReport {
    /// Extraction finished without any diagnostic.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.shape.is_some() && self.diagnostics.is_empty()
    }
}

impl Introspector {
    /// True iff one of the task's resource dependencies is a durable runtime.
    #[must_use]
    pub fn is_durable_task(&self, task_id: &str) -> bool {
        self.durable_resource_for_task(task_id).is_some()
    }

    /// First durable resource in the task's `dependsOn`, left to right.
    #[must_use]
    pub fn durable_resource_for_task(&self, task_id: &str) -> Option<&Resource> {
        let task = self.get_task(task_id)?;
        task.depends_on
            .iter()
            .filter_map(|id| self.get_resource(id))
            .find(|r| is_durable_resource(r))
    }

    /// All durable tasks, in registration order.
    #[must_use]
    pub fn durable_tasks(&self) -> Vec<&Task> {
        self.tasks()
            .iter()
            .filter(|t| self.is_durable_task(&t.base.id))
            .collect()
    }

    /// Static flow shape of a durable task.
    ///
    /// Returns `None` for unknown or non-durable tasks. Results are cached
    /// for the lifetime of this introspector. The workflow body runs against
    /// a recording context and never performs real side effects.
    pub async fn durable_flow_shape(
        &self,
        task_id: &str,
        extractor: &FlowExtractor,
    ) -> Option<FlowShapeReport> {
        if !self.is_durable_task(task_id) {
            return None;
        }
        if let Some(cached) = self.flow_cache.lock().get(task_id) {
            return Some(cached.clone());
        }

        let task = self.get_task(task_id)?;
        let report = match &task.workflow {
            None => FlowShapeReport {
                task_id: task_id.to_string(),
                shape: None,
                diagnostics: vec![
                    Diagnostic::warning(
                        DURABLE_EXTRACTION_NO_BODY,
                        "durable task has no workflow body to extract",
                    )
                    .with_node(task_id, NodeKind::Task),
                ],
                duration_ms: 0,
            },
            Some(body) => {
                let timer = OpTimer::new("introspector", "durable_extraction");
                let extraction = extractor
                    .extract(Arc::clone(&body.0), Value::Null)
                    .await;
                let diagnostics = extraction
                    .failure
                    .iter()
                    .map(|failure| {
                        tracing::warn!(task_id = %task_id, code = failure.code(), "Durable extraction incomplete: {failure}");
                        Diagnostic::warning(failure.code(), failure.to_string())
                            .with_node(task_id, NodeKind::Task)
                    })
                    .collect();
                timer.finish();
                FlowShapeReport {
                    task_id: task_id.to_string(),
                    shape: extraction.shape,
                    diagnostics,
                    duration_ms: extraction.duration_ms,
                }
            }
        };

        self.flow_cache
            .lock()
            .insert(task_id.to_string(), report.clone());
        Some(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ElementBase, Meta, TagUsage};

    #[test]
    fn test_durable_resource_predicate() {
        let by_id = Resource {
            base: ElementBase::new("app.durable.runtime"),
            ..Resource::default()
        };
        let by_tag = Resource {
            base: ElementBase {
                meta: Some(Meta {
                    tags: vec![TagUsage {
                        id: DURABLE_WORKFLOW_TAG.to_string(),
                        config: None,
                    }],
                    ..Meta::default()
                }),
                ..ElementBase::new("app.engine")
            },
            ..Resource::default()
        };
        let plain = Resource {
            base: ElementBase::new("app.db"),
            ..Resource::default()
        };
        assert!(is_durable_resource(&by_id));
        assert!(is_durable_resource(&by_tag));
        assert!(!is_durable_resource(&plain));
    }
}
