//! Host-supplied registry, before validation and interning.
//!
//! Everything here is permissive: ids may be missing, tags and middleware
//! come in several shapes, schemas may be values or strings. The snapshot
//! builder narrows all of it.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use serde_json::Value;

use crate::error::{LensError, LensResult};
use crate::model::{GlobalMiddleware, MiddlewareRef, TagRef, WorkflowBody};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawMeta {
    pub title: Option<String>,
    pub description: Option<String>,
    pub tags: Vec<TagRef>,
}

/// Fields every raw element may carry.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawBase {
    pub id: Option<String>,
    pub meta: Option<RawMeta>,
    #[serde(alias = "filePath")]
    pub source_path: Option<PathBuf>,
    pub registered_by: Option<String>,
    pub overridden_by: Option<String>,
}

impl RawBase {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawTask {
    #[serde(flatten)]
    pub base: RawBase,
    pub depends_on: Vec<String>,
    pub emits: Vec<String>,
    pub middleware: Vec<MiddlewareRef>,
    pub throws: Vec<String>,
    pub input_schema: Option<Value>,
    pub result_schema: Option<Value>,
    #[serde(skip)]
    pub workflow: Option<WorkflowBody>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawHook {
    #[serde(flatten)]
    pub base: RawBase,
    pub event: Option<String>,
    pub hook_order: Option<i32>,
    pub depends_on: Vec<String>,
    pub emits: Vec<String>,
    pub middleware: Vec<MiddlewareRef>,
    pub throws: Vec<String>,
}

/// Isolation as declared; `exports: None` means it was never set.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawIsolation {
    pub deny: Vec<String>,
    pub only: Vec<String>,
    pub exports: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawResource {
    #[serde(flatten)]
    pub base: RawBase,
    pub depends_on: Vec<String>,
    pub middleware: Vec<MiddlewareRef>,
    pub registers: Vec<String>,
    pub overrides: Vec<String>,
    pub throws: Vec<String>,
    pub config: Option<Value>,
    pub config_schema: Option<Value>,
    pub context: Option<Value>,
    pub isolation: Option<RawIsolation>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawMiddleware {
    #[serde(flatten)]
    pub base: RawBase,
    pub depends_on: Vec<String>,
    pub throws: Vec<String>,
    pub config: Option<Value>,
    pub config_schema: Option<Value>,
    pub global: Option<GlobalMiddleware>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawEvent {
    #[serde(flatten)]
    pub base: RawBase,
    pub payload_schema: Option<Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawTag {
    #[serde(flatten)]
    pub base: RawBase,
    pub config: Option<Value>,
    pub config_schema: Option<Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawError {
    #[serde(flatten)]
    pub base: RawBase,
    pub data_schema: Option<Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawAsyncContext {
    #[serde(flatten)]
    pub base: RawBase,
    pub serialize: Option<String>,
    pub parse: Option<String>,
}

/// The registry as handed over by the host application.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawRegistry {
    pub tasks: Vec<RawTask>,
    pub hooks: Vec<RawHook>,
    pub resources: Vec<RawResource>,
    pub middleware: Vec<RawMiddleware>,
    pub events: Vec<RawEvent>,
    pub tags: Vec<RawTag>,
    pub errors: Vec<RawError>,
    pub async_contexts: Vec<RawAsyncContext>,
}

impl RawRegistry {
    /// Decode a JSON registry manifest.
    pub fn from_json(json: &str) -> LensResult<Self> {
        serde_json::from_str(json).map_err(|e| LensError::InvalidManifest(e.to_string()))
    }

    /// Read and decode a registry manifest file.
    pub fn load_manifest(path: &Path) -> LensResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| LensError::read(path, &e))?;
        Self::from_json(&contents)
    }

    /// Total number of raw elements across all kinds.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tasks.len()
            + self.hooks.len()
            + self.resources.len()
            + self.middleware.len()
            + self.events.len()
            + self.tags.len()
            + self.errors.len()
            + self.async_contexts.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn owned(ids: impl IntoIterator<Item = impl Into<String>>) -> Vec<String> {
    ids.into_iter().map(Into::into).collect()
}

impl RawTask {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            base: RawBase::new(id),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn depends_on(mut self, ids: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.depends_on = owned(ids);
        self
    }

    #[must_use]
    pub fn emits(mut self, ids: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.emits = owned(ids);
        self
    }

    #[must_use]
    pub fn middleware(mut self, refs: impl IntoIterator<Item = MiddlewareRef>) -> Self {
        self.middleware = refs.into_iter().collect();
        self
    }

    #[must_use]
    pub fn tags(mut self, tags: impl IntoIterator<Item = TagRef>) -> Self {
        self.base.meta.get_or_insert_with(RawMeta::default).tags = tags.into_iter().collect();
        self
    }

    #[must_use]
    pub fn throws(mut self, ids: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.throws = owned(ids);
        self
    }

    #[must_use]
    pub fn workflow(mut self, workflow: WorkflowBody) -> Self {
        self.workflow = Some(workflow);
        self
    }
}

impl RawHook {
    pub fn new(id: impl Into<String>, event: impl Into<String>) -> Self {
        Self {
            base: RawBase::new(id),
            event: Some(event.into()),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn order(mut self, order: i32) -> Self {
        self.hook_order = Some(order);
        self
    }

    #[must_use]
    pub fn depends_on(mut self, ids: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.depends_on = owned(ids);
        self
    }

    #[must_use]
    pub fn emits(mut self, ids: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.emits = owned(ids);
        self
    }
}

impl RawResource {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            base: RawBase::new(id),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn depends_on(mut self, ids: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.depends_on = owned(ids);
        self
    }

    #[must_use]
    pub fn registers(mut self, ids: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.registers = owned(ids);
        self
    }

    #[must_use]
    pub fn overrides(mut self, ids: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.overrides = owned(ids);
        self
    }

    #[must_use]
    pub fn middleware(mut self, refs: impl IntoIterator<Item = MiddlewareRef>) -> Self {
        self.middleware = refs.into_iter().collect();
        self
    }

    #[must_use]
    pub fn tags(mut self, tags: impl IntoIterator<Item = TagRef>) -> Self {
        self.base.meta.get_or_insert_with(RawMeta::default).tags = tags.into_iter().collect();
        self
    }

    #[must_use]
    pub fn isolation(mut self, isolation: RawIsolation) -> Self {
        self.isolation = Some(isolation);
        self
    }
}

impl RawEvent {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            base: RawBase::new(id),
            ..Self::default()
        }
    }
}

impl RawMiddleware {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            base: RawBase::new(id),
            ..Self::default()
        }
    }
}

impl RawTag {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            base: RawBase::new(id),
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manifest_decodes_camel_case() {
        let raw = RawRegistry::from_json(
            r#"{
                "tasks": [{
                    "id": "app.tasks.save",
                    "filePath": "/repo/src/save.ts",
                    "dependsOn": ["app.db"],
                    "middleware": ["app.mw.auth", {"id": "app.mw.retry", "config": {"n": 2}}],
                    "inputSchema": {"type": "object"}
                }],
                "hooks": [{"id": "app.hooks.h", "event": "app.events.saved", "hookOrder": -1}],
                "resources": [{"id": "app.db", "isolation": {"exports": []}}],
                "asyncContexts": [{"id": "app.ctx.request"}]
            }"#,
        )
        .unwrap();

        assert_eq!(raw.len(), 4);
        let task = &raw.tasks[0];
        assert_eq!(task.base.id.as_deref(), Some("app.tasks.save"));
        assert_eq!(task.base.source_path, Some(PathBuf::from("/repo/src/save.ts")));
        assert_eq!(task.middleware.len(), 2);
        assert_eq!(raw.hooks[0].hook_order, Some(-1));
        let isolation = raw.resources[0].isolation.as_ref().unwrap();
        assert_eq!(isolation.exports, Some(vec![]));
    }

    #[test]
    fn test_invalid_manifest() {
        let err = RawRegistry::from_json("{\"tasks\": 3}").unwrap_err();
        assert!(matches!(err, LensError::InvalidManifest(_)));
    }

    #[test]
    fn test_builders() {
        let task = RawTask::new("t")
            .depends_on(["r"])
            .emits(["e"])
            .tags([TagRef::from("x")]);
        assert_eq!(task.depends_on, vec!["r".to_string()]);
        assert_eq!(task.emits, vec!["e".to_string()]);
        assert_eq!(task.base.meta.unwrap().tags.len(), 1);

        let hook = RawHook::new("h", "e").order(3);
        assert_eq!(hook.event.as_deref(), Some("e"));
        assert_eq!(hook.hook_order, Some(3));
    }
}
