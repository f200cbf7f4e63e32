//! Element shapes of the interned model.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use durable_lens::DurableWorkflow;
use serde::{Deserialize, Serialize};

use super::{Meta, NodeKind, TagUsage};

/// Fields shared by every element.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ElementBase {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<Meta>,
    /// Sanitized source label, safe to expose.
    pub file_path: Option<String>,
    /// Absolute source path, kept for coverage lookup only.
    #[serde(skip)]
    pub source_path: Option<PathBuf>,
    pub registered_by: Option<String>,
    pub overridden_by: Option<String>,
}

impl ElementBase {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn tags(&self) -> &[TagUsage] {
        self.meta.as_ref().map_or(&[], |m| m.tags.as_slice())
    }
}

/// Common read access to any element kind.
pub trait Element {
    const KIND: NodeKind;

    fn base(&self) -> &ElementBase;

    fn id(&self) -> &str {
        &self.base().id
    }

    fn tags(&self) -> &[TagUsage] {
        self.base().tags()
    }

    fn has_tag(&self, tag_id: &str) -> bool {
        self.tags().iter().any(|t| t.id == tag_id)
    }
}

macro_rules! impl_element {
    ($($ty:ty => $kind:expr),* $(,)?) => {
        $(
            impl Element for $ty {
                const KIND: NodeKind = $kind;

                fn base(&self) -> &ElementBase {
                    &self.base
                }
            }
        )*
    };
}

impl_element! {
    Task => NodeKind::Task,
    Hook => NodeKind::Hook,
    Resource => NodeKind::Resource,
    Middleware => NodeKind::Middleware,
    Event => NodeKind::Event,
    Tag => NodeKind::Tag,
    ErrorDef => NodeKind::Error,
    AsyncContext => NodeKind::AsyncContext,
}

/// Durable workflow body supplied in-process by the host.
#[derive(Clone)]
pub struct WorkflowBody(pub Arc<dyn DurableWorkflow>);

impl WorkflowBody {
    pub fn new(workflow: impl DurableWorkflow + 'static) -> Self {
        Self(Arc::new(workflow))
    }
}

impl fmt::Debug for WorkflowBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("WorkflowBody(..)")
    }
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    #[serde(flatten)]
    pub base: ElementBase,
    pub depends_on: Vec<String>,
    /// Explicit emits followed by event ids found in `depends_on`.
    pub emits: Vec<String>,
    pub middleware: Vec<String>,
    /// Per-usage middleware config, keyed by middleware id.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub middleware_config: BTreeMap<String, String>,
    pub throws: Vec<String>,
    pub input_schema: Option<String>,
    pub result_schema: Option<String>,
    pub is_durable: bool,
    #[serde(skip)]
    pub workflow: Option<WorkflowBody>,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Hook {
    #[serde(flatten)]
    pub base: ElementBase,
    pub event: String,
    pub hook_order: Option<i32>,
    pub depends_on: Vec<String>,
    pub emits: Vec<String>,
    pub middleware: Vec<String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub middleware_config: BTreeMap<String, String>,
    pub throws: Vec<String>,
}

/// How a resource's isolation exports were declared.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportsMode {
    /// No exports given; everything registered is visible.
    #[default]
    Unset,
    /// `exports: []`; nothing escapes.
    None,
    /// Non-empty export pattern list.
    List,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Isolation {
    pub deny: Vec<String>,
    pub only: Vec<String>,
    pub exports: Vec<String>,
    pub exports_mode: ExportsMode,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Resource {
    #[serde(flatten)]
    pub base: ElementBase,
    pub depends_on: Vec<String>,
    pub middleware: Vec<String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub middleware_config: BTreeMap<String, String>,
    pub registers: Vec<String>,
    pub overrides: Vec<String>,
    pub throws: Vec<String>,
    pub config: Option<String>,
    pub config_schema: Option<String>,
    pub context: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub isolation: Option<Isolation>,
}

/// Global scope of a middleware.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GlobalMiddleware {
    pub enabled: bool,
    pub tasks: bool,
    pub resources: bool,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Middleware {
    #[serde(flatten)]
    pub base: ElementBase,
    pub depends_on: Vec<String>,
    pub throws: Vec<String>,
    pub config: Option<String>,
    pub config_schema: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub global: Option<GlobalMiddleware>,
}

impl Middleware {
    /// Whether the middleware applies everywhere without explicit attachment.
    #[must_use]
    pub fn is_global(&self) -> bool {
        self.global
            .is_some_and(|g| g.enabled && (g.tasks || g.resources))
    }
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    #[serde(flatten)]
    pub base: ElementBase,
    pub payload_schema: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Tag {
    #[serde(flatten)]
    pub base: ElementBase,
    /// Default config, used when a usage carries none.
    pub config: Option<String>,
    pub config_schema: Option<String>,
}

/// Application-defined error.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorDef {
    #[serde(flatten)]
    pub base: ElementBase,
    pub data_schema: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AsyncContext {
    #[serde(flatten)]
    pub base: ElementBase,
    pub serialize: Option<String>,
    pub parse: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_task_serializes_flat_camel_case() {
        let task = Task {
            base: ElementBase {
                source_path: Some(PathBuf::from("/secret/abs/path.rs")),
                file_path: Some("workspace:src/path.rs".to_string()),
                ..ElementBase::new("app.tasks.run")
            },
            depends_on: vec!["app.db".to_string()],
            ..Task::default()
        };

        let value = serde_json::to_value(&task).unwrap();
        assert_eq!(value["id"], json!("app.tasks.run"));
        assert_eq!(value["filePath"], json!("workspace:src/path.rs"));
        assert_eq!(value["dependsOn"], json!(["app.db"]));
        assert_eq!(value["isDurable"], json!(false));
        assert!(value.get("sourcePath").is_none());
        assert!(value.get("workflow").is_none());
        assert!(value.get("middlewareConfig").is_none());
    }

    #[test]
    fn test_element_trait_reads_tags() {
        let event = Event {
            base: ElementBase {
                meta: Some(Meta {
                    tags: vec![TagUsage {
                        id: "app.tags.audit".to_string(),
                        config: None,
                    }],
                    ..Meta::default()
                }),
                ..ElementBase::new("app.events.saved")
            },
            payload_schema: None,
        };
        assert_eq!(<Event as Element>::KIND, NodeKind::Event);
        assert!(event.has_tag("app.tags.audit"));
        assert!(!event.has_tag("app.tags.other"));
    }

    #[test]
    fn test_global_middleware_needs_scope() {
        let mut mw = Middleware {
            global: Some(GlobalMiddleware {
                enabled: true,
                tasks: false,
                resources: false,
            }),
            ..Middleware::default()
        };
        assert!(!mw.is_global());
        mw.global = Some(GlobalMiddleware {
            enabled: true,
            tasks: true,
            resources: false,
        });
        assert!(mw.is_global());
    }
}
