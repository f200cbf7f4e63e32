//! Interned data model of a registered application graph.
//!
//! Every element is addressed by its string id. Relations between elements
//! are stored as id lists only; resolving them is the introspector's job.

pub mod diagnostics;
pub mod elements;
pub mod refs;
pub mod tags;

pub use diagnostics::{Diagnostic, Severity};
pub use elements::{
    AsyncContext, Element, ElementBase, ErrorDef, Event, ExportsMode, GlobalMiddleware, Hook,
    Isolation, Middleware, Resource, Tag, Task, WorkflowBody,
};
pub use refs::{ElementRef, HasDependencies, TaskLike};
pub use tags::{MiddlewareRef, TagRef, TagUsage};

use serde::{Deserialize, Serialize};

/// Kind of a registered element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NodeKind {
    Task,
    Hook,
    Resource,
    Middleware,
    Event,
    Tag,
    Error,
    AsyncContext,
}

impl NodeKind {
    /// Order in which a bare id is resolved through the generic accessor.
    pub const RESOLUTION_ORDER: [NodeKind; 8] = [
        NodeKind::Task,
        NodeKind::Hook,
        NodeKind::Resource,
        NodeKind::Middleware,
        NodeKind::Event,
        NodeKind::Tag,
        NodeKind::Error,
        NodeKind::AsyncContext,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Task => "task",
            Self::Hook => "hook",
            Self::Resource => "resource",
            Self::Middleware => "middleware",
            Self::Event => "event",
            Self::Tag => "tag",
            Self::Error => "error",
            Self::AsyncContext => "asyncContext",
        }
    }
}

impl std::fmt::Display for NodeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Descriptive metadata attached to any element.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Meta {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub tags: Vec<TagUsage>,
}

impl Meta {
    /// Per-usage entry for `tag_id`, if the element carries it.
    #[must_use]
    pub fn tag(&self, tag_id: &str) -> Option<&TagUsage> {
        self.tags.iter().find(|t| t.id == tag_id)
    }
}

/// Serialize an arbitrary JSON value for storage in the model.
pub(crate) fn to_json_string(value: &serde_json::Value) -> String {
    value.to_string()
}

/// Schemas may arrive pre-serialized; those are normalized, not re-quoted.
pub(crate) fn to_schema_string(value: &serde_json::Value) -> String {
    crate::schema::canonical_schema_string(value)
}
