//! Tag and middleware references.
//!
//! Hosts attach tags as a bare id, as `{id, config}` or as
//! `{tag: {id}, config}`. All three are narrowed to [`TagUsage`] once, at
//! ingestion; nothing downstream sees the raw forms.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::to_json_string;

/// Canonical tag attachment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TagUsage {
    pub id: String,
    /// Per-usage config, serialized.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TagId {
    pub id: String,
}

/// Tag attachment as supplied by the host.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum TagRef {
    Id(String),
    Handle {
        id: String,
        #[serde(default)]
        config: Option<Value>,
    },
    Wrapped {
        tag: TagId,
        #[serde(default)]
        config: Option<Value>,
    },
}

impl TagRef {
    /// Narrow to the canonical form. Blank ids yield `None`.
    #[must_use]
    pub fn normalize(&self) -> Option<TagUsage> {
        let (id, config) = match self {
            Self::Id(id) => (id, None),
            Self::Handle { id, config } => (id, config.as_ref()),
            Self::Wrapped { tag, config } => (&tag.id, config.as_ref()),
        };
        if id.trim().is_empty() {
            return None;
        }
        Some(TagUsage {
            id: id.clone(),
            config: config.filter(|c| !c.is_null()).map(to_json_string),
        })
    }
}

impl From<&str> for TagRef {
    fn from(id: &str) -> Self {
        Self::Id(id.to_string())
    }
}

/// Middleware attachment as supplied by the host.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum MiddlewareRef {
    Id(String),
    Configured {
        id: String,
        #[serde(default)]
        config: Option<Value>,
    },
}

impl MiddlewareRef {
    #[must_use]
    pub fn id(&self) -> &str {
        match self {
            Self::Id(id) | Self::Configured { id, .. } => id,
        }
    }

    /// Per-usage config, serialized.
    #[must_use]
    pub fn config(&self) -> Option<String> {
        match self {
            Self::Id(_) => None,
            Self::Configured { config, .. } => config
                .as_ref()
                .filter(|c| !c.is_null())
                .map(to_json_string),
        }
    }
}

impl From<&str> for MiddlewareRef {
    fn from(id: &str) -> Self {
        Self::Id(id.to_string())
    }
}
