//! Tunnel metadata read from live resource values.
//!
//! Tunnel routing tables only exist after resource initialization, so this
//! is the one part of the introspector that reads runtime state. Results are
//! held per introspector and are not carried across rebuilds.

use std::collections::HashMap;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::Introspector;
use crate::logging::OpTimer;
use crate::model::{Element, Resource};

/// Canonical tunnel tag id.
pub const TUNNEL_TAG: &str = "globals.tags.tunnel";

const LEGACY_TUNNEL_PATTERN: &str = r"(?i)\btunnel\b";
const LEGACY_EXCLUDED: &str = "tunnelpolicy";

/// Source of live, initialized resource values.
pub trait TunnelRuntime: Send + Sync {
    /// Resolved value of a resource, if it has been initialized.
    fn resolved_value(&self, resource_id: &str) -> Option<Value>;
}

impl TunnelRuntime for HashMap<String, Value> {
    fn resolved_value(&self, resource_id: &str) -> Option<Value> {
        self.get(resource_id).cloned()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TunnelMode {
    Client,
    Server,
    Both,
    #[default]
    None,
}

/// Routing declared by a tunnel resource.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TunnelInfo {
    pub mode: TunnelMode,
    pub transport: Option<String>,
    pub endpoint: Option<String>,
    /// Task ids routed through the tunnel.
    pub tasks: Vec<String>,
    /// Event ids routed through the tunnel.
    pub events: Vec<String>,
}

impl TunnelInfo {
    /// Read tunnel routing from a resolved resource value.
    ///
    /// `tasks`/`events` entries may be ids or objects with an `id`.
    #[must_use]
    pub fn from_value(value: &Value) -> Option<Self> {
        let object = value.as_object()?;
        let mode = object
            .get("mode")
            .and_then(|m| serde_json::from_value(m.clone()).ok())
            .unwrap_or_default();
        let text = |key: &str| object.get(key).and_then(Value::as_str).map(str::to_string);

        Some(Self {
            mode,
            transport: text("transport"),
            endpoint: text("endpoint").or_else(|| text("url")),
            tasks: ids(object.get("tasks")),
            events: ids(object.get("events")),
        })
    }
}

fn ids(value: Option<&Value>) -> Vec<String> {
    let Some(Value::Array(items)) = value else {
        return Vec::new();
    };
    items
        .iter()
        .filter_map(|item| match item {
            Value::String(id) => Some(id.clone()),
            Value::Object(o) => o.get("id").and_then(Value::as_str).map(str::to_string),
            _ => None,
        })
        .collect()
}

/// Matches tunnel tag ids, optionally with the legacy heuristic.
#[derive(Debug, Clone)]
pub(crate) struct TunnelTagMatcher {
    legacy: Option<Regex>,
}

impl TunnelTagMatcher {
    pub fn new(legacy_matching: bool) -> Self {
        let legacy = if legacy_matching {
            match Regex::new(LEGACY_TUNNEL_PATTERN) {
                Ok(re) => Some(re),
                Err(e) => {
                    tracing::warn!(error = %e, "Legacy tunnel tag matching disabled");
                    None
                }
            }
        } else {
            None
        };
        Self { legacy }
    }

    pub fn is_tunnel_tag(&self, tag_id: &str) -> bool {
        if tag_id == TUNNEL_TAG {
            return true;
        }
        self.legacy.as_ref().is_some_and(|re| {
            re.is_match(tag_id) && !tag_id.to_lowercase().contains(LEGACY_EXCLUDED)
        })
    }
}

impl Introspector {
    /// Resources carrying a tunnel tag, in registration order.
    #[must_use]
    pub fn tunnel_resources(&self) -> Vec<&Resource> {
        self.resources()
            .iter()
            .filter(|r| r.tags().iter().any(|t| self.tunnel_tags.is_tunnel_tag(&t.id)))
            .collect()
    }

    /// Re-derive tunnel info for every tunnel resource from its live value.
    ///
    /// Idempotent: the previous result is replaced wholesale. Resources
    /// without an initialized value get no entry. Returns the entry count.
    pub fn populate_tunnel_info(&self, runtime: &dyn TunnelRuntime) -> usize {
        let timer = OpTimer::new("introspector", "populate_tunnels");
        let mut populated = HashMap::new();
        for resource in self.tunnel_resources() {
            let id = &resource.base.id;
            match runtime.resolved_value(id).as_ref().and_then(TunnelInfo::from_value) {
                Some(info) => {
                    populated.insert(id.clone(), info);
                }
                None => tracing::debug!(resource_id = %id, "Tunnel resource has no resolved value"),
            }
        }

        let count = populated.len();
        *self.tunnels.write() = populated;
        timer.finish_with_count("tunnels", count);
        count
    }

    /// Tunnel info of a resource, once populated.
    #[must_use]
    pub fn tunnel_info(&self, resource_id: &str) -> Option<TunnelInfo> {
        self.tunnels.read().get(resource_id).cloned()
    }
}
