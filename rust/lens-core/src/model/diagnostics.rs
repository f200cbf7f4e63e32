//! Structural diagnostics.
//!
//! Collected while building the snapshot and its indexes; never thrown.

use serde::Serialize;

use super::NodeKind;

pub const MALFORMED_ELEMENT: &str = "MALFORMED_ELEMENT";
pub const DUPLICATE_ID: &str = "DUPLICATE_ID";
pub const MISSING_FILE: &str = "MISSING_FILE";
pub const DANGLING_DEPENDENCY: &str = "DANGLING_DEPENDENCY";
pub const ORPHAN_EVENT: &str = "ORPHAN_EVENT";
pub const UNUSED_MIDDLEWARE: &str = "UNUSED_MIDDLEWARE";
pub const OVERRIDE_CONFLICT: &str = "OVERRIDE_CONFLICT";
pub const ISOLATION_VIOLATION: &str = "ISOLATION_VIOLATION";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Diagnostic {
    pub severity: Severity,
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub node_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub node_kind: Option<NodeKind>,
}

impl Diagnostic {
    pub fn new(severity: Severity, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            severity,
            code: code.into(),
            message: message.into(),
            node_id: None,
            node_kind: None,
        }
    }

    pub fn info(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(Severity::Info, code, message)
    }

    pub fn warning(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(Severity::Warning, code, message)
    }

    pub fn error(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(Severity::Error, code, message)
    }

    #[must_use]
    pub fn with_node(mut self, id: impl Into<String>, kind: NodeKind) -> Self {
        self.node_id = Some(id.into());
        self.node_kind = Some(kind);
        self
    }

    /// Like [`with_node`](Self::with_node) for an element whose id may be missing.
    #[must_use]
    pub fn with_kind(mut self, kind: NodeKind) -> Self {
        self.node_kind = Some(kind);
        self
    }
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let severity = match self.severity {
            Severity::Info => "info",
            Severity::Warning => "warning",
            Severity::Error => "error",
        };
        write!(f, "[{severity}] {}: {}", self.code, self.message)?;
        if let Some(id) = &self.node_id {
            write!(f, " ({id})")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_diagnostic_display_and_json() {
        let diag = Diagnostic::warning(DANGLING_DEPENDENCY, "depends on unknown 'app.x'")
            .with_node("app.tasks.a", NodeKind::Task);
        assert_eq!(
            diag.to_string(),
            "[warning] DANGLING_DEPENDENCY: depends on unknown 'app.x' (app.tasks.a)"
        );
        assert_eq!(
            serde_json::to_value(&diag).unwrap(),
            json!({
                "severity": "warning",
                "code": "DANGLING_DEPENDENCY",
                "message": "depends on unknown 'app.x'",
                "nodeId": "app.tasks.a",
                "nodeKind": "TASK"
            })
        );
    }

    #[test]
    fn test_kind_only_diagnostic() {
        let diag = Diagnostic::error(MALFORMED_ELEMENT, "missing id").with_kind(NodeKind::Hook);
        assert_eq!(diag.node_id, None);
        assert_eq!(diag.node_kind, Some(NodeKind::Hook));
        assert!(Severity::Error > Severity::Warning);
    }
}
