//! Isolation boundaries: which registered children a resource exposes.

use super::Introspector;
use crate::model::{ExportsMode, Isolation};

/// Match an id against an isolation pattern.
///
/// A trailing `*` makes the rest of the pattern a prefix; anything else is
/// an exact match.
#[must_use]
pub fn matches_pattern(pattern: &str, id: &str) -> bool {
    match pattern.strip_suffix('*') {
        Some(prefix) => id.starts_with(prefix),
        None => pattern == id,
    }
}

fn matches_any(patterns: &[String], id: &str) -> bool {
    patterns.iter().any(|p| matches_pattern(p, id))
}

/// Children of `registers` visible outside the boundary, in declared order.
#[must_use]
pub fn exposed<'a>(registers: &'a [String], isolation: Option<&Isolation>) -> Vec<&'a str> {
    let Some(isolation) = isolation else {
        return registers.iter().map(String::as_str).collect();
    };

    registers
        .iter()
        .filter(|id| match isolation.exports_mode {
            ExportsMode::None => false,
            ExportsMode::Unset => true,
            ExportsMode::List => matches_any(&isolation.exports, id),
        })
        .filter(|id| !matches_any(&isolation.deny, id))
        .map(String::as_str)
        .collect()
}

/// Why a dependency crosses an isolation rule, if it does.
pub(crate) fn violation(isolation: &Isolation, dependency: &str) -> Option<&'static str> {
    if matches_any(&isolation.deny, dependency) {
        Some("denied")
    } else if !isolation.only.is_empty() && !matches_any(&isolation.only, dependency) {
        Some("not in the allowed list")
    } else {
        None
    }
}

impl Introspector {
    /// Ids a resource exposes across its isolation boundary.
    ///
    /// Unknown resources expose nothing; resources without isolation expose
    /// everything they register.
    #[must_use]
    pub fn exposed_children(&self, resource_id: &str) -> Vec<&str> {
        self.get_resource(resource_id)
            .map(|r| exposed(&r.registers, r.isolation.as_ref()))
            .unwrap_or_default()
    }

    /// Whether `child_id` is visible outside `resource_id`.
    #[must_use]
    pub fn is_exposed(&self, resource_id: &str, child_id: &str) -> bool {
        self.exposed_children(resource_id).contains(&child_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn isolation(exports: Option<&[&str]>, deny: &[&str]) -> Isolation {
        let exports_mode = match exports {
            None => ExportsMode::Unset,
            Some([]) => ExportsMode::None,
            Some(_) => ExportsMode::List,
        };
        Isolation {
            deny: ids(deny),
            only: Vec::new(),
            exports: exports.map(ids).unwrap_or_default(),
            exports_mode,
        }
    }

    #[test]
    fn test_exports_then_deny() {
        let registers = ids(&["a.x", "a.y", "b.z"]);
        let iso = isolation(Some(&["a.*"]), &["a.y"]);
        assert_eq!(exposed(&registers, Some(&iso)), vec!["a.x"]);
    }

    #[test]
    fn test_exports_none_hides_everything() {
        let registers = ids(&["a.x", "b.z"]);
        let iso = isolation(Some(&[]), &[]);
        assert!(exposed(&registers, Some(&iso)).is_empty());
    }

    #[test]
    fn test_unset_exports_everything_minus_deny() {
        let registers = ids(&["a.x", "a.y", "b.z"]);
        let iso = isolation(None, &["b.*"]);
        assert_eq!(exposed(&registers, Some(&iso)), vec!["a.x", "a.y"]);
        assert_eq!(exposed(&registers, None), vec!["a.x", "a.y", "b.z"]);
    }

    #[test]
    fn test_pattern_matching() {
        assert!(matches_pattern("app.foo.*", "app.foo.bar"));
        assert!(!matches_pattern("app.foo.*", "app.foobar"));
        assert!(matches_pattern("*", "anything"));
        assert!(matches_pattern("app.x", "app.x"));
        assert!(!matches_pattern("app.x", "app.x.y"));
    }

    #[test]
    fn test_violation_rules() {
        let iso = Isolation {
            deny: ids(&["app.secret.*"]),
            only: ids(&["app.public.*", "app.secret.key"]),
            ..Isolation::default()
        };
        assert_eq!(violation(&iso, "app.secret.key"), Some("denied"));
        assert_eq!(violation(&iso, "app.other"), Some("not in the allowed list"));
        assert_eq!(violation(&iso, "app.public.db"), None);
    }
}
