//! Redaction of absolute filesystem paths.
//!
//! Paths under a known root become `"<root>:<relative>"`. Anything else is
//! elided to its last two segments so no unrelated directory structure leaks.

use std::path::{Component, Path, PathBuf};

use crate::config::{NamedRoot, PathsConfig};

/// Names of the roots added by `paths.include_defaults`.
pub const DEFAULT_ROOT_NAMES: [&str; 3] = ["workspace", "node_modules", "home"];

const ELLIPSIS: &str = "\u{2026}";

/// Maps absolute paths to root-relative labels.
///
/// Roots are tried most specific first (longest path), so a
/// `node_modules` root inside the workspace wins over the workspace itself.
#[derive(Debug, Clone, Default)]
pub struct PathSanitizer {
    roots: Vec<NamedRoot>,
}

impl PathSanitizer {
    pub fn new(roots: impl IntoIterator<Item = NamedRoot>) -> Self {
        let mut roots: Vec<_> = roots
            .into_iter()
            .map(|r| NamedRoot {
                path: normalize(&r.path),
                ..r
            })
            .collect();
        roots.sort_by_key(|r| std::cmp::Reverse(r.path.as_os_str().len()));
        Self { roots }
    }

    /// Default roots (when enabled) plus the configured ones.
    pub fn from_config(config: &PathsConfig) -> Self {
        let mut roots = Vec::new();
        if config.include_defaults {
            if let Ok(cwd) = std::env::current_dir() {
                roots.push(NamedRoot::new("node_modules", cwd.join("node_modules")));
                roots.push(NamedRoot::new("workspace", cwd));
            }
            if let Some(home) = std::env::var_os("HOME").filter(|h| !h.is_empty()) {
                roots.push(NamedRoot::new("home", home));
            }
        }
        roots.extend(config.roots.iter().cloned());
        tracing::debug!(roots = roots.len(), "Path sanitizer configured");
        Self::new(roots)
    }

    /// Roots in match order.
    #[must_use]
    pub fn roots(&self) -> &[NamedRoot] {
        &self.roots
    }

    /// `..` is resolved before matching, so a path can never be labelled
    /// as inside a root it climbs out of.
    #[must_use]
    pub fn sanitize(&self, path: &Path) -> String {
        let path = normalize(path);
        if !path.is_absolute() {
            return join_segments(&path);
        }

        for root in &self.roots {
            if let Ok(relative) = path.strip_prefix(&root.path) {
                return format!("{}:{}", root.name, join_segments(relative));
            }
        }

        elide(&path)
    }
}

/// Lexical normalization: drops `.`, and `..` pops the previous segment.
/// `..` at the filesystem root stays at the root; leading `..` of a relative
/// path is kept.
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match out.components().next_back() {
                Some(Component::Normal(_)) => {
                    out.pop();
                }
                Some(Component::RootDir | Component::Prefix(_)) => {}
                _ => out.push(".."),
            },
            other => out.push(other.as_os_str()),
        }
    }
    out
}

fn segments(path: &Path) -> impl Iterator<Item = std::borrow::Cow<'_, str>> {
    path.components().filter_map(|c| match c {
        Component::Normal(s) => Some(s.to_string_lossy()),
        Component::ParentDir => Some("..".into()),
        _ => None,
    })
}

fn join_segments(path: &Path) -> String {
    segments(path).collect::<Vec<_>>().join("/")
}

fn elide(path: &Path) -> String {
    let parts: Vec<_> = segments(path).collect();
    let tail = &parts[parts.len().saturating_sub(2)..];
    if tail.is_empty() {
        return ELLIPSIS.to_string();
    }
    format!("{ELLIPSIS}/{}", tail.join("/"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn sanitizer(roots: &[(&str, &str)]) -> PathSanitizer {
        PathSanitizer::new(roots.iter().map(|(n, p)| NamedRoot::new(*n, *p)))
    }

    #[test]
    fn test_root_relative_label() {
        let s = sanitizer(&[("workspace", "/repo")]);
        assert_eq!(s.sanitize(Path::new("/repo/src/foo.ts")), "workspace:src/foo.ts");
    }

    #[test]
    fn test_unmatched_path_is_elided() {
        let s = sanitizer(&[("workspace", "/repo")]);
        assert_eq!(
            s.sanitize(Path::new("/var/lib/other/deep/file.txt")),
            "\u{2026}/deep/file.txt"
        );
        assert_eq!(s.sanitize(Path::new("/file.txt")), "\u{2026}/file.txt");
    }

    #[test]
    fn test_most_specific_root_wins() {
        let s = sanitizer(&[
            ("workspace", "/repo"),
            ("node_modules", "/repo/node_modules"),
        ]);
        assert_eq!(
            s.sanitize(Path::new("/repo/node_modules/lib/index.js")),
            "node_modules:lib/index.js"
        );
        assert_eq!(s.roots()[0].name, "node_modules");
    }

    #[test]
    fn test_prefix_must_end_on_component_boundary() {
        let s = sanitizer(&[("workspace", "/repo")]);
        assert_eq!(
            s.sanitize(Path::new("/repository/src/main.rs")),
            "\u{2026}/src/main.rs"
        );
    }

    #[test]
    fn test_parent_segments_resolve_before_matching() {
        let s = sanitizer(&[("workspace", "/repo")]);
        assert_eq!(s.sanitize(Path::new("/repo/../etc/passwd")), "\u{2026}/etc/passwd");
        assert_eq!(s.sanitize(Path::new("/repo/a/../src/x.ts")), "workspace:src/x.ts");
        assert_eq!(s.sanitize(Path::new("/repo/./src/../../../x.ts")), "\u{2026}/x.ts");
    }

    #[test]
    fn test_root_with_parent_segments_is_normalized() {
        let s = sanitizer(&[("workspace", "/srv/app/../repo")]);
        assert_eq!(s.sanitize(Path::new("/srv/repo/lib.rs")), "workspace:lib.rs");
    }

    #[test]
    fn test_relative_path_passes_through() {
        let s = sanitizer(&[]);
        assert_eq!(s.sanitize(Path::new("src/./lib.rs")), "src/lib.rs");
        assert_eq!(s.sanitize(Path::new("../shared/a/../b.rs")), "../shared/b.rs");
    }

    #[test]
    fn test_from_config_adds_defaults() {
        let config = PathsConfig {
            include_defaults: true,
            roots: vec![NamedRoot::new("vendor", "/opt/vendor")],
        };
        let s = PathSanitizer::from_config(&config);
        let names: Vec<_> = s.roots().iter().map(|r| r.name.as_str()).collect();
        assert!(names.contains(&"workspace"));
        assert!(names.contains(&"node_modules"));
        assert!(names.contains(&"vendor"));

        let cwd = std::env::current_dir().unwrap();
        let inside: PathBuf = cwd.join("src").join("lib.rs");
        assert_eq!(s.sanitize(&inside), "workspace:src/lib.rs");
    }
}
