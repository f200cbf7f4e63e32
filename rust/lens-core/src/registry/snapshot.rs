//! One-shot conversion of a raw registry into the interned model.

use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};

use crate::config::IntrospectionConfig;
use crate::error::LensResult;
use crate::introspector::durable::is_durable_resource;
use crate::logging::OpTimer;
use crate::model::diagnostics::{DUPLICATE_ID, MALFORMED_ELEMENT, MISSING_FILE};
use crate::model::{
    AsyncContext, Diagnostic, ElementBase, ErrorDef, Event, ExportsMode, Hook, Isolation, Meta,
    Middleware, MiddlewareRef, NodeKind, Resource, Tag, TagRef, Task, to_json_string,
    to_schema_string,
};
use crate::paths::PathSanitizer;

use super::raw::{
    RawAsyncContext, RawBase, RawError, RawEvent, RawHook, RawIsolation, RawMeta, RawMiddleware,
    RawRegistry, RawResource, RawTag, RawTask,
};

/// Every registered element at one instant, plus ingestion diagnostics.
///
/// Element order within a kind is registration order.
#[derive(Debug, Clone, Default)]
pub struct RegistrySnapshot {
    pub tasks: Vec<Task>,
    pub hooks: Vec<Hook>,
    pub resources: Vec<Resource>,
    pub middleware: Vec<Middleware>,
    pub events: Vec<Event>,
    pub tags: Vec<Tag>,
    pub errors: Vec<ErrorDef>,
    pub async_contexts: Vec<AsyncContext>,
    pub diagnostics: Vec<Diagnostic>,
}

impl RegistrySnapshot {
    /// Build a snapshot. Malformed input yields diagnostics, never an error.
    pub fn build(raw: RawRegistry, sanitizer: &PathSanitizer, config: &IntrospectionConfig) -> Self {
        let timer = OpTimer::new("snapshot", "build");
        let mut builder = Builder {
            sanitizer,
            check_source_files: config.check_source_files,
            diagnostics: Vec::new(),
        };

        let resources = builder.resources(raw.resources);
        let middleware = builder.middleware(raw.middleware);
        let events = builder.events(raw.events);
        let tags = builder.tags(raw.tags);
        let errors = builder.errors(raw.errors);
        let async_contexts = builder.async_contexts(raw.async_contexts);

        let event_ids: HashSet<String> = events.iter().map(|e| e.base.id.clone()).collect();
        let durable_ids: HashSet<String> = resources
            .iter()
            .filter(|r| is_durable_resource(r))
            .map(|r| r.base.id.clone())
            .collect();

        let tasks = builder.tasks(raw.tasks, &event_ids, &durable_ids);
        let hooks = builder.hooks(raw.hooks, &event_ids);

        let snapshot = Self {
            tasks,
            hooks,
            resources,
            middleware,
            events,
            tags,
            errors,
            async_contexts,
            diagnostics: builder.diagnostics,
        };
        tracing::debug!(elements = snapshot.len(), "Registry snapshot built");
        timer.finish_with_count("diagnostics", snapshot.diagnostics.len());
        snapshot
    }

    /// Decode a JSON manifest and build a snapshot from it.
    pub fn from_json(
        json: &str,
        sanitizer: &PathSanitizer,
        config: &IntrospectionConfig,
    ) -> LensResult<Self> {
        Ok(Self::build(RawRegistry::from_json(json)?, sanitizer, config))
    }

    /// Read a JSON manifest from disk and build a snapshot from it.
    pub fn load_manifest(
        path: &Path,
        sanitizer: &PathSanitizer,
        config: &IntrospectionConfig,
    ) -> LensResult<Self> {
        Ok(Self::build(RawRegistry::load_manifest(path)?, sanitizer, config))
    }

    /// Number of interned elements across all kinds.
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

struct Builder<'a> {
    sanitizer: &'a PathSanitizer,
    check_source_files: bool,
    diagnostics: Vec<Diagnostic>,
}

impl Builder<'_> {
    fn base(&mut self, raw: RawBase, kind: NodeKind, seen: &mut HashSet<String>) -> Option<ElementBase> {
        let Some(id) = raw.id.filter(|id| !id.trim().is_empty()) else {
            self.diagnostics.push(
                Diagnostic::error(MALFORMED_ELEMENT, format!("{kind} without an id was dropped"))
                    .with_kind(kind),
            );
            return None;
        };

        if !seen.insert(id.clone()) {
            tracing::warn!(id = %id, kind = %kind, "Duplicate element id");
            self.diagnostics.push(
                Diagnostic::warning(
                    DUPLICATE_ID,
                    format!("{kind} '{id}' is registered more than once; the first registration is kept"),
                )
                .with_node(&id, kind),
            );
            return None;
        }

        let meta = raw.meta.map(|m| self.meta(m, &id, kind));
        let (file_path, source_path) = match raw.source_path {
            Some(path) => self.source(path, &id, kind),
            None => (None, None),
        };

        Some(ElementBase {
            id,
            meta,
            file_path,
            source_path,
            registered_by: raw.registered_by,
            overridden_by: raw.overridden_by,
        })
    }

    fn meta(&mut self, raw: RawMeta, id: &str, kind: NodeKind) -> Meta {
        let mut tags = Vec::with_capacity(raw.tags.len());
        for tag in &raw.tags {
            match TagRef::normalize(tag) {
                Some(usage) => tags.push(usage),
                None => self.diagnostics.push(
                    Diagnostic::warning(MALFORMED_ELEMENT, "tag reference without an id was dropped")
                        .with_node(id, kind),
                ),
            }
        }
        Meta {
            title: raw.title,
            description: raw.description,
            tags,
        }
    }

    fn source(&mut self, path: PathBuf, id: &str, kind: NodeKind) -> (Option<String>, Option<PathBuf>) {
        let label = self.sanitizer.sanitize(&path);
        if !path.is_absolute() {
            return (Some(label), None);
        }
        if self.check_source_files && !path.exists() {
            self.diagnostics.push(
                Diagnostic::warning(MISSING_FILE, format!("source file {label} does not exist"))
                    .with_node(id, kind),
            );
        }
        (Some(label), Some(path))
    }

    fn tasks(
        &mut self,
        raw: Vec<RawTask>,
        event_ids: &HashSet<String>,
        durable_ids: &HashSet<String>,
    ) -> Vec<Task> {
        let mut seen = HashSet::new();
        let mut tasks = Vec::with_capacity(raw.len());
        for task in raw {
            let Some(base) = self.base(task.base, NodeKind::Task, &mut seen) else {
                continue;
            };
            let (middleware, middleware_config) = split_middleware(task.middleware);
            let emits = derive_emits(task.emits, &task.depends_on, event_ids);
            let is_durable = task.depends_on.iter().any(|d| durable_ids.contains(d));
            tasks.push(Task {
                base,
                emits,
                middleware,
                middleware_config,
                throws: task.throws,
                input_schema: task.input_schema.as_ref().map(to_schema_string),
                result_schema: task.result_schema.as_ref().map(to_schema_string),
                is_durable,
                workflow: task.workflow,
                depends_on: task.depends_on,
            });
        }
        tasks
    }

    fn hooks(&mut self, raw: Vec<RawHook>, event_ids: &HashSet<String>) -> Vec<Hook> {
        let mut seen = HashSet::new();
        let mut hooks = Vec::with_capacity(raw.len());
        for hook in raw {
            let Some(event) = hook.event.filter(|e| !e.trim().is_empty()) else {
                let mut diag = Diagnostic::error(
                    MALFORMED_ELEMENT,
                    "hook without an event was dropped",
                );
                diag = match hook.base.id {
                    Some(id) => diag.with_node(id, NodeKind::Hook),
                    None => diag.with_kind(NodeKind::Hook),
                };
                self.diagnostics.push(diag);
                continue;
            };
            let Some(base) = self.base(hook.base, NodeKind::Hook, &mut seen) else {
                continue;
            };
            let (middleware, middleware_config) = split_middleware(hook.middleware);
            let emits = derive_emits(hook.emits, &hook.depends_on, event_ids);
            hooks.push(Hook {
                base,
                event,
                hook_order: hook.hook_order,
                emits,
                middleware,
                middleware_config,
                throws: hook.throws,
                depends_on: hook.depends_on,
            });
        }
        hooks
    }

    fn resources(&mut self, raw: Vec<RawResource>) -> Vec<Resource> {
        let mut seen = HashSet::new();
        let mut resources = Vec::with_capacity(raw.len());
        for resource in raw {
            let Some(base) = self.base(resource.base, NodeKind::Resource, &mut seen) else {
                continue;
            };
            let (middleware, middleware_config) = split_middleware(resource.middleware);
            resources.push(Resource {
                base,
                depends_on: resource.depends_on,
                middleware,
                middleware_config,
                registers: resource.registers,
                overrides: resource.overrides,
                throws: resource.throws,
                config: resource.config.as_ref().map(to_schema_string),
                config_schema: resource.config_schema.as_ref().map(to_schema_string),
                context: resource.context.as_ref().map(to_schema_string),
                isolation: resource.isolation.map(Isolation::from),
            });
        }
        resources
    }

    fn middleware(&mut self, raw: Vec<RawMiddleware>) -> Vec<Middleware> {
        let mut seen = HashSet::new();
        raw.into_iter()
            .filter_map(|mw| {
                let base = self.base(mw.base, NodeKind::Middleware, &mut seen)?;
                Some(Middleware {
                    base,
                    depends_on: mw.depends_on,
                    throws: mw.throws,
                    config: mw.config.as_ref().map(to_schema_string),
                    config_schema: mw.config_schema.as_ref().map(to_schema_string),
                    global: mw.global,
                })
            })
            .collect()
    }

    fn events(&mut self, raw: Vec<RawEvent>) -> Vec<Event> {
        let mut seen = HashSet::new();
        raw.into_iter()
            .filter_map(|event| {
                let base = self.base(event.base, NodeKind::Event, &mut seen)?;
                Some(Event {
                    base,
                    payload_schema: event.payload_schema.as_ref().map(to_schema_string),
                })
            })
            .collect()
    }

    fn tags(&mut self, raw: Vec<RawTag>) -> Vec<Tag> {
        let mut seen = HashSet::new();
        raw.into_iter()
            .filter_map(|tag| {
                let base = self.base(tag.base, NodeKind::Tag, &mut seen)?;
                Some(Tag {
                    base,
                    config: tag.config.as_ref().filter(|c| !c.is_null()).map(to_json_string),
                    config_schema: tag.config_schema.as_ref().map(to_schema_string),
                })
            })
            .collect()
    }

    fn errors(&mut self, raw: Vec<RawError>) -> Vec<ErrorDef> {
        let mut seen = HashSet::new();
        raw.into_iter()
            .filter_map(|error| {
                let base = self.base(error.base, NodeKind::Error, &mut seen)?;
                Some(ErrorDef {
                    base,
                    data_schema: error.data_schema.as_ref().map(to_schema_string),
                })
            })
            .collect()
    }

    fn async_contexts(&mut self, raw: Vec<RawAsyncContext>) -> Vec<AsyncContext> {
        let mut seen = HashSet::new();
        raw.into_iter()
            .filter_map(|ctx| {
                let base = self.base(ctx.base, NodeKind::AsyncContext, &mut seen)?;
                Some(AsyncContext {
                    base,
                    serialize: ctx.serialize,
                    parse: ctx.parse,
                })
            })
            .collect()
    }
}

impl From<RawIsolation> for Isolation {
    fn from(raw: RawIsolation) -> Self {
        let exports_mode = match &raw.exports {
            None => ExportsMode::Unset,
            Some(exports) if exports.is_empty() => ExportsMode::None,
            Some(_) => ExportsMode::List,
        };
        Self {
            deny: raw.deny,
            only: raw.only,
            exports: raw.exports.unwrap_or_default(),
            exports_mode,
        }
    }
}

fn split_middleware(refs: Vec<MiddlewareRef>) -> (Vec<String>, BTreeMap<String, String>) {
    let mut ids = Vec::with_capacity(refs.len());
    let mut configs = BTreeMap::new();
    for mw in refs {
        if let Some(config) = mw.config() {
            configs.insert(mw.id().to_string(), config);
        }
        ids.push(mw.id().to_string());
    }
    (ids, configs)
}

/// Explicit emits first, then event ids from `depends_on`, without repeats.
fn derive_emits(explicit: Vec<String>, depends_on: &[String], event_ids: &HashSet<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    explicit
        .into_iter()
        .chain(depends_on.iter().filter(|d| event_ids.contains(*d)).cloned())
        .filter(|id| seen.insert(id.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::NamedRoot;
    use crate::introspector::durable::DURABLE_WORKFLOW_TAG;
    use serde_json::json;

    fn build(raw: RawRegistry) -> RegistrySnapshot {
        let config = IntrospectionConfig {
            check_source_files: false,
            ..IntrospectionConfig::default()
        };
        RegistrySnapshot::build(raw, &PathSanitizer::default(), &config)
    }

    fn codes(snapshot: &RegistrySnapshot) -> Vec<&str> {
        snapshot.diagnostics.iter().map(|d| d.code.as_str()).collect()
    }

    #[test]
    fn test_missing_id_is_dropped_with_diagnostic() {
        let raw = RawRegistry {
            tasks: vec![RawTask::default(), RawTask::new("app.tasks.ok")],
            ..RawRegistry::default()
        };
        let snapshot = build(raw);
        assert_eq!(snapshot.tasks.len(), 1);
        assert_eq!(codes(&snapshot), vec![MALFORMED_ELEMENT]);
        assert_eq!(snapshot.diagnostics[0].node_kind, Some(NodeKind::Task));
    }

    #[test]
    fn test_duplicate_keeps_first() {
        let raw = RawRegistry {
            resources: vec![
                RawResource::new("app.db").registers(["a"]),
                RawResource::new("app.db").registers(["b"]),
            ],
            ..RawRegistry::default()
        };
        let snapshot = build(raw);
        assert_eq!(snapshot.resources.len(), 1);
        assert_eq!(snapshot.resources[0].registers, vec!["a".to_string()]);
        assert_eq!(codes(&snapshot), vec![DUPLICATE_ID]);
    }

    #[test]
    fn test_same_id_across_kinds_is_allowed() {
        let raw = RawRegistry {
            tasks: vec![RawTask::new("app.shared")],
            events: vec![RawEvent::new("app.shared")],
            ..RawRegistry::default()
        };
        let snapshot = build(raw);
        assert!(snapshot.diagnostics.is_empty());
        assert_eq!(snapshot.len(), 2);
    }

    #[test]
    fn test_hook_without_event_is_malformed() {
        let raw = RawRegistry {
            hooks: vec![RawHook {
                base: RawBase::new("app.hooks.lost"),
                ..RawHook::default()
            }],
            ..RawRegistry::default()
        };
        let snapshot = build(raw);
        assert!(snapshot.hooks.is_empty());
        assert_eq!(snapshot.diagnostics[0].node_id.as_deref(), Some("app.hooks.lost"));
    }

    #[test]
    fn test_emits_include_event_dependencies() {
        let raw = RawRegistry {
            tasks: vec![
                RawTask::new("t")
                    .emits(["e2", "e1"])
                    .depends_on(["r", "e1", "e3"]),
            ],
            events: vec![RawEvent::new("e1"), RawEvent::new("e3")],
            ..RawRegistry::default()
        };
        let snapshot = build(raw);
        assert_eq!(snapshot.tasks[0].emits, vec!["e2", "e1", "e3"]);
    }

    #[test]
    fn test_durable_flag_from_resource_id_or_tag() {
        let raw = RawRegistry {
            tasks: vec![
                RawTask::new("a").depends_on(["app.durable.runtime"]),
                RawTask::new("b").depends_on(["app.engine"]),
                RawTask::new("c").depends_on(["app.db"]),
            ],
            resources: vec![
                RawResource::new("app.durable.runtime"),
                RawResource::new("app.engine").tags([TagRef::from(DURABLE_WORKFLOW_TAG)]),
                RawResource::new("app.db"),
            ],
            ..RawRegistry::default()
        };
        let snapshot = build(raw);
        let flags: Vec<_> = snapshot.tasks.iter().map(|t| t.is_durable).collect();
        assert_eq!(flags, vec![true, true, false]);
    }

    #[test]
    fn test_middleware_config_and_isolation_modes() {
        let raw: RawRegistry = serde_json::from_value(json!({
            "resources": [
                {"id": "unset", "isolation": {"deny": ["x"]}},
                {"id": "none", "isolation": {"exports": []}},
                {"id": "list", "isolation": {"exports": ["a.*"]},
                 "middleware": [{"id": "mw.retry", "config": {"n": 3}}, "mw.auth"]}
            ]
        }))
        .unwrap();
        let snapshot = build(raw);
        let modes: Vec<_> = snapshot
            .resources
            .iter()
            .map(|r| r.isolation.as_ref().unwrap().exports_mode)
            .collect();
        assert_eq!(modes, vec![ExportsMode::Unset, ExportsMode::None, ExportsMode::List]);

        let list = &snapshot.resources[2];
        assert_eq!(list.middleware, vec!["mw.retry", "mw.auth"]);
        assert_eq!(list.middleware_config.get("mw.retry").map(String::as_str), Some("{\"n\":3}"));
        assert!(!list.middleware_config.contains_key("mw.auth"));
    }

    #[test]
    fn test_source_paths_are_sanitized() {
        let dir = tempfile::tempdir().unwrap();
        let existing = dir.path().join("task.ts");
        std::fs::write(&existing, "export {}").unwrap();
        let missing = dir.path().join("gone.ts");

        let mut raw = RawRegistry::default();
        let mut present = RawTask::new("present");
        present.base.source_path = Some(existing.clone());
        let mut absent = RawTask::new("absent");
        absent.base.source_path = Some(missing);
        raw.tasks = vec![present, absent];

        let sanitizer = PathSanitizer::new([NamedRoot::new("workspace", dir.path())]);
        let snapshot =
            RegistrySnapshot::build(raw, &sanitizer, &IntrospectionConfig::default());

        assert_eq!(snapshot.tasks[0].base.file_path.as_deref(), Some("workspace:task.ts"));
        assert_eq!(snapshot.tasks[0].base.source_path.as_deref(), Some(existing.as_path()));
        assert_eq!(codes(&snapshot), vec![MISSING_FILE]);
        assert_eq!(snapshot.diagnostics[0].node_id.as_deref(), Some("absent"));
    }
}
