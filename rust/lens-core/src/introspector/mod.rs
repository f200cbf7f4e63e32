//! Query facade over one registry snapshot.
//!
//! All queries are synchronous reads over indexes built once in
//! [`Introspector::build`]. Unknown ids give `None` or an empty list, never
//! an error. Relations resolve one level deep, so cyclic graphs are safe.

mod checks;
pub mod durable;
mod index;
pub mod isolation;
pub mod runs;
pub mod tunnel;

pub use durable::{DURABLE_WORKFLOW_TAG, FlowShapeReport, is_durable_resource};
pub use isolation::matches_pattern;
pub use runs::RunQueryArgs;
pub use tunnel::{TUNNEL_TAG, TunnelInfo, TunnelMode, TunnelRuntime};

use std::collections::HashMap;

use parking_lot::{Mutex, RwLock};
use serde::Serialize;

use crate::config::IntrospectionConfig;
use crate::logging::OpTimer;
use crate::model::{
    AsyncContext, Diagnostic, ElementRef, ErrorDef, Event, HasDependencies, Hook, Middleware,
    NodeKind, Resource, Tag, TagUsage, Task, TaskLike,
};
use crate::registry::RegistrySnapshot;

use index::{Indexes, NodeRef};
use tunnel::TunnelTagMatcher;

/// Resolved `dependsOn` and `emits` of one element.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Dependencies<'a> {
    pub tasks: Vec<&'a Task>,
    pub hooks: Vec<&'a Hook>,
    pub resources: Vec<&'a Resource>,
    /// Events the element emits.
    pub emitters: Vec<&'a Event>,
}

/// One attachment of a middleware, with its call-site config.
#[derive(Debug, Clone, Serialize)]
pub struct MiddlewareUsage<'a> {
    pub id: &'a str,
    pub config: Option<&'a str>,
    pub node: ElementRef<'a>,
}

/// Elements carrying one tag, grouped by kind.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TagCarriers<'a> {
    pub tasks: Vec<&'a Task>,
    pub hooks: Vec<&'a Hook>,
    pub resources: Vec<&'a Resource>,
    pub middleware: Vec<&'a Middleware>,
    pub events: Vec<&'a Event>,
    pub errors: Vec<&'a ErrorDef>,
    pub async_contexts: Vec<&'a AsyncContext>,
}

impl TagCarriers<'_> {
    #[must_use]
    pub fn len(&self) -> usize {
        self.tasks.len()
            + self.hooks.len()
            + self.resources.len()
            + self.middleware.len()
            + self.events.len()
            + self.errors.len()
            + self.async_contexts.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Indexed, read-only view of a registry snapshot.
#[derive(Debug)]
pub struct Introspector {
    snapshot: RegistrySnapshot,
    index: Indexes,
    diagnostics: Vec<Diagnostic>,
    tunnel_tags: TunnelTagMatcher,
    tunnels: RwLock<HashMap<String, TunnelInfo>>,
    flow_cache: Mutex<HashMap<String, FlowShapeReport>>,
}

impl Introspector {
    /// Index a snapshot and run the structural checks.
    pub fn build(snapshot: RegistrySnapshot, config: &IntrospectionConfig) -> Self {
        let timer = OpTimer::new("introspector", "build");
        let index = Indexes::build(&snapshot);

        let mut diagnostics = snapshot.diagnostics.clone();
        diagnostics.extend(checks::run(&snapshot, &index));

        timer.finish_with_count("diagnostics", diagnostics.len());
        Self {
            snapshot,
            index,
            diagnostics,
            tunnel_tags: TunnelTagMatcher::new(config.legacy_tunnel_tag_matching),
            tunnels: RwLock::new(HashMap::new()),
            flow_cache: Mutex::new(HashMap::new()),
        }
    }

    /// Ingestion and structural diagnostics.
    #[must_use]
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    #[must_use]
    pub fn snapshot(&self) -> &RegistrySnapshot {
        &self.snapshot
    }

    fn element_at(&self, node: NodeRef) -> Option<ElementRef<'_>> {
        let s = &self.snapshot;
        let i = node.index;
        match node.kind {
            NodeKind::Task => s.tasks.get(i).map(ElementRef::Task),
            NodeKind::Hook => s.hooks.get(i).map(ElementRef::Hook),
            NodeKind::Resource => s.resources.get(i).map(ElementRef::Resource),
            NodeKind::Middleware => s.middleware.get(i).map(ElementRef::Middleware),
            NodeKind::Event => s.events.get(i).map(ElementRef::Event),
            NodeKind::Tag => s.tags.get(i).map(ElementRef::Tag),
            NodeKind::Error => s.errors.get(i).map(ElementRef::Error),
            NodeKind::AsyncContext => s.async_contexts.get(i).map(ElementRef::AsyncContext),
        }
    }

    fn elements_at(&self, nodes: Option<&Vec<NodeRef>>) -> Vec<ElementRef<'_>> {
        nodes
            .into_iter()
            .flatten()
            .filter_map(|&n| self.element_at(n))
            .collect()
    }

    // ---- collections ----

    #[must_use]
    pub fn tasks(&self) -> &[Task] {
        &self.snapshot.tasks
    }

    #[must_use]
    pub fn hooks(&self) -> &[Hook] {
        &self.snapshot.hooks
    }

    #[must_use]
    pub fn resources(&self) -> &[Resource] {
        &self.snapshot.resources
    }

    #[must_use]
    pub fn middleware(&self) -> &[Middleware] {
        &self.snapshot.middleware
    }

    #[must_use]
    pub fn events(&self) -> &[Event] {
        &self.snapshot.events
    }

    #[must_use]
    pub fn tags(&self) -> &[Tag] {
        &self.snapshot.tags
    }

    #[must_use]
    pub fn errors(&self) -> &[ErrorDef] {
        &self.snapshot.errors
    }

    #[must_use]
    pub fn async_contexts(&self) -> &[AsyncContext] {
        &self.snapshot.async_contexts
    }

    // ---- single lookups ----

    #[must_use]
    pub fn get_task(&self, id: &str) -> Option<&Task> {
        let i = self.index.position(NodeKind::Task, id)?;
        self.snapshot.tasks.get(i)
    }

    #[must_use]
    pub fn get_hook(&self, id: &str) -> Option<&Hook> {
        let i = self.index.position(NodeKind::Hook, id)?;
        self.snapshot.hooks.get(i)
    }

    #[must_use]
    pub fn get_resource(&self, id: &str) -> Option<&Resource> {
        let i = self.index.position(NodeKind::Resource, id)?;
        self.snapshot.resources.get(i)
    }

    #[must_use]
    pub fn get_middleware(&self, id: &str) -> Option<&Middleware> {
        let i = self.index.position(NodeKind::Middleware, id)?;
        self.snapshot.middleware.get(i)
    }

    #[must_use]
    pub fn get_event(&self, id: &str) -> Option<&Event> {
        let i = self.index.position(NodeKind::Event, id)?;
        self.snapshot.events.get(i)
    }

    #[must_use]
    pub fn get_tag(&self, id: &str) -> Option<&Tag> {
        let i = self.index.position(NodeKind::Tag, id)?;
        self.snapshot.tags.get(i)
    }

    #[must_use]
    pub fn get_error(&self, id: &str) -> Option<&ErrorDef> {
        let i = self.index.position(NodeKind::Error, id)?;
        self.snapshot.errors.get(i)
    }

    #[must_use]
    pub fn get_async_context(&self, id: &str) -> Option<&AsyncContext> {
        let i = self.index.position(NodeKind::AsyncContext, id)?;
        self.snapshot.async_contexts.get(i)
    }

    /// Resolve a bare id, trying task, hook, resource, middleware, event,
    /// tag, error and async context in that order.
    #[must_use]
    pub fn get_element(&self, id: &str) -> Option<ElementRef<'_>> {
        self.element_at(self.index.resolve(id)?)
    }

    // ---- batch lookups: input order, unknown ids dropped ----

    #[must_use]
    pub fn get_tasks_by_ids<S: AsRef<str>>(&self, ids: &[S]) -> Vec<&Task> {
        ids.iter().filter_map(|id| self.get_task(id.as_ref())).collect()
    }

    #[must_use]
    pub fn get_hooks_by_ids<S: AsRef<str>>(&self, ids: &[S]) -> Vec<&Hook> {
        ids.iter().filter_map(|id| self.get_hook(id.as_ref())).collect()
    }

    #[must_use]
    pub fn get_resources_by_ids<S: AsRef<str>>(&self, ids: &[S]) -> Vec<&Resource> {
        ids.iter().filter_map(|id| self.get_resource(id.as_ref())).collect()
    }

    #[must_use]
    pub fn get_middleware_by_ids<S: AsRef<str>>(&self, ids: &[S]) -> Vec<&Middleware> {
        ids.iter().filter_map(|id| self.get_middleware(id.as_ref())).collect()
    }

    #[must_use]
    pub fn get_events_by_ids<S: AsRef<str>>(&self, ids: &[S]) -> Vec<&Event> {
        ids.iter().filter_map(|id| self.get_event(id.as_ref())).collect()
    }

    #[must_use]
    pub fn get_tags_by_ids<S: AsRef<str>>(&self, ids: &[S]) -> Vec<&Tag> {
        ids.iter().filter_map(|id| self.get_tag(id.as_ref())).collect()
    }

    #[must_use]
    pub fn get_errors_by_ids<S: AsRef<str>>(&self, ids: &[S]) -> Vec<&ErrorDef> {
        ids.iter().filter_map(|id| self.get_error(id.as_ref())).collect()
    }

    #[must_use]
    pub fn get_async_contexts_by_ids<S: AsRef<str>>(&self, ids: &[S]) -> Vec<&AsyncContext> {
        ids.iter()
            .filter_map(|id| self.get_async_context(id.as_ref()))
            .collect()
    }

    /// Elements whose id contains `id_includes`, in resolution kind order
    /// then registration order.
    #[must_use]
    pub fn search(&self, id_includes: &str) -> Vec<ElementRef<'_>> {
        let s = &self.snapshot;
        let all = s
            .tasks
            .iter()
            .map(ElementRef::Task)
            .chain(s.hooks.iter().map(ElementRef::Hook))
            .chain(s.resources.iter().map(ElementRef::Resource))
            .chain(s.middleware.iter().map(ElementRef::Middleware))
            .chain(s.events.iter().map(ElementRef::Event))
            .chain(s.tags.iter().map(ElementRef::Tag))
            .chain(s.errors.iter().map(ElementRef::Error))
            .chain(s.async_contexts.iter().map(ElementRef::AsyncContext));
        all.filter(|e| e.id().contains(id_includes)).collect()
    }

    // ---- relations ----

    /// One level of `dependsOn` resolved against tasks, hooks and resources,
    /// plus `emits` resolved to events.
    #[must_use]
    pub fn dependencies<N: HasDependencies + ?Sized>(&self, node: &N) -> Dependencies<'_> {
        let depends_on = node.depends_on();
        Dependencies {
            tasks: self.get_tasks_by_ids(depends_on),
            hooks: self.get_hooks_by_ids(depends_on),
            resources: self.get_resources_by_ids(depends_on),
            emitters: self.get_events_by_ids(node.emits()),
        }
    }

    /// Dependencies of any element kind by id; empty for unknown ids.
    #[must_use]
    pub fn dependencies_of(&self, id: &str) -> Dependencies<'_> {
        match self.get_element(id) {
            Some(ElementRef::Task(t)) => self.dependencies(t),
            Some(ElementRef::Hook(h)) => self.dependencies(h),
            Some(ElementRef::Resource(r)) => self.dependencies(r),
            Some(ElementRef::Middleware(m)) => self.dependencies(m),
            _ => Dependencies::default(),
        }
    }

    /// Elements that list `id` in their `dependsOn`.
    #[must_use]
    pub fn dependents_of(&self, id: &str) -> Vec<ElementRef<'_>> {
        self.elements_at(self.index.dependents.get(id))
    }

    /// Tasks and hooks that emit the event.
    #[must_use]
    pub fn emitters_of_event(&self, event_id: &str) -> Vec<TaskLike<'_>> {
        self.elements_at(self.index.event_emitters.get(event_id))
            .into_iter()
            .filter_map(|e| match e {
                ElementRef::Task(t) => Some(TaskLike::Task(t)),
                ElementRef::Hook(h) => Some(TaskLike::Hook(h)),
                _ => None,
            })
            .collect()
    }

    /// Hooks listening to the event, by ascending `hookOrder` (unset = 0),
    /// registration order among equals.
    #[must_use]
    pub fn hooks_of_event(&self, event_id: &str) -> Vec<&Hook> {
        self.index
            .event_listeners
            .get(event_id)
            .into_iter()
            .flatten()
            .filter_map(|&i| self.snapshot.hooks.get(i))
            .collect()
    }

    /// Explicit `registeredBy` when stored, else the resource whose
    /// `registers` lists the element.
    #[must_use]
    pub fn registered_by_id(&self, id: &str) -> Option<&str> {
        if let Some(explicit) = self
            .get_element(id)
            .and_then(|e| e.base().registered_by.as_deref())
        {
            return Some(explicit);
        }
        let i = *self.index.registered_by.get(id)?;
        self.snapshot.resources.get(i).map(|r| r.base.id.as_str())
    }

    #[must_use]
    pub fn registered_by(&self, id: &str) -> Option<&Resource> {
        self.get_resource(self.registered_by_id(id)?)
    }

    /// Explicit `overriddenBy` when stored, else the first resource whose
    /// `overrides` lists the element.
    #[must_use]
    pub fn overridden_by_id(&self, id: &str) -> Option<&str> {
        if let Some(explicit) = self
            .get_element(id)
            .and_then(|e| e.base().overridden_by.as_deref())
        {
            return Some(explicit);
        }
        let i = *self.index.overridden_by.get(id)?.first()?;
        self.snapshot.resources.get(i).map(|r| r.base.id.as_str())
    }

    #[must_use]
    pub fn overridden_by(&self, id: &str) -> Option<&Resource> {
        self.get_resource(self.overridden_by_id(id)?)
    }

    /// The resource's `registers` list resolved to elements.
    #[must_use]
    pub fn registered_elements(&self, resource_id: &str) -> Vec<ElementRef<'_>> {
        self.get_resource(resource_id)
            .map(|r| {
                r.registers
                    .iter()
                    .filter_map(|id| self.get_element(id))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// First registered resource that no other resource registers.
    #[must_use]
    pub fn root(&self) -> Option<&Resource> {
        self.snapshot
            .resources
            .iter()
            .find(|r| !self.index.registered_by.contains_key(&r.base.id))
    }

    /// Elements declaring the error in `throws`.
    #[must_use]
    pub fn thrown_by(&self, error_id: &str) -> Vec<ElementRef<'_>> {
        self.elements_at(self.index.thrown_by.get(error_id))
    }

    /// Elements that depend on the async context.
    #[must_use]
    pub fn async_context_used_by(&self, context_id: &str) -> Vec<ElementRef<'_>> {
        self.dependents_of(context_id)
    }

    /// Resources that register the async context.
    #[must_use]
    pub fn async_context_provided_by(&self, context_id: &str) -> Vec<&Resource> {
        self.index
            .registrants
            .get(context_id)
            .into_iter()
            .flatten()
            .filter_map(|&i| self.snapshot.resources.get(i))
            .collect()
    }

    // ---- middleware ----

    fn middleware_usages(&self, middleware_id: &str, resources: bool) -> Vec<MiddlewareUsage<'_>> {
        self.elements_at(self.index.middleware_users.get(middleware_id))
            .into_iter()
            .filter_map(|node| {
                let config = match node {
                    ElementRef::Task(t) if !resources => t.middleware_config.get(middleware_id),
                    ElementRef::Hook(h) if !resources => h.middleware_config.get(middleware_id),
                    ElementRef::Resource(r) if resources => r.middleware_config.get(middleware_id),
                    _ => return None,
                };
                Some(MiddlewareUsage {
                    id: node.id(),
                    config: config.map(String::as_str),
                    node,
                })
            })
            .collect()
    }

    /// Tasks and hooks attaching the middleware, with per-usage config.
    #[must_use]
    pub fn tasks_using_middleware_detailed(&self, middleware_id: &str) -> Vec<MiddlewareUsage<'_>> {
        self.middleware_usages(middleware_id, false)
    }

    /// Resources attaching the middleware, with per-usage config.
    #[must_use]
    pub fn resources_using_middleware_detailed(
        &self,
        middleware_id: &str,
    ) -> Vec<MiddlewareUsage<'_>> {
        self.middleware_usages(middleware_id, true)
    }

    // ---- tags ----

    /// Elements carrying the tag, grouped by kind.
    #[must_use]
    pub fn tag_carriers(&self, tag_id: &str) -> TagCarriers<'_> {
        let mut carriers = TagCarriers::default();
        for element in self.elements_at(self.index.tag_carriers.get(tag_id)) {
            match element {
                ElementRef::Task(t) => carriers.tasks.push(t),
                ElementRef::Hook(h) => carriers.hooks.push(h),
                ElementRef::Resource(r) => carriers.resources.push(r),
                ElementRef::Middleware(m) => carriers.middleware.push(m),
                ElementRef::Event(e) => carriers.events.push(e),
                ElementRef::Error(e) => carriers.errors.push(e),
                ElementRef::AsyncContext(c) => carriers.async_contexts.push(c),
                ElementRef::Tag(_) => {}
            }
        }
        carriers
    }

    /// The element's attachment of the tag.
    #[must_use]
    pub fn tag_usage(&self, element_id: &str, tag_id: &str) -> Option<&TagUsage> {
        self.get_element(element_id)?
            .base()
            .tags()
            .iter()
            .find(|t| t.id == tag_id)
    }

    /// Per-usage config, falling back to the tag's default config.
    /// `None` when the element does not carry the tag.
    #[must_use]
    pub fn resolve_tag_config(&self, element_id: &str, tag_id: &str) -> Option<&str> {
        let usage = self.tag_usage(element_id, tag_id)?;
        usage
            .config
            .as_deref()
            .or_else(|| self.get_tag(tag_id)?.config.as_deref())
    }
}
