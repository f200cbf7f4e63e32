//! Reverse indexes over a snapshot.
//!
//! Indexes hold positions into the snapshot's element vectors, never
//! references, so the introspector can own both without self-borrowing.
//! They are built in one pass and never updated afterwards.

use std::collections::HashMap;

use crate::model::{NodeKind, TagUsage};
use crate::registry::RegistrySnapshot;

/// Position of an element inside the snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct NodeRef {
    pub kind: NodeKind,
    pub index: usize,
}

impl NodeRef {
    fn new(kind: NodeKind, index: usize) -> Self {
        Self { kind, index }
    }
}

const KINDS: usize = NodeKind::RESOLUTION_ORDER.len();

fn slot(kind: NodeKind) -> usize {
    match kind {
        NodeKind::Task => 0,
        NodeKind::Hook => 1,
        NodeKind::Resource => 2,
        NodeKind::Middleware => 3,
        NodeKind::Event => 4,
        NodeKind::Tag => 5,
        NodeKind::Error => 6,
        NodeKind::AsyncContext => 7,
    }
}

#[derive(Debug, Default)]
pub(crate) struct Indexes {
    positions: [HashMap<String, usize>; KINDS],
    /// tag id -> carriers, in kind order then registration order.
    pub tag_carriers: HashMap<String, Vec<NodeRef>>,
    /// middleware id -> tasks, hooks and resources attaching it.
    pub middleware_users: HashMap<String, Vec<NodeRef>>,
    /// event id -> tasks and hooks emitting it.
    pub event_emitters: HashMap<String, Vec<NodeRef>>,
    /// event id -> hook positions, ordered by `hookOrder`.
    pub event_listeners: HashMap<String, Vec<usize>>,
    /// child id -> resource position that lists it in `registers`.
    pub registered_by: HashMap<String, usize>,
    /// child id -> resource positions that list it in `registers`.
    pub registrants: HashMap<String, Vec<usize>>,
    /// target id -> resource positions that list it in `overrides`.
    pub overridden_by: HashMap<String, Vec<usize>>,
    /// error id -> elements declaring it in `throws`.
    pub thrown_by: HashMap<String, Vec<NodeRef>>,
    /// id -> elements listing it in `dependsOn`.
    pub dependents: HashMap<String, Vec<NodeRef>>,
}

impl Indexes {
    pub fn build(snapshot: &RegistrySnapshot) -> Self {
        let mut index = Self::default();

        index.record_positions(NodeKind::Task, snapshot.tasks.iter().map(|e| &e.base.id));
        index.record_positions(NodeKind::Hook, snapshot.hooks.iter().map(|e| &e.base.id));
        index.record_positions(NodeKind::Resource, snapshot.resources.iter().map(|e| &e.base.id));
        index.record_positions(NodeKind::Middleware, snapshot.middleware.iter().map(|e| &e.base.id));
        index.record_positions(NodeKind::Event, snapshot.events.iter().map(|e| &e.base.id));
        index.record_positions(NodeKind::Tag, snapshot.tags.iter().map(|e| &e.base.id));
        index.record_positions(NodeKind::Error, snapshot.errors.iter().map(|e| &e.base.id));
        index.record_positions(
            NodeKind::AsyncContext,
            snapshot.async_contexts.iter().map(|e| &e.base.id),
        );

        index.record_tags(NodeKind::Task, snapshot.tasks.iter().map(|e| e.base.tags()));
        index.record_tags(NodeKind::Hook, snapshot.hooks.iter().map(|e| e.base.tags()));
        index.record_tags(NodeKind::Resource, snapshot.resources.iter().map(|e| e.base.tags()));
        index.record_tags(NodeKind::Middleware, snapshot.middleware.iter().map(|e| e.base.tags()));
        index.record_tags(NodeKind::Event, snapshot.events.iter().map(|e| e.base.tags()));
        index.record_tags(NodeKind::Tag, snapshot.tags.iter().map(|e| e.base.tags()));
        index.record_tags(NodeKind::Error, snapshot.errors.iter().map(|e| e.base.tags()));
        index.record_tags(
            NodeKind::AsyncContext,
            snapshot.async_contexts.iter().map(|e| e.base.tags()),
        );

        for (i, task) in snapshot.tasks.iter().enumerate() {
            let node = NodeRef::new(NodeKind::Task, i);
            push_all(&mut index.middleware_users, &task.middleware, node);
            push_all(&mut index.event_emitters, &task.emits, node);
            push_all(&mut index.thrown_by, &task.throws, node);
            push_all(&mut index.dependents, &task.depends_on, node);
        }

        for (i, hook) in snapshot.hooks.iter().enumerate() {
            let node = NodeRef::new(NodeKind::Hook, i);
            push_all(&mut index.middleware_users, &hook.middleware, node);
            push_all(&mut index.event_emitters, &hook.emits, node);
            push_all(&mut index.thrown_by, &hook.throws, node);
            push_all(&mut index.dependents, &hook.depends_on, node);
            index
                .event_listeners
                .entry(hook.event.clone())
                .or_default()
                .push(i);
        }

        // Stable: equal orders keep registration order.
        for listeners in index.event_listeners.values_mut() {
            listeners.sort_by_key(|&i| snapshot.hooks.get(i).and_then(|h| h.hook_order).unwrap_or(0));
        }

        for (i, resource) in snapshot.resources.iter().enumerate() {
            let node = NodeRef::new(NodeKind::Resource, i);
            push_all(&mut index.middleware_users, &resource.middleware, node);
            push_all(&mut index.thrown_by, &resource.throws, node);
            push_all(&mut index.dependents, &resource.depends_on, node);
            for child in &resource.registers {
                index.registered_by.entry(child.clone()).or_insert(i);
                index.registrants.entry(child.clone()).or_default().push(i);
            }
            for target in &resource.overrides {
                index.overridden_by.entry(target.clone()).or_default().push(i);
            }
        }

        for (i, middleware) in snapshot.middleware.iter().enumerate() {
            let node = NodeRef::new(NodeKind::Middleware, i);
            push_all(&mut index.thrown_by, &middleware.throws, node);
            push_all(&mut index.dependents, &middleware.depends_on, node);
        }

        index
    }

    fn record_positions<'a>(&mut self, kind: NodeKind, ids: impl Iterator<Item = &'a String>) {
        let positions = &mut self.positions[slot(kind)];
        for (i, id) in ids.enumerate() {
            positions.entry(id.clone()).or_insert(i);
        }
    }

    fn record_tags<'a>(&mut self, kind: NodeKind, tags: impl Iterator<Item = &'a [TagUsage]>) {
        for (i, element_tags) in tags.enumerate() {
            for tag in element_tags {
                let carriers = self.tag_carriers.entry(tag.id.clone()).or_default();
                let node = NodeRef::new(kind, i);
                if !carriers.contains(&node) {
                    carriers.push(node);
                }
            }
        }
    }

    pub fn position(&self, kind: NodeKind, id: &str) -> Option<usize> {
        self.positions[slot(kind)].get(id).copied()
    }

    /// First kind, in resolution order, that has an element with this id.
    pub fn resolve(&self, id: &str) -> Option<NodeRef> {
        NodeKind::RESOLUTION_ORDER
            .iter()
            .find_map(|&kind| self.position(kind, id).map(|index| NodeRef::new(kind, index)))
    }

    /// Whether any kind has an element with this id.
    pub fn contains(&self, id: &str) -> bool {
        self.resolve(id).is_some()
    }
}

fn push_all(map: &mut HashMap<String, Vec<NodeRef>>, ids: &[String], node: NodeRef) {
    for id in ids {
        let entries = map.entry(id.clone()).or_default();
        if !entries.contains(&node) {
            entries.push(node);
        }
    }
}
