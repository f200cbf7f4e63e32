//! Structural checks run once the indexes exist.

use super::index::Indexes;
use super::isolation;
use crate::model::diagnostics::{
    DANGLING_DEPENDENCY, ISOLATION_VIOLATION, ORPHAN_EVENT, OVERRIDE_CONFLICT, UNUSED_MIDDLEWARE,
};
use crate::model::{Diagnostic, NodeKind};
use crate::registry::RegistrySnapshot;

pub(crate) fn run(snapshot: &RegistrySnapshot, index: &Indexes) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();
    dangling_dependencies(snapshot, index, &mut diagnostics);
    orphan_events(snapshot, index, &mut diagnostics);
    unused_middleware(snapshot, index, &mut diagnostics);
    override_conflicts(snapshot, index, &mut diagnostics);
    isolation_violations(snapshot, index, &mut diagnostics);
    diagnostics
}

fn dangling_dependencies(snapshot: &RegistrySnapshot, index: &Indexes, out: &mut Vec<Diagnostic>) {
    let nodes = snapshot
        .tasks
        .iter()
        .map(|t| (&t.base.id, NodeKind::Task, &t.depends_on))
        .chain(snapshot.hooks.iter().map(|h| (&h.base.id, NodeKind::Hook, &h.depends_on)))
        .chain(
            snapshot
                .resources
                .iter()
                .map(|r| (&r.base.id, NodeKind::Resource, &r.depends_on)),
        )
        .chain(
            snapshot
                .middleware
                .iter()
                .map(|m| (&m.base.id, NodeKind::Middleware, &m.depends_on)),
        );

    for (id, kind, depends_on) in nodes {
        for dependency in depends_on.iter().filter(|d| !index.contains(d)) {
            out.push(
                Diagnostic::warning(
                    DANGLING_DEPENDENCY,
                    format!("depends on '{dependency}', which is not registered"),
                )
                .with_node(id, kind),
            );
        }
    }
}

fn orphan_events(snapshot: &RegistrySnapshot, index: &Indexes, out: &mut Vec<Diagnostic>) {
    for event in &snapshot.events {
        if !index.event_listeners.contains_key(&event.base.id) {
            out.push(
                Diagnostic::info(ORPHAN_EVENT, "no hook listens to this event")
                    .with_node(&event.base.id, NodeKind::Event),
            );
        }
    }
}

fn unused_middleware(snapshot: &RegistrySnapshot, index: &Indexes, out: &mut Vec<Diagnostic>) {
    for middleware in &snapshot.middleware {
        if !middleware.is_global() && !index.middleware_users.contains_key(&middleware.base.id) {
            out.push(
                Diagnostic::info(UNUSED_MIDDLEWARE, "middleware is neither attached nor global")
                    .with_node(&middleware.base.id, NodeKind::Middleware),
            );
        }
    }
}

fn override_conflicts(snapshot: &RegistrySnapshot, index: &Indexes, out: &mut Vec<Diagnostic>) {
    let mut conflicts: Vec<_> = index
        .overridden_by
        .iter()
        .filter(|(_, resources)| resources.len() > 1)
        .collect();
    conflicts.sort_by(|a, b| a.0.cmp(b.0));

    for (target, resources) in conflicts {
        let claimants: Vec<&str> = resources
            .iter()
            .filter_map(|&i| snapshot.resources.get(i))
            .map(|r| r.base.id.as_str())
            .collect();
        let kind = index.resolve(target).map(|n| n.kind);
        let mut diag = Diagnostic::error(
            OVERRIDE_CONFLICT,
            format!("overridden by more than one resource: {}", claimants.join(", ")),
        );
        diag.node_id = Some(target.clone());
        diag.node_kind = kind;
        out.push(diag);
    }
}

fn isolation_violations(snapshot: &RegistrySnapshot, index: &Indexes, out: &mut Vec<Diagnostic>) {
    for resource in &snapshot.resources {
        let Some(rules) = resource.isolation.as_ref() else {
            continue;
        };
        if rules.deny.is_empty() && rules.only.is_empty() {
            continue;
        }

        for child_id in &resource.registers {
            let Some(child) = index.resolve(child_id) else {
                continue;
            };
            let depends_on = match child.kind {
                NodeKind::Task => snapshot.tasks.get(child.index).map(|t| &t.depends_on),
                NodeKind::Hook => snapshot.hooks.get(child.index).map(|h| &h.depends_on),
                NodeKind::Resource => snapshot.resources.get(child.index).map(|r| &r.depends_on),
                NodeKind::Middleware => snapshot.middleware.get(child.index).map(|m| &m.depends_on),
                _ => None,
            };
            for dependency in depends_on.into_iter().flatten() {
                if let Some(reason) = isolation::violation(rules, dependency) {
                    out.push(
                        Diagnostic::warning(
                            ISOLATION_VIOLATION,
                            format!(
                                "depends on '{dependency}', which is {reason} inside '{}'",
                                resource.base.id
                            ),
                        )
                        .with_node(child_id, child.kind),
                    );
                }
            }
        }
    }
}
