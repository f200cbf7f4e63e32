//! Run query defaults for a single task or hook.

use serde::{Deserialize, Serialize};

use super::Introspector;
use crate::telemetry::{Query, RunFilter, RunNodeKind};

/// Query arguments as a wire layer receives them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RunQueryArgs {
    pub after_timestamp: Option<i64>,
    pub after_sequence: Option<u64>,
    pub last: Option<usize>,
    pub filter: Option<RunFilter>,
}

fn run_options(node_id: &str, kind: RunNodeKind, args: RunQueryArgs) -> Query<RunFilter> {
    let mut filter = args.filter.unwrap_or_default();
    if filter.node_ids.is_none() {
        filter.node_ids = Some(vec![node_id.to_string()]);
    }
    if filter.node_kinds.is_none() {
        filter.node_kinds = Some(vec![kind]);
    }
    Query {
        after_timestamp: args.after_timestamp,
        after_sequence: args.after_sequence,
        filter: Some(filter),
        last: args.last,
    }
}

impl Introspector {
    /// Runs of this task unless `args.filter` says otherwise.
    #[must_use]
    pub fn build_run_options_for_task(&self, task_id: &str, args: RunQueryArgs) -> Query<RunFilter> {
        run_options(task_id, RunNodeKind::Task, args)
    }

    /// Runs of this hook unless `args.filter` says otherwise.
    #[must_use]
    pub fn build_run_options_for_hook(&self, hook_id: &str, args: RunQueryArgs) -> Query<RunFilter> {
        run_options(hook_id, RunNodeKind::Hook, args)
    }
}
