//! Borrowed views over elements of any kind.

use serde::Serialize;

use super::elements::Element;
use super::{
    AsyncContext, ElementBase, ErrorDef, Event, Hook, Middleware, NodeKind, Resource, Tag, Task,
};

/// A borrowed element of any kind.
#[derive(Debug, Clone, Copy, Serialize)]
#[serde(untagged)]
pub enum ElementRef<'a> {
    Task(&'a Task),
    Hook(&'a Hook),
    Resource(&'a Resource),
    Middleware(&'a Middleware),
    Event(&'a Event),
    Tag(&'a Tag),
    Error(&'a ErrorDef),
    AsyncContext(&'a AsyncContext),
}

impl<'a> ElementRef<'a> {
    #[must_use]
    pub fn base(&self) -> &'a ElementBase {
        match *self {
            Self::Task(e) => &e.base,
            Self::Hook(e) => &e.base,
            Self::Resource(e) => &e.base,
            Self::Middleware(e) => &e.base,
            Self::Event(e) => &e.base,
            Self::Tag(e) => &e.base,
            Self::Error(e) => &e.base,
            Self::AsyncContext(e) => &e.base,
        }
    }

    #[must_use]
    pub fn id(&self) -> &'a str {
        &self.base().id
    }

    #[must_use]
    pub fn kind(&self) -> NodeKind {
        match self {
            Self::Task(_) => Task::KIND,
            Self::Hook(_) => Hook::KIND,
            Self::Resource(_) => Resource::KIND,
            Self::Middleware(_) => Middleware::KIND,
            Self::Event(_) => Event::KIND,
            Self::Tag(_) => Tag::KIND,
            Self::Error(_) => ErrorDef::KIND,
            Self::AsyncContext(_) => AsyncContext::KIND,
        }
    }

    /// Declared `dependsOn`, empty for kinds without dependencies.
    #[must_use]
    pub fn depends_on(&self) -> &'a [String] {
        match *self {
            Self::Task(e) => &e.depends_on,
            Self::Hook(e) => &e.depends_on,
            Self::Resource(e) => &e.depends_on,
            Self::Middleware(e) => &e.depends_on,
            _ => &[],
        }
    }

    /// Declared `throws`, empty for kinds that cannot throw.
    #[must_use]
    pub fn throws(&self) -> &'a [String] {
        match *self {
            Self::Task(e) => &e.throws,
            Self::Hook(e) => &e.throws,
            Self::Resource(e) => &e.throws,
            Self::Middleware(e) => &e.throws,
            _ => &[],
        }
    }

    /// Serialized schemas the element declares, labelled by role.
    #[must_use]
    pub fn schemas(&self) -> Vec<(&'static str, &'a str)> {
        let declared: Vec<(&'static str, &'a Option<String>)> = match *self {
            Self::Task(e) => vec![("input", &e.input_schema), ("result", &e.result_schema)],
            Self::Resource(e) => vec![("config", &e.config_schema)],
            Self::Middleware(e) => vec![("config", &e.config_schema)],
            Self::Event(e) => vec![("payload", &e.payload_schema)],
            Self::Tag(e) => vec![("config", &e.config_schema)],
            Self::Error(e) => vec![("data", &e.data_schema)],
            Self::Hook(_) | Self::AsyncContext(_) => Vec::new(),
        };
        declared
            .into_iter()
            .filter_map(|(role, schema)| schema.as_deref().map(|s| (role, s)))
            .collect()
    }
}

/// A task or a hook; both emit events and run under middleware.
#[derive(Debug, Clone, Copy, Serialize)]
#[serde(untagged)]
pub enum TaskLike<'a> {
    Task(&'a Task),
    Hook(&'a Hook),
}

impl<'a> TaskLike<'a> {
    #[must_use]
    pub fn id(&self) -> &'a str {
        match *self {
            Self::Task(t) => &t.base.id,
            Self::Hook(h) => &h.base.id,
        }
    }

    #[must_use]
    pub fn kind(&self) -> NodeKind {
        match self {
            Self::Task(_) => NodeKind::Task,
            Self::Hook(_) => NodeKind::Hook,
        }
    }

    #[must_use]
    pub fn emits(&self) -> &'a [String] {
        match *self {
            Self::Task(t) => &t.emits,
            Self::Hook(h) => &h.emits,
        }
    }
}

impl<'a> From<TaskLike<'a>> for ElementRef<'a> {
    fn from(value: TaskLike<'a>) -> Self {
        match value {
            TaskLike::Task(t) => ElementRef::Task(t),
            TaskLike::Hook(h) => ElementRef::Hook(h),
        }
    }
}

/// Elements with a `dependsOn` list.
pub trait HasDependencies {
    fn depends_on(&self) -> &[String];

    fn emits(&self) -> &[String] {
        &[]
    }
}

impl HasDependencies for Task {
    fn depends_on(&self) -> &[String] {
        &self.depends_on
    }

    fn emits(&self) -> &[String] {
        &self.emits
    }
}

impl HasDependencies for Hook {
    fn depends_on(&self) -> &[String] {
        &self.depends_on
    }

    fn emits(&self) -> &[String] {
        &self.emits
    }
}

impl HasDependencies for Resource {
    fn depends_on(&self) -> &[String] {
        &self.depends_on
    }
}

impl HasDependencies for Middleware {
    fn depends_on(&self) -> &[String] {
        &self.depends_on
    }
}
