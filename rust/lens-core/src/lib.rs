//! Runner Lens - introspection and live telemetry for DI application graphs
//!
//! This crate turns the registered elements of a dependency-injected
//! application (tasks, hooks, resources, middleware, events, tags, errors and
//! async contexts) into a queryable graph, and keeps bounded live telemetry
//! next to it:
//!
//! - **Snapshot**: one-shot ingestion of a raw registry into an interned model
//! - **Introspector**: O(1) id lookups plus reverse indexes (emitters,
//!   listeners, tag carriers, middleware users, registrants, overrides)
//! - **Durable flows**: static shape of durable workflow tasks
//! - **Telemetry**: ring buffers of logs, emissions, errors and runs with
//!   cursor-based polling
//! - **Schemas**: readable text for JSON Schema documents
//!
//! # Architecture
//!
//! - [`config`]: layered configuration and validation
//! - [`registry`]: raw registry types and the [`RegistrySnapshot`]
//! - [`introspector`]: indexes and all graph queries
//! - [`telemetry`]: ring buffers, record filters, the tracing capture layer
//! - [`runtime`]: interceptor chain that records runs
//! - [`session`]: owner of the current introspector, swapped atomically
//!
//! # Example
//!
//! ```rust,ignore
//! use lens_core::{LensConfig, RawRegistry, Session};
//!
//! let raw = RawRegistry::load_manifest(Path::new("registry.json"))?;
//! let session = Session::new(LensConfig::load()?, raw);
//! let introspector = session.introspector();
//! for event in introspector.events() {
//!     println!("{} <- {:?}", event.base.id, introspector.emitters_of_event(&event.base.id));
//! }
//! ```

pub mod config;
pub mod coverage;
pub mod error;
pub mod introspector;
pub mod logging;
pub mod model;
pub mod paths;
pub mod registry;
pub mod runtime;
pub mod schema;
pub mod session;
pub mod telemetry;

pub use config::LensConfig;
pub use coverage::{CoverageSource, CoverageSummary, StaticCoverage};
pub use error::{LensError, LensResult};
pub use introspector::Introspector;
pub use model::{Diagnostic, NodeKind, Severity};
pub use paths::PathSanitizer;
pub use registry::{RawRegistry, RegistrySnapshot};
pub use session::Session;
pub use telemetry::Telemetry;
