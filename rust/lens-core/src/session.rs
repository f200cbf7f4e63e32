//! The long-lived owner of one introspection session.
//!
//! Readers take a cheap `Arc` of the current introspector; a rebuild builds
//! the replacement without holding the lock and publishes it in one swap.

use std::sync::Arc;

use durable_lens::FlowExtractor;
use parking_lot::RwLock;
use serde_json::Value;

use crate::config::LensConfig;
use crate::coverage::{CoverageSource, CoverageSummary};
use crate::introspector::{FlowShapeReport, Introspector};
use crate::paths::PathSanitizer;
use crate::registry::{RawRegistry, RegistrySnapshot};
use crate::telemetry::Telemetry;

pub struct Session {
    config: LensConfig,
    telemetry: Arc<Telemetry>,
    sanitizer: PathSanitizer,
    extractor: FlowExtractor,
    coverage: Option<Arc<dyn CoverageSource>>,
    current: RwLock<Arc<Introspector>>,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("config", &self.config)
            .field("sanitizer", &self.sanitizer)
            .field("has_coverage", &self.coverage.is_some())
            .finish_non_exhaustive()
    }
}

impl Session {
    /// Start a session over `raw` with fresh telemetry buffers.
    pub fn new(config: LensConfig, raw: RawRegistry) -> Self {
        let telemetry = Arc::new(Telemetry::new(&config.telemetry));
        Self::with_telemetry(config, telemetry, raw)
    }

    /// Start a session sharing an existing telemetry hub.
    pub fn with_telemetry(config: LensConfig, telemetry: Arc<Telemetry>, raw: RawRegistry) -> Self {
        let sanitizer = PathSanitizer::from_config(&config.paths);
        let extractor = FlowExtractor::new(config.durable.extraction_timeout());
        let introspector = build(&config, &sanitizer, raw);
        Self {
            config,
            telemetry,
            sanitizer,
            extractor,
            coverage: None,
            current: RwLock::new(Arc::new(introspector)),
        }
    }

    #[must_use]
    pub fn with_coverage(mut self, coverage: Arc<dyn CoverageSource>) -> Self {
        self.coverage = Some(coverage);
        self
    }

    #[must_use]
    pub fn config(&self) -> &LensConfig {
        &self.config
    }

    #[must_use]
    pub fn telemetry(&self) -> &Arc<Telemetry> {
        &self.telemetry
    }

    #[must_use]
    pub fn sanitizer(&self) -> &PathSanitizer {
        &self.sanitizer
    }

    /// The introspector current at call time.
    #[must_use]
    pub fn introspector(&self) -> Arc<Introspector> {
        Arc::clone(&self.current.read())
    }

    /// Replace the graph. Holders of the previous introspector keep it.
    ///
    /// Tunnel info and cached flow shapes start empty on the new one.
    pub fn rebuild(&self, raw: RawRegistry) -> Arc<Introspector> {
        let next = Arc::new(build(&self.config, &self.sanitizer, raw));
        *self.current.write() = Arc::clone(&next);
        tracing::info!(
            elements = next.snapshot().len(),
            diagnostics = next.diagnostics().len(),
            "Session rebuilt"
        );
        next
    }

    /// Flow shape of a durable task, or `None` when extraction is disabled
    /// or the task is unknown or not durable.
    pub async fn durable_flow_shape(&self, task_id: &str) -> Option<FlowShapeReport> {
        if !self.config.durable.enabled {
            return None;
        }
        let introspector = self.introspector();
        introspector
            .durable_flow_shape(task_id, &self.extractor)
            .await
    }

    /// Coverage of the element's source file; zeroed when anything is missing.
    #[must_use]
    pub fn coverage_for(&self, element_id: &str) -> CoverageSummary {
        self.with_source_path(element_id, |coverage, path| coverage.summary(path))
            .unwrap_or_default()
    }

    /// Raw coverage details of the element's source file, if any.
    #[must_use]
    pub fn coverage_details(&self, element_id: &str) -> Option<Value> {
        self.with_source_path(element_id, |coverage, path| coverage.details(path))
    }

    fn with_source_path<T>(
        &self,
        element_id: &str,
        f: impl FnOnce(&dyn CoverageSource, &std::path::Path) -> Option<T>,
    ) -> Option<T> {
        let coverage = self.coverage.as_deref()?;
        let introspector = self.introspector();
        let element = introspector.get_element(element_id)?;
        let path = element.base().source_path.as_deref()?;
        f(coverage, path)
    }
}

fn build(config: &LensConfig, sanitizer: &PathSanitizer, raw: RawRegistry) -> Introspector {
    let snapshot = RegistrySnapshot::build(raw, sanitizer, &config.introspection);
    Introspector::build(snapshot, &config.introspection)
}
