//! Time-boxed workflow shape extraction.
//!
//! The workflow body runs on its own task against a [`RecordingContext`]. The
//! extractor races it against a wall-clock budget; whichever loses is
//! discarded. A body that outlives the budget is aborted and its eventual
//! outcome is only logged.

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde_json::Value;

use crate::context::DurableWorkflow;
use crate::recorder::RecordingContext;
use crate::DurableFlowShape;

/// Why an extraction did not complete cleanly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtractionFailure {
    /// The workflow body returned an error.
    Threw { message: String },
    /// The workflow body panicked.
    Panicked { message: String },
    /// The workflow body did not finish within the budget.
    TimedOut { after_ms: u64 },
    /// The workflow body called a primitive the recorder cannot describe.
    Unsupported { primitive: String },
}

impl ExtractionFailure {
    /// Stable diagnostic code.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::Threw { .. } => "DURABLE_EXTRACTION_FAILED",
            Self::Panicked { .. } => "DURABLE_EXTRACTION_PANICKED",
            Self::TimedOut { .. } => "DURABLE_EXTRACTION_TIMEOUT",
            Self::Unsupported { .. } => "DURABLE_UNSUPPORTED_PRIMITIVE",
        }
    }
}

impl std::fmt::Display for ExtractionFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Threw { message } => write!(f, "workflow body failed: {message}"),
            Self::Panicked { message } => write!(f, "workflow body panicked: {message}"),
            Self::TimedOut { after_ms } => {
                write!(f, "workflow body did not finish within {after_ms}ms")
            }
            Self::Unsupported { primitive } => {
                write!(f, "workflow body used unsupported primitive '{primitive}'")
            }
        }
    }
}

/// Result of one extraction.
///
/// `shape` is `Some` whenever the body finished cleanly, and also on failure
/// if at least one node was recorded before it stopped.
#[derive(Debug, Clone, Default)]
pub struct Extraction {
    pub shape: Option<DurableFlowShape>,
    pub failure: Option<ExtractionFailure>,
    pub duration_ms: u64,
}

impl Extraction {
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.failure.is_none() && self.shape.is_some()
    }
}

/// Runs workflow bodies against a recording context under a timeout.
#[derive(Debug, Clone)]
pub struct FlowExtractor {
    timeout: Duration,
}

impl Default for FlowExtractor {
    fn default() -> Self {
        Self::new(Self::DEFAULT_TIMEOUT)
    }
}

impl FlowExtractor {
    /// Default wall-clock budget per extraction.
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(800);

    #[must_use]
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Extract the shape of `workflow` when invoked with `input`.
    ///
    /// Never fails: every problem is reported through [`Extraction::failure`].
    pub async fn extract(&self, workflow: Arc<dyn DurableWorkflow>, input: Value) -> Extraction {
        let start = Instant::now();
        let ctx = Arc::new(RecordingContext::new());

        let body_ctx = Arc::clone(&ctx);
        let mut handle =
            tokio::spawn(async move { workflow.run(&*body_ctx, input).await.map(|_| ()) });

        let failure = match tokio::time::timeout(self.timeout, &mut handle).await {
            Ok(Ok(Ok(()))) => None,
            Ok(Ok(Err(e))) => Some(ExtractionFailure::Threw {
                message: format!("{e:#}"),
            }),
            Ok(Err(join_err)) => Some(ExtractionFailure::Panicked {
                message: join_err.to_string(),
            }),
            Err(_) => {
                handle.abort();
                tokio::spawn(async move {
                    match handle.await {
                        Err(e) if e.is_cancelled() => {}
                        Err(e) => tracing::debug!(error = %e, "Abandoned workflow body failed"),
                        Ok(Err(e)) => tracing::debug!(error = %e, "Abandoned workflow body failed"),
                        Ok(Ok(())) => {}
                    }
                });
                Some(ExtractionFailure::TimedOut {
                    after_ms: u64::try_from(self.timeout.as_millis()).unwrap_or(u64::MAX),
                })
            }
        };

        // An unsupported primitive explains a thrown error, and is still
        // reported when the body swallowed it.
        let failure = match (ctx.unsupported().into_iter().next(), failure) {
            (Some(primitive), None | Some(ExtractionFailure::Threw { .. })) => {
                Some(ExtractionFailure::Unsupported { primitive })
            }
            (_, failure) => failure,
        };

        let shape = ctx.shape();
        let shape = if failure.is_none() || !shape.is_empty() {
            Some(shape)
        } else {
            None
        };

        let duration_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);
        match &failure {
            None => tracing::debug!(
                nodes = shape.as_ref().map_or(0, |s| s.nodes.len()),
                duration_ms,
                "Durable flow extracted"
            ),
            Some(f) => tracing::warn!(
                code = f.code(),
                error = %f,
                duration_ms,
                "Durable flow extraction incomplete"
            ),
        }

        Extraction {
            shape,
            failure,
            duration_ms,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_codes() {
        assert_eq!(
            ExtractionFailure::TimedOut { after_ms: 800 }.code(),
            "DURABLE_EXTRACTION_TIMEOUT"
        );
        assert_eq!(
            ExtractionFailure::Unsupported {
                primitive: "rollback".to_string()
            }
            .to_string(),
            "workflow body used unsupported primitive 'rollback'"
        );
    }

    #[test]
    fn test_default_timeout() {
        assert_eq!(FlowExtractor::default().timeout(), Duration::from_millis(800));
    }
}
