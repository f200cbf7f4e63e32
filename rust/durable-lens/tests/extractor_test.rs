//! Integration tests for durable flow extraction.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use durable_lens::prelude::*;
use serde_json::{Value, json};

/// Order workflow touching every primitive the recorder understands.
struct OrderWorkflow {
    side_effects: Arc<AtomicUsize>,
}

#[async_trait]
impl DurableWorkflow for OrderWorkflow {
    async fn run(&self, ctx: &dyn DurableContext, input: Value) -> anyhow::Result<Value> {
        let effects = Arc::clone(&self.side_effects);
        let refund = Arc::clone(&self.side_effects);
        ctx.step(
            StepSpec::new("charge", move || async move {
                effects.fetch_add(1, Ordering::SeqCst);
                Ok(json!({"charged": true}))
            })
            .with_compensation(move || async move {
                refund.fetch_add(1, Ordering::SeqCst);
                Ok(Value::Null)
            }),
        )
        .await?;

        ctx.sleep(Duration::from_secs(3600), Some("cool-off")).await?;

        let approval = ctx
            .wait_for_signal(
                "orders.approved",
                SignalOptions {
                    timeout: Some(Duration::from_secs(60)),
                    step_id: None,
                },
            )
            .await?;
        if approval == SignalOutcome::TimedOut {
            anyhow::bail!("approval timed out");
        }

        let tier = input["tier"].clone();
        let effects = Arc::clone(&self.side_effects);
        ctx.switch(
            SwitchSpec::new("route", tier)
                .branch(Branch::new(
                    "express",
                    |v| v == "gold",
                    move || async move {
                        effects.fetch_add(1, Ordering::SeqCst);
                        Ok(Value::Null)
                    },
                ))
                .branch(Branch::new("standard", |v| v == "silver", || async {
                    Ok(Value::Null)
                }))
                .otherwise(|| async { Ok(Value::Null) }),
        )
        .await?;

        ctx.emit("orders.shipped", json!({"id": 1}), Some("notify"))
            .await?;
        ctx.note("done").await?;
        Ok(Value::Null)
    }
}

struct FailingWorkflow;

#[async_trait]
impl DurableWorkflow for FailingWorkflow {
    async fn run(&self, ctx: &dyn DurableContext, _input: Value) -> anyhow::Result<Value> {
        ctx.note("before failure").await?;
        anyhow::bail!("inventory service unreachable")
    }
}

struct HangingWorkflow;

#[async_trait]
impl DurableWorkflow for HangingWorkflow {
    async fn run(&self, ctx: &dyn DurableContext, _input: Value) -> anyhow::Result<Value> {
        ctx.step(StepSpec::new("prepare", || async { Ok(Value::Null) }))
            .await?;
        std::future::pending::<()>().await;
        Ok(Value::Null)
    }
}

struct RollbackWorkflow;

#[async_trait]
impl DurableWorkflow for RollbackWorkflow {
    async fn run(&self, ctx: &dyn DurableContext, _input: Value) -> anyhow::Result<Value> {
        ctx.step(StepSpec::new("reserve", || async { Ok(Value::Null) }))
            .await?;
        ctx.rollback().await?;
        Ok(Value::Null)
    }
}

struct SilentFailureWorkflow;

#[async_trait]
impl DurableWorkflow for SilentFailureWorkflow {
    async fn run(&self, _ctx: &dyn DurableContext, _input: Value) -> anyhow::Result<Value> {
        anyhow::bail!("failed before any primitive")
    }
}

#[tokio::test]
async fn test_extracts_full_shape_without_side_effects() {
    let side_effects = Arc::new(AtomicUsize::new(0));
    let workflow = Arc::new(OrderWorkflow {
        side_effects: Arc::clone(&side_effects),
    });

    let extraction = FlowExtractor::default()
        .extract(workflow, json!({"tier": "gold"}))
        .await;

    assert!(extraction.is_complete());
    assert_eq!(side_effects.load(Ordering::SeqCst), 0);

    let shape = extraction.shape.unwrap();
    assert_eq!(
        shape.nodes,
        vec![
            FlowNode::Step {
                step_id: "charge".to_string(),
                has_compensation: true,
            },
            FlowNode::Sleep {
                duration_ms: 3_600_000,
                step_id: Some("cool-off".to_string()),
            },
            FlowNode::WaitForSignal {
                signal_id: "orders.approved".to_string(),
                timeout_ms: Some(60_000),
                step_id: None,
            },
            FlowNode::Switch {
                step_id: "route".to_string(),
                branch_ids: vec!["express".to_string(), "standard".to_string()],
                has_default: true,
            },
            FlowNode::Emit {
                event_id: "orders.shipped".to_string(),
                step_id: Some("notify".to_string()),
            },
            FlowNode::Note {
                message: "done".to_string(),
            },
        ]
    );
}

#[tokio::test]
async fn test_thrown_error_keeps_partial_shape() {
    let extraction = FlowExtractor::default()
        .extract(Arc::new(FailingWorkflow), Value::Null)
        .await;

    let failure = extraction.failure.unwrap();
    assert_eq!(failure.code(), "DURABLE_EXTRACTION_FAILED");
    assert!(failure.to_string().contains("inventory service unreachable"));
    assert_eq!(extraction.shape.unwrap().nodes.len(), 1);
}

#[tokio::test]
async fn test_failure_without_nodes_has_no_shape() {
    let extraction = FlowExtractor::default()
        .extract(Arc::new(SilentFailureWorkflow), Value::Null)
        .await;

    assert!(extraction.shape.is_none());
    assert!(extraction.failure.is_some());
}

#[tokio::test]
async fn test_hanging_body_times_out() {
    let extractor = FlowExtractor::new(Duration::from_millis(50));
    let extraction = extractor
        .extract(Arc::new(HangingWorkflow), Value::Null)
        .await;

    assert_eq!(
        extraction.failure,
        Some(ExtractionFailure::TimedOut { after_ms: 50 })
    );
    assert_eq!(extraction.shape.unwrap().step_ids(), vec!["prepare"]);
}

#[tokio::test]
async fn test_unsupported_primitive_is_reported() {
    let extraction = FlowExtractor::default()
        .extract(Arc::new(RollbackWorkflow), Value::Null)
        .await;

    assert_eq!(
        extraction.failure,
        Some(ExtractionFailure::Unsupported {
            primitive: "rollback".to_string()
        })
    );
    assert_eq!(extraction.shape.unwrap().step_ids(), vec!["reserve"]);
}
