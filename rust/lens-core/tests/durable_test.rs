//! Durable task detection and flow shapes through a session.

use std::time::Duration;

use async_trait::async_trait;
use durable_lens::prelude::*;
use lens_core::introspector::DURABLE_WORKFLOW_TAG;
use lens_core::model::{TagRef, WorkflowBody};
use lens_core::registry::{RawResource, RawTask};
use lens_core::{LensConfig, RawRegistry, Session};
use serde_json::{Value, json};

struct CheckoutWorkflow;

#[async_trait]
impl DurableWorkflow for CheckoutWorkflow {
    async fn run(&self, ctx: &dyn DurableContext, _input: Value) -> anyhow::Result<Value> {
        ctx.step(StepSpec::new("reserve", || async { Ok(json!({"reserved": true})) }))
            .await?;
        ctx.sleep(Duration::from_secs(30), Some("settle")).await?;
        ctx.emit("shop.events.paid", json!({}), None).await?;
        Ok(Value::Null)
    }
}

/// Stalls on a real timer after its first step.
struct StallingWorkflow;

#[async_trait]
impl DurableWorkflow for StallingWorkflow {
    async fn run(&self, ctx: &dyn DurableContext, _input: Value) -> anyhow::Result<Value> {
        ctx.step(StepSpec::new("lookup", || async { Ok(Value::Null) }))
            .await?;
        tokio::time::sleep(Duration::from_secs(30)).await;
        Ok(Value::Null)
    }
}

fn registry() -> RawRegistry {
    RawRegistry {
        tasks: vec![
            RawTask::new("shop.tasks.checkout")
                .depends_on(["shop.durable"])
                .workflow(WorkflowBody::new(CheckoutWorkflow)),
            RawTask::new("shop.tasks.lookup")
                .depends_on(["shop.workflows"])
                .workflow(WorkflowBody::new(StallingWorkflow)),
            RawTask::new("shop.tasks.unbodied").depends_on(["shop.durable"]),
            RawTask::new("shop.tasks.plain").depends_on(["shop.db"]),
        ],
        resources: vec![
            RawResource::new("shop.durable"),
            RawResource::new("shop.workflows").tags([TagRef::from(DURABLE_WORKFLOW_TAG)]),
            RawResource::new("shop.db"),
        ],
        ..RawRegistry::default()
    }
}

fn session() -> Session {
    let mut config = LensConfig::default();
    config.introspection.check_source_files = false;
    config.durable.extraction_timeout_ms = 100;
    Session::new(config, registry())
}

#[test]
fn test_durable_detection() {
    let session = session();
    let introspector = session.introspector();

    assert!(introspector.is_durable_task("shop.tasks.checkout"));
    assert!(introspector.is_durable_task("shop.tasks.lookup"));
    assert!(!introspector.is_durable_task("shop.tasks.plain"));
    assert!(!introspector.is_durable_task("shop.tasks.unknown"));

    let durable: Vec<&str> = introspector
        .durable_tasks()
        .iter()
        .map(|t| t.base.id.as_str())
        .collect();
    assert_eq!(
        durable,
        vec!["shop.tasks.checkout", "shop.tasks.lookup", "shop.tasks.unbodied"]
    );
    assert!(introspector.get_task("shop.tasks.checkout").unwrap().is_durable);
}

#[tokio::test]
async fn test_flow_shape_of_complete_workflow() {
    let session = session();
    let report = session
        .durable_flow_shape("shop.tasks.checkout")
        .await
        .unwrap();

    assert!(report.is_complete());
    let shape = report.shape.unwrap();
    let kinds: Vec<&str> = shape.nodes.iter().map(FlowNode::kind).collect();
    assert_eq!(kinds, vec!["step", "sleep", "emit"]);
    assert_eq!(shape.step_ids(), vec!["reserve", "settle"]);
}

#[tokio::test]
async fn test_timeout_keeps_partial_shape() {
    let session = session();
    let report = session
        .durable_flow_shape("shop.tasks.lookup")
        .await
        .unwrap();

    assert_eq!(report.diagnostics.len(), 1);
    assert_eq!(report.diagnostics[0].code, "DURABLE_EXTRACTION_TIMEOUT");
    assert_eq!(report.shape.unwrap().step_ids(), vec!["lookup"]);
}

#[tokio::test]
async fn test_missing_body_and_non_durable() {
    let session = session();

    let report = session
        .durable_flow_shape("shop.tasks.unbodied")
        .await
        .unwrap();
    assert!(report.shape.is_none());
    assert_eq!(report.diagnostics[0].code, "DURABLE_EXTRACTION_NO_BODY");

    assert!(session.durable_flow_shape("shop.tasks.plain").await.is_none());
    assert!(session.durable_flow_shape("shop.tasks.unknown").await.is_none());
}

#[tokio::test]
async fn test_rebuild_drops_cached_shapes() {
    let session = session();
    let before = session.introspector();
    session.durable_flow_shape("shop.tasks.checkout").await.unwrap();

    let mut raw = registry();
    raw.tasks.retain(|t| t.base.id.as_deref() != Some("shop.tasks.checkout"));
    session.rebuild(raw);

    assert!(session.durable_flow_shape("shop.tasks.checkout").await.is_none());
    assert!(before.get_task("shop.tasks.checkout").is_some());
}
