//! lens-inspect - offline inspection of a registry manifest
//!
//! Loads a registry manifest, builds a session and prints a summary, the
//! diagnostics, and optionally one element's relations, schemas or durable
//! flow shape.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;

use lens_core::config::LogFormat;
use lens_core::logging::init_tracing;
use lens_core::model::ElementRef;
use lens_core::schema::format_schema;
use lens_core::{Introspector, LensConfig, RawRegistry, Session, StaticCoverage, Telemetry};

/// Command-line arguments.
#[derive(Parser, Debug)]
#[command(name = "lens-inspect")]
#[command(about = "Inspect a registered application graph")]
#[command(version)]
struct Args {
    /// Registry manifest (JSON).
    #[arg(short, long, env = "RUNNER_LENS_MANIFEST")]
    manifest: PathBuf,

    /// Coverage report keyed by absolute source path.
    #[arg(long, env = "RUNNER_LENS_COVERAGE")]
    coverage: Option<PathBuf>,

    /// Element whose relations, schemas and coverage to print.
    #[arg(short, long)]
    element: Option<String>,

    /// Durable task whose flow shape to extract.
    #[arg(long)]
    durable: Option<String>,

    /// Emit JSON logs.
    #[arg(long)]
    json_logs: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut config = LensConfig::load()?;
    if args.json_logs {
        config.logging.format = LogFormat::Json;
    }

    let telemetry = Arc::new(Telemetry::new(&config.telemetry));
    init_tracing(&config.logging, Some(Arc::clone(&telemetry)));
    tracing::info!("Starting lens-inspect v{}", env!("CARGO_PKG_VERSION"));

    let raw = RawRegistry::load_manifest(&args.manifest)?;
    let mut session = Session::with_telemetry(config, telemetry, raw);
    if let Some(path) = &args.coverage {
        session = session.with_coverage(Arc::new(StaticCoverage::load(path)?));
    }

    let introspector = session.introspector();
    print_summary(&introspector);

    if let Some(id) = &args.element {
        print_element(&session, &introspector, id);
    }

    if let Some(task_id) = &args.durable {
        match session.durable_flow_shape(task_id).await {
            Some(report) => println!("{}", serde_json::to_string_pretty(&report)?),
            None => println!("'{task_id}' is not a durable task (or extraction is disabled)"),
        }
    }

    Ok(())
}

fn print_summary(introspector: &Introspector) {
    println!("Registry");
    println!("  tasks:          {}", introspector.tasks().len());
    println!("  hooks:          {}", introspector.hooks().len());
    println!("  resources:      {}", introspector.resources().len());
    println!("  middleware:     {}", introspector.middleware().len());
    println!("  events:         {}", introspector.events().len());
    println!("  tags:           {}", introspector.tags().len());
    println!("  errors:         {}", introspector.errors().len());
    println!("  async contexts: {}", introspector.async_contexts().len());
    if let Some(root) = introspector.root() {
        println!("  root:           {}", root.base.id);
    }
    let durable: Vec<&str> = introspector
        .durable_tasks()
        .iter()
        .map(|t| t.base.id.as_str())
        .collect();
    if !durable.is_empty() {
        println!("  durable tasks:  {}", durable.join(", "));
    }

    let diagnostics = introspector.diagnostics();
    println!();
    println!("Diagnostics ({})", diagnostics.len());
    for diagnostic in diagnostics {
        println!("  {diagnostic}");
    }
}

fn print_element(session: &Session, introspector: &Introspector, id: &str) {
    println!();
    let Some(element) = introspector.get_element(id) else {
        println!("No element with id '{id}'");
        return;
    };
    println!("{} {}", element.kind(), element.id());
    if let Some(path) = &element.base().file_path {
        println!("  file: {path}");
    }

    let deps = introspector.dependencies_of(id);
    print_ids("depends on tasks", deps.tasks.iter().map(|t| t.base.id.as_str()));
    print_ids("depends on hooks", deps.hooks.iter().map(|h| h.base.id.as_str()));
    print_ids(
        "depends on resources",
        deps.resources.iter().map(|r| r.base.id.as_str()),
    );
    print_ids("emits", deps.emitters.iter().map(|e| e.base.id.as_str()));
    print_ids(
        "dependents",
        introspector.dependents_of(id).iter().map(ElementRef::id),
    );

    if let ElementRef::Event(_) = element {
        print_ids(
            "emitted by",
            introspector.emitters_of_event(id).iter().map(|e| e.id()),
        );
        print_ids(
            "listened by",
            introspector.hooks_of_event(id).iter().map(|h| h.base.id.as_str()),
        );
    }

    for (role, schema) in element.schemas() {
        println!("  {role} schema:");
        for line in format_schema(schema).lines() {
            println!("    {line}");
        }
    }

    let coverage = session.coverage_for(id);
    if coverage.total_statements > 0 {
        println!(
            "  coverage: {:.1}% ({}/{} statements)",
            coverage.percentage, coverage.covered_statements, coverage.total_statements
        );
    }
}

fn print_ids<'a>(label: &str, ids: impl Iterator<Item = &'a str>) {
    let ids: Vec<&str> = ids.collect();
    if !ids.is_empty() {
        println!("  {label}: {}", ids.join(", "));
    }
}
