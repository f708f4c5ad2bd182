// src/lib.rs

pub mod cli;
pub mod config;
pub mod context;
pub mod dag;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod fs;
pub mod intercept;
pub mod logging;
pub mod serve;
pub mod tasks;
pub mod types;
pub mod watch;

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::cli::{CliArgs, Invocation};
use crate::config::{SiteConfig, resolve_config};
use crate::context::BuildContext;
use crate::dag::{DagGraph, Pipeline, Scheduler};
use crate::engine::{CoreRuntime, Runtime, RuntimeEvent, RuntimeOptions, TriggerReason};
use crate::exec::RealExecutorBackend;
use crate::fs::RealFileSystem;
use crate::intercept::DesktopNotifier;
use crate::types::BuildMode;

/// The pipeline an invocation runs.
pub fn pipeline_for(invocation: Invocation) -> Pipeline {
    match invocation {
        Invocation::Build => Pipeline::production(),
        Invocation::Dev => Pipeline::development(),
        Invocation::Single(task) => Pipeline::single(task),
    }
}

/// High-level entry point used by `main.rs`.
///
/// Resolves config and build mode, compiles the pipeline, then runs it until
/// it finishes (build, single task) or Ctrl-C (dev).
pub async fn run(args: CliArgs) -> Result<()> {
    let root = std::env::current_dir().context("reading current directory")?;
    let config = resolve_config(args.config.as_deref().map(Path::new), &root)?;

    let mode = config::environment::from_process_env();
    let pipeline = pipeline_for(args.invocation());
    let graph = DagGraph::from_pipeline(&pipeline)?;

    info!(%mode, pipeline = pipeline.name(), root = ?root, "sitepipe starting");

    if args.dry_run {
        print_dry_run(mode, &pipeline, &graph, &config);
        return Ok(());
    }

    let behaviour = config.watch().triggered_while_running_behaviour;
    let queue_length = config.watch().queue_length;

    let ctx = Arc::new(BuildContext::new(
        mode,
        config,
        root,
        Arc::new(RealFileSystem),
        Arc::new(DesktopNotifier),
    ));

    let (rt_tx, rt_rx) = mpsc::channel::<RuntimeEvent>(64);
    let executor = RealExecutorBackend::new(Arc::clone(&ctx), rt_tx.clone());

    {
        let tx = rt_tx.clone();
        tokio::spawn(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                eprintln!("failed to listen for Ctrl+C: {e}");
                return;
            }
            let _ = tx.send(RuntimeEvent::ShutdownRequested).await;
        });
    }

    let roots = graph.roots();
    info!(?roots, "initial pipeline roots to trigger at startup");
    for task in roots {
        rt_tx
            .send(RuntimeEvent::TaskTriggered {
                task,
                reason: TriggerReason::Manual,
            })
            .await?;
    }

    let options = RuntimeOptions {
        exit_when_idle: !pipeline.is_long_lived(),
    };
    let core = CoreRuntime::new(Scheduler::new(graph), behaviour, queue_length, options);

    Runtime::new(core, rt_rx, executor).run().await?;
    Ok(())
}

fn print_dry_run(mode: BuildMode, pipeline: &Pipeline, graph: &DagGraph, config: &SiteConfig) {
    println!("sitepipe dry-run");
    println!("  mode = {mode}");
    println!("  pipeline = {}", pipeline.name());
    println!("  build dir = {}", config.build_dir().display());
    println!();

    println!("paths:");
    for entry in config.paths().entries() {
        println!(
            "  {:<12} {:<40} -> {}",
            entry.category.as_str(),
            entry.source,
            entry.output.display()
        );
    }
    println!();

    let tasks: Vec<_> = graph.tasks().collect();
    println!("tasks ({}):", tasks.len());
    for task in tasks {
        let deps = graph.dependencies_of(task);
        if deps.is_empty() {
            println!("  - {task}");
        } else {
            let deps: Vec<_> = deps.iter().map(|d| d.as_str()).collect();
            println!("  - {task} (after {})", deps.join(", "));
        }
    }

    debug!("dry-run complete (no execution)");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TaskId;

    #[test]
    fn invocations_pick_their_pipeline() {
        assert_eq!(pipeline_for(Invocation::Build).name(), "build");
        assert!(pipeline_for(Invocation::Dev).is_long_lived());
        assert_eq!(
            pipeline_for(Invocation::Single(TaskId::Js)).tasks(),
            vec![TaskId::Js]
        );
    }
}
