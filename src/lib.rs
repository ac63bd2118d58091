// src/lib.rs

pub mod calendar;
pub mod cli;
pub mod config;
pub mod engine;
pub mod errors;
pub mod graph;
pub mod logging;
pub mod report;
pub mod schedule;
pub mod types;
pub mod workflow;

use std::path::PathBuf;

use anyhow::{Context, Result};
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::cli::CliArgs;
use crate::config::load_and_validate;
use crate::engine::ProjectRegistry;
use crate::types::NodeKey;
use crate::workflow::{Action, ActionContext, WorkflowEvent};

/// High-level entry point used by `main.rs`.
///
/// Loads the project file, applies any `--apply` actions through the
/// project's runtime, recomputes the schedule and prints it.
pub async fn run(args: CliArgs) -> Result<()> {
    let config_path = PathBuf::from(&args.config);
    let cfg = load_and_validate(&config_path)
        .with_context(|| format!("loading {}", config_path.display()))?;

    if args.dry_run {
        print!("{}", report::render_dry_run(&cfg));
        debug!("dry-run complete (nothing scheduled)");
        return Ok(());
    }

    let actions = parse_apply_args(&args.apply)?;
    let as_of = args.as_of.unwrap_or(cfg.info.start_date);
    let project_id = cfg.info.id.clone();
    let core = cfg.build_project()?;

    let (event_tx, mut event_rx) = mpsc::channel::<WorkflowEvent>(64);
    let event_log = tokio::spawn(async move {
        while let Some(event) = event_rx.recv().await {
            debug!(?event, "workflow event");
        }
    });

    let mut registry = ProjectRegistry::new().with_event_sink(event_tx);
    registry.register(core)?;
    let handle = registry.get(&project_id)?;

    let mut ctx = ActionContext::on(as_of);
    if let Some(actor) = &args.actor {
        ctx = ctx.by(actor.clone());
    }
    if !actions.is_empty() {
        info!(count = actions.len(), "applying actions");
    }
    let outcome = handle.apply_and_recompute(actions, ctx, as_of).await?;
    if !outcome.transitions.is_empty() {
        print!("{}", report::render_transitions(&outcome.transitions));
        println!();
    }
    print!("{}", report::render_schedule(&outcome.schedule, &outcome.nodes));

    registry.remove(&project_id).await?;
    drop(registry);
    event_log.await?;
    Ok(())
}

/// Parse `--apply NODE=ACTION[=ARG]` entries.
fn parse_apply_args(raw: &[String]) -> Result<Vec<(NodeKey, Action)>> {
    raw.iter()
        .map(|entry| {
            let (node, action) = entry
                .split_once('=')
                .with_context(|| format!("--apply '{entry}': expected NODE=ACTION"))?;
            let node: NodeKey = node
                .trim()
                .parse()
                .map_err(|e| anyhow::anyhow!("--apply '{entry}': {e}"))?;
            let action: Action = action
                .parse()
                .map_err(|e| anyhow::anyhow!("--apply '{entry}': {e}"))?;
            Ok((node, action))
        })
        .collect()
}
