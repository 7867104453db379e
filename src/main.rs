//! canopy - Hierarchical Test Execution CLI
//!
//! A CLI for running plan-defined node trees with automatic
//! resource-lock inference and bounded parallel execution.
//!
//! ## Usage
//!
//! ```bash
//! # Execute a plan with the default parallelism
//! canopy run plan.yaml
//!
//! # Serial-by-default run with stored results
//! canopy run plan.yaml --default-mode same_thread --store
//!
//! # Inspect the inferred schedule without executing
//! canopy explain plan.yaml
//!
//! # Show the latest stored run
//! canopy results --latest
//! ```

use std::sync::Arc;

use anyhow::Result;
use chrono::Utc;
use clap::Parser;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use canopy::cli::{self, Args};
use canopy::config::{AppConfig, EnvConfig, ExecutionConfig};
use canopy::executor::{execute_all, explain, CancelToken};
use canopy::models::ExecutionMode;
use canopy::output::{write_summary_to_file, LoggingListener, OutputFormat, ResultFormatter};
use canopy::plan::PlanFile;
use canopy::results::{ResultStore, StoredRun};

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let level = if args.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .compact()
        .init();

    match args.command {
        cli::Command::Run(run_args) => {
            run_plan(run_args).await?;
        }
        cli::Command::Explain(explain_args) => {
            explain_plan(explain_args)?;
        }
        cli::Command::Results(results_args) => {
            show_results(results_args)?;
        }
    }

    Ok(())
}

fn build_execution_config(args: &cli::RunArgs, app: &AppConfig, env: &EnvConfig) -> Result<ExecutionConfig> {
    let mut exec = app.execution.clone().with_env_overrides(env);

    if let Some(parallelism) = args.parallelism {
        exec = exec.with_parallelism(parallelism);
    }
    if let Some(mode) = args.default_mode.as_deref() {
        let mode = ExecutionMode::from_str(mode)
            .ok_or_else(|| anyhow::anyhow!("Unknown execution mode: {mode}"))?;
        exec = exec.with_default_mode(mode);
    }
    Ok(exec)
}

async fn run_plan(args: cli::RunArgs) -> Result<()> {
    let env = EnvConfig::load();
    let app = match args.config.as_deref().or(env.config_file.as_deref()) {
        Some(path) => AppConfig::load(path)?,
        None => AppConfig::default(),
    };
    let exec = build_execution_config(&args, &app, &env)?;

    let plan = PlanFile::load(&args.plan)?;
    info!(
        "Executing plan {} ({} nodes, parallelism {})",
        plan.name,
        plan.node_count(),
        exec.parallelism
    );

    let token = CancelToken::new();
    let signal_token = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Cancellation requested; running nodes will finish");
            signal_token.cancel();
        }
    });

    let started_at = Utc::now();
    let summary = execute_all(
        plan.build_tree(),
        Arc::new(LoggingListener),
        token,
        &exec,
    )
    .await?;

    let format = OutputFormat::from_str(&args.format).unwrap_or(OutputFormat::Table);
    let formatter = ResultFormatter::new(format);
    println!("{}", formatter.format_summary(&summary));

    if let Some(path) = &args.output {
        write_summary_to_file(path, &summary, format)?;
        info!("Wrote results to {path}");
    }

    if args.store {
        let store = match app.results_dir.as_deref().or(env.results_dir.as_deref()) {
            Some(dir) => ResultStore::new(dir),
            None => ResultStore::default_dir(),
        };
        store.save(&StoredRun::new(summary.clone(), &exec, started_at))?;
    }

    if summary.failed > 0 {
        std::process::exit(1);
    }

    Ok(())
}

fn explain_plan(args: cli::ExplainArgs) -> Result<()> {
    let plan = PlanFile::load(&args.plan)?;
    let advice = explain(&plan.build_tree())?;

    println!("\nExecution plan for {} ({} nodes)\n", plan.name, advice.len());
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    for node in &advice {
        let mode = match (node.forced_mode, node.declared_mode) {
            (Some(forced), _) => format!("{forced} (forced)"),
            (None, Some(declared)) => declared.to_string(),
            (None, None) => "default".to_string(),
        };

        if node.lock.is_empty() {
            println!("  {:44} {}", node.path, mode);
        } else {
            let keys: Vec<String> = node.lock.iter().map(ToString::to_string).collect();
            println!("  {:44} {} | locks: {}", node.path, mode, keys.join(", "));
        }
    }

    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━\n");
    Ok(())
}

fn show_results(args: cli::ResultsArgs) -> Result<()> {
    let env = EnvConfig::load();
    let store = match args.dir.as_deref().or(env.results_dir.as_deref()) {
        Some(dir) => ResultStore::new(dir),
        None => ResultStore::default_dir(),
    };

    let format = OutputFormat::from_str(&args.format).unwrap_or(OutputFormat::Table);
    let formatter = ResultFormatter::new(format);

    if let Some(id) = &args.id {
        let run = store.load(id)?;
        println!("{}", formatter.format_summary(&run.summary));
        return Ok(());
    }

    if args.latest {
        match store.latest()? {
            Some(run) => {
                info!("Run {} ({} -> {})", run.id, run.started_at, run.completed_at);
                println!("{}", formatter.format_summary(&run.summary));
            }
            None => println!("No stored runs in {}", store.base_dir().display()),
        }
        return Ok(());
    }

    let ids = store.list()?;
    if ids.is_empty() {
        println!("No stored runs in {}", store.base_dir().display());
    } else {
        println!("\nStored runs ({}):\n", ids.len());
        for id in ids {
            println!("  {id}");
        }
        println!();
    }
    Ok(())
}
