//! CLI argument parsing
//!
//! Defines command-line interface using clap.

use clap::{Parser, Subcommand};

/// Hierarchical test execution engine
#[derive(Parser, Debug)]
#[command(name = "canopy")]
#[command(author = "hephaex@gmail.com")]
#[command(version = "0.1.0")]
#[command(about = "Execute node trees concurrently with automatic resource-lock inference")]
#[command(long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Execute a plan file
    Run(RunArgs),

    /// Show inferred locks and execution modes without running anything
    Explain(ExplainArgs),

    /// View stored run results
    Results(ResultsArgs),
}

/// Arguments for run command
#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Plan file (YAML or JSON)
    pub plan: String,

    /// Maximum node bodies in flight at once (default: CPU count)
    #[arg(short, long)]
    pub parallelism: Option<usize>,

    /// Default execution mode (concurrent, same_thread)
    #[arg(short, long)]
    pub default_mode: Option<String>,

    /// Output format (table, json, json-pretty, csv, summary)
    #[arg(short, long, default_value = "table")]
    pub format: String,

    /// Save formatted output to file
    #[arg(short, long)]
    pub output: Option<String>,

    /// Store the run in the results directory
    #[arg(short, long)]
    pub store: bool,

    /// Config file path
    #[arg(short, long)]
    pub config: Option<String>,
}

/// Arguments for explain command
#[derive(Parser, Debug)]
pub struct ExplainArgs {
    /// Plan file (YAML or JSON)
    pub plan: String,
}

/// Arguments for results command
#[derive(Parser, Debug)]
pub struct ResultsArgs {
    /// Show the latest stored run
    #[arg(short, long)]
    pub latest: bool,

    /// Load a specific run by ID
    #[arg(short, long)]
    pub id: Option<String>,

    /// Output format
    #[arg(short, long, default_value = "table")]
    pub format: String,

    /// Results directory override
    #[arg(long)]
    pub dir: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_parsing() {
        let args = Args::parse_from(["canopy", "explain", "plan.yaml"]);
        match args.command {
            Command::Explain(explain_args) => {
                assert_eq!(explain_args.plan, "plan.yaml");
            }
            _ => panic!("Expected Explain command"),
        }
    }

    #[test]
    fn test_run_args() {
        let args = Args::parse_from([
            "canopy",
            "run",
            "plan.yaml",
            "--parallelism",
            "8",
            "--default-mode",
            "same_thread",
            "--store",
        ]);
        match args.command {
            Command::Run(run_args) => {
                assert_eq!(run_args.plan, "plan.yaml");
                assert_eq!(run_args.parallelism, Some(8));
                assert_eq!(run_args.default_mode.as_deref(), Some("same_thread"));
                assert!(run_args.store);
                assert_eq!(run_args.format, "table");
            }
            _ => panic!("Expected Run command"),
        }
    }

    #[test]
    fn test_results_args() {
        let args = Args::parse_from(["canopy", "results", "--latest", "--format", "json"]);
        match args.command {
            Command::Results(results_args) => {
                assert!(results_args.latest);
                assert_eq!(results_args.format, "json");
            }
            _ => panic!("Expected Results command"),
        }
    }
}
