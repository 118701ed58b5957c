//! Toolflow CLI - run chained tool workflows against a tool backend.

mod load;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use toolflow_core::{templates, RunStatus};
use toolflow_execution::{execute, BatchOptions, BatchRunner, ExecutorOptions, ItemOutcome};
use toolflow_tools::{
    suggest_workflow, BackendConfig, HttpToolBackend, ToolCatalog, DEFAULT_SUGGESTION_LIMIT,
};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "toolflow")]
#[command(about = "Chain tool calls into workflows", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Tool backend URL (defaults to ACI_BACKEND_URL)
    #[arg(long, global = true)]
    backend_url: Option<String>,

    /// API key (defaults to ACI_API_KEY)
    #[arg(long, global = true)]
    api_key: Option<String>,

    /// Request timeout in seconds (defaults to ACI_TIMEOUT_SECS)
    #[arg(long, global = true)]
    timeout_secs: Option<u64>,

    /// Verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a workflow once
    Run {
        /// Workflow definition (JSON)
        #[arg(long, conflicts_with = "template")]
        workflow: Option<PathBuf>,
        /// Built-in template name
        #[arg(long)]
        template: Option<String>,
        /// Input value as key=value (repeatable)
        #[arg(long = "input", short = 'i')]
        inputs: Vec<String>,
        /// Input object (JSON)
        #[arg(long)]
        input_file: Option<PathBuf>,
        /// Keep going after a failed step
        #[arg(long)]
        continue_on_failure: bool,
        /// Write the outcome to a file instead of stdout
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
    /// Run a workflow once per input item
    Batch {
        /// Workflow definition (JSON)
        #[arg(long, conflicts_with = "template")]
        workflow: Option<PathBuf>,
        /// Built-in template name
        #[arg(long)]
        template: Option<String>,
        /// JSON array of input objects
        #[arg(long)]
        inputs: PathBuf,
        /// Record failed items instead of aborting
        #[arg(long)]
        continue_on_fail: bool,
        /// Keep going after a failed step inside an item
        #[arg(long)]
        continue_on_failure: bool,
        /// Items run at once
        #[arg(long, default_value = "1")]
        concurrency: usize,
        /// Write the results to a file instead of stdout
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
    /// List available apps
    Apps,
    /// List functions of an app
    Functions {
        /// App name
        app: String,
    },
    /// Search functions by description
    Search {
        /// Search text
        query: String,
        /// Maximum results
        #[arg(long, default_value = "10")]
        limit: usize,
    },
    /// Suggest a workflow for a description
    Suggest {
        /// What the workflow should do
        description: String,
        /// Maximum tools to propose
        #[arg(long, default_value_t = DEFAULT_SUGGESTION_LIMIT)]
        limit: usize,
    },
    /// Print a built-in template, or list them
    Template {
        /// Template name
        name: Option<String>,
    },
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    // stdout carries results, so logs go to stderr
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn backend_config(cli: &Cli) -> BackendConfig {
    let mut config = BackendConfig::from_env();
    if let Some(url) = &cli.backend_url {
        config = config.with_base_url(url.clone());
    }
    if let Some(key) = &cli.api_key {
        config = config.with_api_key(key.clone());
    }
    if let Some(secs) = cli.timeout_secs {
        config = config.with_timeout(Duration::from_secs(secs));
    }
    config
}

fn emit<T: Serialize>(value: &T, output: Option<&Path>) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    match output {
        Some(path) => {
            std::fs::write(path, json)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            info!("Wrote {}", path.display());
        }
        None => println!("{}", json),
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = backend_config(&cli);
    debug!(backend = %config.base_url, "Using tool backend");
    let backend = Arc::new(HttpToolBackend::new(config));

    match cli.command {
        Commands::Run {
            workflow,
            template,
            inputs,
            input_file,
            continue_on_failure,
            output,
        } => {
            let workflow = load::workflow(workflow.as_deref(), template.as_deref())?;
            let input = load::input(input_file.as_deref(), &inputs)?;

            let outcome = execute(
                backend,
                &workflow,
                &input,
                ExecutorOptions { continue_on_failure },
            )
            .await?;
            emit(&outcome, output.as_deref())?;

            if let RunStatus::Failed { index, error } = &outcome.status {
                bail!("Workflow '{}' failed at step {}: {}", workflow.name(), index, error);
            }
        }
        Commands::Batch {
            workflow,
            template,
            inputs,
            continue_on_fail,
            continue_on_failure,
            concurrency,
            output,
        } => {
            let workflow = load::workflow(workflow.as_deref(), template.as_deref())?;
            let items = load::inputs(&inputs)?;

            let runner = BatchRunner::new(backend).with_options(BatchOptions {
                step: ExecutorOptions { continue_on_failure },
                continue_on_fail,
                concurrency,
            });
            let results = runner.run(&workflow, items).await?;
            emit(&results, output.as_deref())?;

            let failed = results
                .iter()
                .filter(|r| matches!(r.outcome, ItemOutcome::Failed(_)))
                .count();
            info!("{} items, {} failed", results.len(), failed);
        }
        Commands::Apps => {
            let apps = backend.list_apps().await?;
            println!("Apps ({})", apps.len());
            for app in apps {
                match &app.description {
                    Some(description) => println!("  {} - {}", app.label(), description),
                    None => println!("  {}", app.label()),
                }
            }
        }
        Commands::Functions { app } => {
            let functions = backend.list_functions(&app).await?;
            println!("Functions of {} ({})", app, functions.len());
            for function in functions {
                println!("  {} - {}", function.name, function.about().unwrap_or(""));
            }
        }
        Commands::Search { query, limit } => {
            let functions = backend.search_functions(&query, limit).await?;
            println!("Matches ({})", functions.len());
            for function in functions {
                println!(
                    "  {}.{} - {}",
                    function.app_name,
                    function.name,
                    function.about().unwrap_or("")
                );
            }
        }
        Commands::Suggest { description, limit } => {
            let suggestion = suggest_workflow(backend.as_ref(), &description, limit).await?;
            emit(&suggestion, None)?;
        }
        Commands::Template { name: Some(name) } => {
            let workflow = templates::by_name(&name).with_context(|| {
                format!(
                    "Unknown template '{}'. Available: {}",
                    name,
                    templates::TEMPLATE_NAMES.join(", ")
                )
            })?;
            emit(&workflow, None)?;
        }
        Commands::Template { name: None } => {
            for name in templates::TEMPLATE_NAMES {
                println!("{}", name);
            }
        }
    }

    Ok(())
}
