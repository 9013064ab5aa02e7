use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use bist_models::{BistConfig, CapabilityFlags, GenerationBackend, PromptingMode};
use clap::{Args, Parser, Subcommand, ValueEnum};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "bist", about = "BIST equity decision-support agent and ablation evaluator")]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config/bist.toml")]
    config: String,

    /// Emit logs as JSON lines
    #[arg(long)]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Answer a single query
    Query {
        text: String,

        #[command(flatten)]
        mode: ModeArgs,

        /// Print the full agent state as JSON instead of the report
        #[arg(long)]
        json: bool,
    },
    /// Read queries from stdin until `exit`, `quit` or EOF
    Repl {
        #[command(flatten)]
        mode: ModeArgs,
    },
    /// Run the ablation sweep and write the results file
    Evaluate {
        /// Query set (TOML); defaults to `evaluation.queries_path`
        #[arg(long)]
        queries: Option<PathBuf>,

        /// Repeats per query and configuration
        #[arg(long)]
        repeats: Option<u32>,

        /// Comma-separated configuration names to run
        #[arg(long, value_delimiter = ',')]
        configs: Vec<String>,
    },
}

#[derive(Args, Debug, Clone, Copy)]
struct ModeArgs {
    /// Disable document retrieval
    #[arg(long)]
    no_rag: bool,

    /// Disable financial data tools
    #[arg(long)]
    no_tools: bool,

    #[arg(long, value_enum, default_value_t = PromptingArg::Few)]
    prompting: PromptingArg,
}

impl ModeArgs {
    fn capabilities(&self) -> CapabilityFlags {
        CapabilityFlags {
            rag: !self.no_rag,
            tools: !self.no_tools,
        }
    }
}

#[derive(ValueEnum, Debug, Clone, Copy)]
enum PromptingArg {
    Zero,
    One,
    Few,
}

impl From<PromptingArg> for PromptingMode {
    fn from(arg: PromptingArg) -> Self {
        match arg {
            PromptingArg::Zero => PromptingMode::ZeroShot,
            PromptingArg::One => PromptingMode::OneShot,
            PromptingArg::Few => PromptingMode::FewShot,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Respects RUST_LOG
    if cli.log_json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(EnvFilter::from_default_env())
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env())
            .with_writer(std::io::stderr)
            .init();
    }

    let config = bist::load_config(&cli.config)?;
    if config.generation.backend == GenerationBackend::Cli
        && !bist::agent::check_cli_available(&config.generation.command).await
    {
        warn!(
            command = %config.generation.command,
            "Generation CLI not found; reports will fall back to raw data"
        );
    }

    match cli.command {
        Command::Query { text, mode, json } => run_query(&config, &text, mode, json).await,
        Command::Repl { mode } => run_repl(&config, mode).await,
        Command::Evaluate {
            queries,
            repeats,
            configs,
        } => run_evaluate(config, queries, repeats, configs).await,
    }
}

async fn run_query(config: &BistConfig, text: &str, mode: ModeArgs, json: bool) -> Result<()> {
    let generator = bist::build_generator(&config.generation)?;
    let workflow = bist::build_workflow(config, generator).context("Failed to build workflow")?;

    let state = workflow
        .run(text, mode.capabilities(), mode.prompting.into())
        .await;

    if json {
        println!("{}", serde_json::to_string_pretty(&state)?);
    } else if let Some(report) = state.report() {
        println!("{report}");
    } else {
        anyhow::bail!(
            "Query failed: {}",
            state.error.as_deref().unwrap_or("no report produced")
        );
    }
    Ok(())
}

async fn run_repl(config: &BistConfig, mode: ModeArgs) -> Result<()> {
    let generator = bist::build_generator(&config.generation)?;
    let workflow = bist::build_workflow(config, generator).context("Failed to build workflow")?;
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        print!("bist> ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await.context("Failed to read from stdin")? else {
            break;
        };
        let query = line.trim();
        if query.is_empty() {
            continue;
        }
        if matches!(query, "exit" | "quit") {
            break;
        }

        let state = workflow
            .run(query, mode.capabilities(), mode.prompting.into())
            .await;
        match state.report() {
            Some(report) => println!("{report}\n"),
            None => eprintln!(
                "error: {}",
                state.error.as_deref().unwrap_or("no report produced")
            ),
        }
    }
    Ok(())
}

async fn run_evaluate(
    mut config: BistConfig,
    queries: Option<PathBuf>,
    repeats: Option<u32>,
    configs: Vec<String>,
) -> Result<()> {
    if let Some(repeats) = repeats {
        config.evaluation.repeats = repeats;
    }
    let queries_path = queries.unwrap_or_else(|| PathBuf::from(&config.evaluation.queries_path));
    let queries = bist::eval::load_queries(&queries_path)
        .with_context(|| format!("Failed to load queries: {}", queries_path.display()))?;

    let configurations: Vec<_> = if configs.is_empty() {
        config.evaluation.configurations.clone()
    } else {
        let selected: Vec<_> = config
            .evaluation
            .configurations
            .iter()
            .filter(|c| configs.contains(&c.name))
            .cloned()
            .collect();
        if let Some(unknown) = configs
            .iter()
            .find(|name| !selected.iter().any(|c| &c.name == *name))
        {
            anyhow::bail!("Unknown configuration: {unknown}");
        }
        selected
    };

    let engine = bist::build_engine(&config).context("Failed to build evaluation engine")?;

    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("Interrupt received, stopping sweep");
                cancel.cancel();
            }
        });
    }

    let report = engine
        .run_ablation(&queries, &configurations, cancel)
        .await
        .context("Evaluation failed")?;
    let path = bist::eval::write_results(&report, Path::new(&config.evaluation.results_dir))
        .context("Failed to write results")?;

    print_summary(&report);
    println!("\nResults written to {}", path.display());
    if report.cancelled {
        println!("Sweep was cancelled; results are partial.");
    }
    Ok(())
}

const SUMMARY_METRICS: [&str; 6] = [
    "faithfulness",
    "answer_relevancy",
    "context_recall",
    "tool_f1",
    "category_accuracy",
    "judge_overall",
];

fn print_summary(report: &bist::eval::AblationReport) {
    print!("{:<14} {:>5} {:>5}", "configuration", "ok", "skip");
    for metric in SUMMARY_METRICS {
        print!(" {metric:>17}");
    }
    println!();

    for summary in report.summaries() {
        print!(
            "{:<14} {:>5} {:>5}",
            summary.configuration.name, summary.completed, summary.skipped
        );
        for metric in SUMMARY_METRICS {
            let cell = match summary.metrics.get(metric) {
                Some(m) => format!("{:.3} ± {:.3}", m.mean, m.std),
                None => "-".to_string(),
            };
            print!(" {cell:>17}");
        }
        println!();
    }
}
