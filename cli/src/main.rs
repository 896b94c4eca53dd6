//! CLI entrypoint for the ensemble pipeline
//!
//! This is the main binary that wires together all layers using
//! dependency injection.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use ensemble_application::use_cases::mode_run_coordinator::CoordinatorConfig;
use ensemble_application::{EnsembleOrchestrator, RunEnsembleInput, Services};
use ensemble_domain::budget::BudgetConfig;
use ensemble_domain::core::Question;
use ensemble_domain::synthesis::{MergeConfig, SynthesisStrategy};
use ensemble_infrastructure::{
    BroadcastEventBus, CatalogLoader, InMemoryPaneTransport, SqliteStateStore, TmuxPaneTransport, TwoTierCache,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "ensemble")]
#[command(author, version, about = "Run a panel of reasoning modes over a question and synthesize their output")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Verbosity level (-v = info, -vv = debug, -vvv = trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// tmux session to drive panes in; omit to use an in-memory transport
    #[arg(long, global = true)]
    tmux_session: Option<String>,

    /// Path to the sqlite state store database
    #[arg(long, global = true, default_value = "ensemble-state.sqlite3")]
    state_db: PathBuf,

    /// Directory for the on-disk cache tier
    #[arg(long, global = true, default_value = ".ensemble-cache")]
    cache_dir: PathBuf,

    /// Explicit preset/catalog overrides file
    #[arg(long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the full pipeline: context pack, mode run, synthesis.
    Run(RunArgs),
    /// Build the context pack and assignment plan without touching any pane.
    DryRun(RunArgs),
}

#[derive(Parser, Debug)]
struct RunArgs {
    /// The question the panel is answering.
    question: String,

    /// Name for this session (used for state-store persistence and events).
    #[arg(long, default_value = "session")]
    session_name: String,

    /// Project identifier the context pack is generated for.
    #[arg(long, default_value = "default")]
    project_id: String,

    /// Ensemble preset to resolve modes from.
    #[arg(long)]
    preset: Option<String>,

    /// Explicit mode ids, used when `--preset` is not given.
    #[arg(long = "mode", value_name = "MODE_ID")]
    modes: Vec<String>,

    /// Synthesis strategy.
    #[arg(long, value_enum, default_value = "manual")]
    strategy: Strategy,

    /// Output format.
    #[arg(short, long, value_enum, default_value = "json")]
    output: OutputFormat,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Strategy {
    Manual,
    Consensus,
    Weighted,
    Dialectical,
}

impl From<Strategy> for SynthesisStrategy {
    fn from(s: Strategy) -> Self {
        match s {
            Strategy::Manual => SynthesisStrategy::Manual,
            Strategy::Consensus => SynthesisStrategy::Consensus,
            Strategy::Weighted => SynthesisStrategy::Weighted,
            Strategy::Dialectical => SynthesisStrategy::Dialectical,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    Json,
    Pretty,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };
    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).init();

    info!("starting ensemble pipeline");

    let catalog = Arc::new(
        CatalogLoader::load(cli.config.as_deref()).context("failed to load mode catalog")?,
    );
    let cache = Arc::new(TwoTierCache::new(cli.cache_dir.clone(), 256, chrono::Duration::hours(24)));
    let state_store = Arc::new(
        SqliteStateStore::open(&cli.state_db).context("failed to open state store")?,
    );
    let event_bus = Arc::new(BroadcastEventBus::default());
    let pane_transport = match &cli.tmux_session {
        Some(session) => Arc::new(TmuxPaneTransport::new(session.clone())) as Arc<dyn ensemble_application::PaneTransport>,
        None => Arc::new(InMemoryPaneTransport::new(Vec::new())) as Arc<dyn ensemble_application::PaneTransport>,
    };

    let services = Services {
        catalog,
        cache,
        state_store,
        event_bus,
        pane_transport,
    };
    let orchestrator = EnsembleOrchestrator::new(services);

    match cli.command {
        Command::DryRun(args) => {
            let input = build_input(args)?;
            let plan = orchestrator.run_stage1(&input).await.context("dry run failed")?;
            print_json(&plan, &input.session_name)?;
        }
        Command::Run(args) => {
            let output_format = args.output;
            let session_name = args.session_name.clone();
            let input = build_input(args)?;
            let session = orchestrator.run(input).await.context("ensemble run failed")?;
            match output_format {
                OutputFormat::Json => {
                    println!("{}", serde_json::to_string_pretty(&session)?);
                }
                OutputFormat::Pretty => {
                    println!("session: {session_name}");
                    println!("status: {:?}", session.status);
                    if let Some(synthesis) = &session.synthesis_output {
                        println!("\n{}", synthesis.summary);
                    }
                }
            }
        }
    }

    Ok(())
}

fn build_input(args: RunArgs) -> Result<RunEnsembleInput> {
    let question = Question::try_new(args.question).context("question must not be blank")?;
    Ok(RunEnsembleInput {
        session_name: args.session_name,
        question,
        preset_name: args.preset,
        explicit_modes: args.modes,
        project_id: args.project_id,
        sections: Vec::new(),
        budget_config: BudgetConfig::default(),
        synthesis_strategy: args.strategy.into(),
        merge_config: MergeConfig::default(),
        category_affinity: Default::default(),
        explicit_assignments: Default::default(),
        coordinator_config: CoordinatorConfig::default(),
    })
}

fn print_json<T: serde::Serialize>(value: &T, context: &str) -> Result<()> {
    let json = serde_json::to_string_pretty(value).with_context(|| format!("failed to serialize result for {context}"))?;
    println!("{json}");
    Ok(())
}
