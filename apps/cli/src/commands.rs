//! CLI command definitions, routing, and tracing setup.

use clap::{Parser, Subcommand};
use color_eyre::eyre::Result;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

use topicforge_core::{PipelineConfig, ProgressReporter, Scheduler, TickPhase, TickReport};
use topicforge_shared::{AppConfig, Query, init_config, load_config, resolve_data_dir};
use topicforge_store::Store;

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// TopicForge — keep a topical corpus and classifier fresh.
#[derive(Parser)]
#[command(
    name = "topicforge",
    version,
    about = "Resolve topical queries into a labeled web corpus and a trained classifier.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Run one full pipeline tick now.
    Run {
        /// Queries for this run, overriding the configured list.
        #[arg(short, long)]
        query: Vec<String>,
    },

    /// Run the pipeline on its recurring schedule (never exits).
    Schedule,

    /// Retrain the classifier on the current labeled corpus.
    Train,

    /// Classify texts with the persisted model.
    Predict {
        /// Texts to classify.
        #[arg(required = true)]
        texts: Vec<String>,

        /// Also write the label list to the predictions file.
        #[arg(long)]
        save: bool,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "topicforge=info",
        1 => "topicforge=debug",
        _ => "topicforge=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt().with_env_filter(env_filter).with_target(false).init();
        }
        LogFormat::Json => {
            fmt().json().with_env_filter(env_filter).init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Run { query } => cmd_run(&query).await,
        Command::Schedule => cmd_schedule().await,
        Command::Train => cmd_train().await,
        Command::Predict { texts, save } => cmd_predict(&texts, save).await,
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init().await,
            ConfigAction::Show => cmd_config_show().await,
        },
    }
}

fn open_store(config: &AppConfig) -> Result<Store> {
    let data_dir = resolve_data_dir(config)?;
    Ok(Store::open(data_dir)?)
}

async fn cmd_run(query_overrides: &[String]) -> Result<()> {
    let config = load_config()?;
    let store = open_store(&config)?;

    let mut pipeline = PipelineConfig::from(&config);
    if !query_overrides.is_empty() {
        pipeline.queries = query_overrides.iter().map(Query::new).collect();
    }

    info!(queries = pipeline.queries.len(), "running pipeline tick");

    let reporter = CliProgress::new();
    let report = topicforge_core::run_tick(&pipeline, &store, &reporter).await?;

    print_report(&report);
    Ok(())
}

async fn cmd_schedule() -> Result<()> {
    let config = load_config()?;
    let store = open_store(&config)?;
    let pipeline = PipelineConfig::from(&config);
    let scheduler = Scheduler::from_config(&config.schedule);

    info!(
        interval_days = config.schedule.interval_days,
        "starting recurring schedule"
    );

    scheduler
        .run_forever(|| {
            let pipeline = pipeline.clone();
            let store = &store;
            async move {
                let report =
                    topicforge_core::run_tick(&pipeline, store, &topicforge_core::SilentProgress)
                        .await?;
                print_report(&report);
                Ok(())
            }
        })
        .await;

    Ok(())
}

async fn cmd_train() -> Result<()> {
    let config = load_config()?;
    let store = open_store(&config)?;

    let opts = topicforge_model::TrainOptions {
        holdout: config.training.holdout,
        seed: config.training.seed,
        alpha: config.training.alpha,
    };

    let examples = topicforge_model::ensure_corpus(&store)?;
    let (artifact, eval) = topicforge_model::train(&examples, &opts)?;
    artifact.save(&store)?;

    println!();
    println!("  Classifier trained.");
    println!("  Examples: {}", examples.len());
    println!("  Train id: {}", artifact.train_id);
    println!();
    print!("{eval}");
    println!();

    Ok(())
}

async fn cmd_predict(texts: &[String], save: bool) -> Result<()> {
    let config = load_config()?;
    let store = open_store(&config)?;

    let labels = topicforge_core::predict(&store, texts, save)?;

    for (text, label) in texts.iter().zip(&labels) {
        println!("{label}\t{text}");
    }
    Ok(())
}

async fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

async fn cmd_config_show() -> Result<()> {
    let config: AppConfig = load_config()?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}

fn print_report(report: &TickReport) {
    println!();
    println!("  Tick complete.");
    println!("  Resolved:   {}", report.resolver);
    println!("  Extracted:  {}", report.extractor);
    println!("  Normalized: {}", report.normalizer);
    match &report.train_error {
        None => println!("  Trained:    yes"),
        Some(e) => println!("  Trained:    no ({e})"),
    }
    println!("  Time:       {:.1}s", report.elapsed.as_secs_f64());
    println!();
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter using an indicatif spinner.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {msg}")
                .unwrap()
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
        );
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { spinner }
    }
}

impl ProgressReporter for CliProgress {
    fn phase(&self, phase: TickPhase, query: Option<&Query>) {
        match query {
            Some(q) => self.spinner.set_message(format!("{phase}: {q}")),
            None => self.spinner.set_message(phase.to_string()),
        }
    }

    fn done(&self, _report: &TickReport) {
        self.spinner.finish_and_clear();
    }
}
