//! One scheduled tick: Resolving → Extracting → Normalizing → Training.
//!
//! Queries are processed strictly sequentially, one fully handled before the
//! next begins. A per-query failure is logged, counted, and skipped; it
//! never aborts the surrounding loop. Only a configuration error inside the
//! trainer halts that tick's training phase, and even that leaves the tick
//! completing to idle.

use std::time::{Duration, Instant};

use tracing::{debug, info, instrument, warn};

use topicforge_extractor::{ExtractOptions, Extractor};
use topicforge_model::{ModelArtifact, TrainOptions, ensure_corpus, train};
use topicforge_normalizer::normalize;
use topicforge_resolver::{ResolveOptions, Resolver};
use topicforge_shared::{AppConfig, Query, Result, StageCounters, TopicforgeError};
use topicforge_store::Store;

// ---------------------------------------------------------------------------
// Tick phases
// ---------------------------------------------------------------------------

/// The orchestrator's per-tick state machine. Each tick walks
/// `Idle → Resolving → Extracting → Normalizing → Training → Idle`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickPhase {
    Idle,
    Resolving,
    Extracting,
    Normalizing,
    Training,
}

impl std::fmt::Display for TickPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            TickPhase::Idle => "idle",
            TickPhase::Resolving => "resolving",
            TickPhase::Extracting => "extracting",
            TickPhase::Normalizing => "normalizing",
            TickPhase::Training => "training",
        };
        write!(f, "{name}")
    }
}

// ---------------------------------------------------------------------------
// Config & report
// ---------------------------------------------------------------------------

/// Configuration for one pipeline tick.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Queries processed each tick, in order.
    pub queries: Vec<Query>,
    /// Resolver settings.
    pub resolve: ResolveOptions,
    /// Extractor settings.
    pub extract: ExtractOptions,
    /// Trainer settings.
    pub train: TrainOptions,
}

impl From<&AppConfig> for PipelineConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            queries: config.query_list(),
            resolve: ResolveOptions {
                provider_base: config.resolver.provider_base.clone(),
                result_count: config.resolver.result_count,
                blocked_domains: config.resolver.blocked_domains.clone(),
                timeout_secs: config.resolver.timeout_secs,
            },
            extract: ExtractOptions {
                timeout_secs: config.fetch.timeout_secs,
                delay_ms: config.fetch.delay_ms,
            },
            train: TrainOptions {
                holdout: config.training.holdout,
                seed: config.training.seed,
                alpha: config.training.alpha,
            },
        }
    }
}

/// Aggregate outcome of one tick. Counters make per-stage failure rates
/// observable without changing the non-fatal skip policy.
#[derive(Debug, Clone)]
pub struct TickReport {
    /// Per-query resolution counters.
    pub resolver: StageCounters,
    /// Per-URL extraction counters, merged across queries.
    pub extractor: StageCounters,
    /// Per-query normalization counters.
    pub normalizer: StageCounters,
    /// Whether a model artifact was saved this tick.
    pub trained: bool,
    /// The training failure, if the phase was aborted.
    pub train_error: Option<String>,
    /// Wall-clock duration of the tick.
    pub elapsed: Duration,
}

// ---------------------------------------------------------------------------
// Progress reporting
// ---------------------------------------------------------------------------

/// Progress callback for reporting tick status.
pub trait ProgressReporter: Send + Sync {
    /// Called when the tick enters a new phase, with the query in flight
    /// for the per-query phases.
    fn phase(&self, phase: TickPhase, query: Option<&Query>);
    /// Called when the tick completes.
    fn done(&self, report: &TickReport);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn phase(&self, _phase: TickPhase, _query: Option<&Query>) {}
    fn done(&self, _report: &TickReport) {}
}

// ---------------------------------------------------------------------------
// The tick
// ---------------------------------------------------------------------------

/// Run one full pipeline tick over all configured queries.
///
/// Returns `Err` only for setup failures (e.g. the HTTP client cannot be
/// built); everything downstream is absorbed into the [`TickReport`].
#[instrument(skip_all, fields(queries = config.queries.len()))]
pub async fn run_tick(
    config: &PipelineConfig,
    store: &Store,
    progress: &dyn ProgressReporter,
) -> Result<TickReport> {
    let start = Instant::now();

    let resolver = Resolver::new(config.resolve.clone())?;
    let extractor = Extractor::new(config.extract.clone())?;

    let mut report = TickReport {
        resolver: StageCounters::default(),
        extractor: StageCounters::default(),
        normalizer: StageCounters::default(),
        trained: false,
        train_error: None,
        elapsed: Duration::ZERO,
    };

    for query in &config.queries {
        run_query(query, &resolver, &extractor, store, progress, &mut report).await;
    }

    // Training runs once per tick, over the shared labeled corpus. A
    // configuration error aborts only this phase; the tick still completes.
    progress.phase(TickPhase::Training, None);
    match run_training(&config.train, store) {
        Ok(()) => report.trained = true,
        Err(e) => {
            warn!(error = %e, "training phase aborted");
            report.train_error = Some(e.to_string());
        }
    }

    progress.phase(TickPhase::Idle, None);
    report.elapsed = start.elapsed();

    info!(
        resolver = %report.resolver,
        extractor = %report.extractor,
        normalizer = %report.normalizer,
        trained = report.trained,
        elapsed_ms = report.elapsed.as_millis(),
        "tick complete"
    );

    progress.done(&report);
    Ok(report)
}

/// Resolve, extract, and normalize a single query. Never fails the tick.
async fn run_query(
    query: &Query,
    resolver: &Resolver,
    extractor: &Extractor,
    store: &Store,
    progress: &dyn ProgressReporter,
    report: &mut TickReport,
) {
    let ident = query.ident();

    // --- Resolving ---
    progress.phase(TickPhase::Resolving, Some(query));
    match resolver.resolve(query, store).await {
        Ok(urls) => match store.write_url_set(&ident, &urls) {
            Ok(()) => report.resolver.record_success(),
            Err(e) => {
                warn!(%query, error = %e, "failed to write URL set");
                report.resolver.record_failure();
            }
        },
        Err(e) => {
            // Previous URL set stays untouched: stale-but-valid over nothing.
            warn!(%query, error = %e, "resolution failed, keeping previous URL set");
            report.resolver.record_failure();
        }
    }

    // --- Extracting ---
    progress.phase(TickPhase::Extracting, Some(query));
    match store.read_url_set(&ident) {
        Ok(Some(urls)) => match extractor.extract_batch(query, &urls, store).await {
            Ok(outcome) => report.extractor.merge(outcome.counters),
            Err(e) => {
                warn!(%query, error = %e, "extraction batch failed");
            }
        },
        Ok(None) => {
            // No URL set has ever been written: nothing to do, not an error.
            debug!(%query, "no URL set, skipping extraction");
        }
        Err(e) => {
            warn!(%query, error = %e, "failed to read URL set");
        }
    }

    // --- Normalizing ---
    progress.phase(TickPhase::Normalizing, Some(query));
    match normalize(query, store) {
        Ok(Some(_)) => report.normalizer.record_success(),
        Ok(None) => {
            debug!(%query, "no extraction history, skipping normalization");
        }
        Err(e) => {
            warn!(%query, error = %e, "normalization failed");
            report.normalizer.record_failure();
        }
    }
}

/// Bootstrap the corpus if needed, train, and persist the model artifact.
fn run_training(opts: &TrainOptions, store: &Store) -> Result<()> {
    let examples = ensure_corpus(store)?;
    let (artifact, eval) = train(&examples, opts)?;
    info!(train_id = %artifact.train_id, "evaluation report:\n{eval}");
    artifact.save(store)?;
    Ok(())
}

/// Convenience: load the persisted model and predict, optionally saving the
/// output list.
pub fn predict(store: &Store, texts: &[String], save: bool) -> Result<Vec<String>> {
    let artifact = ModelArtifact::load(store)?.ok_or_else(|| {
        TopicforgeError::config("no trained model found; run a tick or `train` first")
    })?;

    if save {
        artifact.predict_and_save(texts, store)
    } else {
        Ok(artifact.predict(texts))
    }
}
