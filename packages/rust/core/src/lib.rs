//! Pipeline orchestration for TopicForge.
//!
//! [`pipeline::run_tick`] executes one Resolving → Extracting → Normalizing →
//! Training pass over the configured queries; [`scheduler::Scheduler`] runs
//! it on a recurring interval.

pub mod pipeline;
pub mod scheduler;

pub use pipeline::{
    PipelineConfig, ProgressReporter, SilentProgress, TickPhase, TickReport, predict, run_tick,
};
pub use scheduler::Scheduler;
