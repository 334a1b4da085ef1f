//! Shared types, error model, and configuration for TopicForge.
//!
//! This crate is the foundation depended on by all other TopicForge crates.
//! It provides:
//! - [`TopicforgeError`] — the unified error type
//! - Domain types ([`Query`], [`RawRecord`], [`CanonicalRecord`], [`LabeledExample`])
//! - Configuration ([`AppConfig`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, DefaultsConfig, FetchConfig, ResolverConfig, ScheduleConfig, TrainingConfig,
    config_dir, config_file_path, init_config, load_config, load_config_from, resolve_data_dir,
};
pub use error::{Result, TopicforgeError};
pub use types::{
    CanonicalRecord, CrawlEntry, LabeledExample, NO_DESCRIPTION, NO_TITLE, Query, RawRecord,
    STAMP_FORMAT, StageCounters,
};
