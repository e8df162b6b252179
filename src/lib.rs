//! ai-cli - LLM prompt workflows with persistent runs and usage metrics
//!
//! Two services hold all persistent state:
//!
//! 1. **Runs** ([`run::RunManager`]): named working directories under
//!    `<project>/runs/`, numbered by a project-local counter, with a per-user
//!    pointer file recording which run is current across invocations.
//!
//! 2. **Metrics** ([`metrics::MetricsRecorder`]): one record per command
//!    invocation plus a recomputed summary in a shared JSON store.
//!
//! Both go through the [`fs::FileSystem`] seam and lock their store files
//! for every read-modify-write cycle.

pub mod config;
pub mod error;
pub mod fs;
pub mod metrics;
pub mod run;

pub use error::{AppError, Result};
