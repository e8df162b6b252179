//! Runs: named, directory-scoped sessions of CLI activity
//!
//! A run is created under `<project>/runs/<name>/` with `outputs/`, `logs/`
//! and `metrics/` subdirectories and a `run-info.json` metadata file. The
//! active run is recorded in a per-user pointer file so separate CLI
//! invocations can find it.

mod manager;
mod types;

pub use manager::{RUN_INFO_FILE, RUN_SUBDIRECTORIES, RunManager};
pub use types::{RunInfo, generate_run_name, iso_timestamp};

#[cfg(test)]
mod tests;
