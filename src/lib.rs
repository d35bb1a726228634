// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod dates;
pub mod ingest;
pub mod metrics;
pub mod pipeline;
pub mod publish;
pub mod sink;
pub mod summary;

// ---- Re-exports for stable public API ----
pub use crate::dates::{normalize_date, NormalizedDate};
pub use crate::ingest::types::{CollectionOutcome, ListingSource, RawListing, SlotHint};
pub use crate::ingest::{collect_all, collect_one, Aggregation};
pub use crate::pipeline::{build_report, AggregateReport, PipelineOutput};

use anyhow::Result;
use chrono::{DateTime, Local, NaiveDateTime, Utc};
use std::path::Path;
use std::sync::Arc;

/// The run's single clock reading: local wall time for year inference,
/// UTC for the report stamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunClock {
    pub now: NaiveDateTime,
    pub generated_at: DateTime<Utc>,
}

impl RunClock {
    pub fn now() -> Self {
        let local = Local::now();
        Self {
            now: local.naive_local(),
            generated_at: local.with_timezone(&Utc),
        }
    }

    /// Fixed clock for tests and replays.
    pub fn fixed(now: NaiveDateTime) -> Self {
        Self {
            now,
            generated_at: now.and_utc(),
        }
    }
}

/// Result of the concurrent + sequential phases, before persistence.
#[derive(Debug, Clone)]
pub struct RunResult {
    pub aggregation: Aggregation,
    pub output: PipelineOutput,
}

impl RunResult {
    pub fn report(&self) -> &AggregateReport {
        &self.output.report
    }
}

/// Collect every source concurrently, then dedup/sort/assemble. Never fails:
/// source problems end up in `aggregation.outcomes`.
pub async fn collect_and_build(sources: &[Arc<dyn ListingSource>], clock: RunClock) -> RunResult {
    let aggregation = collect_all(sources).await;
    let output = build_report(&aggregation, clock.now, clock.generated_at);
    RunResult {
        aggregation,
        output,
    }
}

/// Persist the report. Errors are fatal for the run.
pub fn persist(result: &RunResult, output_path: &Path) -> Result<()> {
    sink::write_report(output_path, result.report())
}

/// One full run: collect → pipeline → sink.
pub async fn run_once(
    sources: &[Arc<dyn ListingSource>],
    clock: RunClock,
    output_path: &Path,
) -> Result<RunResult> {
    let result = collect_and_build(sources, clock).await;
    persist(&result, output_path)?;
    Ok(result)
}
