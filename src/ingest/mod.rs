// src/ingest/mod.rs
pub mod config;
pub mod providers;
pub mod types;

use crate::ingest::types::{CollectionOutcome, ListingSource, RawListing, SlotHint};
use metrics::{counter, describe_counter, describe_gauge, describe_histogram, histogram};
use once_cell::sync::OnceCell;
use std::sync::Arc;
use tokio::sync::mpsc;

/// One-time metrics registration (so series show up in the snapshot).
pub(crate) fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("ingest_sources_total", "Listing sources collected.");
        describe_counter!(
            "ingest_source_errors_total",
            "Sources that failed, panicked or returned unusable data."
        );
        describe_counter!(
            "ingest_listings_total",
            "Raw listings returned by sources (pre-dedup)."
        );
        describe_counter!(
            "ingest_dedup_total",
            "Listings removed by per-source (date, location) dedup."
        );
        describe_counter!(
            "ingest_unparseable_dates_total",
            "Listings whose date matched no template."
        );
        describe_histogram!("ingest_source_ms", "Per-source collection time in milliseconds.");
        describe_gauge!(
            "ingest_pipeline_last_run_ts",
            "Unix ts when the aggregation pipeline last ran."
        );
    });
}

/// Everything the aggregator hands downstream: per-source outcomes in
/// configured order plus all listings flattened in that same order.
#[derive(Debug, Clone, Default)]
pub struct Aggregation {
    pub outcomes: Vec<CollectionOutcome>,
    pub listings: Vec<RawListing>,
}

impl Aggregation {
    pub fn failed_sources(&self) -> impl Iterator<Item = &CollectionOutcome> {
        self.outcomes.iter().filter(|o| !o.is_ok())
    }
}

/// Stamp blank `source` fields with the collector's name.
fn stamp_source(name: &str, listings: &mut [RawListing]) {
    for l in listings.iter_mut() {
        if l.source.trim().is_empty() {
            l.source = name.to_string();
        }
    }
}

/// Run one source in isolation. Errors and panics become `CollectionOutcome::failure`;
/// this never returns an error itself.
pub async fn collect_one(source: Arc<dyn ListingSource>, hint: SlotHint) -> CollectionOutcome {
    let name = source.name().to_string();
    tracing::info!(slot = hint.slot, source = %name, "starting source");
    let t0 = std::time::Instant::now();

    // Own task so a panicking source surfaces as a JoinError instead of unwinding here.
    let task = {
        let source = Arc::clone(&source);
        tokio::spawn(async move { source.fetch_listings(hint).await })
    };

    let outcome = match task.await {
        Ok(Ok(mut listings)) => {
            stamp_source(&name, &mut listings);
            tracing::info!(
                slot = hint.slot,
                source = %name,
                count = listings.len(),
                "source complete"
            );
            CollectionOutcome::success(name.clone(), listings)
        }
        Ok(Err(e)) => {
            tracing::warn!(slot = hint.slot, source = %name, error = ?e, "source error");
            CollectionOutcome::failure(name.clone(), format!("{e:#}"))
        }
        Err(join_err) => {
            let msg = if join_err.is_panic() {
                "source panicked".to_string()
            } else {
                format!("source task failed: {join_err}")
            };
            tracing::warn!(slot = hint.slot, source = %name, error = %msg, "source error");
            CollectionOutcome::failure(name.clone(), msg)
        }
    };

    let ms = t0.elapsed().as_secs_f64() * 1_000.0;
    histogram!("ingest_source_ms").record(ms);
    counter!("ingest_sources_total").increment(1);
    if outcome.is_ok() {
        counter!("ingest_listings_total").increment(outcome.listings.len() as u64);
    } else {
        counter!("ingest_source_errors_total").increment(1);
    }
    outcome
}

/// Fan out every source concurrently, wait for all of them, fan in.
///
/// Each unit sends exactly one `(slot, outcome)` over a channel; results are
/// placed back into configured order so downstream output is reproducible.
/// No timeouts and no cancellation: a hung source holds the whole run.
pub async fn collect_all(sources: &[Arc<dyn ListingSource>]) -> Aggregation {
    ensure_metrics_described();

    let n = sources.len();
    let (tx, mut rx) = mpsc::channel::<(usize, CollectionOutcome)>(n.max(1));

    for (idx, source) in sources.iter().enumerate() {
        let tx = tx.clone();
        let source = Arc::clone(source);
        let hint = SlotHint::for_slot(idx + 1);
        tokio::spawn(async move {
            let outcome = collect_one(source, hint).await;
            // Receiver lives until every sender is gone; send only fails if the run was dropped.
            let _ = tx.send((idx, outcome)).await;
        });
    }
    drop(tx);

    let mut slots: Vec<Option<CollectionOutcome>> = vec![None; n];
    while let Some((idx, outcome)) = rx.recv().await {
        slots[idx] = Some(outcome);
    }

    let outcomes: Vec<CollectionOutcome> = slots
        .into_iter()
        .zip(sources)
        .map(|(slot, src)| {
            slot.unwrap_or_else(|| CollectionOutcome::failure(src.name(), "source task vanished"))
        })
        .collect();

    let listings = outcomes
        .iter()
        .flat_map(|o| o.listings.iter().cloned())
        .collect();

    Aggregation { outcomes, listings }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::{anyhow, Result};
    use std::time::Duration;

    struct Fixed {
        name: &'static str,
        delay_ms: u64,
        result: fn() -> Result<Vec<RawListing>>,
    }

    #[async_trait::async_trait]
    impl ListingSource for Fixed {
        async fn fetch_listings(&self, _hint: SlotHint) -> Result<Vec<RawListing>> {
            tokio::time::sleep(Duration::from_millis(self.delay_ms)).await;
            (self.result)()
        }
        fn name(&self) -> &str {
            self.name
        }
    }

    #[tokio::test]
    async fn outcomes_follow_configured_order_not_finish_order() {
        let sources: Vec<Arc<dyn ListingSource>> = vec![
            Arc::new(Fixed {
                name: "Slow",
                delay_ms: 80,
                result: || Ok(vec![RawListing::new("Slow").with_date("Jan 2, 2030")]),
            }),
            Arc::new(Fixed {
                name: "Fast",
                delay_ms: 0,
                result: || Ok(vec![RawListing::new("Fast").with_date("Jan 1, 2030")]),
            }),
        ];
        let agg = collect_all(&sources).await;
        let names: Vec<_> = agg.outcomes.iter().map(|o| o.source_name.as_str()).collect();
        assert_eq!(names, vec!["Slow", "Fast"]);
        assert_eq!(agg.listings[0].source, "Slow");
    }

    #[tokio::test]
    async fn failing_source_does_not_affect_siblings() {
        let sources: Vec<Arc<dyn ListingSource>> = vec![
            Arc::new(Fixed {
                name: "Broken",
                delay_ms: 0,
                result: || Err(anyhow!("page layout changed")),
            }),
            Arc::new(Fixed {
                name: "Fine",
                delay_ms: 10,
                result: || Ok(vec![RawListing::new("Fine")]),
            }),
        ];
        let agg = collect_all(&sources).await;
        assert_eq!(agg.outcomes.len(), 2);
        assert_eq!(
            agg.outcomes[0].error.as_deref(),
            Some("page layout changed")
        );
        assert!(agg.outcomes[1].is_ok());
        assert_eq!(agg.listings.len(), 1);
        assert_eq!(agg.failed_sources().count(), 1);
    }

    #[tokio::test]
    async fn blank_source_field_is_stamped_with_collector_name() {
        let src: Arc<dyn ListingSource> = Arc::new(Fixed {
            name: "Vantage Auctions",
            delay_ms: 0,
            result: || Ok(vec![RawListing::new("  ").with_title("Equipment Auction")]),
        });
        let out = collect_one(src, SlotHint::for_slot(1)).await;
        assert_eq!(out.listings[0].source, "Vantage Auctions");
    }

    #[test]
    fn slot_hint_cascades() {
        assert_eq!(
            SlotHint::for_slot(3),
            SlotHint {
                slot: 3,
                offset_x: 240,
                offset_y: 200
            }
        );
        assert_eq!(SlotHint::for_slot(1).offset_x, 0);
    }
}
