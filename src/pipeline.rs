//! # Merge / Dedup / Sort
//! Sequential stage after every source has joined: per-source dedup,
//! stable chronological sort, report assembly. No I/O.

use chrono::{DateTime, NaiveDateTime, Utc};
use metrics::{counter, gauge};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

use crate::dates::{clean_date, normalize_date, NormalizedDate};
use crate::ingest::types::{CollectionOutcome, RawListing};
use crate::ingest::Aggregation;

/// The persisted artifact.
///
/// `per_source_counts` are pre-dedup, so
/// `sum(per_source_counts) == total_count + duplicates_removed`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AggregateReport {
    pub generated_at: DateTime<Utc>,
    pub total_count: usize,
    pub per_source_counts: BTreeMap<String, usize>,
    pub duplicates_removed: usize,
    pub listings: Vec<RawListing>,
}

/// Report plus run-level diagnostics that never reach the artifact.
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    pub report: AggregateReport,
    /// Raw date strings that matched no template, in output order.
    pub unparseable_dates: Vec<String>,
}

/// Drop later listings whose `(source, date, location)` repeats an earlier one.
/// Listings from different sources never collapse into each other.
pub fn dedup_within_source(listings: Vec<RawListing>) -> (Vec<RawListing>, usize) {
    let mut seen: HashSet<(String, String, String)> = HashSet::new();
    let mut keep = Vec::with_capacity(listings.len());
    let mut dropped = 0usize;

    for l in listings {
        let (date, location) = l.dedup_key();
        let key = (l.source.clone(), date.to_string(), location.to_string());
        if !seen.insert(key) {
            dropped += 1;
            continue;
        }
        keep.push(l);
    }

    (keep, dropped)
}

/// Stable ascending sort by normalized date; unparseable dates go last in input order.
/// Each date is normalized exactly once, so each bad date warns exactly once.
pub fn sort_by_date(listings: Vec<RawListing>, now: NaiveDateTime) -> (Vec<RawListing>, Vec<String>) {
    let mut keyed: Vec<(NormalizedDate, RawListing)> = listings
        .into_iter()
        .map(|l| {
            let key = normalize_date(l.date.as_deref().unwrap_or_default(), now);
            (key, l)
        })
        .collect();

    // `sort_by` is stable
    keyed.sort_by(|a, b| a.0.cmp(&b.0));

    let mut unparseable = Vec::new();
    let sorted = keyed
        .into_iter()
        .map(|(key, l)| {
            if key.is_unparseable() {
                if let Some(raw) = l.date.as_deref().filter(|d| clean_date(d).is_some()) {
                    unparseable.push(raw.to_string());
                }
            }
            l
        })
        .collect();

    (sorted, unparseable)
}

/// Raw (pre-dedup) listing count per source; failed sources report 0.
pub fn per_source_counts(outcomes: &[CollectionOutcome]) -> BTreeMap<String, usize> {
    outcomes
        .iter()
        .map(|o| (o.source_name.clone(), o.listings.len()))
        .collect()
}

/// Dedup, sort and assemble the final report.
pub fn build_report(
    agg: &Aggregation,
    now: NaiveDateTime,
    generated_at: DateTime<Utc>,
) -> PipelineOutput {
    let counts = per_source_counts(&agg.outcomes);
    let (deduped, dropped) = dedup_within_source(agg.listings.clone());
    let (sorted, unparseable_dates) = sort_by_date(deduped, now);

    counter!("ingest_dedup_total").increment(dropped as u64);
    counter!("ingest_unparseable_dates_total").increment(unparseable_dates.len() as u64);
    gauge!("ingest_pipeline_last_run_ts").set(generated_at.timestamp() as f64);

    tracing::info!(
        total = sorted.len(),
        duplicates = dropped,
        unparseable = unparseable_dates.len(),
        "pipeline assembled report"
    );

    PipelineOutput {
        report: AggregateReport {
            generated_at,
            total_count: sorted.len(),
            per_source_counts: counts,
            duplicates_removed: dropped,
            listings: sorted,
        },
        unparseable_dates,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 1, 1)
            .unwrap()
            .and_hms_opt(8, 0, 0)
            .unwrap()
    }

    #[test]
    fn dedup_trims_before_comparing() {
        let v = vec![
            RawListing::new("Bar None Auction")
                .with_date("Feb 6, 2026")
                .with_location("Fontana, CA")
                .with_title("first"),
            RawListing::new("Bar None Auction")
                .with_date(" Feb 6, 2026 ")
                .with_location("Fontana, CA  ")
                .with_title("second"),
        ];
        let (kept, dropped) = dedup_within_source(v);
        assert_eq!(dropped, 1);
        assert_eq!(kept[0].title.as_deref(), Some("first"));
    }

    #[test]
    fn differently_formatted_equal_dates_are_not_duplicates() {
        let v = vec![
            RawListing::new("A").with_date("Feb 6, 2026").with_location("X"),
            RawListing::new("A").with_date("02/06/2026").with_location("X"),
        ];
        assert_eq!(dedup_within_source(v).1, 0);
    }

    #[test]
    fn sentinel_dates_sort_last_without_being_reported() {
        let v = vec![
            RawListing::new("A").with_date("Date TBD").with_title("tbd"),
            RawListing::new("A").with_title("no date"),
            RawListing::new("A").with_date("March 3, 2026").with_title("march"),
        ];
        let (sorted, bad) = sort_by_date(v, now());
        let titles: Vec<_> = sorted.iter().filter_map(|l| l.title.as_deref()).collect();
        assert_eq!(titles, vec!["march", "tbd", "no date"]);
        assert!(bad.is_empty());
    }

    #[test]
    fn counts_include_failed_sources_as_zero() {
        let outcomes = vec![
            CollectionOutcome::success("A", vec![RawListing::new("A")]),
            CollectionOutcome::failure("B", "timeout"),
        ];
        let c = per_source_counts(&outcomes);
        assert_eq!(c.get("A"), Some(&1));
        assert_eq!(c.get("B"), Some(&0));
    }
}
