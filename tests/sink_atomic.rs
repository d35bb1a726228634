// tests/sink_atomic.rs
use auction_aggregator::pipeline::AggregateReport;
use auction_aggregator::sink::{read_report, write_report};
use auction_aggregator::RawListing;
use chrono::{TimeZone, Utc};
use std::collections::BTreeMap;
use std::fs;

fn report(n: usize) -> AggregateReport {
    let listings: Vec<RawListing> = (0..n)
        .map(|i| {
            RawListing::new("Vantage Auctions")
                .with_title(format!("Auction {i}"))
                .with_date("Jan 24, 2026")
                .with_location("Lake Elsinore, CA")
                .with_extra("preview", "Jan 22-23")
        })
        .collect();
    let mut counts = BTreeMap::new();
    counts.insert("Vantage Auctions".to_string(), n);
    AggregateReport {
        generated_at: Utc.with_ymd_and_hms(2026, 1, 1, 12, 0, 0).unwrap(),
        total_count: n,
        per_source_counts: counts,
        duplicates_removed: 0,
        listings,
    }
}

#[test]
fn overwrite_replaces_prior_content() {
    let dir = tempfile::tempdir().unwrap();
    let p = dir.path().join("auctions.json");
    fs::write(&p, "stale and much longer than the new content will ever be ...").unwrap();

    write_report(&p, &report(2)).unwrap();
    assert_eq!(read_report(&p).unwrap().total_count, 2);

    write_report(&p, &report(1)).unwrap();
    let back = read_report(&p).unwrap();
    assert_eq!(back, report(1));

    let leftovers: Vec<_> = fs::read_dir(dir.path())
        .unwrap()
        .flatten()
        .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
        .collect();
    assert!(leftovers.is_empty());
}

#[test]
fn output_is_stable_and_diff_friendly() {
    let dir = tempfile::tempdir().unwrap();
    let a = dir.path().join("a.json");
    let b = dir.path().join("b.json");
    write_report(&a, &report(3)).unwrap();
    write_report(&b, &report(3)).unwrap();
    let ta = fs::read_to_string(&a).unwrap();
    assert_eq!(ta, fs::read_to_string(&b).unwrap());

    // Top-level keys in declaration order, indented.
    let g = ta.find("\"generatedAt\"").unwrap();
    let t = ta.find("\"totalCount\"").unwrap();
    let p = ta.find("\"perSourceCounts\"").unwrap();
    let l = ta.find("\"listings\"").unwrap();
    assert!(g < t && t < p && p < l);
    assert!(ta.contains("\n    {\n      \"title\": \"Auction 0\""));
    assert!(ta.ends_with('\n'));
}

#[test]
fn write_failure_is_an_error_and_keeps_old_file() {
    let dir = tempfile::tempdir().unwrap();
    let p = dir.path().join("auctions.json");
    write_report(&p, &report(1)).unwrap();

    // A directory squatting on the tmp name makes the write fail.
    fs::create_dir(dir.path().join("auctions.json.tmp")).unwrap();
    assert!(write_report(&p, &report(5)).is_err());
    assert_eq!(read_report(&p).unwrap().total_count, 1);
}
