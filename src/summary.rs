//! Human-readable run summary printed to stdout after the pipeline.

use std::fmt::Write as _;

use crate::ingest::Aggregation;
use crate::pipeline::PipelineOutput;
use crate::RawListing;

const RULE: &str = "================================================================================";

fn field<'a>(v: &'a Option<String>, default: &'a str) -> &'a str {
    v.as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or(default)
}

fn extra_line(l: &RawListing, key: &str) -> Option<String> {
    l.extra.get(key).map(|v| match v.as_str() {
        Some(s) => s.to_string(),
        None => v.to_string(),
    })
}

/// Per-source status, errors, total, then every listing in final order.
pub fn render_summary(agg: &Aggregation, out: &PipelineOutput) -> String {
    let mut s = String::new();
    let _ = writeln!(s, "{RULE}\nSUMMARY\n{RULE}");

    for o in &agg.outcomes {
        let n = o.listings.len();
        let mark = if n > 0 { '\u{2713}' } else { '\u{2717}' };
        let _ = writeln!(s, "{mark} {}: {n} auctions", o.source_name);
    }

    let errors: Vec<_> = agg.failed_sources().collect();
    if !errors.is_empty() {
        let _ = writeln!(s, "\nErrors encountered:");
        for o in errors {
            let _ = writeln!(
                s,
                "  - {}: {}",
                o.source_name,
                o.error.as_deref().unwrap_or_default()
            );
        }
    }

    let report = &out.report;
    let _ = writeln!(s, "\nTotal auctions found: {}", report.total_count);
    if report.duplicates_removed > 0 {
        let _ = writeln!(s, "Duplicates removed: {}", report.duplicates_removed);
    }

    let _ = writeln!(s, "\n{RULE}\nALL UPCOMING AUCTIONS (SORTED BY DATE)\n{RULE}");
    if report.listings.is_empty() {
        let _ = writeln!(s, "\nNo auctions found.");
    }
    for (i, l) in report.listings.iter().enumerate() {
        let source = if l.source.trim().is_empty() {
            "Unknown"
        } else {
            l.source.as_str()
        };
        let _ = writeln!(s, "\n{}. {}", i + 1, field(&l.title, "No title"));
        let _ = writeln!(s, "   Source: {source}");
        let _ = writeln!(s, "   Date: {}", field(&l.date, "Date not found"));
        let _ = writeln!(s, "   Location: {}", field(&l.location, "Location not found"));
        if let Some(items) = extra_line(l, "items") {
            let _ = writeln!(s, "   Items: {items}");
        }
        if let Some(kind) = extra_line(l, "type") {
            let _ = writeln!(s, "   Type: {kind}");
        }
        let _ = writeln!(s, "   Link: {}", field(&l.link, "No link"));
    }

    if !out.unparseable_dates.is_empty() {
        let _ = writeln!(s, "\nWarning: could not parse these dates (sorted to end):");
        for d in &out.unparseable_dates {
            let _ = writeln!(s, "  - '{d}'");
        }
    }

    s
}
