// src/ingest/providers/mod.rs
#[cfg(feature = "ingest-http")]
pub mod http_json;
pub mod json_file;

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::sync::Arc;

use crate::ingest::config::{RunConfig, SourceKind};
use crate::ingest::types::{ListingSource, RawListing};

// Accepted document shapes: a bare array, or an object wrapping it
// (`listings`, or `auctions` as the published artifact names it).
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ListingDoc {
    Bare(Vec<RawListing>),
    Wrapped {
        #[serde(alias = "auctions")]
        listings: Vec<RawListing>,
    },
}

/// Parse a JSON listings document produced by an extractor.
pub fn parse_listings_json(source_name: &str, body: &str) -> Result<Vec<RawListing>> {
    let trimmed = body.trim();
    if trimmed.is_empty() || trimmed == "null" {
        bail!("{source_name}: empty listings document");
    }
    let doc: ListingDoc = serde_json::from_str(trimmed)
        .with_context(|| format!("{source_name}: listings document is not a list of listings"))?;
    Ok(match doc {
        ListingDoc::Bare(v) => v,
        ListingDoc::Wrapped { listings } => listings,
    })
}

/// Instantiate every enabled source from the registry, in registry order.
pub fn build_sources(cfg: &RunConfig) -> Result<Vec<Arc<dyn ListingSource>>> {
    let mut out: Vec<Arc<dyn ListingSource>> = Vec::new();
    for spec in cfg.enabled_sources() {
        match &spec.kind {
            SourceKind::JsonFile { path } => {
                out.push(Arc::new(json_file::JsonFileSource::new(&spec.name, path)));
            }
            #[cfg(feature = "ingest-http")]
            SourceKind::HttpJson { url } => {
                out.push(Arc::new(http_json::HttpJsonSource::new(&spec.name, url)));
            }
            #[cfg(not(feature = "ingest-http"))]
            SourceKind::HttpJson { .. } => {
                bail!(
                    "source {} needs feature `ingest-http` (http_json)",
                    spec.name
                );
            }
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_and_wrapped_documents_parse() {
        let bare = r#"[{"title":"A","date":"Jan 5, 2030","source":"X"}]"#;
        assert_eq!(parse_listings_json("X", bare).unwrap().len(), 1);

        let wrapped = r#"{"auctions":[{"title":"A"},{"title":"B","items":"1200+"}]}"#;
        let v = parse_listings_json("X", wrapped).unwrap();
        assert_eq!(v.len(), 2);
        assert_eq!(v[1].extra.get("items").and_then(|x| x.as_str()), Some("1200+"));
    }

    #[test]
    fn malformed_documents_are_errors() {
        assert!(parse_listings_json("X", "").is_err());
        assert!(parse_listings_json("X", "null").is_err());
        assert!(parse_listings_json("X", r#"{"foo": 1}"#).is_err());
        assert!(parse_listings_json("X", "<html>").is_err());
    }
}
