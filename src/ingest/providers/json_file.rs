use anyhow::{Context, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};

use crate::ingest::providers::parse_listings_json;
use crate::ingest::types::{ListingSource, RawListing, SlotHint};

/// Reads listings an extractor already wrote to disk.
pub struct JsonFileSource {
    name: String,
    path: PathBuf,
}

impl JsonFileSource {
    pub fn new(name: &str, path: impl AsRef<Path>) -> Self {
        Self {
            name: name.to_string(),
            path: path.as_ref().to_path_buf(),
        }
    }
}

#[async_trait]
impl ListingSource for JsonFileSource {
    async fn fetch_listings(&self, _hint: SlotHint) -> Result<Vec<RawListing>> {
        let body = tokio::fs::read_to_string(&self.path)
            .await
            .with_context(|| format!("reading {}", self.path.display()))?;
        parse_listings_json(&self.name, &body)
    }

    fn name(&self) -> &str {
        &self.name
    }
}
