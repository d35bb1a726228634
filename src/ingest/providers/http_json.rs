use anyhow::{Context, Result};
use async_trait::async_trait;

use crate::ingest::providers::parse_listings_json;
use crate::ingest::types::{ListingSource, RawListing, SlotHint};

/// GETs a JSON listings document. No timeout: a slow endpoint delays the run, it does not fail it.
pub struct HttpJsonSource {
    name: String,
    url: String,
    client: reqwest::Client,
}

impl HttpJsonSource {
    pub fn new(name: &str, url: &str) -> Self {
        Self {
            name: name.to_string(),
            url: url.to_string(),
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl ListingSource for HttpJsonSource {
    async fn fetch_listings(&self, _hint: SlotHint) -> Result<Vec<RawListing>> {
        let resp = self
            .client
            .get(&self.url)
            .send()
            .await
            .with_context(|| format!("{} http get()", self.name))?
            .error_for_status()
            .with_context(|| format!("{} http status", self.name))?;
        let body = resp
            .text()
            .await
            .with_context(|| format!("{} http .text()", self.name))?;
        parse_listings_json(&self.name, &body)
    }

    fn name(&self) -> &str {
        &self.name
    }
}
