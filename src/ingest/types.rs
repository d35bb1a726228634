// src/ingest/types.rs
use anyhow::Result;
use serde_json::Value;
use std::collections::BTreeMap;

/// One auction/event as produced by a listing source.
///
/// `date` is kept verbatim for display; sorting derives its key via
/// [`crate::dates::normalize_date`] and never rewrites it.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize, PartialEq)]
pub struct RawListing {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
    /// Origin of the listing, e.g. "Ritchie Bros". Never empty once collected.
    #[serde(default)]
    pub source: String,
    /// Source-specific fields (`items`, `type`, `preview`, ...), passed through untouched.
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl RawListing {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            ..Self::default()
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_date(mut self, date: impl Into<String>) -> Self {
        self.date = Some(date.into());
        self
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    pub fn with_link(mut self, link: impl Into<String>) -> Self {
        self.link = Some(link.into());
        self
    }

    pub fn with_extra(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }

    /// Dedup key within a source: trimmed raw `(date, location)`.
    pub fn dedup_key(&self) -> (&str, &str) {
        (
            self.date.as_deref().unwrap_or_default().trim(),
            self.location.as_deref().unwrap_or_default().trim(),
        )
    }
}

/// Result of one collection attempt for one source.
#[derive(Debug, Clone, PartialEq)]
pub struct CollectionOutcome {
    pub source_name: String,
    pub listings: Vec<RawListing>,
    pub error: Option<String>,
}

impl CollectionOutcome {
    pub fn success(source_name: impl Into<String>, listings: Vec<RawListing>) -> Self {
        Self {
            source_name: source_name.into(),
            listings,
            error: None,
        }
    }

    pub fn failure(source_name: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            source_name: source_name.into(),
            listings: Vec::new(),
            error: Some(error.into()),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

/// Launch position handed to each source (1-based slot + cascading display offset).
/// Browser-driven sources use it to place their window; others ignore it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotHint {
    pub slot: usize,
    pub offset_x: i32,
    pub offset_y: i32,
}

impl SlotHint {
    pub fn for_slot(slot: usize) -> Self {
        let step = slot.saturating_sub(1) as i32;
        Self {
            slot,
            offset_x: step * 120,
            offset_y: step * 100,
        }
    }
}

#[async_trait::async_trait]
pub trait ListingSource: Send + Sync {
    async fn fetch_listings(&self, hint: SlotHint) -> Result<Vec<RawListing>>;
    fn name(&self) -> &str;
}
