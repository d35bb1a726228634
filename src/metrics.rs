use anyhow::{Context, Result};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::path::Path;

use crate::sink::write_atomic;

/// Process-wide Prometheus recorder. Without it every `counter!`/`histogram!` is a no-op.
pub struct Metrics {
    pub handle: PrometheusHandle,
}

impl Metrics {
    /// Install the recorder. Fails if another recorder is already installed.
    pub fn init() -> Result<Self> {
        // Use default buckets to avoid API differences across crate versions.
        let handle = PrometheusBuilder::new()
            .install_recorder()
            .context("prometheus: install recorder")?;
        crate::ingest::ensure_metrics_described();
        Ok(Self { handle })
    }

    /// Prometheus exposition text of everything recorded so far.
    pub fn render(&self) -> String {
        self.handle.render()
    }

    /// Textfile-collector style snapshot, replaced atomically.
    pub fn write_snapshot(&self, path: &Path) -> Result<()> {
        write_atomic(path, self.render().as_bytes())
            .with_context(|| format!("writing metrics snapshot to {}", path.display()))
    }
}
