//! # Persistence Sink
//! Pretty JSON with stable key order, replaced atomically (tmp file + rename
//! in the same directory). Readers see either the old report or the new one.

use anyhow::{Context, Result};
use std::ffi::OsString;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::pipeline::AggregateReport;

fn tmp_path(path: &Path) -> PathBuf {
    let mut name: OsString = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| OsString::from("report"));
    name.push(".tmp");
    path.with_file_name(name)
}

/// Write `bytes` to `path` via a sibling tmp file. The tmp file is removed on failure.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(dir) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(dir)
            .with_context(|| format!("creating output dir {}", dir.display()))?;
    }

    let tmp = tmp_path(path);
    let res = (|| -> std::io::Result<()> {
        let mut f = fs::File::create(&tmp)?;
        f.write_all(bytes)?;
        f.sync_all()?;
        fs::rename(&tmp, path)
    })();

    if let Err(e) = res {
        let _ = fs::remove_file(&tmp);
        return Err(e).with_context(|| format!("writing report to {}", path.display()));
    }
    Ok(())
}

/// Serialize and persist the report. Any error here is fatal for the run.
pub fn write_report(path: &Path, report: &AggregateReport) -> Result<()> {
    let mut json = serde_json::to_string_pretty(report).context("serializing report")?;
    json.push('\n');
    write_atomic(path, json.as_bytes())?;
    tracing::info!(
        path = %path.display(),
        total = report.total_count,
        "report saved"
    );
    Ok(())
}

pub fn read_report(path: &Path) -> Result<AggregateReport> {
    let s = fs::read_to_string(path)
        .with_context(|| format!("reading report from {}", path.display()))?;
    serde_json::from_str(&s).with_context(|| format!("parsing report {}", path.display()))
}
