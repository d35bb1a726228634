//! Downstream publishing of the saved report. Fire-and-forget: a failed
//! publish is logged and never changes the run's result.

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};

#[async_trait]
pub trait Publisher: Send + Sync {
    async fn publish(&self, artifact: &Path) -> Result<()>;
    fn name(&self) -> &'static str;
}

/// `git add` / `git commit` / `git push` in the artifact's directory.
#[derive(Debug, Clone)]
pub struct GitPublisher {
    repo_dir: PathBuf,
    message: String,
    view_url: Option<String>,
}

impl GitPublisher {
    pub fn for_artifact(artifact: &Path, view_url: Option<String>) -> Self {
        let repo_dir = artifact
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        Self {
            repo_dir,
            message: "Update auction data".to_string(),
            view_url,
        }
    }

    async fn git(&self, args: &[&str]) -> Result<()> {
        let output = tokio::process::Command::new("git")
            .args(args)
            .current_dir(&self.repo_dir)
            .output()
            .await
            .with_context(|| format!("running git {}", args.join(" ")))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            bail!("git {} failed: {}", args.join(" "), stderr.trim());
        }
        Ok(())
    }
}

#[async_trait]
impl Publisher for GitPublisher {
    async fn publish(&self, artifact: &Path) -> Result<()> {
        let file = artifact
            .file_name()
            .and_then(|f| f.to_str())
            .context("artifact path has no file name")?;

        self.git(&["add", file]).await?;
        self.git(&["commit", "-m", self.message.as_str()]).await?;
        self.git(&["push"]).await?;

        if let Some(url) = &self.view_url {
            tracing::info!(%url, "published; site updates shortly");
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "git"
    }
}

/// Returns whether publishing succeeded. Never propagates.
pub async fn publish_best_effort(publisher: &dyn Publisher, artifact: &Path) -> bool {
    match publisher.publish(artifact).await {
        Ok(()) => {
            tracing::info!(publisher = publisher.name(), "report published");
            true
        }
        Err(e) => {
            tracing::warn!(
                publisher = publisher.name(),
                error = ?e,
                "publish failed; the report is saved locally and can be pushed manually"
            );
            false
        }
    }
}
