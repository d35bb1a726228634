// src/ingest/config.rs
use anyhow::{anyhow, bail, Context, Result};
use serde::Deserialize;
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

pub const ENV_CONFIG_PATH: &str = "AUCTIONS_CONFIG_PATH";
pub const ENV_OUTPUT_PATH: &str = "AUCTIONS_OUTPUT_PATH";
pub const ENV_PUBLISH: &str = "AUCTIONS_PUBLISH";
pub const ENV_PUBLISH_URL: &str = "AUCTIONS_PUBLISH_URL";
pub const ENV_METRICS_PATH: &str = "AUCTIONS_METRICS_PATH";

pub const DEFAULT_OUTPUT_PATH: &str = "auctions.json";

fn default_enabled() -> bool {
    true
}

fn default_output_path() -> PathBuf {
    PathBuf::from(DEFAULT_OUTPUT_PATH)
}

/// How a source obtains its listings.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SourceKind {
    /// Pre-extracted JSON document on disk.
    JsonFile { path: PathBuf },
    /// JSON document served over HTTP (feature `ingest-http`).
    HttpJson { url: String },
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct SourceSpec {
    pub name: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(flatten)]
    pub kind: SourceKind,
}

/// Everything one run needs. Built from the registry file plus env overrides.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct RunConfig {
    #[serde(default = "default_output_path")]
    pub output_path: PathBuf,
    pub sources: Vec<SourceSpec>,
    #[serde(default)]
    pub publish: bool,
    #[serde(default)]
    pub publish_url: Option<String>,
    #[serde(default)]
    pub metrics_path: Option<PathBuf>,
}

impl RunConfig {
    pub fn enabled_sources(&self) -> impl Iterator<Item = &SourceSpec> {
        self.sources.iter().filter(|s| s.enabled)
    }

    /// Apply `AUCTIONS_*` env overrides on top of file values.
    pub fn apply_env(&mut self) {
        if let Some(p) = env_nonempty(ENV_OUTPUT_PATH) {
            self.output_path = PathBuf::from(p);
        }
        if let Some(v) = env_nonempty(ENV_PUBLISH) {
            self.publish = matches!(v.as_str(), "1" | "true" | "TRUE" | "True");
        }
        if let Some(u) = env_nonempty(ENV_PUBLISH_URL) {
            self.publish_url = Some(u);
        }
        if let Some(p) = env_nonempty(ENV_METRICS_PATH) {
            self.metrics_path = Some(PathBuf::from(p));
        }
    }
}

fn env_nonempty(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Load a registry from an explicit path. Supports TOML or JSON formats.
pub fn load_config_from(path: &Path) -> Result<RunConfig> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("reading source registry from {}", path.display()))?;
    let ext = path
        .extension()
        .and_then(|s| s.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase();
    parse_config(&content, ext.as_str())
        .with_context(|| format!("parsing source registry {}", path.display()))
}

/// Load the registry using env var + fallbacks, then apply env overrides:
/// 1) $AUCTIONS_CONFIG_PATH
/// 2) config/sources.toml
/// 3) config/sources.json
pub fn load_config_default() -> Result<RunConfig> {
    let mut cfg = load_registry_default()?;
    cfg.apply_env();
    Ok(cfg)
}

fn load_registry_default() -> Result<RunConfig> {
    if let Ok(p) = std::env::var(ENV_CONFIG_PATH) {
        let pb = PathBuf::from(p);
        if pb.exists() {
            return load_config_from(&pb);
        } else {
            return Err(anyhow!("{ENV_CONFIG_PATH} points to non-existent path"));
        }
    }
    let toml_p = PathBuf::from("config/sources.toml");
    if toml_p.exists() {
        return load_config_from(&toml_p);
    }
    let json_p = PathBuf::from("config/sources.json");
    if json_p.exists() {
        return load_config_from(&json_p);
    }
    Err(anyhow!(
        "no source registry found (set {ENV_CONFIG_PATH} or create config/sources.toml)"
    ))
}

fn parse_config(s: &str, hint_ext: &str) -> Result<RunConfig> {
    let raw: RunConfig = if hint_ext == "json" {
        serde_json::from_str(s).context("invalid JSON registry")?
    } else if hint_ext == "toml" {
        toml::from_str(s).context("invalid TOML registry")?
    } else {
        // No usable extension: JSON first, then TOML.
        match serde_json::from_str(s) {
            Ok(v) => v,
            Err(_) => toml::from_str(s).map_err(|_| anyhow!("unsupported registry format"))?,
        }
    };
    validate(raw)
}

fn validate(mut cfg: RunConfig) -> Result<RunConfig> {
    let mut seen = BTreeSet::new();
    for s in cfg.sources.iter_mut() {
        s.name = s.name.trim().to_string();
        if s.name.is_empty() {
            bail!("source with empty name in registry");
        }
        if !seen.insert(s.name.clone()) {
            bail!("duplicate source name in registry: {}", s.name);
        }
    }
    if cfg.enabled_sources().next().is_none() {
        bail!("registry has no enabled sources");
    }
    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOML: &str = r#"
output_path = "out/auctions.json"

[[sources]]
name = " Ritchie Bros "
kind = "json_file"
path = "data/ritchie.json"

[[sources]]
name = "Bar None Auction"
kind = "http_json"
url = "https://example.test/barnone.json"
enabled = false
"#;

    #[test]
    fn toml_registry_parses_and_trims() {
        let cfg = parse_config(TOML, "toml").unwrap();
        assert_eq!(cfg.output_path, PathBuf::from("out/auctions.json"));
        assert_eq!(cfg.sources[0].name, "Ritchie Bros");
        assert_eq!(
            cfg.sources[0].kind,
            SourceKind::JsonFile {
                path: PathBuf::from("data/ritchie.json")
            }
        );
        assert!(!cfg.sources[1].enabled);
        assert_eq!(cfg.enabled_sources().count(), 1);
        assert!(!cfg.publish);
    }

    #[test]
    fn json_registry_defaults_output_path() {
        let json = r#"{"sources":[{"name":"WCA","kind":"json_file","path":"wca.json"}]}"#;
        let cfg = parse_config(json, "").unwrap();
        assert_eq!(cfg.output_path, PathBuf::from(DEFAULT_OUTPUT_PATH));
        assert!(cfg.sources[0].enabled);
    }

    #[test]
    fn rejects_duplicates_blank_names_and_all_disabled() {
        let dup = r#"{"sources":[
            {"name":"A","kind":"json_file","path":"a.json"},
            {"name":" A ","kind":"json_file","path":"b.json"}]}"#;
        assert!(parse_config(dup, "json").is_err());

        let blank = r#"{"sources":[{"name":"  ","kind":"json_file","path":"a.json"}]}"#;
        assert!(parse_config(blank, "json").is_err());

        let off = r#"{"sources":[{"name":"A","kind":"json_file","path":"a.json","enabled":false}]}"#;
        assert!(parse_config(off, "json").is_err());
    }
}
