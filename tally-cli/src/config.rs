use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::state::ensure_tally_home;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub llm: LlmSection,
    pub store: StoreSection,
    pub ingest: IngestSection,
    pub log: LogSection,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmSection {
    pub model: String,
    pub base_url: String,
    pub temperature: f32,
    /// Rounds in which the model may call the query tool before it must answer.
    pub max_tool_rounds: usize,
    /// Budget for the whole question, model calls and queries included.
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreSection {
    pub db_path: PathBuf,
    /// Refuse model-authored statements that would write to the database.
    pub read_only_queries: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestSection {
    pub dir: PathBuf,
    pub converter: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogSection {
    pub level: String,
}

impl Default for LlmSection {
    fn default() -> Self {
        Self {
            model: "gpt-4o-mini".to_string(),
            base_url: "https://api.openai.com".to_string(),
            temperature: 0.7,
            max_tool_rounds: crate::conversation::DEFAULT_MAX_TOOL_ROUNDS,
            timeout_secs: 30,
        }
    }
}

impl LlmSection {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for StoreSection {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from("transactions.db"),
            read_only_queries: false,
        }
    }
}

impl Default for IngestSection {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("statements"),
            converter: tally_ingest::DEFAULT_CONVERTER.to_string(),
        }
    }
}

impl Default for LogSection {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

pub fn config_path() -> Result<PathBuf> {
    Ok(ensure_tally_home()?.join("config.toml"))
}

/// Missing file means defaults; missing keys fall back per section.
pub fn load_config_from(p: &Path) -> Result<Config> {
    if !p.exists() {
        return Ok(Config::default());
    }
    let s = fs::read_to_string(p).with_context(|| format!("read {}", p.display()))?;
    toml::from_str(&s).with_context(|| format!("parse {}", p.display()))
}

pub fn save_config_to(cfg: &Config, p: &Path) -> Result<()> {
    let s = toml::to_string_pretty(cfg).context("serialize config")?;
    fs::write(p, s).with_context(|| format!("write {}", p.display()))?;
    Ok(())
}

/// Write defaults to `p` unless a file is already there. Returns whether it wrote.
pub fn init_config(p: &Path) -> Result<bool> {
    if p.exists() {
        println!("Config already exists: {}", p.display());
        return Ok(false);
    }
    if let Some(parent) = p.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(parent).with_context(|| format!("create {}", parent.display()))?;
    }
    save_config_to(&Config::default(), p)?;
    println!("Wrote {}", p.display());
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = load_config_from(&dir.path().join("nope.toml")).unwrap();
        assert_eq!(cfg.llm.max_tool_rounds, 2);
        assert_eq!(cfg.llm.timeout(), Duration::from_secs(30));
        assert_eq!(cfg.ingest.converter, "pdftotext");
        assert!(!cfg.store.read_only_queries);
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("config.toml");
        fs::write(
            &p,
            "[llm]\nmodel = \"gpt-4o\"\n\n[store]\nread_only_queries = true\n",
        )
        .unwrap();

        let cfg = load_config_from(&p).unwrap();
        assert_eq!(cfg.llm.model, "gpt-4o");
        assert_eq!(cfg.llm.base_url, "https://api.openai.com");
        assert!(cfg.store.read_only_queries);
        assert_eq!(cfg.store.db_path, PathBuf::from("transactions.db"));
        assert_eq!(cfg.log.level, "info");
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("config.toml");
        let mut cfg = Config::default();
        cfg.llm.max_tool_rounds = 4;
        cfg.ingest.dir = PathBuf::from("/tmp/statements");
        save_config_to(&cfg, &p).unwrap();

        let back = load_config_from(&p).unwrap();
        assert_eq!(back.llm.max_tool_rounds, 4);
        assert_eq!(back.ingest.dir, PathBuf::from("/tmp/statements"));
    }

    #[test]
    fn test_init_writes_to_the_given_path_once() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("nested").join("tally.toml");

        assert!(init_config(&p).unwrap());
        let cfg = load_config_from(&p).unwrap();
        assert_eq!(cfg.llm.model, "gpt-4o-mini");

        fs::write(&p, "[log]\nlevel = \"debug\"\n").unwrap();
        assert!(!init_config(&p).unwrap());
        assert_eq!(load_config_from(&p).unwrap().log.level, "debug");
    }

    #[test]
    fn test_malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("config.toml");
        fs::write(&p, "[llm\nmodel = ").unwrap();
        assert!(load_config_from(&p).is_err());
    }
}
