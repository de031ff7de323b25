use anyhow::{Context, Result};
use daymate_core::TaskCatalog;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::state::ensure_daymate_home;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub day: DaySection,
    pub session: SessionSection,
    pub storage: StorageSection,
    pub log: LogSection,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DaySection {
    /// Today's checklist, presented in this order.
    pub tasks: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionSection {
    /// Used when `--session` is not passed.
    pub default_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageSection {
    /// Relative paths resolve under the daymate home directory.
    pub state_file: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LogSection {
    /// tracing filter, e.g. "daymate=debug". `RUST_LOG` wins when set.
    pub filter: Option<String>,
}

impl Default for DaySection {
    fn default() -> Self {
        Self {
            tasks: [
                "10 minutes of meditation or deep breathing",
                "Check job boards and send 3 applications",
                "45 minutes of Azure exam study",
                "15 minutes of rest and stretching",
                "30 minutes of networking on LinkedIn",
                "20 minutes of light exercise",
            ]
            .into_iter()
            .map(str::to_string)
            .collect(),
        }
    }
}

impl Default for SessionSection {
    fn default() -> Self {
        Self {
            default_id: "local".to_string(),
        }
    }
}

impl Default for StorageSection {
    fn default() -> Self {
        Self {
            state_file: "state.json".to_string(),
        }
    }
}

impl Config {
    pub fn catalog(&self) -> TaskCatalog {
        TaskCatalog::new(self.day.tasks.iter().map(|t| t.trim()).filter(|t| !t.is_empty()))
    }

    pub fn state_path(&self, home: &Path) -> PathBuf {
        let p = PathBuf::from(&self.storage.state_file);
        if p.is_absolute() { p } else { home.join(p) }
    }
}

pub fn config_path() -> Result<PathBuf> {
    Ok(ensure_daymate_home()?.join("config.toml"))
}

pub fn load_config() -> Result<Config> {
    let p = config_path()?;
    if !p.exists() {
        return Ok(Config::default());
    }
    let s = fs::read_to_string(&p).with_context(|| format!("read {}", p.display()))?;
    parse_config(&s).with_context(|| format!("parse {}", p.display()))
}

pub fn parse_config(s: &str) -> Result<Config> {
    Ok(toml::from_str(s)?)
}

pub fn save_config(cfg: &Config) -> Result<()> {
    let p = config_path()?;
    let s = toml::to_string_pretty(cfg).context("serialize config")?;
    fs::write(&p, s).with_context(|| format!("write {}", p.display()))?;
    Ok(())
}

pub fn init_config() -> Result<()> {
    let p = config_path()?;
    if p.exists() {
        println!("Config already exists: {}", p.display());
        return Ok(());
    }
    save_config(&Config::default())?;
    println!("Wrote {}", p.display());
    Ok(())
}
