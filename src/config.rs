//! User configuration stored as TOML under the user config dir

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};
use ratatui::style::Color;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::augmented::BranchesChildren;
use crate::git::DEFAULT_MAX_COMMITS;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Commits read from the log, older ones are cut off
    pub max_commits: usize,
    pub fetch_interval_secs: u64,
    /// Quiet time before file changes trigger a refresh
    pub batch_interval_millis: u64,
    /// Hide a local branch next to its remote when both are at the same commit
    pub elide_synced_locals: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            max_commits: DEFAULT_MAX_COMMITS,
            fetch_interval_secs: 600,
            batch_interval_millis: 1000,
            elide_synced_locals: false,
        }
    }
}

impl Settings {
    pub fn fetch_interval(&self) -> Duration {
        Duration::from_secs(self.fetch_interval_secs)
    }

    pub fn batch_interval(&self) -> Duration {
        Duration::from_millis(self.batch_interval_millis)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RepoConfig {
    /// Branches shown when the repo was last viewed
    pub shown_branches: Vec<String>,
    /// Parent branch name to child branch names, set by the user
    pub branches_children: BranchesChildren,
    /// Display name to color name, e.g. "red", "lightblue" or "#ff8800"
    pub branch_colors: BTreeMap<String, String>,
}

impl RepoConfig {
    /// Parsed color overrides, invalid color names are skipped
    pub fn branch_colors(&self) -> HashMap<String, Color> {
        self.branch_colors
            .iter()
            .filter_map(|(name, color)| match Color::from_str(color) {
                Ok(color) => Some((name.clone(), color)),
                Err(_) => {
                    warn!("Invalid color {:?} for branch {:?}", color, name);
                    None
                }
            })
            .collect()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub settings: Settings,
    pub repos: BTreeMap<String, RepoConfig>,
}

fn repo_key(path: &Path) -> String {
    path.display().to_string()
}

impl Config {
    pub fn repo(&self, path: &Path) -> RepoConfig {
        self.repos.get(&repo_key(path)).cloned().unwrap_or_default()
    }
}

/// Config with the file it is saved to. In memory stores never touch the disk.
#[derive(Debug, Clone, Default)]
pub struct ConfigStore {
    config: Config,
    path: Option<PathBuf>,
}

impl ConfigStore {
    pub fn in_memory() -> Self {
        Self::with_config(Config::default())
    }

    pub fn with_config(config: Config) -> Self {
        Self { config, path: None }
    }

    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("ketto").join("config.toml"))
    }

    /// Load from the user config dir. A missing or broken file yields defaults.
    pub fn load() -> Self {
        let Some(path) = Self::default_path() else {
            warn!("No user config dir, using default settings");
            return Self::in_memory();
        };
        Self::load_from(path)
    }

    pub fn load_from(path: PathBuf) -> Self {
        let config = match Self::read(&path) {
            Ok(config) => config,
            Err(e) => {
                warn!("Failed to read config {}: {:#}", path.display(), e);
                Config::default()
            }
        };
        Self {
            config,
            path: Some(path),
        }
    }

    fn read(path: &Path) -> Result<Config> {
        if !path.exists() {
            return Ok(Config::default());
        }
        let content = fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
        toml::from_str(&content).with_context(|| format!("Failed to parse {}", path.display()))
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn settings(&self) -> &Settings {
        &self.config.settings
    }

    pub fn repo(&self, path: &Path) -> RepoConfig {
        self.config.repo(path)
    }

    /// Change the config of one repo and save
    pub fn update_repo(&mut self, path: &Path, update: impl FnOnce(&mut RepoConfig)) -> Result<()> {
        update(self.config.repos.entry(repo_key(path)).or_default());
        self.save()
    }

    pub fn save(&self) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir).with_context(|| format!("Failed to create {}", dir.display()))?;
        }
        let content = toml::to_string_pretty(&self.config).context("Failed to serialize config")?;
        fs::write(path, content).with_context(|| format!("Failed to write {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_for_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = ConfigStore::load_from(dir.path().join("config.toml"));
        assert_eq!(store.settings(), &Settings::default());
        assert_eq!(store.settings().max_commits, 30_000);
    }

    #[test]
    fn test_partial_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[settings]\nfetch_interval_secs = 60\n").unwrap();

        let store = ConfigStore::load_from(path);
        assert_eq!(store.settings().fetch_interval(), Duration::from_secs(60));
        assert_eq!(store.settings().batch_interval(), Duration::from_secs(1));
    }

    #[test]
    fn test_broken_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "settings = [").unwrap();

        let store = ConfigStore::load_from(path);
        assert_eq!(store.config(), &Config::default());
    }

    #[test]
    fn test_update_repo_saves() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ketto").join("config.toml");
        let repo = Path::new("/work/repo");

        let mut store = ConfigStore::load_from(path.clone());
        store
            .update_repo(repo, |r| {
                r.shown_branches = vec!["main".to_string(), "topic".to_string()];
                r.branches_children.insert("main".to_string(), vec!["topic".to_string()]);
            })
            .unwrap();

        let reloaded = ConfigStore::load_from(path);
        let config = reloaded.repo(repo);
        assert_eq!(config.shown_branches, vec!["main", "topic"]);
        assert_eq!(config.branches_children["main"], vec!["topic"]);
    }

    #[test]
    fn test_branch_colors() {
        let config = RepoConfig {
            branch_colors: BTreeMap::from([
                ("main".to_string(), "lightblue".to_string()),
                ("topic".to_string(), "not a color".to_string()),
            ]),
            ..Default::default()
        };
        let colors = config.branch_colors();
        assert_eq!(colors.get("main"), Some(&Color::LightBlue));
        assert!(!colors.contains_key("topic"));
    }
}
