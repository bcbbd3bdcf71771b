//! Base directory discovery and `teamcal.toml` loading.

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

pub const HOME_ENV: &str = "TEAMCAL_HOME";
pub const BASE_DIR_NAME: &str = "TeamCal";
pub const CONFIG_FILE_NAME: &str = "teamcal.toml";

static DEFAULT_DATABASE: &str = "teamcal.db";

fn default_database() -> String {
    DEFAULT_DATABASE.to_string()
}

/// Optional settings read from `<base dir>/teamcal.toml`.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct TeamCalConfig {
    pub log_level: Option<String>,

    /// Database file name, relative to the base directory.
    #[serde(default = "default_database")]
    pub database: String,

    /// Login that may edit every non-subscription calendar.
    pub demo_username: Option<String>,
}

impl Default for TeamCalConfig {
    fn default() -> Self {
        Self {
            log_level: None,
            database: default_database(),
            demo_username: None,
        }
    }
}

impl TeamCalConfig {
    /// Reads the config of `base_dir`; a missing file yields defaults.
    pub fn load(base_dir: &Path) -> Result<Self> {
        let path = base_dir.join(CONFIG_FILE_NAME);
        if !path.is_file() {
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(&path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let config: Self =
            toml::from_str(&raw).with_context(|| format!("invalid config {}", path.display()))?;
        if config.database.trim().is_empty() {
            bail!("`database` in {} must not be empty", path.display());
        }
        Ok(config)
    }

    pub fn database_path(&self, base_dir: &Path) -> PathBuf {
        base_dir.join(&self.database)
    }
}

/// Inputs of the base directory lookup, split out so tests need neither
/// the process environment nor the real home directory.
#[derive(Debug, Default)]
pub struct BaseDirSources {
    pub flag: Option<PathBuf>,
    pub env: Option<PathBuf>,
    pub current_dir: PathBuf,
    pub home_dir: Option<PathBuf>,
}

impl BaseDirSources {
    pub fn from_process(flag: Option<PathBuf>) -> Result<Self> {
        Ok(Self {
            flag,
            env: std::env::var_os(HOME_ENV)
                .filter(|value| !value.is_empty())
                .map(PathBuf::from),
            current_dir: std::env::current_dir().context("cannot determine current directory")?,
            home_dir: dirs::home_dir(),
        })
    }
}

/// Resolves the base directory: explicit flag, then `TEAMCAL_HOME`, then an
/// existing `./TeamCal`, then `$HOME/TeamCal`. A missing directory is only
/// created when `init` is set. The result is absolute.
pub fn resolve_base_dir(sources: &BaseDirSources, init: bool) -> Result<PathBuf> {
    let explicit = sources.flag.as_ref().or(sources.env.as_ref());
    let chosen = match explicit {
        Some(dir) => sources.current_dir.join(dir),
        None => {
            let local = sources.current_dir.join(BASE_DIR_NAME);
            let home = sources.home_dir.as_ref().map(|home| home.join(BASE_DIR_NAME));
            match home {
                Some(home) if !local.is_dir() && home.is_dir() => home,
                _ => local,
            }
        }
    };

    if !chosen.is_dir() {
        if !init {
            bail!(
                "base directory {} does not exist; rerun with --init to create it",
                chosen.display()
            );
        }
        std::fs::create_dir_all(&chosen)
            .with_context(|| format!("failed to create {}", chosen.display()))?;
        log::info!(
            "event=base_dir_init module=cli status=ok path={}",
            chosen.display()
        );
    }
    Ok(chosen)
}
