use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Database file used when neither the command line nor the config names one
pub const DEFAULT_DATABASE: &str = "db.sql3";

/// Optional settings read from `maskattack.toml`
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct MaskAttackConfig {
    /// Store file location
    pub database: Option<String>,
    /// Directory holding the per-clip data files (`create`)
    pub datadir: Option<String>,
    /// Directory prefixed to listed paths (`dumplist`, `checkfiles`)
    pub directory: Option<String>,
    /// Extension of the data files
    pub extension: Option<String>,
}

impl MaskAttackConfig {
    /// Store location: command line, then config, then the default
    pub fn database_path(&self, cli: Option<PathBuf>) -> PathBuf {
        cli.or_else(|| self.database.as_ref().map(PathBuf::from))
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DATABASE))
    }

    pub fn datadir_path(&self, cli: Option<PathBuf>) -> Option<PathBuf> {
        cli.or_else(|| self.datadir.as_ref().map(PathBuf::from))
    }

    pub fn directory_path(&self, cli: Option<PathBuf>) -> Option<PathBuf> {
        cli.or_else(|| self.directory.as_ref().map(PathBuf::from))
    }

    pub fn extension_or(&self, cli: Option<String>) -> Option<String> {
        cli.or_else(|| self.extension.clone())
    }
}

pub fn default_config_path() -> PathBuf {
    PathBuf::from("maskattack.toml")
}

/// Load the config file; a missing file is not an error
pub fn load_config(path: Option<&Path>) -> anyhow::Result<Option<MaskAttackConfig>> {
    let path = path.map(Path::to_path_buf).unwrap_or_else(default_config_path);
    if !path.exists() {
        return Ok(None);
    }

    let contents = std::fs::read_to_string(&path)?;
    let config: MaskAttackConfig = toml::from_str(&contents)?;
    tracing::debug!("Loaded config from {}", path.display());
    Ok(Some(config))
}

pub fn ensure_db_dir(db_path: &Path) -> anyhow::Result<()> {
    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}
