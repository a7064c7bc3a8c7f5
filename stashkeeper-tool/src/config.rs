use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::StkError;
use crate::store::{StoreType, default_store_path};

#[derive(Debug, Deserialize)]
pub struct Config {
    #[serde(default = "default_league")]
    pub league: String,
    #[serde(default = "default_realm")]
    pub realm: String,
    #[serde(default)]
    pub store: StoreConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            league: default_league(),
            realm: default_realm(),
            store: StoreConfig::default(),
        }
    }
}

fn default_league() -> String {
    "Standard".to_string()
}

fn default_realm() -> String {
    "pc".to_string()
}

#[derive(Debug, Default, Deserialize)]
pub struct StoreConfig {
    #[serde(default)]
    pub r#type: StoreType,
    pub path: Option<PathBuf>,
}

fn config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("stashkeeper").join("config.toml"))
}

/// Reads the config file. A missing file means defaults; a malformed one is
/// an error.
pub fn load_config_from(path: &Path) -> Result<Config, StkError> {
    match std::fs::read_to_string(path) {
        Ok(content) => Ok(toml::from_str(&content)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Config::default()),
        Err(e) => Err(e.into()),
    }
}

pub fn load_config() -> Result<Config, StkError> {
    match config_path() {
        Some(path) => load_config_from(&path),
        None => Ok(Config::default()),
    }
}

pub fn resolve_store_config(
    config: &Config,
    cli_type: Option<StoreType>,
    cli_path: Option<PathBuf>,
) -> (StoreType, PathBuf) {
    let store_type = cli_type.unwrap_or(config.store.r#type);
    let store_path = cli_path
        .or_else(|| config.store.path.clone())
        .unwrap_or_else(default_store_path);

    (store_type, store_path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn missing_file_gives_defaults() {
        let dir = TempDir::new().unwrap();
        let config = load_config_from(&dir.path().join("config.toml")).unwrap();
        assert_eq!(config.league, "Standard");
        assert_eq!(config.store.r#type, StoreType::Rocks);
    }

    #[test]
    fn parses_file_and_cli_overrides() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "league = \"Settlers\"\n[store]\ntype = \"memory\"\npath = \"/tmp/stk\"\n",
        )
        .unwrap();

        let config = load_config_from(&path).unwrap();
        assert_eq!(config.league, "Settlers");
        assert_eq!(config.realm, "pc");

        let (store_type, store_path) = resolve_store_config(&config, None, None);
        assert_eq!(store_type, StoreType::Memory);
        assert_eq!(store_path, PathBuf::from("/tmp/stk"));

        let (store_type, store_path) =
            resolve_store_config(&config, Some(StoreType::Rocks), Some("/data".into()));
        assert_eq!(store_type, StoreType::Rocks);
        assert_eq!(store_path, PathBuf::from("/data"));
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "league = [").unwrap();
        assert!(matches!(load_config_from(&path), Err(StkError::Config(_))));
    }
}
