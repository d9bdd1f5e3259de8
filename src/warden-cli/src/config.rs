//! `warden.toml` configuration.
//!
//! Looked up in order: the `--config` path, `./warden.toml`, then
//! `<config_dir>/warden/config.toml`. A missing file means defaults; an
//! explicit `--config` path that does not exist is an error.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};

/// File name looked up in the working directory.
pub const LOCAL_CONFIG_FILE: &str = "warden.toml";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WardenConfig {
    /// Definition directories, searched before the default ones.
    pub definition_dirs: Vec<PathBuf>,
    pub elevated_mode: Option<bool>,
    /// Rate at which wall time becomes cooldown ticks.
    pub ticks_per_second: Option<u32>,
    /// Sandbox world YAML. The demo colony is used when unset.
    pub world: Option<PathBuf>,
    pub log_level: Option<String>,
}

impl WardenConfig {
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).context("Invalid warden config")
    }

    /// Read `path`. Relative paths inside the file are taken relative to
    /// the file's directory.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        let config = Self::parse(&content)
            .with_context(|| format!("Failed to parse config {}", path.display()))?;
        Ok(match path.parent() {
            Some(base) => config.relative_to(base),
            None => config,
        })
    }

    /// Find and load the config. Returns the path used, if any.
    pub fn discover(explicit: Option<&Path>) -> Result<(Self, Option<PathBuf>)> {
        if let Some(path) = explicit {
            if !path.exists() {
                bail!("Config file not found: {}", path.display());
            }
            return Ok((Self::load(path)?, Some(path.to_path_buf())));
        }

        for path in Self::candidate_paths() {
            if path.is_file() {
                return Ok((Self::load(&path)?, Some(path)));
            }
        }
        Ok((Self::default(), None))
    }

    /// Implicit config locations, in priority order.
    pub fn candidate_paths() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from(LOCAL_CONFIG_FILE)];
        if let Some(config_dir) = dirs::config_dir() {
            paths.push(config_dir.join("warden").join("config.toml"));
        }
        paths
    }

    fn relative_to(mut self, base: &Path) -> Self {
        let rebase = |p: PathBuf| if p.is_relative() { base.join(p) } else { p };
        self.definition_dirs = self.definition_dirs.into_iter().map(rebase).collect();
        self.world = self.world.map(rebase);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_full() {
        let config = WardenConfig::parse(
            r#"
definition_dirs = ["defs", "/opt/warden/defs"]
elevated_mode = true
ticks_per_second = 120
world = "colony.yaml"
log_level = "debug"
"#,
        )
        .unwrap();

        assert_eq!(config.definition_dirs.len(), 2);
        assert_eq!(config.elevated_mode, Some(true));
        assert_eq!(config.ticks_per_second, Some(120));
        assert_eq!(config.log_level.as_deref(), Some("debug"));
    }

    #[test]
    fn test_parse_empty_and_invalid() {
        assert_eq!(WardenConfig::parse("").unwrap(), WardenConfig::default());
        assert!(WardenConfig::parse("ticks_per_second = \"fast\"").is_err());
    }

    #[test]
    fn test_load_rebases_relative_paths() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("warden.toml");
        std::fs::write(
            &path,
            "definition_dirs = [\"defs\", \"/abs/defs\"]\nworld = \"colony.yaml\"\n",
        )
        .unwrap();

        let config = WardenConfig::load(&path).unwrap();
        assert_eq!(
            config.definition_dirs,
            vec![dir.path().join("defs"), PathBuf::from("/abs/defs")]
        );
        assert_eq!(config.world, Some(dir.path().join("colony.yaml")));
    }

    #[test]
    fn test_explicit_missing_config_fails() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.toml");
        assert!(WardenConfig::discover(Some(&missing)).is_err());
    }
}
