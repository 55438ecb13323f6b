//! On-disk configuration.
//!
//! Everything the engine needs — the core knobs, the mirror directory, and
//! the blacklist — lives in one JSON document under the platform config
//! directory. Writers publish via tmp-write-then-rename so a crash mid-save
//! never corrupts the file a concurrently running proxy has open.

use aptcache_core::{CoreConfig, MirrorDirectory, MirrorSet};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(flatten)]
    pub core: CoreConfig,
    #[serde(default)]
    pub mirrors: BTreeMap<String, MirrorSet>,
    #[serde(default)]
    pub blacklist: Vec<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        let mut mirrors = BTreeMap::new();
        mirrors.insert(
            "debian".to_string(),
            vec!["http://deb.debian.org/debian".to_string()],
        );
        mirrors.insert(
            "ubuntu".to_string(),
            vec!["http://archive.ubuntu.com/ubuntu".to_string()],
        );
        Self {
            core: CoreConfig::default(),
            mirrors,
            blacklist: Vec::new(),
        }
    }
}

pub fn config_path() -> anyhow::Result<PathBuf> {
    let dir = dirs::config_dir()
        .ok_or_else(|| anyhow::anyhow!("could not determine the platform config directory"))?
        .join("aptcache");
    Ok(dir.join("config.json"))
}

/// Loads `config.json`, writing out built-in defaults (including a resolved
/// default storage path next to the config file) the first time the CLI
/// runs on a machine.
pub fn load() -> anyhow::Result<AppConfig> {
    let path = config_path()?;
    match std::fs::read(&path) {
        Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            let mut cfg = AppConfig::default();
            if let Some(parent) = path.parent() {
                cfg.core.storage_path_resolved = parent.join("storage");
            }
            save(&cfg)?;
            Ok(cfg)
        }
        Err(e) => Err(e.into()),
    }
}

pub fn save(cfg: &AppConfig) -> anyhow::Result<()> {
    let path = config_path()?;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let tmp = path.with_extension("json.tmp");
    std::fs::write(&tmp, serde_json::to_vec_pretty(cfg)?)?;
    std::fs::rename(&tmp, &path)?;
    Ok(())
}

/// Adapts the on-disk `mirrors` map to the engine's [`MirrorDirectory`] seam.
pub struct ConfigMirrors(pub BTreeMap<String, MirrorSet>);

impl MirrorDirectory for ConfigMirrors {
    fn mirrors_for(&self, upstream_key: &str) -> Option<MirrorSet> {
        self.0.get(upstream_key).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_known_distros() {
        let cfg = AppConfig::default();
        assert!(cfg.mirrors.contains_key("debian"));
        assert!(cfg.mirrors.contains_key("ubuntu"));
    }
}
