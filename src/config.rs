use std::path::PathBuf;

use log::{debug, info};
use serde::Deserialize;
use url::Url;

use crate::store::StoreOptions;

// ---------------------------------------------------------------------------
// ConfigFile — deserialized from TOML (all fields optional)
// ---------------------------------------------------------------------------

#[derive(Default, Deserialize)]
#[serde(default)]
pub struct ConfigFile {
    pub slot: Option<PathBuf>,
    pub base_url: Option<String>,
    #[serde(default)]
    pub store: StoreConfigFile,
    #[serde(default)]
    pub preview: PreviewConfigFile,
}

#[derive(Default, Deserialize)]
#[serde(default)]
pub struct StoreConfigFile {
    pub coalesce_writes: Option<bool>,
}

#[derive(Default, Deserialize)]
#[serde(default)]
pub struct PreviewConfigFile {
    pub label_chars: Option<usize>,
}

// ---------------------------------------------------------------------------
// Config — resolved (all fields concrete)
// ---------------------------------------------------------------------------

pub struct Config {
    pub slot: PathBuf,
    pub store: StoreOptions,
    pub preview: PreviewConfig,
}

pub struct PreviewConfig {
    pub label_chars: usize,
}

impl ConfigFile {
    /// Merge CLI values (overwrites non-None fields).
    pub fn merge_cli(&mut self, slot: Option<PathBuf>, base_url: Option<String>) {
        if let Some(ref v) = slot {
            debug!("config: CLI override slot={}", v.display());
            self.slot = slot;
        }
        if let Some(ref v) = base_url {
            debug!("config: CLI override base_url={v}");
            self.base_url = base_url;
        }
    }

    /// Resolve to a Config by applying defaults to missing fields.
    pub fn resolve(self) -> anyhow::Result<Config> {
        let base_url = match self.base_url {
            Some(s) => Some(
                Url::parse(&s).map_err(|e| anyhow::anyhow!("invalid base_url '{s}': {e}"))?,
            ),
            None => None,
        };
        let slot = match self.slot {
            Some(p) => p,
            None => default_slot_path()
                .ok_or_else(|| anyhow::anyhow!("no slot path given and no HOME to default to"))?,
        };
        let config = Config {
            slot,
            store: StoreOptions {
                base_url,
                coalesce_writes: self.store.coalesce_writes.unwrap_or(true),
            },
            preview: PreviewConfig {
                label_chars: self.preview.label_chars.unwrap_or(60),
            },
        };
        info!(
            "config: resolved slot={}, base_url={}, coalesce_writes={}, label_chars={}",
            config.slot.display(),
            config
                .store
                .base_url
                .as_ref()
                .map_or("-", |u| u.as_str()),
            config.store.coalesce_writes,
            config.preview.label_chars,
        );
        Ok(config)
    }
}

fn xdg_dir(var: &str, home_fallback: &str) -> Option<PathBuf> {
    std::env::var_os(var)
        .map(PathBuf::from)
        .or_else(|| std::env::var_os("HOME").map(|h| PathBuf::from(h).join(home_fallback)))
}

/// Resolve the XDG config path for pagekeep.
fn config_path() -> Option<PathBuf> {
    Some(xdg_dir("XDG_CONFIG_HOME", ".config")?.join("pagekeep").join("config.toml"))
}

/// Default slot: `$XDG_STATE_HOME/pagekeep/page-state.json`.
fn default_slot_path() -> Option<PathBuf> {
    Some(xdg_dir("XDG_STATE_HOME", ".local/state")?.join("pagekeep").join("page-state.json"))
}

/// Load config file. Returns `ConfigFile::default()` if no file exists.
/// Returns an error if the file exists but cannot be parsed.
pub fn load_config() -> anyhow::Result<ConfigFile> {
    let path = match config_path() {
        Some(p) => p,
        None => {
            info!("config: no HOME or XDG_CONFIG_HOME set, using defaults");
            return Ok(ConfigFile::default());
        }
    };
    debug!("config: looking for {}", path.display());
    match std::fs::read_to_string(&path) {
        Ok(text) => {
            info!("config: loaded from {}", path.display());
            let cfg: ConfigFile = toml::from_str(&text)
                .map_err(|e| anyhow::anyhow!("failed to parse {}: {e}", path.display()))?;
            Ok(cfg)
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            info!("config: {} not found, using defaults", path.display());
            Ok(ConfigFile::default())
        }
        Err(e) => Err(anyhow::anyhow!("failed to read {}: {e}", path.display())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_toml() {
        let mut cfg: ConfigFile = toml::from_str("").unwrap();
        // Pin the slot so the test doesn't depend on HOME.
        cfg.merge_cli(Some("/tmp/s.json".into()), None);
        let resolved = cfg.resolve().unwrap();
        assert_eq!(resolved.slot, PathBuf::from("/tmp/s.json"));
        assert!(resolved.store.base_url.is_none());
        assert!(resolved.store.coalesce_writes);
        assert_eq!(resolved.preview.label_chars, 60);
    }

    #[test]
    fn partial_toml() {
        let text = r#"
            slot = "/var/tmp/page.json"
            base_url = "https://docs.invalid/book/"
            [store]
            coalesce_writes = false
        "#;
        let cfg: ConfigFile = toml::from_str(text).unwrap();
        let resolved = cfg.resolve().unwrap();
        assert_eq!(resolved.slot, PathBuf::from("/var/tmp/page.json"));
        assert_eq!(
            resolved.store.base_url.as_ref().map(|u| u.as_str()),
            Some("https://docs.invalid/book/")
        );
        assert!(!resolved.store.coalesce_writes);
        // Defaults for unspecified fields
        assert_eq!(resolved.preview.label_chars, 60);
    }

    #[test]
    fn invalid_toml() {
        let text = "this is not valid toml [[[";
        let result = toml::from_str::<ConfigFile>(text);
        assert!(result.is_err());
    }

    #[test]
    fn invalid_base_url() {
        let cfg: ConfigFile = toml::from_str(
            r#"
            slot = "/tmp/s.json"
            base_url = "not a url"
        "#,
        )
        .unwrap();
        assert!(cfg.resolve().is_err());
    }

    #[test]
    fn cli_overrides() {
        let mut cfg: ConfigFile = toml::from_str(
            r#"
            slot = "/from/file.json"
            [preview]
            label_chars = 20
        "#,
        )
        .unwrap();
        cfg.merge_cli(Some("/from/cli.json".into()), Some("https://cli.invalid/".into()));
        let resolved = cfg.resolve().unwrap();
        assert_eq!(resolved.slot, PathBuf::from("/from/cli.json")); // CLI wins
        assert_eq!(resolved.preview.label_chars, 20); // file (no CLI flag)
        assert!(resolved.store.base_url.is_some());
    }
}
