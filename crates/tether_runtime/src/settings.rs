//! Settings management

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Runtime settings, read from a JSON file. Every field is optional in the
/// file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Directory the entries of `scripts` are relative to.
    pub script_root: PathBuf,
    /// One scripted entity is spawned per entry.
    pub scripts: Vec<String>,
    pub hooks: HookSettings,
    pub ticks: u32,
    pub tick_seconds: f64,
    /// Used when `RUST_LOG` is not set.
    pub log_filter: String,
}

/// Names of the script lifecycle functions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HookSettings {
    pub start: String,
    pub update: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            script_root: PathBuf::from("scripts"),
            scripts: vec!["mover.js".to_owned()],
            hooks: HookSettings::default(),
            ticks: 60,
            tick_seconds: 1.0 / 60.0,
            log_filter: "info".to_owned(),
        }
    }
}

impl Default for HookSettings {
    fn default() -> Self {
        Self {
            start: "Start".to_owned(),
            update: "Update".to_owned(),
        }
    }
}

impl Settings {
    /// Load from `path`. A missing file means defaults.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading settings from {}", path.display()))?;
        Self::parse(&text).with_context(|| format!("parsing settings in {}", path.display()))
    }

    pub fn parse(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn script_paths(&self) -> impl Iterator<Item = PathBuf> + '_ {
        self.scripts.iter().map(|script| self.script_root.join(script))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_file_keeps_defaults() {
        let settings = Settings::parse(r#"{ "ticks": 3, "hooks": { "update": "Tick" } }"#).unwrap();
        assert_eq!(settings.ticks, 3);
        assert_eq!(settings.hooks.update, "Tick");
        assert_eq!(settings.hooks.start, "Start");
        assert_eq!(settings.log_filter, "info");
    }

    #[test]
    fn missing_file_is_default() {
        let settings = Settings::load(Path::new("/definitely/not/tether.json")).unwrap();
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn malformed_file_is_an_error() {
        assert!(Settings::parse("{ ticks: }").is_err());
        assert!(Settings::parse(r#"{ "ticks": "many" }"#).is_err());
    }

    #[test]
    fn script_paths_join_the_root() {
        let settings = Settings {
            script_root: PathBuf::from("game"),
            scripts: vec!["a.js".into(), "b.js".into()],
            ..Settings::default()
        };
        let paths: Vec<PathBuf> = settings.script_paths().collect();
        assert_eq!(paths, [PathBuf::from("game/a.js"), PathBuf::from("game/b.js")]);
    }
}
