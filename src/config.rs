use std::path::Path;
use serde::Deserialize;
use crate::errors::{Error, Result};

/// Settings consulted by the middleware on every request.
///
/// Field names on the wire match the settings a web project would declare:
/// `DEBUG`, `UNUSED_CONTEXT_ALWAYS`, `UNUSED_CONTEXT_IGNORE`,
/// `UNUSED_CONTEXT_EXCLUDE`. Unknown settings are ignored so the same file can
/// carry the rest of a project's configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    #[serde(rename = "DEBUG", default)]
    pub debug: bool,
    /// Track even when `debug` is off.
    #[serde(rename = "UNUSED_CONTEXT_ALWAYS", default)]
    pub always: bool,
    /// Extra keys never reported as unused.
    #[serde(rename = "UNUSED_CONTEXT_IGNORE", default)]
    pub ignore: Vec<String>,
    /// Path prefixes that are never tracked.
    #[serde(rename = "UNUSED_CONTEXT_EXCLUDE", default = "default_exclude")]
    pub exclude: Vec<String>,
}

fn default_exclude() -> Vec<String> {
    vec!["/admin/".to_string()]
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            debug: false,
            always: false,
            ignore: Vec::new(),
            exclude: default_exclude(),
        }
    }
}

impl Settings {
    pub fn from_json(s: &str) -> Result<Self> {
        Ok(serde_json::from_str(s)?)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("{}: {e}", path.display())))?;
        Self::from_json(&raw)
    }

    pub fn should_track(&self) -> bool {
        self.debug || self.always
    }

    pub fn is_excluded(&self, path: &str) -> bool {
        self.exclude.iter().any(|prefix| path.starts_with(prefix.as_str()))
    }
}
