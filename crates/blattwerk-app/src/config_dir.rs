// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Platform-aware configuration file resolution.

use std::path::{Path, PathBuf};

use anyhow::Context as _;
use blattwerk_core::config::EditorConfig;
use tracing::{debug, info};

const CONFIG_FILE: &str = "config.json";

/// Where the default configuration file lives:
/// `$XDG_CONFIG_HOME/blattwerk/config.json`, else `~/.config/blattwerk/config.json`.
pub fn default_config_path() -> Option<PathBuf> {
    config_base().map(|base| base.join("blattwerk").join(CONFIG_FILE))
}

/// Load the configuration from `explicit`, falling back to the default file
/// when it exists and to built-in defaults otherwise.
pub fn load_config(explicit: Option<&Path>) -> anyhow::Result<EditorConfig> {
    if let Some(path) = explicit {
        info!(path = %path.display(), "Loading configuration");
        return EditorConfig::load(path)
            .with_context(|| format!("load configuration '{}'", path.display()));
    }

    match default_config_path() {
        Some(path) if path.is_file() => {
            info!(path = %path.display(), "Loading default configuration");
            EditorConfig::load(&path)
                .with_context(|| format!("load configuration '{}'", path.display()))
        }
        _ => {
            debug!("No configuration file, using defaults");
            Ok(EditorConfig::default())
        }
    }
}

fn config_base() -> Option<PathBuf> {
    if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME") {
        if !xdg.is_empty() {
            return Some(PathBuf::from(xdg));
        }
    }
    std::env::var("HOME")
        .ok()
        .map(|home| PathBuf::from(home).join(".config"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_file_wins() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("custom.json");
        std::fs::write(&path, r#"{ "render_scale": 2.0 }"#).unwrap();
        let config = load_config(Some(&path)).unwrap();
        assert_eq!(config.render_scale, 2.0);
    }

    #[test]
    fn missing_explicit_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_config(Some(&dir.path().join("absent.json"))).is_err());
    }

    #[test]
    fn default_path_ends_in_blattwerk_config() {
        if let Some(path) = default_config_path() {
            assert!(path.ends_with("blattwerk/config.json"));
        }
    }
}
