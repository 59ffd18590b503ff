use anyhow::{Context, Result};
use std::path::PathBuf;

pub(crate) const DEFAULT_PROJECT: &str = "local";
pub(crate) const DEFAULT_LOG_FILTER: &str = "info";

/// Paths and settings resolved once at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Config {
    pub(crate) data_dir: PathBuf,
    pub(crate) db_path: PathBuf,
    pub(crate) log_path: PathBuf,
    pub(crate) export_dir: PathBuf,
    /// Project reference embedded in the session token key.
    pub(crate) project: String,
    pub(crate) log_filter: String,
}

impl Config {
    pub(crate) fn from_env() -> Result<Self> {
        Self::resolve(|key| std::env::var(key).ok())
    }

    /// `lookup` stands in for the process environment.
    pub(crate) fn resolve(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let data_dir = match non_empty("EXPENSETUI_DATA_DIR") {
            Some(dir) => PathBuf::from(dir),
            None => directories::ProjectDirs::from("com", "expensetui", "ExpenseTUI")
                .ok_or_else(|| anyhow::anyhow!("Could not determine data directory"))?
                .data_dir()
                .to_path_buf(),
        };

        let export_dir = match non_empty("EXPENSETUI_EXPORT_DIR") {
            Some(dir) => PathBuf::from(dir),
            None => directories::UserDirs::new()
                .map(|d| d.home_dir().to_path_buf())
                .unwrap_or_else(|| PathBuf::from(".")),
        };

        Ok(Self {
            db_path: data_dir.join("expensetui.db"),
            log_path: data_dir.join("expensetui.log"),
            data_dir,
            export_dir,
            project: non_empty("EXPENSETUI_PROJECT").unwrap_or_else(|| DEFAULT_PROJECT.into()),
            log_filter: non_empty("EXPENSETUI_LOG").unwrap_or_else(|| DEFAULT_LOG_FILTER.into()),
        })
    }

    pub(crate) fn ensure_dirs(&self) -> Result<()> {
        std::fs::create_dir_all(&self.data_dir).with_context(|| {
            format!(
                "Failed to create data directory: {}",
                self.data_dir.display()
            )
        })
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_overrides_from_env() {
        let cfg = Config::resolve(env(&[
            ("EXPENSETUI_DATA_DIR", "/tmp/et"),
            ("EXPENSETUI_EXPORT_DIR", "/tmp/out"),
            ("EXPENSETUI_PROJECT", "abcd"),
            ("EXPENSETUI_LOG", "debug"),
        ]))
        .unwrap();
        assert_eq!(cfg.db_path, PathBuf::from("/tmp/et/expensetui.db"));
        assert_eq!(cfg.log_path, PathBuf::from("/tmp/et/expensetui.log"));
        assert_eq!(cfg.export_dir, PathBuf::from("/tmp/out"));
        assert_eq!(cfg.project, "abcd");
        assert_eq!(cfg.log_filter, "debug");
    }

    #[test]
    fn test_blank_values_use_defaults() {
        let cfg = Config::resolve(env(&[
            ("EXPENSETUI_DATA_DIR", "/tmp/et"),
            ("EXPENSETUI_PROJECT", "  "),
        ]))
        .unwrap();
        assert_eq!(cfg.project, DEFAULT_PROJECT);
        assert_eq!(cfg.log_filter, DEFAULT_LOG_FILTER);
    }

    #[test]
    fn test_ensure_dirs_creates_data_dir() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("nested").join("data");
        let cfg = Config::resolve(env(&[("EXPENSETUI_DATA_DIR", dir.to_str().unwrap())])).unwrap();
        cfg.ensure_dirs().unwrap();
        assert!(dir.is_dir());
    }
}
