//! Configuration loading and parsing.
//!
//! Parses `mapyrus.toml` (or an override path provided by the binary):
//! runtime limits (`[runtime] timeout_seconds`, `regex_cache_capacity`),
//! include search paths (`[include] paths`) and a default log filter
//! (`[log] filter`). Unknown fields are ignored so the format can grow
//! without breaking older files; a file that fails to parse falls back to
//! defaults rather than aborting startup.

use std::path::PathBuf;
use std::{fs, time::Duration};

use anyhow::Result;
use serde::Deserialize;
use tracing::{info, warn};

#[derive(Debug, Deserialize, Clone)]
pub struct RuntimeConfig {
    /// Wall-clock budget per interpretation; zero disables the throttle.
    #[serde(default)]
    pub timeout_seconds: u64,
    #[serde(default = "RuntimeConfig::default_regex_cache_capacity")]
    pub regex_cache_capacity: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: 0,
            regex_cache_capacity: Self::default_regex_cache_capacity(),
        }
    }
}

impl RuntimeConfig {
    const fn default_regex_cache_capacity() -> usize {
        64
    }

    pub fn timeout(&self) -> Option<Duration> {
        if self.timeout_seconds == 0 {
            None
        } else {
            Some(Duration::from_secs(self.timeout_seconds))
        }
    }
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct IncludeConfig {
    /// Directories searched for `include` targets after the including
    /// file's own directory.
    #[serde(default)]
    pub paths: Vec<PathBuf>,
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct LogConfig {
    /// Default tracing filter, overridden by `RUST_LOG`.
    #[serde(default)]
    pub filter: Option<String>,
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct ConfigFile {
    #[serde(default)]
    pub runtime: RuntimeConfig,
    #[serde(default)]
    pub include: IncludeConfig,
    #[serde(default)]
    pub log: LogConfig,
}

#[derive(Debug, Clone, Default)]
pub struct Config {
    pub file: ConfigFile,
    /// Where the configuration was actually read from, when it was.
    pub source: Option<PathBuf>,
}

/// Best-effort config path: working directory first, then the platform
/// config dir.
pub fn discover() -> PathBuf {
    let local = PathBuf::from("mapyrus.toml");
    if local.exists() {
        return local;
    }
    if let Some(dir) = dirs::config_dir() {
        return dir.join("mapyrus").join("mapyrus.toml");
    }
    PathBuf::from("mapyrus.toml")
}

pub fn load_from(path: Option<PathBuf>) -> Result<Config> {
    let path = path.unwrap_or_else(discover);
    match fs::read_to_string(&path) {
        Ok(content) => match toml::from_str::<ConfigFile>(&content) {
            Ok(file) => {
                info!(target: "config", path = %path.display(), "config_loaded");
                Ok(Config {
                    file,
                    source: Some(path),
                })
            }
            Err(e) => {
                warn!(target: "config", path = %path.display(), error = %e, "config_parse_failed_using_defaults");
                Ok(Config::default())
            }
        },
        Err(_) => Ok(Config::default()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_without_file() {
        let config = load_from(Some(PathBuf::from("/no/such/mapyrus.toml"))).unwrap();
        assert_eq!(config.file.runtime.regex_cache_capacity, 64);
        assert!(config.file.runtime.timeout().is_none());
        assert!(config.source.is_none());
    }

    #[test]
    fn parses_runtime_and_includes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mapyrus.toml");
        let mut f = std::fs::File::create(&path).unwrap();
        writeln!(
            f,
            "[runtime]\ntimeout_seconds = 30\nregex_cache_capacity = 128\n\n[include]\npaths = [\"/usr/share/maps\"]\n"
        )
        .unwrap();
        let config = load_from(Some(path)).unwrap();
        assert_eq!(
            config.file.runtime.timeout(),
            Some(Duration::from_secs(30))
        );
        assert_eq!(config.file.runtime.regex_cache_capacity, 128);
        assert_eq!(config.file.include.paths.len(), 1);
    }

    #[test]
    fn malformed_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mapyrus.toml");
        std::fs::write(&path, "not [valid toml").unwrap();
        let config = load_from(Some(path)).unwrap();
        assert_eq!(config.file.runtime.regex_cache_capacity, 64);
    }

    #[test]
    fn unknown_fields_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mapyrus.toml");
        std::fs::write(&path, "[future]\nshiny = true\n").unwrap();
        let config = load_from(Some(path)).unwrap();
        assert!(config.source.is_some());
    }
}
