//! Runtime configuration read from the environment.
//!
//! | Variable | Meaning |
//! |----------|---------|
//! | `GO_BRIDGE_LIB_PATH` | Path of the bridge shared library |
//! | `GO_BRIDGE_LIB_DIR` | Directory searched for the platform file name |
//! | `GO_BRIDGE_LOG` | Log filter, falls back to `RUST_LOG` |

use std::ffi::OsString;
use std::path::PathBuf;

pub const ENV_LIB_PATH: &str = "GO_BRIDGE_LIB_PATH";
pub const ENV_LIB_DIR: &str = "GO_BRIDGE_LIB_DIR";
pub const ENV_LOG: &str = "GO_BRIDGE_LOG";

/// Where to find the bridge library and how loudly to log.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BridgeConfig {
    pub library_path: Option<PathBuf>,
    pub library_dir: Option<PathBuf>,
    pub log_filter: Option<String>,
}

impl BridgeConfig {
    /// Reads the configuration from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var_os(key))
    }

    /// Builds a configuration from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<OsString>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.is_empty());

        BridgeConfig {
            library_path: non_empty(ENV_LIB_PATH).map(PathBuf::from),
            library_dir: non_empty(ENV_LIB_DIR).map(PathBuf::from),
            log_filter: non_empty(ENV_LOG)
                .or_else(|| non_empty("RUST_LOG"))
                .and_then(|v| v.into_string().ok()),
        }
    }

    /// Uses the library at `path`.
    pub fn with_library_path<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.library_path = Some(path.into());
        self
    }

    /// Sets the log filter (`env_logger` syntax).
    pub fn with_log_filter(mut self, filter: &str) -> Self {
        self.log_filter = Some(filter.to_string());
        self
    }
}

/// Installs the process logger once.
///
/// A host that already installed a `log` backend keeps it.
pub fn init_logging(config: &BridgeConfig) {
    let mut builder = pretty_env_logger::formatted_builder();
    match &config.log_filter {
        Some(filter) => {
            builder.parse_filters(filter);
        }
        None => {
            builder.filter_level(log::LevelFilter::Warn);
        }
    }
    let _ = builder.try_init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<OsString> {
        let map: HashMap<String, OsString> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), OsString::from(v)))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn empty_environment_yields_defaults() {
        let config = BridgeConfig::from_lookup(lookup(&[]));
        assert_eq!(config, BridgeConfig::default());
    }

    #[test]
    fn reads_library_and_log_settings() {
        let config = BridgeConfig::from_lookup(lookup(&[
            (ENV_LIB_PATH, "/opt/bridge/libgo_bridge.so"),
            (ENV_LIB_DIR, "/opt/bridge"),
            (ENV_LOG, "debug"),
        ]));
        assert_eq!(config.library_path, Some(PathBuf::from("/opt/bridge/libgo_bridge.so")));
        assert_eq!(config.library_dir, Some(PathBuf::from("/opt/bridge")));
        assert_eq!(config.log_filter.as_deref(), Some("debug"));
    }

    #[test]
    fn empty_values_are_ignored() {
        let config = BridgeConfig::from_lookup(lookup(&[(ENV_LIB_PATH, ""), (ENV_LOG, "")]));
        assert!(config.library_path.is_none());
        assert!(config.log_filter.is_none());
    }

    #[test]
    fn log_filter_falls_back_to_rust_log() {
        let config = BridgeConfig::from_lookup(lookup(&[("RUST_LOG", "go_jni_bridge=trace")]));
        assert_eq!(config.log_filter.as_deref(), Some("go_jni_bridge=trace"));

        let config = BridgeConfig::from_lookup(lookup(&[("RUST_LOG", "info"), (ENV_LOG, "error")]));
        assert_eq!(config.log_filter.as_deref(), Some("error"));
    }
}
