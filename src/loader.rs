//! Locating and loading the bridge library.
//!
//! The library is found the same way every time: an explicit
//! `GO_BRIDGE_LIB_PATH`, otherwise a search of `GO_BRIDGE_LIB_DIR`. When
//! neither is set the caller decides what to do (see
//! [`Bridge::from_config`](crate::bridge::Bridge::from_config)).

use std::path::{Path, PathBuf};

use libloading::{Library, Symbol};
use log::{debug, info};

use crate::config::{BridgeConfig, ENV_LIB_DIR, ENV_LIB_PATH};
use crate::error::{BridgeError, Result};
use crate::sys::bridge::{self as ffi, BridgeInterface};

/// Platform file name of the bridge library.
pub fn library_filename() -> &'static str {
    #[cfg(target_os = "windows")]
    {
        "go_bridge.dll"
    }
    #[cfg(target_os = "macos")]
    {
        "libgo_bridge.dylib"
    }
    #[cfg(all(unix, not(target_os = "macos")))]
    {
        "libgo_bridge.so"
    }
}

fn candidates_from_dir(dir: &Path) -> Vec<PathBuf> {
    let filename = library_filename();
    vec![dir.join(filename), dir.join("lib").join(filename)]
}

/// Resolves the library path from `config`.
///
/// Returns `Ok(None)` when nothing is configured.
pub fn find_bridge_library(config: &BridgeConfig) -> Result<Option<PathBuf>> {
    if let Some(path) = &config.library_path {
        if path.exists() {
            return Ok(Some(path.clone()));
        }
        return Err(BridgeError::Locate(format!(
            "{ENV_LIB_PATH} is set but does not exist: {}",
            path.display()
        )));
    }

    if let Some(dir) = &config.library_dir {
        return candidates_from_dir(dir)
            .into_iter()
            .find(|p| p.exists())
            .map(Some)
            .ok_or_else(|| {
                BridgeError::Locate(format!(
                    "Could not find {} under {ENV_LIB_DIR}={}. Set {ENV_LIB_PATH} explicitly.",
                    library_filename(),
                    dir.display()
                ))
            });
    }

    Ok(None)
}

/// Opens `path` and resolves every export of the bridge ABI.
///
/// The returned [`Library`] must outlive every use of the table.
pub fn load_library(path: &Path) -> Result<(Library, BridgeInterface)> {
    info!("loading bridge library {}", path.display());

    let lib = unsafe { Library::new(path)? };
    let iface = unsafe { resolve(&lib)? };

    debug!("resolved bridge exports: {:?}", iface);
    Ok((lib, iface))
}

unsafe fn symbol<T: Copy>(lib: &Library, name: &'static [u8]) -> Result<T> {
    let sym: Symbol<T> = lib.get(name).map_err(|source| BridgeError::Symbol {
        symbol: ffi::symbol_name(name),
        source,
    })?;
    Ok(*sym)
}

unsafe fn resolve(lib: &Library) -> Result<BridgeInterface> {
    Ok(BridgeInterface {
        wait_a_bit: symbol(lib, ffi::SYM_WAIT_A_BIT)?,
        no_op: symbol(lib, ffi::SYM_NO_OP)?,
        div_integers: symbol(lib, ffi::SYM_DIV_INTEGERS)?,
        join_strings: symbol(lib, ffi::SYM_JOIN_STRINGS)?,
        echo_bytes: symbol(lib, ffi::SYM_ECHO_BYTES)?,
        new_test_map: symbol(lib, ffi::SYM_NEW_TEST_MAP)?,
        test_map_get_name: symbol(lib, ffi::SYM_TEST_MAP_GET_NAME)?,
        free_handle: symbol(lib, ffi::SYM_FREE_HANDLE)?,
        call_callback_add: symbol(lib, ffi::SYM_CALL_CALLBACK_ADD)?,
        returns_an_error: symbol(lib, ffi::SYM_RETURNS_AN_ERROR)?,
        any_echo_json: symbol(lib, ffi::SYM_ANY_ECHO_JSON)?,
        free_string: symbol(lib, ffi::SYM_FREE_STRING)?,
        free_bytes: symbol(lib, ffi::SYM_FREE_BYTES)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nothing_configured_is_not_an_error() {
        let found = find_bridge_library(&BridgeConfig::default()).unwrap();
        assert!(found.is_none());
    }

    #[test]
    fn missing_explicit_path_is_reported() {
        let config = BridgeConfig::default().with_library_path("/nonexistent/libgo_bridge.so");
        let err = find_bridge_library(&config).unwrap_err();
        assert!(err.to_string().contains(ENV_LIB_PATH));
    }

    #[test]
    fn directory_without_library_is_reported() {
        let config = BridgeConfig {
            library_dir: Some(std::env::temp_dir().join("go-jni-bridge-missing-dir")),
            ..BridgeConfig::default()
        };
        let err = find_bridge_library(&config).unwrap_err();
        assert!(err.to_string().contains(library_filename()));
    }

    #[test]
    fn loading_a_missing_library_fails() {
        let err = load_library(Path::new("/nonexistent/libgo_bridge.so")).unwrap_err();
        assert!(matches!(err, BridgeError::Load(_)));
    }
}
