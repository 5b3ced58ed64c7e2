//! # go-jni-bridge
//!
//! JNI native methods for the Java class `GoBridge`, backed by a C-ABI
//! "bridge library".
//!
//! Each `static native` method on `GoBridge` is exported from this crate as a
//! `Java_GoBridge_*` symbol. The export converts its Java arguments into C
//! values, calls the matching `Go*` function of the bridge library, and
//! converts the result back into Java values. Memory the library hands out
//! (strings, byte buffers) is returned to the library's own free functions.
//!
//! ## Scenarios
//!
//! | Java method | Bridge export | Shape |
//! |-------------|---------------|-------|
//! | `waitABit(long)` | `GoWaitABit` | void call |
//! | `noOp()` | `GoNoOp` | no arguments, no result |
//! | `divIntegers(long, long)` | `GoDivIntegers` | primitives in, `double` out |
//! | `joinStrings(String[])` | `GoJoinStrings` | string array in, string out |
//! | `echoBytes(byte[])` | `GoEchoBytes` | byte buffer round trip |
//! | `newTestMap()` / `testMapGetName(long)` / `freeHandle(long)` | `GoNewTestMap` / `GoTestMapGetName` / `GoFreeHandle` | opaque handle |
//! | `callCallbackAdd(AddCallback)` | `GoCallCallbackAdd` | callback into Java |
//! | `returnsAnError()` | `GoReturnsAnError` | error string out |
//! | `anyEchoJson(String)` | `GoAnyEchoJSON` | JSON payload round trip |
//!
//! ## Quick Start
//!
//! **1. Build the shared library:**
//! ```bash
//! cargo build --release
//! ```
//!
//! **2. Point it at a bridge library (optional):**
//! ```bash
//! export GO_BRIDGE_LIB_PATH=/opt/bridge/libgo_bridge.so
//! ```
//! Without it the built-in Rust implementation of the bridge (the `guest`
//! feature) is used.
//!
//! **3. Load it from Java:**
//! ```java
//! System.load("/path/to/target/release/libgo_jni_bridge.so");
//! double q = GoBridge.divIntegers(10, 4);
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │                  Java: GoBridge natives                 │
//! ├─────────────────────────────────────────────────────────┤
//! │            natives: Java_GoBridge_*, JNI_OnLoad         │
//! │   callback: thread-local context + add trampoline       │
//! ├─────────────────────────────────────────────────────────┤
//! │           bridge::Bridge - Result-returning calls       │
//! │   ForeignString, ForeignBytes - release on drop         │
//! ├─────────────────────────────────────────────────────────┤
//! │        sys::bridge::BridgeInterface (raw C ABI)         │
//! │   loader (libloading)        guest (built-in)           │
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`sys::bridge`] | Raw bridge ABI: status codes, function pointer table, symbol names |
//! | [`bridge`] | **Safe wrapper** - start here to call the bridge from Rust |
//! | [`loader`] | Finding and opening the bridge library |
//! | [`config`] | Environment configuration and logger setup |
//! | [`callback`] | Callback context for `callCallbackAdd` |
//! | [`natives`] | The JNI exports |
//! | `guest` | Built-in bridge implementation (`guest` feature) |
//! | `embed` | In-process JVM for integration tests (`embed` feature) |

pub mod sys;
pub mod bridge;
pub mod callback;
pub mod config;
pub mod error;
pub mod loader;
pub mod natives;
pub mod prelude;

#[cfg(feature = "guest")]
pub mod guest;

#[cfg(feature = "embed")]
pub mod embed;

use std::sync::OnceLock;

use log::info;

use crate::bridge::Bridge;
use crate::config::{init_logging, BridgeConfig};
use crate::error::{BridgeError, Result};

// =============================================================================
// The process-wide bridge
// =============================================================================

static GLOBAL_BRIDGE: OnceLock<Bridge> = OnceLock::new();

/// Installs `bridge` for the JNI exports.
///
/// Fails (handing the bridge back) if one is already installed.
pub fn install_bridge(bridge: Bridge) -> std::result::Result<(), Bridge> {
    GLOBAL_BRIDGE.set(bridge)
}

/// Returns the installed bridge, loading it from the environment on first use.
///
/// `JNI_OnLoad` normally installs the bridge. This covers hosts that call the
/// exports without going through `System.load`.
pub fn global_bridge() -> Result<&'static Bridge> {
    if let Some(bridge) = GLOBAL_BRIDGE.get() {
        return Ok(bridge);
    }
    let config = BridgeConfig::from_env();
    init_logging(&config);
    load_global_bridge(&config)
}

/// Installs the bridge selected by `config` unless one is already installed.
pub fn load_global_bridge(config: &BridgeConfig) -> Result<&'static Bridge> {
    if let Some(bridge) = GLOBAL_BRIDGE.get() {
        return Ok(bridge);
    }
    let bridge =
        Bridge::from_config(config).map_err(|e| BridgeError::Unavailable(e.to_string()))?;
    info!("using bridge: {}", bridge.origin());
    Ok(GLOBAL_BRIDGE.get_or_init(|| bridge))
}
