//! Error type shared by the loader, the bridge wrapper and the JNI exports.

use std::ffi::{c_int, NulError};

use thiserror::Error;

/// Everything that can go wrong on either side of the shim.
#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("failed to load bridge library: {0}")]
    Load(#[from] libloading::Error),

    #[error("bridge library does not export `{symbol}`: {source}")]
    Symbol {
        symbol: &'static str,
        #[source]
        source: libloading::Error,
    },

    #[error("{0}")]
    Locate(String),

    #[error("{call} failed with status {status}")]
    Status { call: &'static str, status: c_int },

    #[error("{call} returned a string that is not valid UTF-8")]
    Utf8 { call: &'static str },

    #[error("{call} reported success without producing a result")]
    MissingResult { call: &'static str },

    #[error("argument contains an interior NUL byte: {0}")]
    Nul(#[from] NulError),

    #[error("length {0} does not fit in a C int")]
    TooLong(usize),

    #[error("`{0}` must not be null")]
    NullArgument(&'static str),

    #[error("callback into the JVM failed")]
    Callback,

    #[error("no bridge installed and none could be loaded: {0}")]
    Unavailable(String),

    #[error(transparent)]
    Jni(#[from] jni::errors::Error),
}

pub type Result<T, E = BridgeError> = std::result::Result<T, E>;

/// Maps a bridge status code to `Ok(())` or [`BridgeError::Status`].
pub(crate) fn check(call: &'static str, status: c_int) -> Result<()> {
    if status == crate::sys::bridge::BRIDGE_OK {
        Ok(())
    } else {
        Err(BridgeError::Status { call, status })
    }
}
