//! Common imports for calling the bridge from Rust.
//!
//! Kept small: the wrapper, its configuration and error types.

pub use crate::bridge::{Bridge, ForeignBytes, ForeignString};
pub use crate::config::BridgeConfig;
pub use crate::error::{BridgeError, Result};
pub use crate::sys::bridge::{AddCallback, BridgeHandle, BridgeInterface};
pub use crate::{global_bridge, install_bridge};
#[cfg(feature = "embed")]
pub use crate::embed::{EmbeddedJvm, JavaVmBuilder};
