//! Raw FFI declarations.
//!
//! JNI types come from [`jni::sys`]; this module only describes the C ABI of
//! the bridge library on the other side of the shim.

pub mod bridge;
