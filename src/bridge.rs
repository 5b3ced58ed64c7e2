//! Safe wrapper around the bridge library's function table.
//!
//! [`Bridge`] owns a [`BridgeInterface`] (and, when loaded from disk, the
//! library that backs it) and exposes one method per export. Each method
//! copies its arguments into Rust-owned buffers that live for the duration of
//! the call, invokes the export, and turns the status code into a
//! [`Result`].
//!
//! Memory returned by the library is wrapped in a guard that hands it back to
//! the library's free function exactly once:
//!
//! - [`ForeignString`] releases through `GoFreeString`
//! - [`ForeignBytes`] releases through `GoFreeBytes`
//!
//! # Example
//!
//! ```rust,ignore
//! use go_jni_bridge::bridge::Bridge;
//!
//! let bridge = Bridge::builtin();
//! assert_eq!(bridge.join_strings(&["hello", "world"])?, "hello,world");
//!
//! let handle = bridge.new_test_map()?;
//! println!("{}", bridge.test_map_get_name(handle)?);
//! bridge.free_handle(handle);
//! ```

use std::ffi::{c_char, c_int, c_void, CStr, CString};
use std::path::Path;
use std::ptr;

use log::{debug, trace};

use crate::config::BridgeConfig;
use crate::error::{check, BridgeError, Result};
use crate::sys::bridge::{AddCallback, BridgeHandle, BridgeInterface, BRIDGE_OK};

/// A bridge library ready to be called.
///
/// # Thread Safety
///
/// The table holds plain function pointers, so a `Bridge` can be shared
/// between threads. Whether concurrent calls are sound is a property of the
/// library; the built-in guest serialises access to its handle table.
pub struct Bridge {
    iface: BridgeInterface,
    origin: String,
    _lib: Option<libloading::Library>,
}

impl std::fmt::Debug for Bridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bridge").field("origin", &self.origin).finish()
    }
}

impl Bridge {
    /// Wraps a function table.
    ///
    /// # Safety
    ///
    /// Every function pointer must honour the bridge ABI described in
    /// [`crate::sys::bridge`], including the ownership of returned memory.
    pub unsafe fn from_interface(iface: BridgeInterface) -> Self {
        Bridge {
            iface,
            origin: "custom interface".to_string(),
            _lib: None,
        }
    }

    /// Loads the bridge library at `path` and resolves every export.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let (lib, iface) = crate::loader::load_library(path)?;
        Ok(Bridge {
            iface,
            origin: path.display().to_string(),
            _lib: Some(lib),
        })
    }

    /// The Rust implementation of the bridge ABI shipped with this crate.
    #[cfg(feature = "guest")]
    pub fn builtin() -> Self {
        Bridge {
            iface: crate::guest::interface(),
            origin: "built-in guest".to_string(),
            _lib: None,
        }
    }

    /// Picks the library named by `config`, or the built-in guest when none is
    /// configured.
    pub fn from_config(config: &BridgeConfig) -> Result<Self> {
        match crate::loader::find_bridge_library(config)? {
            Some(path) => Self::load(path),
            None => Self::fallback(),
        }
    }

    #[cfg(feature = "guest")]
    fn fallback() -> Result<Self> {
        Ok(Self::builtin())
    }

    #[cfg(not(feature = "guest"))]
    fn fallback() -> Result<Self> {
        Err(BridgeError::Locate(format!(
            "no bridge library configured; set {} or {}",
            crate::config::ENV_LIB_PATH,
            crate::config::ENV_LIB_DIR
        )))
    }

    /// Returns the raw function table.
    pub fn interface(&self) -> &BridgeInterface {
        &self.iface
    }

    /// Describes where the table came from (a path or "built-in guest").
    pub fn origin(&self) -> &str {
        &self.origin
    }

    // =========================================================================
    // Scenario 1: void call
    // =========================================================================

    /// Blocks for `ms` milliseconds inside the library.
    pub fn wait_a_bit(&self, ms: i64) -> Result<()> {
        let status = unsafe { (self.iface.wait_a_bit)(ms) };
        check("GoWaitABit", status)
    }

    /// Calls the library's no-argument, no-result export.
    pub fn no_op(&self) {
        unsafe { (self.iface.no_op)() }
    }

    // =========================================================================
    // Scenario 2: primitive echo
    // =========================================================================

    /// Divides `x` by `y`. Division by zero is reported as a status error,
    /// never as a computed value.
    pub fn div_integers(&self, x: i64, y: i64) -> Result<f64> {
        let mut result = 0.0_f64;
        let status = unsafe { (self.iface.div_integers)(x, y, &mut result) };
        check("GoDivIntegers", status)?;
        Ok(result)
    }

    // =========================================================================
    // Scenario 3: string echo
    // =========================================================================

    /// Joins `items` inside the library.
    ///
    /// The strings are copied into NUL-terminated buffers owned by this call;
    /// the joined result is copied out and released with `GoFreeString`.
    pub fn join_strings<S: AsRef<str>>(&self, items: &[S]) -> Result<String> {
        let owned = items
            .iter()
            .map(|s| CString::new(s.as_ref()))
            .collect::<std::result::Result<Vec<_>, _>>()?;
        self.join_c_strings(&owned)?
            .into_string()
            .map_err(|_| BridgeError::Utf8 { call: "GoJoinStrings" })
    }

    /// Joins already-encoded C strings, passing their bytes through untouched.
    ///
    /// Used for JNI modified UTF-8, where U+0000 is encoded as `C0 80` and so
    /// never appears as a terminator.
    pub fn join_c_strings<S: AsRef<CStr>>(&self, items: &[S]) -> Result<CString> {
        let mut ptrs: Vec<*mut c_char> =
            items.iter().map(|s| s.as_ref().as_ptr() as *mut c_char).collect();
        let len = c_len(ptrs.len())?;

        trace!("GoJoinStrings with {} element(s)", len);

        let mut out: *mut c_char = ptr::null_mut();
        let status = unsafe { (self.iface.join_strings)(ptrs.as_mut_ptr(), len, &mut out) };
        let joined = unsafe { ForeignString::new(self, out) };
        check("GoJoinStrings", status)?;
        joined
            .as_c_str()
            .map(CStr::to_owned)
            .ok_or(BridgeError::MissingResult { call: "GoJoinStrings" })
    }

    // =========================================================================
    // Scenario 4: array echo
    // =========================================================================

    /// Sends `data` through the library and copies the returned buffer.
    ///
    /// A zero-length input yields a zero-length output.
    pub fn echo_bytes(&self, data: &[u8]) -> Result<Vec<u8>> {
        let len = c_len(data.len())?;
        let mut out: *mut c_void = ptr::null_mut();
        let mut out_len: c_int = 0;

        trace!("GoEchoBytes with {} byte(s)", len);

        let status = unsafe {
            (self.iface.echo_bytes)(data.as_ptr() as *mut c_void, len, &mut out, &mut out_len)
        };
        let echoed = unsafe { ForeignBytes::new(self, out, out_len) };
        check("GoEchoBytes", status)?;
        if out_len < 0 || (out.is_null() && out_len > 0) {
            return Err(BridgeError::MissingResult { call: "GoEchoBytes" });
        }
        Ok(echoed.as_slice().to_vec())
    }

    // =========================================================================
    // Scenario 5: object create + method call
    // =========================================================================

    /// Creates a library-side object and returns its handle.
    ///
    /// The handle stays valid until passed to [`Bridge::free_handle`].
    pub fn new_test_map(&self) -> Result<BridgeHandle> {
        let mut handle: BridgeHandle = 0;
        let status = unsafe { (self.iface.new_test_map)(&mut handle) };
        check("GoNewTestMap", status)?;
        debug!("GoNewTestMap -> handle {}", handle);
        Ok(handle)
    }

    /// Reads the name of the object behind `handle`.
    pub fn test_map_get_name(&self, handle: BridgeHandle) -> Result<String> {
        let mut out: *mut c_char = ptr::null_mut();
        let status = unsafe { (self.iface.test_map_get_name)(handle, &mut out) };
        let name = unsafe { ForeignString::new(self, out) };
        check("GoTestMapGetName", status)?;
        name.require("GoTestMapGetName")?.to_string_checked("GoTestMapGetName")
    }

    /// Releases the object behind `handle`.
    ///
    /// Use-after-free and double-free are the caller's responsibility.
    pub fn free_handle(&self, handle: BridgeHandle) {
        debug!("GoFreeHandle({})", handle);
        unsafe { (self.iface.free_handle)(handle) }
    }

    // =========================================================================
    // Scenario 6: callback
    // =========================================================================

    /// Hands `callback` to the library, which invokes it synchronously on
    /// this thread and reports the combined result.
    pub fn call_callback_add(&self, callback: AddCallback) -> Result<i64> {
        let mut result: i64 = 0;
        let status = unsafe { (self.iface.call_callback_add)(Some(callback), &mut result) };
        check("GoCallCallbackAdd", status)?;
        Ok(result)
    }

    // =========================================================================
    // Scenario 7: error propagation
    // =========================================================================

    /// Calls an export that may fail.
    ///
    /// Returns `None` on success and the library's message on failure. A
    /// failure without a message is described by its status code, so a failing
    /// call is never reported as `None`.
    pub fn returns_an_error(&self) -> Result<Option<String>> {
        let mut out: *mut c_char = ptr::null_mut();
        let status = unsafe { (self.iface.returns_an_error)(&mut out) };
        let message = unsafe { ForeignString::new(self, out) };
        if status == BRIDGE_OK {
            return Ok(None);
        }
        match message.as_c_str() {
            Some(msg) => Ok(Some(msg.to_string_lossy().into_owned())),
            None => Ok(Some(format!("GoReturnsAnError failed with status {status}"))),
        }
    }

    // =========================================================================
    // Dynamic payload echo
    // =========================================================================

    /// Sends a JSON document through the library and returns its echo.
    pub fn any_echo_json(&self, payload: &str) -> Result<String> {
        let input = CString::new(payload)?;
        let mut out: *mut c_char = ptr::null_mut();
        let status = unsafe { (self.iface.any_echo_json)(input.as_ptr(), &mut out) };
        let echoed = unsafe { ForeignString::new(self, out) };
        check("GoAnyEchoJSON", status)?;
        echoed.require("GoAnyEchoJSON")?.to_string_checked("GoAnyEchoJSON")
    }
}

fn c_len(len: usize) -> Result<c_int> {
    c_int::try_from(len).map_err(|_| BridgeError::TooLong(len))
}

// =========================================================================
// Ownership guards for library-allocated memory
// =========================================================================

/// A `char*` allocated by the bridge library.
///
/// The string is released through the library's `GoFreeString` when the guard
/// is dropped. A null pointer is allowed and is never passed to the free
/// function.
pub struct ForeignString<'a> {
    bridge: &'a Bridge,
    ptr: *mut c_char,
}

impl<'a> ForeignString<'a> {
    /// Takes ownership of `ptr`.
    ///
    /// # Safety
    ///
    /// `ptr` must be null or a NUL-terminated string allocated by `bridge`'s
    /// library and not owned by anything else.
    pub unsafe fn new(bridge: &'a Bridge, ptr: *mut c_char) -> Self {
        ForeignString { bridge, ptr }
    }

    /// Returns `true` when the library produced no string.
    pub fn is_null(&self) -> bool {
        self.ptr.is_null()
    }

    /// Borrows the string, or `None` for a null pointer.
    pub fn as_c_str(&self) -> Option<&CStr> {
        if self.ptr.is_null() {
            None
        } else {
            Some(unsafe { CStr::from_ptr(self.ptr) })
        }
    }

    fn require(self, call: &'static str) -> Result<Self> {
        if self.is_null() {
            Err(BridgeError::MissingResult { call })
        } else {
            Ok(self)
        }
    }

    fn to_string_checked(&self, call: &'static str) -> Result<String> {
        self.as_c_str()
            .ok_or(BridgeError::MissingResult { call })?
            .to_str()
            .map(str::to_owned)
            .map_err(|_| BridgeError::Utf8 { call })
    }
}

impl<'a> Drop for ForeignString<'a> {
    fn drop(&mut self) {
        if !self.ptr.is_null() {
            unsafe { (self.bridge.iface.free_string)(self.ptr) };
        }
    }
}

/// A byte buffer allocated by the bridge library.
///
/// Released through the library's `GoFreeBytes` when dropped.
pub struct ForeignBytes<'a> {
    bridge: &'a Bridge,
    ptr: *mut c_void,
    len: usize,
}

impl<'a> ForeignBytes<'a> {
    /// Takes ownership of `ptr`.
    ///
    /// # Safety
    ///
    /// `ptr` must be null or point to at least `len` readable bytes allocated
    /// by `bridge`'s library and not owned by anything else.
    pub unsafe fn new(bridge: &'a Bridge, ptr: *mut c_void, len: c_int) -> Self {
        ForeignBytes {
            bridge,
            ptr,
            len: usize::try_from(len).unwrap_or(0),
        }
    }

    /// Borrows the buffer; a null pointer reads as an empty slice.
    pub fn as_slice(&self) -> &[u8] {
        if self.ptr.is_null() || self.len == 0 {
            &[]
        } else {
            unsafe { std::slice::from_raw_parts(self.ptr as *const u8, self.len) }
        }
    }

    pub fn len(&self) -> usize {
        self.as_slice().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<'a> Drop for ForeignBytes<'a> {
    fn drop(&mut self) {
        if !self.ptr.is_null() {
            unsafe { (self.bridge.iface.free_bytes)(self.ptr) };
        }
    }
}
