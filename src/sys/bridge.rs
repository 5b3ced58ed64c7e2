// go-jni-bridge/src/sys/bridge.rs
//
// C ABI of the bridge library.
//
// The library is built separately (typically `go build -buildmode=c-shared`)
// and exports plain C functions. Every fallible export returns an `int`
// status and writes its results through out-parameters. Memory handed back
// through an out-parameter belongs to the library and must be returned via
// `GoFreeString` / `GoFreeBytes`.

use std::ffi::{c_char, c_int, c_void};

// =============================================================================
// Status codes
// =============================================================================

pub const BRIDGE_OK: c_int = 0;
pub const BRIDGE_ERR: c_int = -1;

// =============================================================================
// Handles and callbacks
// =============================================================================

/// Opaque identifier of an object owned by the bridge library.
///
/// Handles are never `0` in the built-in guest.
pub type BridgeHandle = u64;

/// `int64_t (*AddCallbackFunc)(int64_t, int64_t)`
pub type AddCallback = unsafe extern "C" fn(a: i64, b: i64) -> i64;

// =============================================================================
// Exported function types
// =============================================================================

pub type WaitABitFn = unsafe extern "C" fn(ms: i64) -> c_int;
pub type NoOpFn = unsafe extern "C" fn();
pub type DivIntegersFn = unsafe extern "C" fn(x: i64, y: i64, out_result: *mut f64) -> c_int;
pub type JoinStringsFn =
    unsafe extern "C" fn(arr: *mut *mut c_char, arr_len: c_int, out_result: *mut *mut c_char) -> c_int;
pub type EchoBytesFn = unsafe extern "C" fn(
    data: *mut c_void,
    data_len: c_int,
    out_data: *mut *mut c_void,
    out_len: *mut c_int,
) -> c_int;
pub type NewTestMapFn = unsafe extern "C" fn(out_handle: *mut BridgeHandle) -> c_int;
pub type TestMapGetNameFn =
    unsafe extern "C" fn(handle: BridgeHandle, out_name: *mut *mut c_char) -> c_int;
pub type FreeHandleFn = unsafe extern "C" fn(handle: BridgeHandle);
pub type CallCallbackAddFn =
    unsafe extern "C" fn(cb: Option<AddCallback>, out_result: *mut i64) -> c_int;
pub type ReturnsAnErrorFn = unsafe extern "C" fn(out_err_msg: *mut *mut c_char) -> c_int;
pub type AnyEchoJsonFn =
    unsafe extern "C" fn(in_json: *const c_char, out_json: *mut *mut c_char) -> c_int;
pub type FreeStringFn = unsafe extern "C" fn(s: *mut c_char);
pub type FreeBytesFn = unsafe extern "C" fn(ptr: *mut c_void);

// =============================================================================
// Function table
// =============================================================================

/// Every export of the bridge library, resolved up front.
///
/// A table is either filled from a loaded library (see [`crate::loader`]) or
/// built directly from Rust `extern "C"` functions.
#[derive(Clone, Copy)]
pub struct BridgeInterface {
    pub wait_a_bit: WaitABitFn,
    pub no_op: NoOpFn,
    pub div_integers: DivIntegersFn,
    pub join_strings: JoinStringsFn,
    pub echo_bytes: EchoBytesFn,
    pub new_test_map: NewTestMapFn,
    pub test_map_get_name: TestMapGetNameFn,
    pub free_handle: FreeHandleFn,
    pub call_callback_add: CallCallbackAddFn,
    pub returns_an_error: ReturnsAnErrorFn,
    pub any_echo_json: AnyEchoJsonFn,
    pub free_string: FreeStringFn,
    pub free_bytes: FreeBytesFn,
}

impl std::fmt::Debug for BridgeInterface {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BridgeInterface")
            .field("wait_a_bit", &(self.wait_a_bit as *const c_void))
            .field("div_integers", &(self.div_integers as *const c_void))
            .field("join_strings", &(self.join_strings as *const c_void))
            .field("echo_bytes", &(self.echo_bytes as *const c_void))
            .finish_non_exhaustive()
    }
}

// =============================================================================
// Exported symbol names (NUL-terminated for dlsym)
// =============================================================================

pub const SYM_WAIT_A_BIT: &[u8] = b"GoWaitABit\0";
pub const SYM_NO_OP: &[u8] = b"GoNoOp\0";
pub const SYM_DIV_INTEGERS: &[u8] = b"GoDivIntegers\0";
pub const SYM_JOIN_STRINGS: &[u8] = b"GoJoinStrings\0";
pub const SYM_ECHO_BYTES: &[u8] = b"GoEchoBytes\0";
pub const SYM_NEW_TEST_MAP: &[u8] = b"GoNewTestMap\0";
pub const SYM_TEST_MAP_GET_NAME: &[u8] = b"GoTestMapGetName\0";
pub const SYM_FREE_HANDLE: &[u8] = b"GoFreeHandle\0";
pub const SYM_CALL_CALLBACK_ADD: &[u8] = b"GoCallCallbackAdd\0";
pub const SYM_RETURNS_AN_ERROR: &[u8] = b"GoReturnsAnError\0";
pub const SYM_ANY_ECHO_JSON: &[u8] = b"GoAnyEchoJSON\0";
pub const SYM_FREE_STRING: &[u8] = b"GoFreeString\0";
pub const SYM_FREE_BYTES: &[u8] = b"GoFreeBytes\0";

/// Strips the trailing NUL from a symbol constant for diagnostics.
pub fn symbol_name(sym: &'static [u8]) -> &'static str {
    let trimmed = sym.strip_suffix(b"\0").unwrap_or(sym);
    std::str::from_utf8(trimmed).unwrap_or("<non-utf8 symbol>")
}
