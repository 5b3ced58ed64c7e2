//! Built-in implementation of the bridge ABI.
//!
//! These `extern "C"` functions behave like the exports of the external
//! bridge library and are installed when no library is configured. Strings
//! are handed out as `CString` allocations and byte buffers with `malloc`, so
//! each must come back through [`free_string`] / [`free_bytes`].

use std::collections::HashMap;
use std::ffi::{c_char, c_int, c_void, CStr, CString};
use std::ptr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, OnceLock};
use std::time::Duration;

use log::{trace, warn};
use serde_json::Value;

use crate::sys::bridge::{AddCallback, BridgeHandle, BridgeInterface, BRIDGE_ERR, BRIDGE_OK};

/// Name given to every new test map.
pub const TEST_MAP_NAME: &str = "name1";

/// Message reported by [`returns_an_error`].
pub const ERROR_MESSAGE: &str = "An error from ReturnsAnError";

/// Arguments the callback scenario passes to the callback, and the sum it
/// expects back.
pub const CALLBACK_ARGS: (i64, i64) = (1, 2);
pub const CALLBACK_EXPECTED: i64 = 3;

/// Function table pointing at this module.
pub fn interface() -> BridgeInterface {
    BridgeInterface {
        wait_a_bit,
        no_op,
        div_integers,
        join_strings,
        echo_bytes,
        new_test_map,
        test_map_get_name,
        free_handle,
        call_callback_add,
        returns_an_error,
        any_echo_json,
        free_string,
        free_bytes,
    }
}

// =============================================================================
// Handle registry
// =============================================================================

#[derive(Debug)]
struct TestMap {
    name: String,
}

static NEXT_HANDLE: AtomicU64 = AtomicU64::new(1);

fn registry() -> &'static Mutex<HashMap<BridgeHandle, TestMap>> {
    static REGISTRY: OnceLock<Mutex<HashMap<BridgeHandle, TestMap>>> = OnceLock::new();
    REGISTRY.get_or_init(|| Mutex::new(HashMap::new()))
}

fn store(map: TestMap) -> BridgeHandle {
    let handle = NEXT_HANDLE.fetch_add(1, Ordering::Relaxed);
    registry()
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
        .insert(handle, map);
    handle
}

fn with_map<R>(handle: BridgeHandle, f: impl FnOnce(&TestMap) -> R) -> Option<R> {
    let maps = registry().lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    maps.get(&handle).map(f)
}

fn remove(handle: BridgeHandle) -> bool {
    registry()
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
        .remove(&handle)
        .is_some()
}

// =============================================================================
// Allocation helpers
// =============================================================================

unsafe fn write_string(out: *mut *mut c_char, value: impl Into<Vec<u8>>) -> c_int {
    match CString::new(value) {
        Ok(s) => {
            *out = s.into_raw();
            BRIDGE_OK
        }
        Err(_) => BRIDGE_ERR,
    }
}

// =============================================================================
// Exports
// =============================================================================

pub unsafe extern "C" fn wait_a_bit(ms: i64) -> c_int {
    let Ok(ms) = u64::try_from(ms) else {
        return BRIDGE_ERR;
    };
    if ms > 0 {
        std::thread::sleep(Duration::from_millis(ms));
    }
    BRIDGE_OK
}

pub unsafe extern "C" fn no_op() {}

pub unsafe extern "C" fn div_integers(x: i64, y: i64, out_result: *mut f64) -> c_int {
    if y == 0 || out_result.is_null() {
        return BRIDGE_ERR;
    }
    *out_result = x as f64 / y as f64;
    BRIDGE_OK
}

pub unsafe extern "C" fn join_strings(
    arr: *mut *mut c_char,
    arr_len: c_int,
    out_result: *mut *mut c_char,
) -> c_int {
    let Ok(len) = usize::try_from(arr_len) else {
        return BRIDGE_ERR;
    };
    if out_result.is_null() || (arr.is_null() && len > 0) {
        return BRIDGE_ERR;
    }

    let mut joined: Vec<u8> = Vec::new();
    for i in 0..len {
        let item = *arr.add(i);
        if item.is_null() {
            return BRIDGE_ERR;
        }
        if i > 0 {
            joined.push(b',');
        }
        joined.extend_from_slice(CStr::from_ptr(item).to_bytes());
    }

    trace!("join_strings: {} part(s), {} byte(s)", len, joined.len());
    write_string(out_result, joined)
}

pub unsafe extern "C" fn echo_bytes(
    data: *mut c_void,
    data_len: c_int,
    out_data: *mut *mut c_void,
    out_len: *mut c_int,
) -> c_int {
    let Ok(len) = usize::try_from(data_len) else {
        return BRIDGE_ERR;
    };
    if out_data.is_null() || out_len.is_null() || (data.is_null() && len > 0) {
        return BRIDGE_ERR;
    }

    if len == 0 {
        *out_data = ptr::null_mut();
        *out_len = 0;
        return BRIDGE_OK;
    }

    let buf = libc::malloc(len);
    if buf.is_null() {
        return BRIDGE_ERR;
    }
    ptr::copy_nonoverlapping(data as *const u8, buf as *mut u8, len);

    *out_data = buf;
    *out_len = data_len;
    BRIDGE_OK
}

pub unsafe extern "C" fn new_test_map(out_handle: *mut BridgeHandle) -> c_int {
    if out_handle.is_null() {
        return BRIDGE_ERR;
    }
    *out_handle = store(TestMap {
        name: TEST_MAP_NAME.to_string(),
    });
    BRIDGE_OK
}

pub unsafe extern "C" fn test_map_get_name(handle: BridgeHandle, out_name: *mut *mut c_char) -> c_int {
    if out_name.is_null() {
        return BRIDGE_ERR;
    }
    match with_map(handle, |map| map.name.clone()) {
        Some(name) => write_string(out_name, name),
        None => BRIDGE_ERR,
    }
}

pub unsafe extern "C" fn free_handle(handle: BridgeHandle) {
    if !remove(handle) {
        warn!("free_handle: unknown handle {}", handle);
    }
}

pub unsafe extern "C" fn call_callback_add(cb: Option<AddCallback>, out_result: *mut i64) -> c_int {
    let Some(cb) = cb else {
        return BRIDGE_ERR;
    };
    if out_result.is_null() {
        return BRIDGE_ERR;
    }

    let (a, b) = CALLBACK_ARGS;
    let sum = cb(a, b);
    if sum != CALLBACK_EXPECTED {
        warn!("callback returned {} for add({}, {}), expected {}", sum, a, b, CALLBACK_EXPECTED);
        return BRIDGE_ERR;
    }

    *out_result = sum;
    BRIDGE_OK
}

pub unsafe extern "C" fn returns_an_error(out_err_msg: *mut *mut c_char) -> c_int {
    if out_err_msg.is_null() {
        return BRIDGE_ERR;
    }
    match CString::new(ERROR_MESSAGE) {
        Ok(msg) => *out_err_msg = msg.into_raw(),
        Err(_) => *out_err_msg = ptr::null_mut(),
    }
    BRIDGE_ERR
}

pub unsafe extern "C" fn any_echo_json(in_json: *const c_char, out_json: *mut *mut c_char) -> c_int {
    if in_json.is_null() || out_json.is_null() {
        return BRIDGE_ERR;
    }
    let Ok(raw) = CStr::from_ptr(in_json).to_str() else {
        return BRIDGE_ERR;
    };
    if !is_mixed_payload(raw) {
        return BRIDGE_ERR;
    }
    write_string(out_json, raw)
}

/// Accepts a non-empty JSON array whose elements cycle number, string, number.
pub fn is_mixed_payload(raw: &str) -> bool {
    let Ok(Value::Array(items)) = serde_json::from_str::<Value>(raw) else {
        return false;
    };
    !items.is_empty()
        && items.iter().enumerate().all(|(i, v)| match i % 3 {
            1 => v.is_string(),
            _ => v.is_number(),
        })
}

pub unsafe extern "C" fn free_string(s: *mut c_char) {
    if !s.is_null() {
        drop(CString::from_raw(s));
    }
}

pub unsafe extern "C" fn free_bytes(ptr: *mut c_void) {
    libc::free(ptr);
}
