//! `JNI_OnLoad` and the native methods of `GoBridge`.
//!
//! Every export follows the same shape: convert the Java arguments, call the
//! installed [`Bridge`](crate::bridge::Bridge), convert the result back. Any
//! error is logged and replaced by the method's failure value:
//!
//! | Method | On failure |
//! |--------|------------|
//! | `waitABit`, `noOp`, `freeHandle` | logs only |
//! | `divIntegers` | `NaN` |
//! | `joinStrings`, `echoBytes`, `testMapGetName`, `anyEchoJson` | `null` |
//! | `newTestMap` | `0` |
//! | `callCallbackAdd` | `-1` |
//! | `returnsAnError` | the error text (`null` means success) |
//!
//! No export throws. The only exception that can reach Java is one raised by
//! the callback target itself, which is left pending.

use std::borrow::Cow;
use std::ffi::{c_void, CStr, CString};
use std::panic::{self, AssertUnwindSafe};

use jni::objects::{JByteArray, JClass, JObject, JObjectArray, JString};
use jni::strings::JNIStr;
use jni::sys::{jbyteArray, jdouble, jint, jlong, jstring, JNI_ERR, JNI_VERSION_1_8};
use jni::JNIEnv;
use log::{debug, error, info};

use crate::bridge::Bridge;
use crate::callback::{add_trampoline, CallbackScope};
use crate::config::{init_logging, BridgeConfig};
use crate::error::{BridgeError, Result};
use crate::sys::bridge::BridgeHandle;

/// Runs `body`, turning errors and panics into `fallback`.
fn guarded<T>(method: &'static str, fallback: T, body: impl FnOnce() -> Result<T>) -> T {
    match panic::catch_unwind(AssertUnwindSafe(body)) {
        Ok(Ok(value)) => value,
        Ok(Err(e)) => {
            error!("GoBridge.{}: {}", method, e);
            fallback
        }
        Err(_) => {
            error!("GoBridge.{}: panicked", method);
            fallback
        }
    }
}

fn bridge() -> Result<&'static Bridge> {
    crate::global_bridge()
}

fn read_string(env: &mut JNIEnv, s: &JString, name: &'static str) -> Result<String> {
    if s.is_null() {
        return Err(BridgeError::NullArgument(name));
    }
    Ok(env.get_string(s)?.into())
}

fn new_string(env: &mut JNIEnv, value: &str) -> Result<jstring> {
    Ok(env.new_string(value)?.into_raw())
}

// =============================================================================
// Library load
// =============================================================================

#[no_mangle]
pub extern "system" fn JNI_OnLoad(_vm: *mut jni::sys::JavaVM, _reserved: *mut c_void) -> jint {
    let config = BridgeConfig::from_env();
    init_logging(&config);

    match crate::load_global_bridge(&config) {
        Ok(bridge) => {
            info!("GoBridge natives ready ({})", bridge.origin());
            JNI_VERSION_1_8
        }
        Err(e) => {
            error!("GoBridge natives unavailable: {}", e);
            JNI_ERR
        }
    }
}

// =============================================================================
// Void and primitive calls
// =============================================================================

#[no_mangle]
pub extern "system" fn Java_GoBridge_waitABit(_env: JNIEnv, _class: JClass, ms: jlong) {
    guarded("waitABit", (), || bridge()?.wait_a_bit(ms))
}

#[no_mangle]
pub extern "system" fn Java_GoBridge_noOp(_env: JNIEnv, _class: JClass) {
    guarded("noOp", (), || {
        bridge()?.no_op();
        Ok(())
    })
}

#[no_mangle]
pub extern "system" fn Java_GoBridge_divIntegers(
    _env: JNIEnv,
    _class: JClass,
    x: jlong,
    y: jlong,
) -> jdouble {
    guarded("divIntegers", f64::NAN, || bridge()?.div_integers(x, y))
}

// =============================================================================
// Strings and arrays
// =============================================================================

/// Copies the modified UTF-8 bytes of `s`, which never contain a NUL.
fn read_modified_utf8(env: &mut JNIEnv, s: &JString, name: &'static str) -> Result<CString> {
    if s.is_null() {
        return Err(BridgeError::NullArgument(name));
    }
    let chars = env.get_string(s)?;
    let bytes: &CStr = &chars;
    Ok(bytes.to_owned())
}

fn join_strings(env: &mut JNIEnv, items: &JObjectArray) -> Result<jstring> {
    if items.is_null() {
        return Err(BridgeError::NullArgument("arr"));
    }

    let len = env.get_array_length(items)?;
    let mut parts = Vec::with_capacity(usize::try_from(len).unwrap_or(0));
    for i in 0..len {
        let element = JString::from(env.get_object_array_element(items, i)?);
        let part = read_modified_utf8(env, &element, "arr[i]")?;
        env.delete_local_ref(element)?;
        parts.push(part);
    }

    debug!("joinStrings: {} element(s)", parts.len());
    let joined = bridge()?.join_c_strings(&parts)?;
    let decoded: Cow<str> = unsafe { JNIStr::from_ptr(joined.as_ptr()) }.into();
    new_string(env, &decoded)
}

#[no_mangle]
pub extern "system" fn Java_GoBridge_joinStrings<'local>(
    mut env: JNIEnv<'local>,
    _class: JClass<'local>,
    items: JObjectArray<'local>,
) -> jstring {
    guarded("joinStrings", std::ptr::null_mut(), || join_strings(&mut env, &items))
}

fn echo_bytes(env: &mut JNIEnv, data: &JByteArray) -> Result<jbyteArray> {
    if data.is_null() {
        return Err(BridgeError::NullArgument("data"));
    }

    let input = env.convert_byte_array(data)?;
    let echoed = bridge()?.echo_bytes(&input)?;
    Ok(env.byte_array_from_slice(&echoed)?.into_raw())
}

#[no_mangle]
pub extern "system" fn Java_GoBridge_echoBytes<'local>(
    mut env: JNIEnv<'local>,
    _class: JClass<'local>,
    data: JByteArray<'local>,
) -> jbyteArray {
    guarded("echoBytes", std::ptr::null_mut(), || echo_bytes(&mut env, &data))
}

// =============================================================================
// Opaque handles
// =============================================================================

#[no_mangle]
pub extern "system" fn Java_GoBridge_newTestMap(_env: JNIEnv, _class: JClass) -> jlong {
    guarded("newTestMap", 0, || Ok(bridge()?.new_test_map()? as jlong))
}

#[no_mangle]
pub extern "system" fn Java_GoBridge_testMapGetName<'local>(
    mut env: JNIEnv<'local>,
    _class: JClass<'local>,
    handle: jlong,
) -> jstring {
    guarded("testMapGetName", std::ptr::null_mut(), || {
        let name = bridge()?.test_map_get_name(handle as BridgeHandle)?;
        new_string(&mut env, &name)
    })
}

#[no_mangle]
pub extern "system" fn Java_GoBridge_freeHandle(_env: JNIEnv, _class: JClass, handle: jlong) {
    guarded("freeHandle", (), || {
        bridge()?.free_handle(handle as BridgeHandle);
        Ok(())
    })
}

// =============================================================================
// Callback
// =============================================================================

fn call_callback_add(env: &mut JNIEnv, adder: &JObject) -> Result<jlong> {
    if adder.is_null() {
        return Err(BridgeError::NullArgument("adder"));
    }
    let bridge = bridge()?;

    let class = env.get_object_class(adder)?;
    let method = match env.get_method_id(&class, "add", "(JJ)J") {
        Ok(method) => method,
        Err(e) => {
            if env.exception_check()? {
                env.exception_clear()?;
            }
            return Err(e.into());
        }
    };
    env.delete_local_ref(class)?;

    let scope = CallbackScope::enter(env, adder, method);
    let result = bridge.call_callback_add(add_trampoline);
    let failed = scope.failed();
    drop(scope);

    if failed {
        return Err(BridgeError::Callback);
    }
    result
}

#[no_mangle]
pub extern "system" fn Java_GoBridge_callCallbackAdd<'local>(
    mut env: JNIEnv<'local>,
    _class: JClass<'local>,
    adder: JObject<'local>,
) -> jlong {
    guarded("callCallbackAdd", -1, || call_callback_add(&mut env, &adder))
}

// =============================================================================
// Error propagation
// =============================================================================

/// `None` on success, the failure text otherwise.
fn error_message() -> Option<String> {
    match bridge().and_then(|b| b.returns_an_error()) {
        Ok(message) => message,
        Err(e) => Some(e.to_string()),
    }
}

#[no_mangle]
pub extern "system" fn Java_GoBridge_returnsAnError<'local>(
    mut env: JNIEnv<'local>,
    _class: JClass<'local>,
) -> jstring {
    guarded("returnsAnError", std::ptr::null_mut(), || match error_message() {
        Some(message) => new_string(&mut env, &message),
        None => Ok(std::ptr::null_mut()),
    })
}

// =============================================================================
// JSON echo
// =============================================================================

#[no_mangle]
pub extern "system" fn Java_GoBridge_anyEchoJson<'local>(
    mut env: JNIEnv<'local>,
    _class: JClass<'local>,
    payload: JString<'local>,
) -> jstring {
    guarded("anyEchoJson", std::ptr::null_mut(), || {
        let payload = read_string(&mut env, &payload, "payloadJson")?;
        let echoed = bridge()?.any_echo_json(&payload)?;
        new_string(&mut env, &echoed)
    })
}
