use std::cell::Cell;
use std::ffi::{c_char, c_int, c_void, CString};
use std::ptr;

use go_jni_bridge::bridge::Bridge;
use go_jni_bridge::error::BridgeError;
use go_jni_bridge::guest;
use go_jni_bridge::sys::bridge::{BridgeInterface, BRIDGE_ERR, BRIDGE_OK};

thread_local! {
    static STRING_FREES: Cell<usize> = const { Cell::new(0) };
    static BYTE_FREES: Cell<usize> = const { Cell::new(0) };
}

fn string_frees() -> usize {
    STRING_FREES.with(Cell::get)
}

fn byte_frees() -> usize {
    BYTE_FREES.with(Cell::get)
}

unsafe extern "C" fn counting_free_string(s: *mut c_char) {
    STRING_FREES.with(|n| n.set(n.get() + 1));
    guest::free_string(s);
}

unsafe extern "C" fn counting_free_bytes(p: *mut c_void) {
    BYTE_FREES.with(|n| n.set(n.get() + 1));
    guest::free_bytes(p);
}

unsafe extern "C" fn succeeds_without_message(out: *mut *mut c_char) -> c_int {
    *out = ptr::null_mut();
    BRIDGE_OK
}

unsafe extern "C" fn fails_without_message(out: *mut *mut c_char) -> c_int {
    *out = ptr::null_mut();
    BRIDGE_ERR
}

unsafe extern "C" fn reports_success_without_result(
    _arr: *mut *mut c_char,
    _len: c_int,
    out: *mut *mut c_char,
) -> c_int {
    *out = ptr::null_mut();
    BRIDGE_OK
}

unsafe extern "C" fn add(a: i64, b: i64) -> i64 {
    a + b
}

unsafe extern "C" fn subtract(a: i64, b: i64) -> i64 {
    a - b
}

fn counting_interface() -> BridgeInterface {
    BridgeInterface {
        free_string: counting_free_string,
        free_bytes: counting_free_bytes,
        ..guest::interface()
    }
}

fn counting_bridge() -> Bridge {
    unsafe { Bridge::from_interface(counting_interface()) }
}

// =============================================================================
// Void and primitive calls
// =============================================================================

#[test]
fn wait_and_no_op_complete() {
    let bridge = Bridge::builtin();
    bridge.wait_a_bit(1).unwrap();
    bridge.no_op();
}

#[test]
fn negative_wait_is_an_error() {
    let err = Bridge::builtin().wait_a_bit(-5).unwrap_err();
    assert!(matches!(err, BridgeError::Status { call: "GoWaitABit", .. }));
}

#[test]
fn division_returns_quotient() {
    let bridge = Bridge::builtin();
    assert_eq!(bridge.div_integers(10, 4).unwrap(), 2.5);
    assert_eq!(bridge.div_integers(-9, 3).unwrap(), -3.0);
}

#[test]
fn division_by_zero_is_a_failure_not_a_value() {
    let err = Bridge::builtin().div_integers(1, 0).unwrap_err();
    match err {
        BridgeError::Status { call, status } => {
            assert_eq!(call, "GoDivIntegers");
            assert_ne!(status, BRIDGE_OK);
        }
        other => panic!("unexpected error: {other}"),
    }
}

// =============================================================================
// Strings
// =============================================================================

#[test]
fn joins_with_commas() {
    let bridge = Bridge::builtin();
    assert_eq!(bridge.join_strings(&["a", "b", "c"]).unwrap(), "a,b,c");
    assert_eq!(bridge.join_strings(&["only"]).unwrap(), "only");
}

#[test]
fn joining_nothing_yields_empty_string() {
    let empty: [&str; 0] = [];
    assert_eq!(Bridge::builtin().join_strings(&empty).unwrap(), "");
}

#[test]
fn joining_non_ascii_round_trips() {
    let parts = vec!["grüße".to_string(), "日本".to_string()];
    assert_eq!(Bridge::builtin().join_strings(&parts).unwrap(), "grüße,日本");
}

#[test]
fn interior_nul_is_rejected_before_the_call() {
    let err = Bridge::builtin().join_strings(&["a\0b"]).unwrap_err();
    assert!(matches!(err, BridgeError::Nul(_)));
}

#[test]
fn joining_encoded_strings_passes_bytes_through() {
    // Modified UTF-8 for "a\0b": the NUL is encoded as C0 80.
    let parts = [
        CString::new(vec![b'a', 0xC0, 0x80, b'b']).unwrap(),
        CString::new("c").unwrap(),
    ];
    let joined = Bridge::builtin().join_c_strings(&parts).unwrap();
    assert_eq!(joined.as_bytes(), &[b'a', 0xC0, 0x80, b'b', b',', b'c']);
}

#[test]
fn joined_string_is_freed_once() {
    let bridge = counting_bridge();
    let before = string_frees();
    bridge.join_strings(&["x", "y"]).unwrap();
    assert_eq!(string_frees() - before, 1);
}

#[test]
fn success_without_result_is_reported() {
    let iface = BridgeInterface {
        join_strings: reports_success_without_result,
        ..counting_interface()
    };
    let bridge = unsafe { Bridge::from_interface(iface) };
    let before = string_frees();
    let err = bridge.join_strings(&["x"]).unwrap_err();
    assert!(matches!(err, BridgeError::MissingResult { call: "GoJoinStrings" }));
    assert_eq!(string_frees(), before);
}

// =============================================================================
// Byte buffers
// =============================================================================

#[test]
fn echoes_bytes() {
    let data: Vec<u8> = (0..=255).collect();
    assert_eq!(Bridge::builtin().echo_bytes(&data).unwrap(), data);
}

#[test]
fn empty_buffer_echoes_as_empty() {
    let echoed = Bridge::builtin().echo_bytes(&[]).unwrap();
    assert!(echoed.is_empty());
}

#[test]
fn echoed_buffer_is_freed_once() {
    let bridge = counting_bridge();
    let before = byte_frees();
    bridge.echo_bytes(b"hello").unwrap();
    assert_eq!(byte_frees() - before, 1);

    let before = byte_frees();
    bridge.echo_bytes(&[]).unwrap();
    assert_eq!(byte_frees(), before);
}

// =============================================================================
// Handles
// =============================================================================

#[test]
fn handle_stays_valid_until_freed() {
    let bridge = Bridge::builtin();
    let handle = bridge.new_test_map().unwrap();
    assert_ne!(handle, 0);

    for _ in 0..3 {
        assert_eq!(bridge.test_map_get_name(handle).unwrap(), guest::TEST_MAP_NAME);
    }

    bridge.free_handle(handle);
    assert!(bridge.test_map_get_name(handle).is_err());
}

#[test]
fn handles_are_independent() {
    let bridge = Bridge::builtin();
    let first = bridge.new_test_map().unwrap();
    let second = bridge.new_test_map().unwrap();
    assert_ne!(first, second);

    bridge.free_handle(first);
    assert_eq!(bridge.test_map_get_name(second).unwrap(), guest::TEST_MAP_NAME);
    bridge.free_handle(second);
}

#[test]
fn double_free_is_tolerated_by_the_guest() {
    let bridge = Bridge::builtin();
    let handle = bridge.new_test_map().unwrap();
    bridge.free_handle(handle);
    bridge.free_handle(handle);
}

#[test]
fn name_string_is_freed_once() {
    let bridge = counting_bridge();
    let handle = bridge.new_test_map().unwrap();
    let before = string_frees();
    bridge.test_map_get_name(handle).unwrap();
    assert_eq!(string_frees() - before, 1);
    bridge.free_handle(handle);
}

// =============================================================================
// Callback
// =============================================================================

#[test]
fn callback_round_trip_returns_sum() {
    let sum = Bridge::builtin().call_callback_add(add).unwrap();
    assert_eq!(sum, guest::CALLBACK_EXPECTED);
}

#[test]
fn wrong_callback_result_is_an_error() {
    let err = Bridge::builtin().call_callback_add(subtract).unwrap_err();
    assert!(matches!(err, BridgeError::Status { call: "GoCallCallbackAdd", .. }));
}

// =============================================================================
// Error propagation
// =============================================================================

#[test]
fn failing_call_returns_its_message() {
    let message = Bridge::builtin().returns_an_error().unwrap();
    assert_eq!(message.as_deref(), Some(guest::ERROR_MESSAGE));
}

#[test]
fn error_message_is_freed_once() {
    let bridge = counting_bridge();
    let before = string_frees();
    assert!(bridge.returns_an_error().unwrap().is_some());
    assert_eq!(string_frees() - before, 1);
}

#[test]
fn successful_call_returns_none_and_frees_nothing() {
    let iface = BridgeInterface {
        returns_an_error: succeeds_without_message,
        ..counting_interface()
    };
    let bridge = unsafe { Bridge::from_interface(iface) };
    let before = string_frees();
    assert_eq!(bridge.returns_an_error().unwrap(), None);
    assert_eq!(string_frees(), before);
}

#[test]
fn failure_without_message_is_never_none() {
    let iface = BridgeInterface {
        returns_an_error: fails_without_message,
        ..counting_interface()
    };
    let bridge = unsafe { Bridge::from_interface(iface) };
    let message = bridge.returns_an_error().unwrap().unwrap();
    assert!(message.contains("GoReturnsAnError"));
}

// =============================================================================
// JSON echo
// =============================================================================

#[test]
fn mixed_json_payload_is_echoed() {
    let payload = r#"[1,"two",3.5,4,"five"]"#;
    assert_eq!(Bridge::builtin().any_echo_json(payload).unwrap(), payload);
}

#[test]
fn malformed_json_payload_is_rejected() {
    let bridge = Bridge::builtin();
    assert!(bridge.any_echo_json("[]").is_err());
    assert!(bridge.any_echo_json(r#"["one"]"#).is_err());
    assert!(bridge.any_echo_json("{").is_err());
}

// =============================================================================
// Loading
// =============================================================================

#[test]
fn unconfigured_bridge_falls_back_to_the_guest() {
    let bridge = Bridge::from_config(&Default::default()).unwrap();
    assert_eq!(bridge.origin(), Bridge::builtin().origin());
}

#[test]
fn missing_library_path_fails_to_load() {
    let config = go_jni_bridge::config::BridgeConfig::default()
        .with_library_path("/nonexistent/dir/libgo_bridge.so");
    assert!(Bridge::from_config(&config).is_err());
}
