//! Callback path from the bridge library back into the JVM.
//!
//! The bridge ABI only accepts a bare `int64_t (*)(int64_t, int64_t)`, which
//! cannot carry the `JNIEnv*`, the target object or the method id. Those are
//! parked in thread-local storage by a [`CallbackScope`] for the duration of
//! one native call; the library invokes [`add_trampoline`] synchronously on the
//! same thread, and the trampoline reads them back.
//!
//! ```text
//! Java_GoBridge_callCallbackAdd
//!   └─ CallbackScope::enter(env, adder, add)   context = Some(..)
//!        └─ GoCallCallbackAdd(add_trampoline)
//!             └─ add_trampoline(1, 2) ──► adder.add(1, 2)   (JNI CallLongMethod)
//!   └─ drop(scope)                             context = previous
//! ```
//!
//! A scope restores whatever was installed before it, so a callback that
//! re-enters `callCallbackAdd` on the same thread sees its own context and
//! leaves the outer one intact.

use std::cell::Cell;
use std::marker::PhantomData;

use jni::objects::{JMethodID, JObject, JValue};
use jni::signature::{Primitive, ReturnType};
use jni::sys::{jmethodID, jobject};
use jni::JNIEnv;
use log::{error, trace, warn};

/// Everything the trampoline needs to reach the Java callback.
#[derive(Clone, Copy, Debug)]
struct CallbackContext {
    env: *mut jni::sys::JNIEnv,
    target: jobject,
    method: jmethodID,
    failed: bool,
}

thread_local! {
    static CONTEXT: Cell<Option<CallbackContext>> = const { Cell::new(None) };
}

/// Installs the callback context for the current thread until dropped.
///
/// Not `Send`: the context is only meaningful on the thread that owns the
/// `JNIEnv`.
#[must_use = "the callback context is cleared as soon as the scope is dropped"]
pub struct CallbackScope<'a> {
    previous: Option<CallbackContext>,
    _borrow: PhantomData<&'a ()>,
    _not_send: PhantomData<*const ()>,
}

impl<'a> CallbackScope<'a> {
    /// Parks `env`, `target` and `method` for [`add_trampoline`].
    ///
    /// `method` must identify an instance method of `target` with signature
    /// `(JJ)J`.
    pub fn enter(env: &'a JNIEnv<'_>, target: &'a JObject<'_>, method: JMethodID) -> Self {
        let context = CallbackContext {
            env: env.get_raw(),
            target: target.as_raw(),
            method: method.into_raw(),
            failed: false,
        };
        let previous = CONTEXT.with(|slot| slot.replace(Some(context)));
        trace!("callback context installed");
        CallbackScope {
            previous,
            _borrow: PhantomData,
            _not_send: PhantomData,
        }
    }

    /// Returns `true` if any trampoline call inside this scope failed to reach
    /// Java or returned with an exception.
    pub fn failed(&self) -> bool {
        CONTEXT.with(|slot| slot.get().map_or(true, |ctx| ctx.failed))
    }
}

impl<'a> Drop for CallbackScope<'a> {
    fn drop(&mut self) {
        CONTEXT.with(|slot| slot.set(self.previous.take()));
        trace!("callback context restored");
    }
}

/// Returns `true` while a [`CallbackScope`] is alive on this thread.
pub fn is_active() -> bool {
    CONTEXT.with(|slot| slot.get().is_some())
}

fn mark_failed() {
    CONTEXT.with(|slot| {
        if let Some(mut ctx) = slot.get() {
            ctx.failed = true;
            slot.set(Some(ctx));
        }
    });
}

/// `AddCallbackFunc` handed to the bridge library.
///
/// Calls `add(a, b)` on the target of the innermost [`CallbackScope`]. Without
/// a scope, or when the Java call fails, returns `0` and records the failure.
pub unsafe extern "C" fn add_trampoline(a: i64, b: i64) -> i64 {
    let Some(ctx) = CONTEXT.with(|slot| slot.get()) else {
        error!("add callback invoked with no callback context on this thread");
        return 0;
    };

    let mut env = match JNIEnv::from_raw(ctx.env) {
        Ok(env) => env,
        Err(e) => {
            error!("add callback: invalid JNIEnv: {}", e);
            mark_failed();
            return 0;
        }
    };
    let target = JObject::from_raw(ctx.target);
    let method = JMethodID::from_raw(ctx.method);
    let args = [JValue::Long(a).as_jni(), JValue::Long(b).as_jni()];

    let result = env
        .call_method_unchecked(&target, method, ReturnType::Primitive(Primitive::Long), &args)
        .and_then(|value| value.j());

    match result {
        Ok(sum) => {
            trace!("add({}, {}) = {}", a, b, sum);
            sum
        }
        Err(e) => {
            warn!("add callback into the JVM failed: {}", e);
            mark_failed();
            0
        }
    }
}
