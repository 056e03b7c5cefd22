//! Native-to-host callbacks.
//!
//! [`Routine::wrap_callback`] turns a host closure into a native function
//! pointer: a libffi closure whose trampoline enters [`dispatch`]. The
//! dispatcher decodes each native argument, invokes the closure and
//! encodes its result into the return slot.
//!
//! Nothing can unwind through the native frames that called the
//! trampoline. A closure that returns `Err` or panics, or arguments and
//! results that fail to convert, abort the process with a diagnostic.
//!
//! Host values and closures are not `Send`. A trampoline entered from a
//! thread other than the one that wrapped it aborts before it touches the
//! closure.

use crate::abi::Abi;
use crate::cif::{status_name, CallInterface};
use crate::error::{fatal, FfiError, FfiResult};
use crate::marshal::{decode_value, encode_return};
use crate::routine::{Origin, Routine};
use crate::schema::ValueType;
use crate::signature::Signature;
use crate::value::{HostClosure, HostValue};
use libffi::raw::{self, ffi_cif, ffi_closure};
use std::ffi::c_void;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::rc::Rc;
use std::thread::{self, ThreadId};

/// What the dispatcher needs to service one trampoline.
pub(crate) struct CallbackTarget<V> {
    owner: ThreadId,
    closure: Rc<dyn HostClosure<V>>,
    params: Vec<ValueType>,
    ret: Option<ValueType>,
}

/// Why a callback could not complete normally.
#[derive(Debug)]
pub enum CallbackFailure {
    Decode(FfiError),
    Closure(String),
    Encode(FfiError),
}

impl fmt::Display for CallbackFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CallbackFailure::Decode(e) => write!(f, "callback argument could not be decoded: {}", e),
            CallbackFailure::Closure(msg) => write!(f, "callback closure failed: {}", msg),
            CallbackFailure::Encode(e) => write!(f, "callback result could not be encoded: {}", e),
        }
    }
}

impl<V: HostValue> CallbackTarget<V> {
    /// Decode, invoke, encode.
    ///
    /// # Safety
    /// `args` must hold one valid pointer per parameter and `ret` must be
    /// the return slot libffi passed to the closure.
    pub(crate) unsafe fn run(
        &self,
        ret: *mut c_void,
        args: *const *mut c_void,
    ) -> Result<(), CallbackFailure> {
        let mut values = Vec::with_capacity(self.params.len());
        for (i, ty) in self.params.iter().enumerate() {
            let src = *args.add(i) as *const u8;
            values.push(decode_value(ty, src).map_err(CallbackFailure::Decode)?);
        }
        let result = self
            .closure
            .invoke(&values)
            .map_err(CallbackFailure::Closure)?;
        if let Some(ty) = &self.ret {
            encode_return(&result, ty, ret as *mut u8).map_err(CallbackFailure::Encode)?;
        }
        Ok(())
    }
}

/// Entry point of every trampoline.
unsafe extern "C" fn dispatch<V: HostValue>(
    _cif: *mut ffi_cif,
    ret: *mut c_void,
    args: *mut *mut c_void,
    user_data: *mut c_void,
) {
    let target = &*(user_data as *const CallbackTarget<V>);
    if thread::current().id() != target.owner {
        fatal("callback invoked from a foreign thread");
    }
    match panic::catch_unwind(AssertUnwindSafe(|| target.run(ret, args))) {
        Ok(Ok(())) => {}
        Ok(Err(failure)) => fatal(&failure.to_string()),
        Err(payload) => {
            let message = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            fatal(&format!("callback closure panicked: {}", message))
        }
    }
}

/// An allocated libffi closure; freed on drop.
pub(crate) struct Trampoline<V> {
    closure: *mut ffi_closure,
    code: usize,
    // Referenced by the closure as user data; boxed so it never moves.
    _target: Box<CallbackTarget<V>>,
}

impl<V: HostValue> Trampoline<V> {
    fn new(cif: &CallInterface, target: CallbackTarget<V>) -> FfiResult<Trampoline<V>> {
        let mut code: *mut c_void = std::ptr::null_mut();
        let closure = unsafe {
            raw::ffi_closure_alloc(std::mem::size_of::<ffi_closure>(), &mut code)
        } as *mut ffi_closure;
        if closure.is_null() || code.is_null() {
            return Err(FfiError::closure_alloc("couldn't allocate closure"));
        }

        let target = Box::new(target);
        let status = unsafe {
            raw::ffi_prep_closure_loc(
                closure,
                cif.as_raw(),
                Some(dispatch::<V>),
                &*target as *const CallbackTarget<V> as *mut c_void,
                code,
            )
        };
        if status != raw::ffi_status_FFI_OK {
            unsafe { raw::ffi_closure_free(closure as *mut c_void) };
            return Err(FfiError::closure_alloc(format!(
                "couldn't prep closure: {}",
                status_name(status)
            )));
        }

        Ok(Trampoline {
            closure,
            code: code as usize,
            _target: target,
        })
    }
}

impl<V> Drop for Trampoline<V> {
    fn drop(&mut self) {
        tracing::debug!(event = "trampoline_freed", code = self.code);
        unsafe { raw::ffi_closure_free(self.closure as *mut c_void) };
    }
}

impl<V: HostValue> Routine<V> {
    /// Wrap a host closure as a native function pointer with the given
    /// fixed-arity signature.
    pub fn wrap_callback(
        closure: impl HostClosure<V>,
        signature: Signature,
        abi: Abi,
    ) -> FfiResult<Routine<V>> {
        if signature.is_variadic() {
            return Err(FfiError::invalid_spec(
                "variadic callbacks are not supported",
            ));
        }
        let cif = CallInterface::fixed(abi, signature.ret(), &signature.arg_types())?;
        let closure: Rc<dyn HostClosure<V>> = Rc::new(closure);
        let trampoline = Trampoline::new(
            &cif,
            CallbackTarget {
                owner: thread::current().id(),
                closure: closure.clone(),
                params: signature.arg_types(),
                ret: signature.ret().cloned(),
            },
        )?;
        tracing::debug!(
            event = "callback_wrapped",
            code = trampoline.code,
            args = signature.params().len(),
        );
        Ok(Routine {
            entry: trampoline.code,
            trampoline: Some(trampoline),
            cif: Some(cif),
            abi,
            origin: Origin::Callback(closure),
            signature,
        })
    }
}
