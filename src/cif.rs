//! Call interface construction.
//!
//! A [`CallInterface`] owns a prepared `ffi_cif` together with the argument
//! descriptor array it points at and the schemas keeping aggregate
//! descriptors alive. Fixed interfaces are built once per routine;
//! transient ones are built for a single variadic call and dropped with it.

use crate::abi::Abi;
use crate::error::{FfiError, FfiResult};
use crate::schema::ValueType;
use crate::types::PrimType;
use libffi::raw::{self, ffi_cif, ffi_type};
use std::ffi::c_void;

// Added in libffi 3.4; not every binding generation exports it.
const FFI_BAD_ARGTYPE: raw::ffi_status = 3;

pub(crate) fn status_name(status: raw::ffi_status) -> String {
    match status {
        s if s == raw::ffi_status_FFI_OK => "FFI_OK".to_string(),
        s if s == raw::ffi_status_FFI_BAD_TYPEDEF => "FFI_BAD_TYPEDEF".to_string(),
        s if s == raw::ffi_status_FFI_BAD_ABI => "FFI_BAD_ABI".to_string(),
        FFI_BAD_ARGTYPE => "FFI_BAD_ARGTYPE".to_string(),
        other => format!("status {}", other),
    }
}

/// A prepared libffi call interface.
pub struct CallInterface {
    cif: Box<ffi_cif>,
    // Referenced by `cif.arg_types`; must not move or be dropped first.
    arg_types: Box<[*mut ffi_type]>,
    ret: Option<ValueType>,
    args: Vec<ValueType>,
    fixed: Option<usize>,
}

// Immutable after preparation; libffi only reads it during a call.
unsafe impl Send for CallInterface {}
unsafe impl Sync for CallInterface {}

impl CallInterface {
    /// Build the interface cached by a fixed-arity routine.
    pub fn fixed(abi: Abi, ret: Option<&ValueType>, args: &[ValueType]) -> FfiResult<Self> {
        Self::prepare(abi, ret, args.to_vec(), None)
    }

    /// Build a one-call interface for a variadic routine.
    ///
    /// `trailing` are the per-call types of the arguments after the fixed
    /// ones.
    pub fn transient(
        abi: Abi,
        ret: Option<&ValueType>,
        fixed: &[ValueType],
        trailing: &[ValueType],
    ) -> FfiResult<Self> {
        let mut args = Vec::with_capacity(fixed.len() + trailing.len());
        args.extend_from_slice(fixed);
        args.extend_from_slice(trailing);
        Self::prepare(abi, ret, args, Some(fixed.len()))
    }

    fn prepare(
        abi: Abi,
        ret: Option<&ValueType>,
        args: Vec<ValueType>,
        fixed: Option<usize>,
    ) -> FfiResult<Self> {
        let raw_abi = abi.to_raw()?;
        let mut arg_types: Box<[*mut ffi_type]> = args.iter().map(|a| a.ffi_type()).collect();
        let rtype = ret
            .map(|r| r.ffi_type())
            .unwrap_or_else(PrimType::void_ffi_type);
        let mut cif: Box<ffi_cif> = Box::new(unsafe { std::mem::zeroed() });
        let atypes = if arg_types.is_empty() {
            std::ptr::null_mut()
        } else {
            arg_types.as_mut_ptr()
        };

        let (operation, status) = match fixed {
            None => ("prep_cif", unsafe {
                raw::ffi_prep_cif(&mut *cif, raw_abi, args.len() as u32, rtype, atypes)
            }),
            Some(nfixed) => ("prep_cif_var", unsafe {
                raw::ffi_prep_cif_var(
                    &mut *cif,
                    raw_abi,
                    nfixed as u32,
                    args.len() as u32,
                    rtype,
                    atypes,
                )
            }),
        };
        if status != raw::ffi_status_FFI_OK {
            return Err(FfiError::cif_prep(operation, status_name(status)));
        }

        tracing::debug!(
            event = "cif_prepared",
            operation,
            abi = %abi,
            args = args.len(),
            fixed = fixed.unwrap_or(args.len()),
            void = ret.is_none(),
        );

        Ok(CallInterface {
            cif,
            arg_types,
            ret: ret.cloned(),
            args,
            fixed,
        })
    }

    pub fn arg_types(&self) -> &[ValueType] {
        &self.args
    }

    pub fn ret_type(&self) -> Option<&ValueType> {
        self.ret.as_ref()
    }

    pub fn is_variadic(&self) -> bool {
        self.fixed.is_some()
    }

    pub(crate) fn as_raw(&self) -> *mut ffi_cif {
        &*self.cif as *const ffi_cif as *mut ffi_cif
    }

    /// Perform the native call.
    ///
    /// # Safety
    /// `code` must be a function matching this interface, `ret` must point
    /// at a slot of at least `max(return size, ffi_arg)` bytes (or be null
    /// for void), and `args` must hold one valid pointer per argument.
    pub(crate) unsafe fn call(&self, code: *const c_void, ret: *mut c_void, args: *mut *mut c_void) {
        debug_assert_eq!(self.arg_types.len(), self.args.len());
        let fun: unsafe extern "C" fn() = std::mem::transmute(code);
        raw::ffi_call(self.as_raw(), Some(fun), ret, args);
    }
}

impl std::fmt::Debug for CallInterface {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallInterface")
            .field("args", &self.args.iter().map(|a| a.describe()).collect::<Vec<_>>())
            .field("ret", &self.ret.as_ref().map(|r| r.describe()))
            .field("fixed", &self.fixed)
            .finish()
    }
}
