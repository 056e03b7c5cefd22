//! Routine descriptors: a native entry point plus everything needed to
//! call it.
//!
//! A routine comes from one of three places: a symbol in a loaded
//! library, a raw address supplied by the caller, or a trampoline wrapping
//! a host closure (see [`crate::callback`]).

use crate::abi::Abi;
use crate::callback::Trampoline;
use crate::cif::CallInterface;
use crate::error::{FfiError, FfiResult};
use crate::loader::Library;
use crate::signature::Signature;
use crate::value::{HostClosure, HostValue};
use std::fmt;
use std::rc::Rc;

/// Where a routine's entry point came from.
pub enum Origin<V> {
    Library {
        library: Rc<dyn Library>,
        symbol: String,
    },
    Raw,
    Callback(Rc<dyn HostClosure<V>>),
}

pub struct Routine<V: HostValue> {
    // Declared before `cif`: the trampoline points at the cif and must be
    // released first.
    pub(crate) trampoline: Option<Trampoline<V>>,
    /// Absent for variadic routines, which build one per call.
    pub(crate) cif: Option<CallInterface>,
    pub(crate) entry: usize,
    pub(crate) abi: Abi,
    pub(crate) origin: Origin<V>,
    pub(crate) signature: Signature,
}

impl<V: HostValue> Routine<V> {
    /// Bind `symbol` from `library`.
    ///
    /// The routine keeps the library handle and refuses to run once the
    /// library reports itself closed.
    pub fn bind(
        library: Rc<dyn Library>,
        symbol: &str,
        signature: Signature,
        abi: Abi,
    ) -> FfiResult<Routine<V>> {
        if !library.is_open() {
            return Err(FfiError::library_closed(library.name()));
        }
        let entry = library.symbol(symbol)?;
        let cif = Self::fixed_cif(&signature, abi)?;
        tracing::debug!(
            event = "routine_bound",
            library = library.name(),
            symbol,
            entry,
            variadic = signature.is_variadic(),
        );
        Ok(Routine {
            trampoline: None,
            cif,
            entry,
            abi,
            origin: Origin::Library {
                library,
                symbol: symbol.to_string(),
            },
            signature,
        })
    }

    /// Bind an arbitrary native address.
    ///
    /// # Safety
    /// `address` must be a function with the given signature for as long
    /// as the routine may be called.
    pub unsafe fn from_address(
        address: usize,
        signature: Signature,
        abi: Abi,
    ) -> FfiResult<Routine<V>> {
        if address == 0 {
            return Err(FfiError::null_address("make_routine_raw"));
        }
        let cif = Self::fixed_cif(&signature, abi)?;
        tracing::debug!(event = "routine_raw", entry = address);
        Ok(Routine {
            trampoline: None,
            cif,
            entry: address,
            abi,
            origin: Origin::Raw,
            signature,
        })
    }

    pub(crate) fn fixed_cif(signature: &Signature, abi: Abi) -> FfiResult<Option<CallInterface>> {
        if signature.is_variadic() {
            // validate the ABI up front even though no cif is cached
            abi.to_raw()?;
            return Ok(None);
        }
        CallInterface::fixed(abi, signature.ret(), &signature.arg_types()).map(Some)
    }

    /// Native entry point; for callbacks, the trampoline address.
    pub fn address(&self) -> usize {
        self.entry
    }

    pub fn abi(&self) -> Abi {
        self.abi
    }

    pub fn signature(&self) -> &Signature {
        &self.signature
    }

    pub fn origin(&self) -> &Origin<V> {
        &self.origin
    }

    pub fn is_variadic(&self) -> bool {
        self.signature.is_variadic()
    }

    pub fn is_callback(&self) -> bool {
        matches!(self.origin, Origin::Callback(_))
    }

    /// The cached call interface of a fixed-arity routine.
    pub fn call_interface(&self) -> Option<&CallInterface> {
        self.cif.as_ref()
    }

    /// Fails if the owning library has been closed.
    pub fn check_live(&self) -> FfiResult<()> {
        match &self.origin {
            Origin::Library { library, .. } if !library.is_open() => {
                Err(FfiError::library_closed(library.name()))
            }
            _ => Ok(()),
        }
    }
}

impl<V: HostValue> fmt::Debug for Routine<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let origin = match &self.origin {
            Origin::Library { library, symbol } => format!("{}:{}", library.name(), symbol),
            Origin::Raw => "raw".to_string(),
            Origin::Callback(_) => "callback".to_string(),
        };
        f.debug_struct("Routine")
            .field("entry", &format_args!("{:#x}", self.entry))
            .field("abi", &self.abi)
            .field("origin", &origin)
            .field("signature", &self.signature)
            .finish()
    }
}
