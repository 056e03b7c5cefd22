//! Dynamic library handles.
//!
//! Routines only need two things from the library they come from: symbol
//! addresses, and whether the library is still open. [`Library`] is that
//! boundary; [`NativeLibrary`] implements it with `libloading`.

use crate::error::{FfiError, FfiResult};
use std::cell::RefCell;
use std::path::Path;

/// What a bound routine needs from its owning library.
pub trait Library {
    fn name(&self) -> &str;

    fn is_open(&self) -> bool;

    /// Address of `symbol`.
    fn symbol(&self, symbol: &str) -> FfiResult<usize>;
}

/// A shared library loaded through the platform loader.
pub struct NativeLibrary {
    path: String,
    native: RefCell<Option<libloading::Library>>,
}

impl NativeLibrary {
    /// Load a library by path or bare name.
    ///
    /// Paths containing a separator must exist; bare names are resolved
    /// by the platform loader's search rules.
    pub fn open(path: &str) -> FfiResult<NativeLibrary> {
        if path.contains(std::path::MAIN_SEPARATOR) && !Path::new(path).exists() {
            return Err(FfiError::library_not_found(path));
        }
        let native = unsafe { libloading::Library::new(path) }
            .map_err(|e| FfiError::library_not_found(format!("{} ({})", path, e)))?;
        tracing::debug!(event = "library_opened", path);
        Ok(NativeLibrary {
            path: path.to_string(),
            native: RefCell::new(Some(native)),
        })
    }

    /// The running executable and everything already linked into it.
    #[cfg(unix)]
    pub fn this_process() -> NativeLibrary {
        NativeLibrary {
            path: "<self>".to_string(),
            native: RefCell::new(Some(libloading::os::unix::Library::this().into())),
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Unload the library. Routines bound to it fail from now on.
    pub fn close(&self) -> FfiResult<()> {
        let native = self
            .native
            .borrow_mut()
            .take()
            .ok_or_else(|| FfiError::library_closed(self.path.as_str()))?;
        native
            .close()
            .map_err(|e| FfiError::library_not_found(format!("{} ({})", self.path, e)))?;
        tracing::debug!(event = "library_closed", path = %self.path);
        Ok(())
    }
}

impl Library for NativeLibrary {
    fn name(&self) -> &str {
        &self.path
    }

    fn is_open(&self) -> bool {
        self.native.borrow().is_some()
    }

    fn symbol(&self, symbol: &str) -> FfiResult<usize> {
        let native = self.native.borrow();
        let lib = native
            .as_ref()
            .ok_or_else(|| FfiError::library_closed(self.path.as_str()))?;
        let addr = unsafe {
            lib.get::<*const std::ffi::c_void>(symbol.as_bytes())
                .map(|sym| *sym as usize)
        }
        .map_err(|_| FfiError::symbol_not_found(self.path.as_str(), symbol))?;
        if addr == 0 {
            return Err(FfiError::symbol_not_found(self.path.as_str(), symbol));
        }
        Ok(addr)
    }
}

impl std::fmt::Debug for NativeLibrary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NativeLibrary")
            .field("path", &self.path)
            .field("open", &self.is_open())
            .finish()
    }
}
