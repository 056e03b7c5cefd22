//! Backing memory for aggregate instances.
//!
//! Storage is either owned by the bridge or borrowed from external code at
//! a fixed address. External regions carry a liveness flag that is checked
//! before every access; invalidation happens once and is not reversible.
//!
//! Invalidation is assumed to happen on the thread using the instance.
//! Racing an access against invalidation from another thread is the
//! caller's responsibility.

use crate::error::{FfiError, FfiResult};
use std::cell::{Cell, RefCell};
use std::rc::Rc;

/// Who owns the bytes behind an instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MemoryOwner {
    /// Allocated by the bridge and freed when the last instance drops.
    Bridge,
    /// Lives at an external address; the bridge never frees it itself.
    External,
}

/// A non-owning view of externally managed memory.
#[derive(Debug)]
pub struct ExternalRegion {
    address: usize,
    size: usize,
    valid: Cell<bool>,
}

#[derive(Debug, Clone)]
pub(crate) enum Storage {
    Owned(Rc<RefCell<Vec<u8>>>),
    External(Rc<ExternalRegion>),
}

impl Storage {
    pub(crate) fn owned(size: usize) -> Storage {
        Storage::Owned(Rc::new(RefCell::new(vec![0; size])))
    }

    pub(crate) fn from_vec(bytes: Vec<u8>) -> Storage {
        Storage::Owned(Rc::new(RefCell::new(bytes)))
    }

    pub(crate) fn external(address: usize, size: usize) -> Storage {
        Storage::External(Rc::new(ExternalRegion {
            address,
            size,
            valid: Cell::new(true),
        }))
    }

    pub(crate) fn owner(&self) -> MemoryOwner {
        match self {
            Storage::Owned(_) => MemoryOwner::Bridge,
            Storage::External(_) => MemoryOwner::External,
        }
    }

    pub(crate) fn is_live(&self) -> bool {
        match self {
            Storage::Owned(_) => true,
            Storage::External(region) => region.valid.get(),
        }
    }

    /// Total bytes behind this storage, or a liveness error.
    pub(crate) fn len(&self) -> FfiResult<usize> {
        match self {
            Storage::Owned(bytes) => Ok(bytes.borrow().len()),
            Storage::External(region) => {
                region.check()?;
                Ok(region.size)
            }
        }
    }

    /// Base address of the storage.
    pub(crate) fn address(&self) -> FfiResult<usize> {
        match self {
            Storage::Owned(bytes) => Ok(bytes.borrow().as_ptr() as usize),
            Storage::External(region) => {
                region.check()?;
                Ok(region.address)
            }
        }
    }

    pub(crate) fn with_bytes<R>(
        &self,
        offset: usize,
        len: usize,
        f: impl FnOnce(&[u8]) -> R,
    ) -> FfiResult<R> {
        match self {
            Storage::Owned(bytes) => {
                let bytes = bytes.borrow();
                let slice = bytes
                    .get(offset..offset + len)
                    .ok_or_else(|| FfiError::index_out_of_bounds(offset + len, bytes.len()))?;
                Ok(f(slice))
            }
            Storage::External(region) => {
                region.check()?;
                region.bounds(offset, len)?;
                let slice = unsafe {
                    std::slice::from_raw_parts((region.address + offset) as *const u8, len)
                };
                Ok(f(slice))
            }
        }
    }

    pub(crate) fn with_bytes_mut<R>(
        &self,
        offset: usize,
        len: usize,
        f: impl FnOnce(&mut [u8]) -> R,
    ) -> FfiResult<R> {
        match self {
            Storage::Owned(bytes) => {
                let mut bytes = bytes.borrow_mut();
                let total = bytes.len();
                let slice = bytes
                    .get_mut(offset..offset + len)
                    .ok_or_else(|| FfiError::index_out_of_bounds(offset + len, total))?;
                Ok(f(slice))
            }
            Storage::External(region) => {
                region.check()?;
                region.bounds(offset, len)?;
                let slice = unsafe {
                    std::slice::from_raw_parts_mut((region.address + offset) as *mut u8, len)
                };
                Ok(f(slice))
            }
        }
    }

    /// Mark external storage dead, then hand its address to `free`.
    pub(crate) fn invalidate(&self, free: Option<&dyn Fn(usize)>) -> FfiResult<()> {
        match self {
            Storage::Owned(_) => Err(FfiError::not_external()),
            Storage::External(region) => {
                if !region.valid.replace(false) {
                    return Err(FfiError::already_invalidated(region.address));
                }
                tracing::debug!(
                    event = "external_invalidated",
                    address = region.address,
                    size = region.size,
                    freed = free.is_some(),
                );
                if let Some(free) = free {
                    free(region.address);
                }
                Ok(())
            }
        }
    }

    pub(crate) fn same_storage(&self, other: &Storage) -> bool {
        match (self, other) {
            (Storage::Owned(a), Storage::Owned(b)) => Rc::ptr_eq(a, b),
            (Storage::External(a), Storage::External(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl ExternalRegion {
    fn check(&self) -> FfiResult<()> {
        if self.valid.get() {
            Ok(())
        } else {
            Err(FfiError::memory_invalidated(self.address))
        }
    }

    fn bounds(&self, offset: usize, len: usize) -> FfiResult<()> {
        if offset + len > self.size {
            return Err(FfiError::index_out_of_bounds(offset + len, self.size));
        }
        Ok(())
    }
}
