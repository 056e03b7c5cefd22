//! Host values addressed by integer.
//!
//! A value cell lets a host value travel through native code as an opaque
//! pointer. Cells live in a per-thread registry keyed by address, so a
//! read through an address that is not a live cell fails with
//! [`ErrorKind::UnknownCell`](crate::error::ErrorKind::UnknownCell) instead
//! of touching memory. Opaque-value slots are encoded as cells too.
//!
//! A cell stays alive until [`free_value_pointer`] releases it. Addresses of
//! released cells may be handed out again by later allocations.

use crate::error::{FfiError, FfiResult};
use crate::value::HostValue;
use rustc_hash::FxHashMap;
use std::any::Any;
use std::cell::RefCell;

struct Slot {
    value: Box<dyn Any>,
}

thread_local! {
    static CELLS: RefCell<FxHashMap<usize, Box<Slot>>> = RefCell::new(FxHashMap::default());
}

/// Store `value` in a new cell and return the cell's address.
pub fn alloc_value_pointer<V: HostValue>(value: V) -> usize {
    let slot = Box::new(Slot {
        value: Box::new(value),
    });
    let address = &*slot as *const Slot as usize;
    CELLS.with(|cells| cells.borrow_mut().insert(address, slot));
    tracing::trace!(event = "value_cell_alloc", address);
    address
}

fn with_cell<V: HostValue, R>(
    address: usize,
    operation: &str,
    f: impl FnOnce(&mut V) -> R,
) -> FfiResult<R> {
    if address == 0 {
        return Err(FfiError::null_address(operation));
    }
    CELLS.with(|cells| {
        let mut cells = cells.borrow_mut();
        let slot = cells
            .get_mut(&address)
            .ok_or_else(|| FfiError::unknown_cell(address))?;
        let value = slot
            .value
            .downcast_mut::<V>()
            .ok_or_else(|| FfiError::type_mismatch("value cell of this host type", "foreign cell"))?;
        Ok(f(value))
    })
}

/// Clone the value stored in a cell.
pub fn get_at_pointer<V: HostValue>(address: usize) -> FfiResult<V> {
    with_cell(address, "get-at-pointer", |v: &mut V| v.clone())
}

/// Replace the value stored in a cell and return a clone of the new value.
pub fn set_at_pointer<V: HostValue>(address: usize, value: V) -> FfiResult<V> {
    let old = with_cell(address, "set-at-pointer", |v: &mut V| {
        std::mem::replace(v, value.clone())
    })?;
    // dropped outside the registry borrow
    drop(old);
    Ok(value)
}

/// Release a cell.
pub fn free_value_pointer<V: HostValue>(address: usize) -> FfiResult<()> {
    // checks null, liveness and type before removing
    with_cell(address, "free-value-pointer", |_: &mut V| ())?;
    let slot = CELLS.with(|cells| cells.borrow_mut().remove(&address));
    tracing::trace!(event = "value_cell_free", address);
    drop(slot);
    Ok(())
}

/// Whether `address` names a live cell on this thread.
pub fn is_value_pointer(address: usize) -> bool {
    CELLS.with(|cells| cells.borrow().contains_key(&address))
}
