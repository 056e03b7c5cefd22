//! Growable, aligned scratch buffer for call arguments.
//!
//! Slots are addressed by offset while the buffer is still growing.
//! Raw pointers only exist after [`ArgBuffer::freeze`], when no further
//! reallocation can happen.

use std::ffi::c_void;

const BLOCK: usize = 16;

#[repr(C, align(16))]
#[derive(Clone, Copy)]
struct Block([u8; BLOCK]);

/// Argument buffer under construction.
#[derive(Default)]
pub struct ArgBuffer {
    blocks: Vec<Block>,
    len: usize,
}

impl ArgBuffer {
    pub fn new() -> Self {
        ArgBuffer::default()
    }

    pub fn with_capacity(bytes: usize) -> Self {
        ArgBuffer {
            blocks: Vec::with_capacity(bytes.div_ceil(BLOCK)),
            len: 0,
        }
    }

    /// Bytes in use, padding included.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Append a zeroed slot of `size` bytes aligned to `align` and return
    /// its offset. Alignment is capped at 16.
    pub fn reserve(&mut self, size: usize, align: usize) -> usize {
        let align = align.clamp(1, BLOCK);
        let offset = self.len.next_multiple_of(align);
        self.len = offset + size;
        let needed = self.len.div_ceil(BLOCK);
        if needed > self.blocks.len() {
            self.blocks.resize(needed, Block([0; BLOCK]));
        }
        offset
    }

    pub fn slot(&self, offset: usize, size: usize) -> &[u8] {
        &self.bytes()[offset..offset + size]
    }

    pub fn slot_mut(&mut self, offset: usize, size: usize) -> &mut [u8] {
        &mut self.bytes_mut()[offset..offset + size]
    }

    fn bytes(&self) -> &[u8] {
        unsafe { std::slice::from_raw_parts(self.blocks.as_ptr() as *const u8, self.len) }
    }

    fn bytes_mut(&mut self) -> &mut [u8] {
        unsafe { std::slice::from_raw_parts_mut(self.blocks.as_mut_ptr() as *mut u8, self.len) }
    }

    /// Stop growing; offsets can now be turned into pointers.
    pub fn freeze(mut self) -> FrozenBuffer {
        let base = self.blocks.as_mut_ptr() as *mut u8;
        FrozenBuffer {
            _blocks: self.blocks,
            base,
            len: self.len,
        }
    }
}

/// An argument buffer that no longer moves.
pub struct FrozenBuffer {
    _blocks: Vec<Block>,
    base: *mut u8,
    len: usize,
}

impl FrozenBuffer {
    /// Absolute address of the slot at `offset`.
    pub fn ptr(&self, offset: usize) -> *mut c_void {
        debug_assert!(offset <= self.len);
        unsafe { self.base.add(offset) as *mut c_void }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}
