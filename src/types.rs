//! Primitive type catalog.
//!
//! Maps the closed set of primitive tags to their widths, their host value
//! ranges, and the libffi descriptors the native backend expects. The
//! keyword table is built once and only read afterwards.

use libffi::low::types;
use libffi::raw::ffi_type;
use once_cell::sync::Lazy;
use rustc_hash::FxHashMap;
use std::fmt;

/// Width of a native pointer on this target.
pub const POINTER_SIZE: usize = std::mem::size_of::<*const ()>();

/// Width libffi widens small integral return values to.
pub const FFI_ARG_SIZE: usize = std::mem::size_of::<libffi::raw::ffi_arg>();

/// Largest byte size a field or aggregate may have.
pub const SIZE_LIMIT: u64 = u32::MAX as u64;

/// A primitive ABI type.
///
/// `Opaque` carries a pointer to a host value so its identity survives a
/// round trip through native code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimType {
    Int8,
    UInt8,
    Int16,
    UInt16,
    Int32,
    UInt32,
    Int64,
    UInt64,
    Float32,
    Float64,
    Pointer,
    Opaque,
}

static KEYWORDS: Lazy<FxHashMap<&'static str, PrimType>> = Lazy::new(|| {
    let mut table = FxHashMap::default();
    for ty in PrimType::ALL {
        table.insert(ty.keyword(), ty);
    }
    // accepted spellings
    table.insert("float32", PrimType::Float32);
    table.insert("float64", PrimType::Float64);
    table.insert("opaque", PrimType::Opaque);
    table
});

impl PrimType {
    pub const ALL: [PrimType; 12] = [
        PrimType::Int8,
        PrimType::UInt8,
        PrimType::Int16,
        PrimType::UInt16,
        PrimType::Int32,
        PrimType::UInt32,
        PrimType::Int64,
        PrimType::UInt64,
        PrimType::Float32,
        PrimType::Float64,
        PrimType::Pointer,
        PrimType::Opaque,
    ];

    /// Look up a primitive by its keyword, e.g. `"uint16"` or `"double"`.
    pub fn from_keyword(word: &str) -> Option<PrimType> {
        KEYWORDS.get(word).copied()
    }

    /// Canonical keyword for this primitive.
    pub fn keyword(self) -> &'static str {
        match self {
            PrimType::Int8 => "int8",
            PrimType::UInt8 => "uint8",
            PrimType::Int16 => "int16",
            PrimType::UInt16 => "uint16",
            PrimType::Int32 => "int32",
            PrimType::UInt32 => "uint32",
            PrimType::Int64 => "int64",
            PrimType::UInt64 => "uint64",
            PrimType::Float32 => "float",
            PrimType::Float64 => "double",
            PrimType::Pointer => "pointer",
            PrimType::Opaque => "value",
        }
    }

    /// Size of this type in bytes.
    pub fn size(self) -> usize {
        match self {
            PrimType::Int8 | PrimType::UInt8 => 1,
            PrimType::Int16 | PrimType::UInt16 => 2,
            PrimType::Int32 | PrimType::UInt32 | PrimType::Float32 => 4,
            PrimType::Int64 | PrimType::UInt64 | PrimType::Float64 => 8,
            PrimType::Pointer | PrimType::Opaque => POINTER_SIZE,
        }
    }

    /// Natural alignment; scalars align to their own size.
    pub fn alignment(self) -> usize {
        self.size()
    }

    pub fn is_integer(self) -> bool {
        matches!(
            self,
            PrimType::Int8
                | PrimType::UInt8
                | PrimType::Int16
                | PrimType::UInt16
                | PrimType::Int32
                | PrimType::UInt32
                | PrimType::Int64
                | PrimType::UInt64
        )
    }

    pub fn is_signed(self) -> bool {
        matches!(
            self,
            PrimType::Int8 | PrimType::Int16 | PrimType::Int32 | PrimType::Int64
        )
    }

    pub fn is_float(self) -> bool {
        matches!(self, PrimType::Float32 | PrimType::Float64)
    }

    /// Inclusive range of host integers this type accepts.
    ///
    /// Host integers are `i64`, so `uint64` tops out at `i64::MAX`.
    pub fn integer_range(self) -> Option<(i64, i64)> {
        match self {
            PrimType::Int8 => Some((i8::MIN as i64, i8::MAX as i64)),
            PrimType::UInt8 => Some((0, u8::MAX as i64)),
            PrimType::Int16 => Some((i16::MIN as i64, i16::MAX as i64)),
            PrimType::UInt16 => Some((0, u16::MAX as i64)),
            PrimType::Int32 => Some((i32::MIN as i64, i32::MAX as i64)),
            PrimType::UInt32 => Some((0, u32::MAX as i64)),
            PrimType::Int64 => Some((i64::MIN, i64::MAX)),
            PrimType::UInt64 => Some((0, i64::MAX)),
            _ => None,
        }
    }

    /// The libffi descriptor for this primitive.
    ///
    /// The descriptors are libffi's own statics; they are never written
    /// through the returned pointer.
    pub(crate) fn ffi_type(self) -> *mut ffi_type {
        unsafe {
            match self {
                PrimType::Int8 => std::ptr::addr_of_mut!(types::sint8),
                PrimType::UInt8 => std::ptr::addr_of_mut!(types::uint8),
                PrimType::Int16 => std::ptr::addr_of_mut!(types::sint16),
                PrimType::UInt16 => std::ptr::addr_of_mut!(types::uint16),
                PrimType::Int32 => std::ptr::addr_of_mut!(types::sint32),
                PrimType::UInt32 => std::ptr::addr_of_mut!(types::uint32),
                PrimType::Int64 => std::ptr::addr_of_mut!(types::sint64),
                PrimType::UInt64 => std::ptr::addr_of_mut!(types::uint64),
                PrimType::Float32 => std::ptr::addr_of_mut!(types::float),
                PrimType::Float64 => std::ptr::addr_of_mut!(types::double),
                PrimType::Pointer | PrimType::Opaque => std::ptr::addr_of_mut!(types::pointer),
            }
        }
    }

    /// Descriptor used for a missing return value.
    pub(crate) fn void_ffi_type() -> *mut ffi_type {
        unsafe { std::ptr::addr_of_mut!(types::void) }
    }
}

impl fmt::Display for PrimType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.keyword())
    }
}
